use crate::reading::{Reading, Scale, Sensor};
use core::convert::Infallible;
use core::fmt;
use core::time::Duration;
use heapless::Vec;
use log::{debug, info, warn};

/// First byte of every frame sent by a sensor node.
pub const SENSOR_MESSAGE: u8 = 100;

/// Number of bytes in a [`Frame`].
pub const FRAME_LEN: usize = 4;

/// The most frames a single reading produces.
pub const MAX_FRAMES: usize = 3;

#[derive(Debug, PartialEq)]
pub enum Error<TRadioError, TSensorError> {
    /// Wrapped error from the radio.
    Radio(TRadioError),
    /// The sensor could not be read.
    Sensor(TSensorError),
    /// Invalid argument was provided.
    InvalidArgument,
}

impl<TRadioError, TSensorError> fmt::Display for Error<TRadioError, TSensorError>
where
    TRadioError: fmt::Debug,
    TSensorError: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Radio(err) => write!(f, "Radio error: {:?}", err),
            Error::Sensor(err) => write!(f, "Sensor error: {:?}", err),
            Error::InvalidArgument => f.write_str("Invalid argument"),
        }
    }
}

/// Identifies the quantity carried by a [`Frame`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Channel {
    Temperature = 1,
    Humidity = 2,
    HeatIndex = 3,
}

/// A radio payload carrying one value in tenths.
///
/// Layout: `[SENSOR_MESSAGE, channel, high byte, low byte]`, where the last two bytes are the
/// big-endian `i16` of the value times ten, truncated towards zero.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Frame([u8; FRAME_LEN]);

impl Frame {
    pub fn new(channel: Channel, value: f32) -> Frame {
        let [high, low] = ((value * 10.0) as i16).to_be_bytes();
        Frame([SENSOR_MESSAGE, channel as u8, high, low])
    }

    pub fn as_bytes(&self) -> &[u8; FRAME_LEN] {
        &self.0
    }

    /// The value carried, in tenths.
    pub fn value_x10(&self) -> i16 {
        i16::from_be_bytes([self.0[2], self.0[3]])
    }
}

/// Builds the frames for a reading: temperature always, then humidity and heat index when the
/// sensor measures humidity. All temperatures are in Celsius.
pub fn frames_for(reading: &Reading) -> Vec<Frame, MAX_FRAMES> {
    let mut frames = Vec::new();
    // Capacity covers every channel, so pushes cannot fail.
    let _ = frames.push(Frame::new(Channel::Temperature, reading.temperature()));
    if let Some(humidity) = reading.humidity() {
        let _ = frames.push(Frame::new(Channel::Humidity, humidity));
    }
    if let Some(heat_index) = reading.heat_index(Scale::Celsius) {
        let _ = frames.push(Frame::new(Channel::HeatIndex, heat_index));
    }
    frames
}

/// The packet radio carrying frames to the base station.
///
/// Addressing, retries, acknowledgements and power management belong to the implementation.
pub trait Radio {
    type Error;

    fn transmit(&mut self, payload: &[u8]) -> Result<(), Self::Error>;
}

/// Counts wake-ups and decides when a report is due.
#[derive(Clone, Copy, Debug)]
pub struct Schedule {
    report_every: u16,
    wakes: u16,
}

impl Schedule {
    /// A report is due on the first wake and then on every `report_every`th wake.
    pub fn new(report_every: u16) -> Schedule {
        Schedule {
            report_every,
            wakes: report_every.saturating_sub(1),
        }
    }

    /// Records a wake-up and returns whether a report is due.
    pub fn tick(&mut self) -> bool {
        self.wakes += 1;
        if self.wakes >= self.report_every {
            self.wakes = 0;
            return true;
        }
        false
    }
}

/// Options to modify the behavior of the relay.
#[derive(Clone, Copy, Debug)]
pub struct Options {
    /// How long the node sleeps between wake-ups.
    pub wake_period: Duration,
    /// How many wake-ups pass between reports.
    pub report_every: u16,
}

/// Eight second wake-ups, reporting once an hour.
pub const DEFAULT_OPTIONS: Options = Options {
    wake_period: Duration::from_secs(8),
    report_every: 450,
};

/// Reads sensors on a schedule and relays their readings over a radio.
#[derive(Debug)]
pub struct Relay<TRadio> {
    radio: TRadio,
    options: Options,
    schedule: Schedule,
}

impl<TRadio, TRadioError> Relay<TRadio>
where
    TRadio: Radio<Error = TRadioError>,
{
    /// If options is `None`, then [`DEFAULT_OPTIONS`] is used.
    pub fn new(
        radio: TRadio,
        options: Option<Options>,
    ) -> Result<Relay<TRadio>, Error<TRadioError, Infallible>> {
        let options = options.unwrap_or(DEFAULT_OPTIONS);
        if options.report_every == 0 || options.wake_period == Duration::ZERO {
            return Err(Error::InvalidArgument);
        }
        Ok(Relay {
            radio,
            options,
            schedule: Schedule::new(options.report_every),
        })
    }

    /// Sleeps whole wake periods using the provided `delay_fn` until a report is due.
    pub async fn wait_for_report<DelayFn, EmptyFuture>(&mut self, delay_fn: DelayFn)
    where
        DelayFn: Fn(Duration) -> EmptyFuture,
        EmptyFuture: core::future::Future<Output = ()>,
    {
        loop {
            delay_fn(self.options.wake_period).await;
            if self.schedule.tick() {
                return;
            }
        }
    }

    /// Reads `sensor` once and transmits its frames. Returns the number of frames sent.
    ///
    /// A failed read is returned without retrying; the next scheduled report tries again.
    pub fn report<TSensor>(
        &mut self,
        sensor: &mut TSensor,
    ) -> Result<usize, Error<TRadioError, TSensor::Error>>
    where
        TSensor: Sensor,
    {
        let reading = match sensor.read() {
            Ok(reading) => reading,
            Err(err) => {
                warn!("Skipping report, sensor read failed");
                return Err(Error::Sensor(err));
            }
        };
        info!("Relaying {}", reading);

        let frames = frames_for(&reading);
        for frame in frames.iter() {
            debug!("Transmitting {:?}", frame.as_bytes());
            self.radio
                .transmit(frame.as_bytes())
                .map_err(Error::Radio)?;
        }
        Ok(frames.len())
    }

    /// Returns the radio owned by this relay.
    pub fn free(self) -> TRadio {
        self.radio
    }
}
