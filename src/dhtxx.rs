use crate::interrupts::InterruptControl;
use crate::line::Line;
use crate::pulse::{PulseCounter, TIMEOUT};
use crate::reading::{Reading, Sensor};
use core::fmt;
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::PinState;
use log::{debug, warn};

#[derive(Debug, PartialEq)]
pub enum Error<TIoError> {
    /// Wrapped error from the HAL.
    Wrapped(TIoError),
    /// Invalid argument was provided.
    InvalidArgument,
    /// The line did not change level within the pulse budget.
    PulseTimeout,
    /// All 40 bits arrived, but the checksum byte disagrees with the data.
    ChecksumMismatch { expected: u8, actual: u8 },
}

impl<TIoError> From<TIoError> for Error<TIoError> {
    fn from(error: TIoError) -> Error<TIoError> {
        Error::Wrapped(error)
    }
}

impl<TIoError> fmt::Display for Error<TIoError>
where
    TIoError: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Wrapped(err) => write!(f, "IO error: {:?}", err),
            Error::InvalidArgument => f.write_str("Invalid argument"),
            Error::PulseTimeout => f.write_str("Timed out waiting for a pulse"),
            Error::ChecksumMismatch { expected, actual } => write!(
                f,
                "Checksum mismatch (expected {:#04x}, received {:#04x})",
                expected, actual
            ),
        }
    }
}

/// The DHT model on the line. Selects the start signal timing and how the frame is decoded.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SensorType {
    Dht11,
    /// Also sold as the AM2301.
    Dht21,
    /// Also sold as the AM2302.
    Dht22,
}

impl SensorType {
    fn start_low_duration_ms(self) -> u32 {
        match self {
            SensorType::Dht11 => DHT11_START_LOW_MS,
            SensorType::Dht21 | SensorType::Dht22 => DHT22_START_LOW_MS,
        }
    }

    /// Decodes the data bytes of a frame that has already passed [`validate_frame`].
    ///
    /// The DHT11 reports whole units only. The DHT21/22 report tenths, with the temperature sign in
    /// the top bit of byte 2 (sign-magnitude, not two's complement).
    pub fn decode(self, frame: &[u8; FRAME_LEN]) -> Reading {
        match self {
            SensorType::Dht11 => Reading::new(frame[2] as f32, Some(frame[0] as f32)),
            SensorType::Dht21 | SensorType::Dht22 => {
                let humidity_x10 = u16::from_be_bytes([frame[0], frame[1]]);
                let magnitude_x10 = u16::from_be_bytes([frame[2] & 0x7F, frame[3]]);
                let mut temperature = magnitude_x10 as f32 * 0.1;
                if frame[2] & 0x80 != 0 {
                    temperature = -temperature;
                }
                Reading::new(temperature, Some(humidity_x10 as f32 * 0.1))
            }
        }
    }
}

/// Number of bytes in a DHT frame: four data bytes and a checksum.
pub const FRAME_LEN: usize = 5;
const FRAME_BITS: usize = FRAME_LEN * 8;

/// How long the line is released before a read so the pull-up can settle.
const SETTLE_US: u32 = 250;
const DHT11_START_LOW_MS: u32 = 18;
const DHT22_START_LOW_MS: u32 = 5;
/// How long the line is held high to end the start signal.
const START_HIGH_US: u32 = 40;
/// Time for the sensor to start pulling the line low after the start signal.
const RESPONSE_DELAY_US: u32 = 10;

/// Options to modify the behavior of the DHT driver.
#[derive(Clone, Copy, Debug)]
pub struct Options {
    /// How many busy-wait loop iterations the platform completes per millisecond.
    ///
    /// Sizes the 1ms timeout applied to every pulse. Overestimating only lengthens the timeout;
    /// underestimating it will make valid pulses time out.
    pub loops_per_ms: u32,
}

/// Defaults for a 16MHz microcontroller.
pub const DEFAULT_OPTIONS: Options = Options {
    loops_per_ms: 16_000,
};

/// Computes the checksum byte for the four data bytes of a frame.
pub fn checksum(data: &[u8]) -> u8 {
    data.iter().fold(0u8, |sum, byte| sum.wrapping_add(*byte))
}

/// Checks that the last byte of a frame is the low 8 bits of the sum of the other four.
pub fn validate_frame<TIoError>(frame: &[u8; FRAME_LEN]) -> Result<(), Error<TIoError>> {
    let expected = checksum(&frame[..FRAME_LEN - 1]);
    let actual = frame[FRAME_LEN - 1];
    if expected != actual {
        return Err(Error::ChecksumMismatch { expected, actual });
    }
    Ok(())
}

/// Packs pulse pairs into bytes, most-significant bit first.
///
/// A bit is 1 when its high pulse outlasted the ~50us low pulse that preceded it.
fn pack_bits(cycles: &[(u32, u32); FRAME_BITS], frame: &mut [u8; FRAME_LEN]) {
    for (i, &(low, high)) in cycles.iter().enumerate() {
        frame[i / 8] <<= 1;
        if high > low {
            frame[i / 8] |= 1;
        }
    }
}

/// A DHT11, DHT21 or DHT22 humidity and temperature sensor.
#[derive(Debug)]
pub struct Dht<TLine, TDelay, TInterrupts> {
    line: TLine,
    delay: TDelay,
    interrupts: TInterrupts,
    sensor_type: SensorType,
    counter: PulseCounter,
    frame: [u8; FRAME_LEN],
}

impl<TLine, TDelay, TInterrupts, TError> Dht<TLine, TDelay, TInterrupts>
where
    TLine: Line<Error = TError>,
    TDelay: DelayNs,
    TInterrupts: InterruptControl,
{
    /// Constructs a DHT sensor that reads from the given line.
    ///
    /// If options is `None`, then [`DEFAULT_OPTIONS`] is used.
    pub fn new(
        line: TLine,
        delay: TDelay,
        interrupts: TInterrupts,
        sensor_type: SensorType,
        options: Option<Options>,
    ) -> Result<Dht<TLine, TDelay, TInterrupts>, Error<TError>> {
        let options = options.unwrap_or(DEFAULT_OPTIONS);
        if options.loops_per_ms == 0 {
            return Err(Error::InvalidArgument);
        }
        Ok(Dht {
            line,
            delay,
            interrupts,
            sensor_type,
            counter: PulseCounter::from_loops_per_ms(options.loops_per_ms),
            frame: [0; FRAME_LEN],
        })
    }

    pub fn sensor_type(&self) -> SensorType {
        self.sensor_type
    }

    /// Reads and decodes a reading from the sensor.
    ///
    /// Blocks for the start signal (up to 18ms) and then, with interrupts masked, for the
    /// sensor's response (about 4-5ms). The sensor needs 1-2 seconds between reads; pacing reads
    /// is up to the caller.
    pub fn read(&mut self) -> Result<Reading, Error<TError>> {
        let frame = self.read_frame()?;
        let reading = self.sensor_type.decode(&frame);
        debug!("DHT reading: {}", reading);
        Ok(reading)
    }

    /// Reads a raw frame from the sensor and validates its checksum.
    pub fn read_frame(&mut self) -> Result<[u8; FRAME_LEN], Error<TError>> {
        self.frame = [0; FRAME_LEN];

        self.line.release()?;
        self.delay.delay_us(SETTLE_US);
        self.line.drive_low()?;
        self.delay.delay_ms(self.sensor_type.start_low_duration_ms());

        let counter = self.counter;
        let Dht {
            line,
            delay,
            interrupts,
            ..
        } = self;
        let cycles = interrupts.masked(|| receive_pulses(line, delay, counter))?;

        pack_bits(&cycles, &mut self.frame);
        if let Err(err) = validate_frame(&self.frame) {
            warn!("DHT checksum failure: {:?}", self.frame);
            return Err(err);
        }
        Ok(self.frame)
    }

    /// Returns the line, delay and interrupt control owned by this driver.
    pub fn free(self) -> (TLine, TDelay, TInterrupts) {
        (self.line, self.delay, self.interrupts)
    }
}

impl<TLine, TDelay, TInterrupts, TError> Sensor for Dht<TLine, TDelay, TInterrupts>
where
    TLine: Line<Error = TError>,
    TDelay: DelayNs,
    TInterrupts: InterruptControl,
{
    type Error = Error<TError>;

    fn read(&mut self) -> Result<Reading, Error<TError>> {
        Dht::read(self)
    }
}

/// Ends the start signal, then measures the sensor's response and 40 data bits.
///
/// Must run with interrupts masked. Returns `(low, high)` loop counts for each bit.
fn receive_pulses<TLine, TDelay, TError>(
    line: &mut TLine,
    delay: &mut TDelay,
    counter: PulseCounter,
) -> Result<[(u32, u32); FRAME_BITS], Error<TError>>
where
    TLine: Line<Error = TError>,
    TDelay: DelayNs,
{
    line.release()?;
    delay.delay_us(START_HIGH_US);
    delay.delay_us(RESPONSE_DELAY_US);

    // The sensor acknowledges with ~80us low followed by ~80us high.
    if counter.measure(line, PinState::Low)? == TIMEOUT {
        debug!("Timeout waiting for start signal low pulse");
        return Err(Error::PulseTimeout);
    }
    if counter.measure(line, PinState::High)? == TIMEOUT {
        debug!("Timeout waiting for start signal high pulse");
        return Err(Error::PulseTimeout);
    }

    let mut cycles = [(0u32, 0u32); FRAME_BITS];
    for (i, pulse) in cycles.iter_mut().enumerate() {
        let low = counter.measure(line, PinState::Low)?;
        if low == TIMEOUT {
            debug!("Timeout waiting for low pulse of bit {}", i);
            return Err(Error::PulseTimeout);
        }
        let high = counter.measure(line, PinState::High)?;
        if high == TIMEOUT {
            debug!("Timeout waiting for high pulse of bit {}", i);
            return Err(Error::PulseTimeout);
        }
        *pulse = (low, high);
    }
    Ok(cycles)
}
