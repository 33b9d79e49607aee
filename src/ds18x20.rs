use crate::interrupts::InterruptControl;
use crate::line::Line;
use crate::reading::{Reading, Sensor};
use core::fmt;
use embedded_hal::delay::DelayNs;
use log::{debug, warn};

const RESET_LOW_US: u32 = 480;
// Sensors answer 15-60us after the reset with a 60-240us presence pulse.
const PRESENCE_SAMPLE_DELAY_US: u32 = 66;
const PRESENCE_SETTLE_US: u32 = 240;

const WRITE_0_LOW_US: u32 = 60;
const WRITE_0_RECOVERY_US: u32 = 4;
const WRITE_1_LOW_US: u32 = 10;
const WRITE_1_RECOVERY_US: u32 = 54;
const WRITE_BYTE_PAUSE_US: u32 = 5;

const READ_REQUEST_US: u32 = 1;
const READ_SAMPLE_DELAY_US: u32 = 10;
const READ_POST_SAMPLE_US: u32 = 50;

const CONVERSION_POLL_DELAY_US: u32 = 1;
/// Read back while a conversion is still running.
const BUSY: u8 = 0xFF;

/// Number of bytes in the scratchpad.
pub const SCRATCHPAD_LEN: usize = 9;

#[derive(Debug, PartialEq)]
pub enum Error<TIoError> {
    /// Wrapped error from the HAL.
    Wrapped(TIoError),
    /// Invalid argument was provided.
    InvalidArgument,
    /// Nothing pulled the line low after a reset.
    NoPresence,
    /// The line was still low after the presence window.
    ShortCircuit,
    /// The conversion did not finish within the poll limit.
    ConversionTimeout,
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
            Error::NoPresence => f.write_str("No device answered the reset"),
            Error::ShortCircuit => f.write_str("Line is shorted to ground"),
            Error::ConversionTimeout => f.write_str("Temperature conversion timed out"),
        }
    }
}

/// What the line looked like after a reset pulse.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Presence {
    /// A device pulled the line low during the presence window.
    Present = 0,
    /// The line stayed high.
    NoDevice = 1,
    /// The line stayed low long after the presence window.
    ShortCircuit = 2,
}

impl Presence {
    /// The numeric status code: 0 ok, 1 no device, 2 short circuit.
    pub fn code(self) -> u8 {
        self as u8
    }
}

/// Administrative commands for operating the data line.
#[derive(Clone, Copy, Debug)]
pub enum RomCommand {
    /// Addresses all devices simultaneously.
    ///
    /// Only one device per line is supported, so every function command follows a skip.
    Skip = 0xCC,
}

/// Requests the sensor perform some operation.
///
/// These commands can only be sent after a [`RomCommand`].
#[derive(Clone, Copy, Debug)]
pub enum FunctionCommand {
    /// Stores the current temperature in the scratchpad.
    ///
    /// The controller can send read slots to determine when the conversion is complete.
    ConvertTemperature = 0x44,
    /// Reads the contents of the sensor's scratchpad. See [`Scratchpad`].
    ReadScratchpad = 0xBE,
}

/// What to do when a conversion is still busy after [`Options::conversion_poll_limit`] polls.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConversionTimeout {
    /// Fail the read with [`Error::ConversionTimeout`].
    Fail,
    /// Read the scratchpad anyway. The temperature may be from an earlier conversion.
    Proceed,
}

/// Options to modify the behavior of the DS18x20 driver.
#[derive(Clone, Copy, Debug)]
pub struct Options {
    /// How many bytes to poll, 1us apart, while waiting for a conversion to finish.
    pub conversion_poll_limit: u16,
    pub on_conversion_timeout: ConversionTimeout,
}

pub const DEFAULT_OPTIONS: Options = Options {
    conversion_poll_limit: 1000,
    on_conversion_timeout: ConversionTimeout::Fail,
};

/// The sensor's 9-byte register block.
///
/// Bytes:
///
/// 1. Byte 0: Temperature in half degrees, least-significant byte.
/// 2. Byte 1: Sign byte (0x00 positive, 0xFF negative).
/// 3. Byte 2: High temperature threshold for the alarm (T<sub>H</sub>).
/// 4. Byte 3: Low temperature threshold for the alarm (T<sub>L</sub>).
/// 5. Byte 4-5: Reserved.
/// 6. Byte 6: Count remain.
/// 7. Byte 7: Count per degree Celsius.
/// 8. Byte 8: The CRC byte.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Scratchpad(pub [u8; SCRATCHPAD_LEN]);

impl Scratchpad {
    pub fn is_negative(&self) -> bool {
        self.0[1] != 0
    }

    /// Whether the half-degree bit of the temperature is set.
    pub fn half_degree(&self) -> bool {
        self.0[0] & 1 == 1
    }

    pub fn count_remain(&self) -> u8 {
        self.0[6]
    }

    pub fn count_per_c(&self) -> u8 {
        self.0[7]
    }

    /// The temperature in degrees Celsius.
    ///
    /// Positive values are refined with the count remain registers and rounded to 0.1 degrees.
    /// Negative values keep the sensor's half degree resolution. A positive reading with a zero
    /// count per degree cannot be refined and reads as 0.0.
    pub fn temperature(&self) -> f32 {
        let raw = self.0[0];
        if self.is_negative() {
            let mut temperature = -(((!raw) >> 1) as f32 + 1.0);
            if self.half_degree() {
                temperature += 0.5;
            }
            return temperature;
        }

        let count_per_c = self.count_per_c();
        if count_per_c == 0 {
            warn!("Scratchpad has no count per degree: {:?}", self.0);
            return 0.0;
        }
        let temperature = (raw >> 1) as f32 - 0.25
            + (count_per_c as f32 - self.count_remain() as f32) / count_per_c as f32;
        libm::floorf(temperature * 10.0 + 0.5) / 10.0
    }
}

/// A DS18S20 or compatible temperature sensor, alone on its line and externally powered.
///
/// Unlike the DHT protocol, nothing here is checksummed end to end. A failed reset is the only
/// signal that the scratchpad cannot be trusted, so reads stop at the first failed reset.
#[derive(Debug)]
pub struct Ds18x20<TLine, TDelay, TInterrupts> {
    line: TLine,
    delay: TDelay,
    interrupts: TInterrupts,
    options: Options,
    scratchpad: [u8; SCRATCHPAD_LEN],
}

impl<TLine, TDelay, TInterrupts, TError> Ds18x20<TLine, TDelay, TInterrupts>
where
    TLine: Line<Error = TError>,
    TDelay: DelayNs,
    TInterrupts: InterruptControl,
{
    /// Constructs a DS18x20 sensor on the given line.
    ///
    /// Every reset and every bit slot runs inside `interrupts`, so an interrupt can only land
    /// between slots. If options is `None`, then [`DEFAULT_OPTIONS`] is used.
    pub fn new(
        line: TLine,
        delay: TDelay,
        interrupts: TInterrupts,
        options: Option<Options>,
    ) -> Result<Ds18x20<TLine, TDelay, TInterrupts>, Error<TError>> {
        let options = options.unwrap_or(DEFAULT_OPTIONS);
        if options.conversion_poll_limit == 0 {
            return Err(Error::InvalidArgument);
        }
        Ok(Ds18x20 {
            line,
            delay,
            interrupts,
            options,
            scratchpad: [0; SCRATCHPAD_LEN],
        })
    }

    /// Starts a first conversion so the sensor holds a fresh value before the first read.
    pub fn init(&mut self) -> Result<(), Error<TError>> {
        self.start_conversion()
    }

    /// Converts and reads the current temperature.
    pub fn read(&mut self) -> Result<Reading, Error<TError>> {
        self.start_conversion()?;
        let scratchpad = self.read_scratchpad()?;
        let temperature = scratchpad.temperature();
        debug!("DS18x20 temperature: {}", temperature);
        Ok(Reading::new(temperature, None))
    }

    /// Resets the line and classifies the presence response.
    ///
    /// Only HAL errors are returned as `Err`; the caller decides what a missing device or a
    /// shorted line means.
    pub fn reset(&mut self) -> Result<Presence, Error<TError>> {
        let Ds18x20 {
            line,
            delay,
            interrupts,
            ..
        } = self;
        let presence = interrupts.masked(|| -> Result<Presence, TError> {
            line.drive_low()?;
            delay.delay_us(RESET_LOW_US);
            line.release()?;
            delay.delay_us(PRESENCE_SAMPLE_DELAY_US);
            let mut presence = if line.is_high()? {
                Presence::NoDevice
            } else {
                Presence::Present
            };
            delay.delay_us(PRESENCE_SETTLE_US);
            if !line.is_high()? {
                presence = Presence::ShortCircuit;
            }
            Ok(presence)
        })?;
        Ok(presence)
    }

    /// Runs a conversion: reset, skip ROM, convert, then poll until the sensor is no longer busy.
    pub fn start_conversion(&mut self) -> Result<(), Error<TError>> {
        self.expect_presence()?;
        self.write_byte(RomCommand::Skip as u8)?;
        self.write_byte(FunctionCommand::ConvertTemperature as u8)?;

        let mut polls = 0u16;
        while self.read_byte()? == BUSY {
            if polls >= self.options.conversion_poll_limit {
                match self.options.on_conversion_timeout {
                    ConversionTimeout::Fail => {
                        warn!("Conversion still busy after {} polls", polls);
                        return Err(Error::ConversionTimeout);
                    }
                    ConversionTimeout::Proceed => {
                        warn!(
                            "Conversion still busy after {} polls, reading anyway",
                            polls
                        );
                        break;
                    }
                }
            }
            self.delay.delay_us(CONVERSION_POLL_DELAY_US);
            polls += 1;
        }
        Ok(())
    }

    /// Reads all nine scratchpad bytes.
    pub fn read_scratchpad(&mut self) -> Result<Scratchpad, Error<TError>> {
        self.scratchpad = [0; SCRATCHPAD_LEN];
        self.expect_presence()?;
        self.write_byte(RomCommand::Skip as u8)?;
        self.write_byte(FunctionCommand::ReadScratchpad as u8)?;
        for i in 0..SCRATCHPAD_LEN {
            self.scratchpad[i] = self.read_byte()?;
        }
        debug!("Scratchpad: {:?}", self.scratchpad);
        Ok(Scratchpad(self.scratchpad))
    }

    /// Writes a byte, least-significant bit first.
    pub fn write_byte(&mut self, byte: u8) -> Result<(), Error<TError>> {
        let mut byte = byte;
        for _ in 0..8 {
            self.write_bit(byte & 1 == 1)?;
            byte >>= 1;
        }
        self.delay.delay_us(WRITE_BYTE_PAUSE_US);
        Ok(())
    }

    /// Reads a byte, least-significant bit first.
    pub fn read_byte(&mut self) -> Result<u8, Error<TError>> {
        let mut byte = 0u8;
        for bit in 0..8 {
            if self.read_bit()? {
                byte |= 1 << bit;
            }
        }
        Ok(byte)
    }

    /// Writes a single bit to the line.
    ///
    /// A 0 holds the line low for most of the slot, a 1 only briefly.
    pub fn write_bit(&mut self, bit: bool) -> Result<(), Error<TError>> {
        let (low_us, recovery_us) = if bit {
            (WRITE_1_LOW_US, WRITE_1_RECOVERY_US)
        } else {
            (WRITE_0_LOW_US, WRITE_0_RECOVERY_US)
        };
        let Ds18x20 {
            line,
            delay,
            interrupts,
            ..
        } = self;
        interrupts.masked(|| -> Result<(), TError> {
            line.drive_low()?;
            delay.delay_us(low_us);
            line.release()
        })?;
        self.delay.delay_us(recovery_us);
        Ok(())
    }

    /// Reads a single bit from the line.
    pub fn read_bit(&mut self) -> Result<bool, Error<TError>> {
        let Ds18x20 {
            line,
            delay,
            interrupts,
            ..
        } = self;
        let bit = interrupts.masked(|| -> Result<bool, TError> {
            line.drive_low()?;
            delay.delay_us(READ_REQUEST_US);
            line.release()?;
            delay.delay_us(READ_SAMPLE_DELAY_US);
            line.is_high()
        })?;
        self.delay.delay_us(READ_POST_SAMPLE_US);
        Ok(bit)
    }

    /// Returns the line, delay and interrupt control owned by this driver.
    pub fn free(self) -> (TLine, TDelay, TInterrupts) {
        (self.line, self.delay, self.interrupts)
    }

    fn expect_presence(&mut self) -> Result<(), Error<TError>> {
        match self.reset()? {
            Presence::Present => Ok(()),
            Presence::NoDevice => {
                warn!("No DS18x20 presence pulse");
                Err(Error::NoPresence)
            }
            Presence::ShortCircuit => {
                warn!("DS18x20 line is shorted");
                Err(Error::ShortCircuit)
            }
        }
    }
}

impl<TLine, TDelay, TInterrupts, TError> Sensor for Ds18x20<TLine, TDelay, TInterrupts>
where
    TLine: Line<Error = TError>,
    TDelay: DelayNs,
    TInterrupts: InterruptControl,
{
    type Error = Error<TError>;

    fn read(&mut self) -> Result<Reading, Error<TError>> {
        Ds18x20::read(self)
    }
}
