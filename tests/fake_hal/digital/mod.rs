use super::concurrent::{self, Event};
use embedded_hal::digital::{self, ErrorKind, ErrorType, InputPin, OutputPin};

#[derive(Debug, PartialEq)]
pub enum Error {}

impl digital::Error for Error {
    fn kind(&self) -> ErrorKind {
        match *self {}
    }
}

/// An open-drain pin that replays scripted line levels, one per sample.
///
/// Once the script runs out, every sample returns the default level.
#[derive(Debug)]
pub struct Pin {
    data_to_read: Option<Vec<u8>>,
    data_index: usize,
    name: &'static str,
    default_data: bool,
}

impl Pin {
    pub fn new(name: &'static str) -> Pin {
        concurrent::clear_events(name);
        Pin {
            data_to_read: None,
            data_index: 0,
            name: name,
            default_data: false,
        }
    }

    pub fn set_default_data(&mut self, default: bool) {
        self.default_data = default;
    }

    pub fn set_data(&mut self, data: Vec<u8>) {
        self.data_to_read = Some(data);
        self.data_index = 0;
    }

    fn sample(&mut self) -> bool {
        let level = match self.data_to_read.as_ref() {
            Some(data) if self.data_index < data.len() => {
                self.data_index += 1;
                data[self.data_index - 1] > 0
            }
            _ => self.default_data,
        };
        concurrent::record_event(self.name, Event::Sample(level));
        level
    }
}

impl ErrorType for Pin {
    type Error = Error;
}

impl InputPin for Pin {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(self.sample())
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.sample())
    }
}

impl OutputPin for Pin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        concurrent::record_event(self.name, Event::Low);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        concurrent::record_event(self.name, Event::Release);
        Ok(())
    }
}
