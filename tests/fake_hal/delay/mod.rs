use super::concurrent::{self, Event};
use embedded_hal::delay::DelayNs;

/// Returns immediately, logging each requested delay to the named event log.
#[derive(Debug)]
pub struct Delay {
    name: &'static str,
}

impl Delay {
    pub fn new(name: &'static str) -> Delay {
        Delay { name }
    }
}

impl DelayNs for Delay {
    fn delay_ns(&mut self, ns: u32) {
        concurrent::record_event(self.name, Event::DelayNs(ns));
    }

    fn delay_us(&mut self, us: u32) {
        concurrent::record_event(self.name, Event::DelayUs(us));
    }

    fn delay_ms(&mut self, ms: u32) {
        concurrent::record_event(self.name, Event::DelayMs(ms));
    }
}
