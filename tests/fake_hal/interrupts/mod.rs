use super::concurrent::{self, Event};
use single_wire_sensors::InterruptControl;

/// Logs where interrupts would be masked and unmasked.
#[derive(Debug)]
pub struct Interrupts {
    name: &'static str,
}

impl Interrupts {
    pub fn new(name: &'static str) -> Interrupts {
        Interrupts { name }
    }
}

impl InterruptControl for Interrupts {
    fn masked<R>(&mut self, f: impl FnOnce() -> R) -> R {
        concurrent::record_event(self.name, Event::Mask);
        let result = f();
        concurrent::record_event(self.name, Event::Unmask);
        result
    }
}

/// Checks that masks are balanced and never nested, and that the line was only sampled while
/// interrupts were masked.
pub fn assert_samples_masked(events: &[Event]) {
    let mut masked = false;
    for event in events.iter() {
        match event {
            Event::Mask => {
                assert!(!masked, "nested mask");
                masked = true;
            }
            Event::Unmask => {
                assert!(masked, "unmask without mask");
                masked = false;
            }
            Event::Sample(_) => assert!(masked, "line sampled with interrupts enabled"),
            _ => {}
        }
    }
    assert!(!masked, "interrupts left masked");
}
