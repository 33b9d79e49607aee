use lazy_static::lazy_static;
use std::collections::HashMap;
use std::sync::Mutex;

/// Something a fake peripheral did, in the order it happened.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Event {
    Low,
    Release,
    Sample(bool),
    DelayNs(u32),
    DelayUs(u32),
    DelayMs(u32),
    Mask,
    Unmask,
}

lazy_static! {
    static ref EVENT_LOG: Mutex<HashMap<&'static str, Vec<Event>>> = Mutex::new(HashMap::new());
}

pub fn clear_events(name: &'static str) {
    let mut map = EVENT_LOG.lock().unwrap();
    map.insert(name, Vec::new());
}

pub fn record_event(name: &'static str, event: Event) {
    let mut map = EVENT_LOG.lock().unwrap();
    map.entry(name).or_insert_with(Vec::new).push(event);
}

pub fn events(name: &str) -> Vec<Event> {
    let map = EVENT_LOG.lock().unwrap();
    map.get(name).cloned().unwrap_or_default()
}
