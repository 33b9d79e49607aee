#![no_std]

/// Universal driver for reading from DHT11, DHT21 or DHT22 humidity and temperature sensors.
pub mod dhtxx;
/// Driver for DS18S20-family temperature sensors on a dedicated line.
///
/// Refer to [this datasheet](https://datasheets.maximintegrated.com/en/ds/DS18S20.pdf) for more
/// information about these devices.
pub mod ds18x20;
pub mod interrupts;
/// Electrical access to a single-wire data line.
pub mod line;
/// Busy-wait pulse width measurement.
pub mod pulse;
pub mod reading;
/// Scheduling and radio framing for a battery-powered sensor node.
pub mod relay;

pub use interrupts::{CriticalSection, InterruptControl, Unmasked};
pub use line::{Line, OpenDrain};
pub use reading::{Reading, Scale, Sensor};
