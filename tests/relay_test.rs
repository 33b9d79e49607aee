use core::time::Duration;
use std::cell::Cell;

use single_wire_sensors::dhtxx::{Dht, SensorType};
use single_wire_sensors::ds18x20::{self, Ds18x20};
use single_wire_sensors::relay::{self, Channel, Radio, Relay};
use single_wire_sensors::OpenDrain;

mod fake_hal;
use fake_hal::delay::Delay;
use fake_hal::digital as fake_digital;
use fake_hal::interrupts::Interrupts;

#[derive(Debug, PartialEq)]
struct RadioError;

#[derive(Default)]
struct FakeRadio {
    sent: Vec<Vec<u8>>,
    fail: bool,
}

impl Radio for FakeRadio {
    type Error = RadioError;

    fn transmit(&mut self, payload: &[u8]) -> Result<(), RadioError> {
        if self.fail {
            return Err(RadioError);
        }
        self.sent.push(payload.to_vec());
        Ok(())
    }
}

const FAST_OPTIONS: relay::Options = relay::Options {
    wake_period: Duration::from_millis(1),
    report_every: 3,
};

fn byte_samples(byte: u8) -> Vec<u8> {
    (0..8).map(|bit| (byte >> bit) & 1).collect()
}

fn new_ds18x20(
    name: &'static str,
    data: Vec<u8>,
) -> Ds18x20<OpenDrain<fake_digital::Pin>, Delay, Interrupts> {
    let mut pin = fake_digital::Pin::new(name);
    pin.set_default_data(true);
    pin.set_data(data);
    Ds18x20::new(
        OpenDrain::new(pin),
        Delay::new(name),
        Interrupts::new(name),
        None,
    )
    .unwrap()
}

/// Samples for a DS18x20 read that converts immediately and reports 25.0 degrees.
fn ds18x20_samples() -> Vec<u8> {
    let mut data = vec![0, 1];
    data.append(&mut byte_samples(0x00));
    data.extend_from_slice(&[0, 1]);
    for byte in [0x32, 0x00, 0x4B, 0x46, 0xFF, 0xFF, 0x0C, 0x10, 0x87].iter() {
        data.append(&mut byte_samples(*byte));
    }
    data
}

/// Samples for a DHT transmission, one sample per counter loop.
fn dht_samples(bytes: [u8; 5]) -> Vec<u8> {
    let mut data = vec![0, 0, 0, 1, 1, 1];
    for byte in bytes.iter() {
        for bit in (0..8).rev() {
            data.extend_from_slice(&[0, 0, 0, 0]);
            if (byte >> bit) & 1 == 1 {
                data.extend_from_slice(&[1, 1, 1, 1, 1, 1]);
            } else {
                data.extend_from_slice(&[1, 1]);
            }
        }
    }
    data.push(0);
    data
}

#[test]
fn new_with_invalid_options_fails() {
    let zero_reports = Relay::new(
        FakeRadio::default(),
        Some(relay::Options {
            report_every: 0,
            ..FAST_OPTIONS
        }),
    );
    let zero_period = Relay::new(
        FakeRadio::default(),
        Some(relay::Options {
            wake_period: Duration::ZERO,
            ..FAST_OPTIONS
        }),
    );

    assert_eq!(
        zero_reports.map(|_| ()).unwrap_err(),
        relay::Error::InvalidArgument
    );
    assert_eq!(
        zero_period.map(|_| ()).unwrap_err(),
        relay::Error::InvalidArgument
    );
}

#[tokio::test]
async fn wait_for_report_sleeps_until_due() {
    let mut relay = Relay::new(FakeRadio::default(), Some(FAST_OPTIONS)).unwrap();
    let sleeps = Cell::new(0);
    let delay_fn = |duration: Duration| {
        sleeps.set(sleeps.get() + 1);
        tokio::time::sleep(duration)
    };

    relay.wait_for_report(&delay_fn).await;
    assert_eq!(sleeps.get(), 1);

    relay.wait_for_report(&delay_fn).await;
    assert_eq!(sleeps.get(), 1 + FAST_OPTIONS.report_every as usize);
}

#[test]
fn report_temperature_reading() -> Result<(), relay::Error<RadioError, ds18x20::Error<fake_digital::Error>>> {
    let mut relay = Relay::new(FakeRadio::default(), Some(FAST_OPTIONS)).unwrap();
    let mut sensor = new_ds18x20("relay-ds18x20", ds18x20_samples());

    assert_eq!(relay.report(&mut sensor)?, 1);

    assert_eq!(relay.free().sent, vec![vec![100, 1, 0, 250]]);
    Ok(())
}

#[tokio::test]
async fn report_humidity_reading_after_wait() {
    let mut relay = Relay::new(FakeRadio::default(), Some(FAST_OPTIONS)).unwrap();
    let mut pin = fake_digital::Pin::new("relay-dht");
    pin.set_data(dht_samples([2, 8, 1, 5, 16]));
    let mut sensor = Dht::new(
        OpenDrain::new(pin),
        Delay::new("relay-dht"),
        Interrupts::new("relay-dht"),
        SensorType::Dht22,
        Some(single_wire_sensors::dhtxx::Options { loops_per_ms: 100 }),
    )
    .unwrap();

    relay
        .wait_for_report(|duration| tokio::time::sleep(duration))
        .await;
    let sent = relay.report(&mut sensor).unwrap();

    let frames = relay.free().sent;
    assert_eq!(sent, 3);
    assert_eq!(frames[0], vec![100, Channel::Temperature as u8, 0x01, 0x05]);
    assert_eq!(frames[1], vec![100, Channel::Humidity as u8, 0x02, 0x08]);
    assert_eq!(frames[2][..2], [100, Channel::HeatIndex as u8]);
}

#[test]
fn report_with_failed_read_sends_nothing() {
    let mut relay = Relay::new(FakeRadio::default(), Some(FAST_OPTIONS)).unwrap();
    let mut sensor = new_ds18x20("relay-no-device", vec![]);

    assert_eq!(
        relay.report(&mut sensor).unwrap_err(),
        relay::Error::Sensor(ds18x20::Error::NoPresence)
    );
    assert!(relay.free().sent.is_empty());
}

#[test]
fn report_with_failed_radio_fails() {
    let radio = FakeRadio {
        fail: true,
        ..FakeRadio::default()
    };
    let mut relay = Relay::new(radio, Some(FAST_OPTIONS)).unwrap();
    let mut sensor = new_ds18x20("relay-radio-failure", ds18x20_samples());

    assert_eq!(
        relay.report(&mut sensor).unwrap_err(),
        relay::Error::Radio(RadioError)
    );
}
