use core::fmt;

/// The temperature scale a value is expressed in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Scale {
    Celsius,
    Fahrenheit,
}

/// A fully decoded sensor reading.
///
/// Readings are only ever built from frames that passed every integrity check, so there is no
/// partially valid reading.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Reading {
    temperature: f32,
    humidity: Option<f32>,
}

impl Reading {
    /// Creates a reading from a temperature in degrees Celsius and an optional relative humidity.
    pub fn new(temperature: f32, humidity: Option<f32>) -> Reading {
        Reading {
            temperature,
            humidity,
        }
    }

    /// The temperature in degrees Celsius.
    pub fn temperature(&self) -> f32 {
        self.temperature
    }

    pub fn temperature_in(&self, scale: Scale) -> f32 {
        match scale {
            Scale::Celsius => self.temperature,
            Scale::Fahrenheit => celsius_to_fahrenheit(self.temperature),
        }
    }

    /// The relative humidity in percent, if the sensor measures it.
    pub fn humidity(&self) -> Option<f32> {
        self.humidity
    }

    /// The heat index in the requested scale, if the sensor measures humidity.
    pub fn heat_index(&self, scale: Scale) -> Option<f32> {
        self.humidity
            .map(|humidity| heat_index(self.temperature_in(scale), humidity, scale))
    }
}

impl fmt::Display for Reading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.humidity {
            Some(humidity) => write!(
                f,
                "RH: {:.1}%, T: {:.1}\u{00B0}C",
                humidity, self.temperature
            ),
            None => write!(f, "T: {:.1}\u{00B0}C", self.temperature),
        }
    }
}

/// Something that produces a [`Reading`] on demand.
///
/// Each call performs one complete, blocking read. Implementations never retry internally, so
/// callers decide whether to retry, skip the cycle, or report the failure.
pub trait Sensor {
    type Error;

    fn read(&mut self) -> Result<Reading, Self::Error>;
}

pub fn celsius_to_fahrenheit(celsius: f32) -> f32 {
    celsius * 1.8 + 32.0
}

/// Converts Fahrenheit to Celsius.
///
/// Uses 0.55555 rather than an exact 5/9 so values agree with the sensor nodes already deployed.
pub fn fahrenheit_to_celsius(fahrenheit: f32) -> f32 {
    (fahrenheit - 32.0) * 0.55555
}

/// Computes the heat index with the Steadman and Rothfusz equations.
///
/// See <http://www.wpc.ncep.noaa.gov/html/heatindex_equation.shtml>. The calculation always runs
/// in Fahrenheit; `scale` is the scale of both `temperature` and the returned value.
pub fn heat_index(temperature: f32, humidity: f32, scale: Scale) -> f32 {
    let t = match scale {
        Scale::Celsius => celsius_to_fahrenheit(temperature),
        Scale::Fahrenheit => temperature,
    };
    let rh = humidity;

    let mut hi = 0.5 * (t + 61.0 + ((t - 68.0) * 1.2) + (rh * 0.094));

    if hi > 79.0 {
        hi = -42.379 + 2.04901523 * t + 10.14333127 * rh
            - 0.22475541 * t * rh
            - 0.00683783 * t * t
            - 0.05481717 * rh * rh
            + 0.00122874 * t * t * rh
            + 0.00085282 * t * rh * rh
            - 0.00000199 * t * t * rh * rh;

        if rh < 13.0 && (80.0..=112.0).contains(&t) {
            hi -= ((13.0 - rh) * 0.25) * libm::sqrtf((17.0 - libm::fabsf(t - 95.0)) * 0.05882);
        } else if rh > 85.0 && (80.0..=87.0).contains(&t) {
            hi += ((rh - 85.0) * 0.1) * ((87.0 - t) * 0.2);
        }
    }

    match scale {
        Scale::Celsius => fahrenheit_to_celsius(hi),
        Scale::Fahrenheit => hi,
    }
}
