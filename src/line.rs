use embedded_hal::digital::{InputPin, OutputPin, PinState};

/// A single data line shared with a sensor and held high by a pull-up resistor.
///
/// Both protocols talk over the line the same way: the controller writes by holding the line low
/// for a measured time and then releasing it, and reads by releasing the line and watching how
/// long the sensor keeps it low or high. Implementations must be cheap enough to call inside
/// bit slots that are only a few microseconds wide.
pub trait Line {
    type Error;

    /// Drives the line low.
    fn drive_low(&mut self) -> Result<(), Self::Error>;

    /// Stops driving the line so the pull-up can raise it, and switches to listening.
    fn release(&mut self) -> Result<(), Self::Error>;

    /// Samples the current logic level of the line.
    fn is_high(&mut self) -> Result<bool, Self::Error>;

    /// Samples the current logic level of the line as a [`PinState`].
    ///
    /// Performs exactly one sample.
    #[inline]
    fn level(&mut self) -> Result<PinState, Self::Error> {
        Ok(PinState::from(self.is_high()?))
    }
}

/// Drives a [`Line`] through an open-drain GPIO pin.
///
/// Setting an open-drain output high leaves the pin floating, so "release" is simply
/// [`OutputPin::set_high`] and the pin can be sampled at any time without switching modes.
#[derive(Debug)]
pub struct OpenDrain<P> {
    pin: P,
}

impl<P> OpenDrain<P>
where
    P: InputPin + OutputPin,
{
    pub fn new(pin: P) -> OpenDrain<P> {
        OpenDrain { pin }
    }

    /// Returns the wrapped pin.
    pub fn free(self) -> P {
        self.pin
    }
}

impl<P> Line for OpenDrain<P>
where
    P: InputPin + OutputPin,
{
    type Error = P::Error;

    #[inline]
    fn drive_low(&mut self) -> Result<(), Self::Error> {
        self.pin.set_low()
    }

    #[inline]
    fn release(&mut self) -> Result<(), Self::Error> {
        self.pin.set_high()
    }

    #[inline]
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        self.pin.is_high()
    }
}
