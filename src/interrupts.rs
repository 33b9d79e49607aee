/// Masks interrupts around timing-critical pulse trains.
///
/// The mask only lasts for the duration of the closure, and the previous interrupt state is
/// restored however the closure exits, including through an early `?` return inside it.
pub trait InterruptControl {
    fn masked<R>(&mut self, f: impl FnOnce() -> R) -> R;
}

/// Masks interrupts with the platform's [`critical_section`] implementation.
#[derive(Clone, Copy, Debug, Default)]
pub struct CriticalSection;

impl InterruptControl for CriticalSection {
    #[inline]
    fn masked<R>(&mut self, f: impl FnOnce() -> R) -> R {
        critical_section::with(|_| f())
    }
}

/// Leaves interrupts enabled.
///
/// Useful on hosts and simulators, or where interrupt latency matters more than pulse fidelity.
#[derive(Clone, Copy, Debug, Default)]
pub struct Unmasked;

impl InterruptControl for Unmasked {
    #[inline]
    fn masked<R>(&mut self, f: impl FnOnce() -> R) -> R {
        f()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn critical_section_returns_closure_result() {
        let result: Result<u8, ()> = CriticalSection.masked(|| Err(()));

        assert_eq!(result, Err(()));
    }

    #[test]
    fn critical_sections_can_be_entered_repeatedly() {
        let mut mask = CriticalSection;
        let mut total = 0;
        for i in 0..3 {
            total += mask.masked(|| i);
        }

        assert_eq!(total, 3);
    }
}
