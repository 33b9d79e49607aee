use crate::line::Line;
use embedded_hal::digital::PinState;

/// Returned by [`PulseCounter::measure`] when no level change was observed in time.
pub const TIMEOUT: u32 = 0;

/// How long a single pulse may last before it is treated as a timeout.
pub const PULSE_BUDGET_US: u32 = 1000;

/// Measures pulse widths by counting busy-wait loop iterations.
///
/// Counts are only meaningful relative to each other on the same device at the same clock speed,
/// which is all the DHT protocol needs to tell a short high pulse from a long one.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PulseCounter {
    max_cycles: u32,
}

impl PulseCounter {
    /// Creates a counter that gives up after `max_cycles` loop iterations.
    pub const fn new(max_cycles: u32) -> PulseCounter {
        PulseCounter { max_cycles }
    }

    /// Creates a counter whose timeout is [`PULSE_BUDGET_US`], given how many loop iterations the
    /// platform completes per millisecond.
    pub const fn from_loops_per_ms(loops_per_ms: u32) -> PulseCounter {
        PulseCounter {
            max_cycles: loops_per_ms.saturating_mul(PULSE_BUDGET_US) / 1000,
        }
    }

    pub fn max_cycles(&self) -> u32 {
        self.max_cycles
    }

    /// Counts loop iterations while `line` stays at `expected`.
    ///
    /// Returns [`TIMEOUT`] if the budget runs out, or if the line is not at `expected` when the
    /// measurement starts. Callers must abort their read on [`TIMEOUT`]; it is never a valid
    /// zero-length pulse.
    #[inline]
    pub fn measure<L: Line>(&self, line: &mut L, expected: PinState) -> Result<u32, L::Error> {
        let mut count = 0u32;
        while line.level()? == expected {
            if count >= self.max_cycles {
                return Ok(TIMEOUT);
            }
            count += 1;
        }
        Ok(count)
    }
}
