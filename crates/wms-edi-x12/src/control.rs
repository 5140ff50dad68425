//! Interchange control numbers.

use std::sync::atomic::{AtomicU32, Ordering};

const FIRST_CONTROL: u32 = 100_000;
const LAST_CONTROL: u32 = 999_999;

/// Source of interchange control numbers.
///
/// Implementations must hand out numbers that are unique for the lifetime
/// of the source instance; the encoder stamps one number per interchange
/// across the ISA/GS/ST/SE/GE/IEA segments.
pub trait ControlNumberSource: Send + Sync {
    /// Next control number, exactly 6 decimal digits.
    fn next(&self) -> String;
}

/// Monotonic control numbers in the 6-digit space.
///
/// Uniqueness contract: numbers are unique per instance for up to 900 000
/// interchanges, after which the counter wraps back to 100000. Sharing one
/// instance per outbound partner keeps interchanges distinguishable across
/// a service's lifetime; tests pin the sequence with [`Self::starting_at`].
#[derive(Debug)]
pub struct SequentialControlNumbers {
    next: AtomicU32,
}

impl SequentialControlNumbers {
    /// Start the sequence at 100000.
    pub fn new() -> Self {
        Self::starting_at(FIRST_CONTROL)
    }

    /// Start the sequence at a chosen value, clamped into the 6-digit space.
    pub fn starting_at(first: u32) -> Self {
        Self {
            next: AtomicU32::new(first.clamp(FIRST_CONTROL, LAST_CONTROL)),
        }
    }
}

impl Default for SequentialControlNumbers {
    fn default() -> Self {
        Self::new()
    }
}

impl ControlNumberSource for SequentialControlNumbers {
    fn next(&self) -> String {
        let value = self
            .next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| {
                Some(if current >= LAST_CONTROL {
                    FIRST_CONTROL
                } else {
                    current + 1
                })
            })
            .unwrap_or(FIRST_CONTROL);
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_is_monotonic() {
        let source = SequentialControlNumbers::new();
        assert_eq!(source.next(), "100000");
        assert_eq!(source.next(), "100001");
        assert_eq!(source.next(), "100002");
    }

    #[test]
    fn test_sequence_wraps_within_six_digits() {
        let source = SequentialControlNumbers::starting_at(999_999);
        assert_eq!(source.next(), "999999");
        assert_eq!(source.next(), "100000");
    }

    #[test]
    fn test_starting_value_is_clamped() {
        let source = SequentialControlNumbers::starting_at(7);
        assert_eq!(source.next(), "100000");
    }
}
