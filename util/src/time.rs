//! General time utility functions

use chrono;

/// Number of nanoseconds in a second
pub const NANOS_PER_SECOND: i64 = 1_000_000_000;

/// Convert a duration into a number of seconds, or `None` if overflow
pub fn duration_to_seconds(duration: chrono::Duration) -> Option<f64> {
    duration
        .num_nanoseconds()
        .map(|ns| ns as f64 / NANOS_PER_SECOND as f64)
}

/// Convert a control period in milliseconds into a frequency in Hertz.
///
/// A zero period has no meaningful frequency and gives `None`.
pub fn period_ms_to_hz(period_ms: u64) -> Option<f64> {
    match period_ms {
        0 => None,
        p => Some(1000.0 / p as f64),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_period_ms_to_hz() {
        assert_eq!(period_ms_to_hz(10), Some(100.0));
        assert_eq!(period_ms_to_hz(0), None);
        assert_eq!(
            duration_to_seconds(chrono::Duration::milliseconds(1500)),
            Some(1.5)
        );
    }
}
