//! Conversion between relative time and the internal tick domain.
//!
//! Public APIs all speak `std::time::Duration` relative to the start of the
//! capture. Index ordering and strip-render arithmetic use a fixed-point
//! "timeline tick" that is 100x one nanosecond, retaining sub-nanosecond
//! precision for exact span math. The scale never crosses the module
//! boundary.

use std::time::Duration;

/// Timeline ticks per nanosecond.
const TICK_SCALE: u64 = 100;

/// Span assigned to a stream's last event when no stream duration is known:
/// 1/30 of a second.
pub(crate) const SYNTHETIC_LAST_SPAN_TICKS: u64 = (1_000_000_000 / 30) * TICK_SCALE;

/// Convert a relative time into timeline ticks.
pub(crate) fn to_timeline_ticks(t: Duration) -> u64 {
    u64::try_from(t.as_nanos())
        .unwrap_or(u64::MAX)
        .saturating_mul(TICK_SCALE)
}

/// Convert timeline ticks back into a relative time.
pub(crate) fn from_timeline_ticks(ticks: u64) -> Duration {
    Duration::from_nanos(ticks / TICK_SCALE)
}

/// Clamp a relative time into `[0, capture_duration]`.
///
/// Out-of-range times are a range violation, not an error; every external
/// write goes through this.
pub(crate) fn clamp_to_capture(t: Duration, capture_duration: Duration) -> Duration {
    t.min(capture_duration)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ticks_scale_by_100() {
        assert_eq!(to_timeline_ticks(Duration::from_nanos(1)), 100);
        assert_eq!(to_timeline_ticks(Duration::from_secs(1)), 100_000_000_000);
    }

    #[test]
    fn tick_roundtrip() {
        let t = Duration::from_micros(1_234_567);
        assert_eq!(from_timeline_ticks(to_timeline_ticks(t)), t);
    }

    #[test]
    fn synthetic_span_is_one_thirtieth_second() {
        assert_eq!(
            from_timeline_ticks(SYNTHETIC_LAST_SPAN_TICKS),
            Duration::from_nanos(33_333_333)
        );
    }

    #[test]
    fn clamp_caps_at_duration() {
        let cap = Duration::from_secs(10);
        assert_eq!(clamp_to_capture(Duration::from_secs(3), cap), Duration::from_secs(3));
        assert_eq!(clamp_to_capture(Duration::from_secs(11), cap), cap);
    }
}
