//! Per-stage wall-clock timing.

use crate::stage::StageKind;
use std::fmt::Write;
use std::time::Duration;

/// Elapsed time of each stage, index-aligned with [`StageKind::ALL`].
///
/// Stages that were skipped or never reached stay at zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StageTiming {
    durations: [Duration; 4],
}

impl StageTiming {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, kind: StageKind, elapsed: Duration) {
        self.durations[kind.index()] = elapsed;
    }

    pub fn get(&self, kind: StageKind) -> Duration {
        self.durations[kind.index()]
    }

    pub fn total(&self) -> Duration {
        self.durations.iter().sum()
    }

    /// `(stage, elapsed)` pairs in dispatch order.
    pub fn iter(&self) -> impl Iterator<Item = (StageKind, Duration)> + '_ {
        StageKind::ALL.into_iter().zip(self.durations.iter().copied())
    }
}

/// Format a duration as `H:MM:SS[.ffffff]`, rounded to the microsecond.
///
/// Durations of a day or more get a `N day(s), ` prefix.
pub fn format_duration(elapsed: Duration) -> String {
    let total_micros = (elapsed.as_nanos() + 500) / 1_000;
    let micros = total_micros % 1_000_000;
    let total_secs = total_micros / 1_000_000;
    let days = total_secs / 86_400;
    let secs_of_day = total_secs % 86_400;

    let mut out = String::new();
    if days > 0 {
        let plural = if days == 1 { "" } else { "s" };
        let _ = write!(out, "{days} day{plural}, ");
    }
    let _ = write!(
        out,
        "{}:{:02}:{:02}",
        secs_of_day / 3_600,
        secs_of_day % 3_600 / 60,
        secs_of_day % 60
    );
    if micros > 0 {
        let _ = write!(out, ".{micros:06}");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_total() {
        let mut timing = StageTiming::new();
        timing.record(StageKind::Make, Duration::from_millis(1500));
        timing.record(StageKind::Integrate, Duration::from_millis(500));
        assert_eq!(timing.get(StageKind::Register), Duration::ZERO);
        assert_eq!(timing.total(), Duration::from_secs(2));
        let order: Vec<StageKind> = timing.iter().map(|(kind, _)| kind).collect();
        assert_eq!(order, StageKind::ALL.to_vec());
    }

    #[test]
    fn test_format_zero() {
        assert_eq!(format_duration(Duration::ZERO), "0:00:00");
    }

    #[test]
    fn test_format_fractional_seconds() {
        assert_eq!(format_duration(Duration::from_millis(1250)), "0:00:01.250000");
        assert_eq!(format_duration(Duration::from_micros(7)), "0:00:00.000007");
    }

    #[test]
    fn test_format_rounds_to_microseconds() {
        assert_eq!(format_duration(Duration::from_nanos(1_499)), "0:00:00.000001");
        assert_eq!(format_duration(Duration::from_nanos(1_500)), "0:00:00.000002");
        assert_eq!(format_duration(Duration::from_nanos(400)), "0:00:00");
    }

    #[test]
    fn test_format_hours_and_minutes() {
        assert_eq!(format_duration(Duration::from_secs(3_661)), "1:01:01");
        assert_eq!(format_duration(Duration::from_secs(36_000)), "10:00:00");
    }

    #[test]
    fn test_format_days() {
        assert_eq!(format_duration(Duration::from_secs(90_000)), "1 day, 1:00:00");
        assert_eq!(format_duration(Duration::from_secs(2 * 86_400)), "2 days, 0:00:00");
    }
}
