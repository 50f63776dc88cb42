use chrono::NaiveTime;

/// Configuration for scheduling behavior, held by the repository.
///
/// The holiday country code is an explicit input here rather than a
/// per-pattern column: one deployment serves one country's calendar.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Earliest bookable start time (inclusive).
    pub business_open: NaiveTime,
    /// Latest bookable start time (exclusive).
    pub business_close: NaiveTime,
    /// ISO country code used for holiday lookups.
    pub holiday_country: String,
    /// When set, a failed blackout/holiday lookup is logged and treated as
    /// "no conflict" instead of failing the whole detection. Off by default:
    /// detection fails closed so an unavailable lookup can never silently
    /// allow a clashing booking.
    pub tolerate_lookup_failures: bool,
    /// Upper bound on drafts per generation run.
    pub max_batch_size: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            business_open: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            business_close: NaiveTime::from_hms_opt(18, 0, 0).unwrap(),
            holiday_country: "US".to_string(),
            tolerate_lookup_failures: false,
            max_batch_size: 50,
        }
    }
}
