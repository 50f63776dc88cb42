use chrono::{Datelike, Duration, Local, Months, NaiveDate, Weekday};

use crate::error::CoreError;
use crate::models::{PatternType, RecurrencePattern};

/// Hard safety cap on how far a scan may look ahead of its starting point.
pub const SCAN_HORIZON_DAYS: i64 = 730;

/// A scan gives up after 10x the requested limit in examined candidates.
/// Candidates are rule-aware jumps, not calendar days, so within the
/// horizon this cap only trips on pathological rules.
pub const ITERATION_CAP_FACTOR: usize = 10;

/// Ordered candidate dates produced by evaluating a pattern.
///
/// `truncated` marks sequences cut short by a safety cap rather than a
/// natural stop condition. Truncation is not an error: availability over
/// completeness.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OccurrenceSequence {
    pub dates: Vec<NaiveDate>,
    pub truncated: bool,
}

/// The four date-arithmetic rules, compiled from a pattern row into a closed
/// tagged union so the match and advance arithmetic stay auditable side by
/// side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecurrenceRule {
    Daily { interval_days: i64 },
    Weekly { days: Vec<Weekday> },
    Biweekly { days: Vec<Weekday> },
    MonthlyDay { day: u32 },
    MonthlyNthWeekday { week: u32, weekday: Weekday },
}

impl RecurrenceRule {
    /// Compiles and validates the selector columns for the pattern's type.
    ///
    /// Exactly one selector set must be populated per type: weekly/biweekly
    /// require `days_of_week`; monthly requires either `day_of_month` or the
    /// `week_of_month` + `weekday_of_month` pair, never both.
    pub fn from_pattern(pattern: &RecurrencePattern) -> Result<Self, CoreError> {
        match pattern.pattern_type {
            PatternType::Daily => {
                if pattern.interval_value < 1 {
                    return Err(CoreError::Validation(
                        "Daily pattern requires interval_value >= 1".to_string(),
                    ));
                }
                Ok(RecurrenceRule::Daily {
                    interval_days: pattern.interval_value,
                })
            }
            PatternType::Weekly | PatternType::Biweekly => {
                let days = pattern.weekday_set()?;
                if days.is_empty() {
                    return Err(CoreError::Validation(format!(
                        "{:?} pattern requires a non-empty days_of_week",
                        pattern.pattern_type
                    )));
                }
                if pattern.pattern_type == PatternType::Weekly {
                    Ok(RecurrenceRule::Weekly { days })
                } else {
                    Ok(RecurrenceRule::Biweekly { days })
                }
            }
            PatternType::Monthly => {
                let nth = match (&pattern.week_of_month, &pattern.weekday_of_month) {
                    (Some(week), Some(raw)) => {
                        if !(1..=5).contains(week) {
                            return Err(CoreError::Validation(
                                "week_of_month must be between 1 and 5".to_string(),
                            ));
                        }
                        let weekday = raw.parse::<Weekday>().map_err(|_| {
                            CoreError::Validation(format!(
                                "Invalid weekday_of_month: {}",
                                raw
                            ))
                        })?;
                        Some((*week as u32, weekday))
                    }
                    (None, None) => None,
                    _ => {
                        return Err(CoreError::Validation(
                            "week_of_month and weekday_of_month must be set together"
                                .to_string(),
                        ))
                    }
                };

                match (pattern.day_of_month, nth) {
                    (Some(day), None) => {
                        if !(1..=31).contains(&day) {
                            return Err(CoreError::Validation(
                                "day_of_month must be between 1 and 31".to_string(),
                            ));
                        }
                        Ok(RecurrenceRule::MonthlyDay { day: day as u32 })
                    }
                    (None, Some((week, weekday))) => {
                        Ok(RecurrenceRule::MonthlyNthWeekday { week, weekday })
                    }
                    (Some(_), Some(_)) => Err(CoreError::Validation(
                        "Monthly pattern must use day_of_month or the nth-weekday \
                         selectors, not both"
                            .to_string(),
                    )),
                    (None, None) => Err(CoreError::Validation(
                        "Monthly pattern requires day_of_month or week_of_month + \
                         weekday_of_month"
                            .to_string(),
                    )),
                }
            }
        }
    }

    /// Whether a candidate date is produced by this rule.
    pub fn matches(&self, start_date: NaiveDate, candidate: NaiveDate) -> bool {
        match self {
            RecurrenceRule::Daily { interval_days } => candidate
                .signed_duration_since(start_date)
                .num_days()
                .rem_euclid(*interval_days)
                == 0,
            RecurrenceRule::Weekly { days } => days.contains(&candidate.weekday()),
            RecurrenceRule::Biweekly { days } => {
                if !days.contains(&candidate.weekday()) {
                    return false;
                }
                let elapsed_days = candidate.signed_duration_since(start_date).num_days();
                elapsed_days.div_euclid(7) % 2 == 0
            }
            RecurrenceRule::MonthlyDay { day } => candidate.day() == *day,
            RecurrenceRule::MonthlyNthWeekday { week, weekday } => {
                nth_weekday_of_month(candidate, *week, *weekday) == Some(candidate)
            }
        }
    }

    /// The next candidate date worth examining after `candidate`.
    ///
    /// Each rule jumps straight to its next plausible date (the next
    /// selected weekday, the next month carrying the day, the next month's
    /// nth weekday), so a scan spends at most a couple of candidates per
    /// produced occurrence. `start_date` anchors the daily and biweekly
    /// phase, keeping resumed scans aligned with the pattern's origin.
    pub fn advance(&self, start_date: NaiveDate, candidate: NaiveDate) -> NaiveDate {
        match self {
            RecurrenceRule::Daily { interval_days } => {
                let elapsed = candidate.signed_duration_since(start_date).num_days();
                let step = interval_days - elapsed.rem_euclid(*interval_days);
                candidate + Duration::days(step)
            }
            RecurrenceRule::Weekly { days } | RecurrenceRule::Biweekly { days } => {
                next_weekday_in(candidate, days)
            }
            RecurrenceRule::MonthlyDay { day } => next_month_day(candidate, *day)
                .unwrap_or(candidate + Duration::days(1)),
            RecurrenceRule::MonthlyNthWeekday { week, weekday } => {
                next_nth_weekday(candidate, *week, *weekday)
                    .unwrap_or(candidate + Duration::days(1))
            }
        }
    }
}

/// The next date strictly after `after` whose weekday is in `days`. `days`
/// is non-empty per rule validation, so a hit exists within a week.
fn next_weekday_in(after: NaiveDate, days: &[Weekday]) -> NaiveDate {
    (1..=7)
        .map(|offset| after + Duration::days(offset))
        .find(|d| days.contains(&d.weekday()))
        .unwrap_or(after + Duration::days(7))
}

/// The next date strictly after `after` with the given day-of-month,
/// skipping months too short to carry it. `None` only at the calendar's
/// representable edge, beyond any scan horizon.
fn next_month_day(after: NaiveDate, day: u32) -> Option<NaiveDate> {
    let mut cursor = after.with_day(1)?;
    for _ in 0..48 {
        if let Some(candidate) = cursor.with_day(day) {
            if candidate > after {
                return Some(candidate);
            }
        }
        cursor = cursor.checked_add_months(Months::new(1))?;
    }
    None
}

/// The next date strictly after `after` that is the nth given weekday of
/// its month, skipping months lacking one.
fn next_nth_weekday(after: NaiveDate, week: u32, weekday: Weekday) -> Option<NaiveDate> {
    let mut cursor = after.with_day(1)?;
    for _ in 0..48 {
        if let Some(target) = nth_weekday_of_month(cursor, week, weekday) {
            if target > after {
                return Some(target);
            }
        }
        cursor = cursor.checked_add_months(Months::new(1))?;
    }
    None
}

/// The nth given weekday of the month containing `reference`, or `None` when
/// the month has no such day (a 5th Friday, say). Months lacking the nth
/// weekday silently yield no occurrence.
fn nth_weekday_of_month(reference: NaiveDate, week: u32, weekday: Weekday) -> Option<NaiveDate> {
    let first = reference.with_day(1)?;
    let offset = (weekday.num_days_from_sunday() as i64
        - first.weekday().num_days_from_sunday() as i64)
        .rem_euclid(7);
    let target = first + Duration::days(offset + 7 * (week as i64 - 1));
    (target.year() == reference.year() && target.month() == reference.month())
        .then_some(target)
}

/// Evaluates a pattern into a finite, deterministic, ordered sequence of
/// candidate dates.
///
/// The scan begins at `max(pattern.start_date, start_from)` (today when
/// `start_from` is absent) and stops at the first of: `limit` dates
/// collected, `end_date` passed, the pattern's lifetime `occurrences_limit`
/// (net of the ordinals prior runs consumed) reached, the 2-year horizon,
/// or the candidate cap. Cap exhaustion returns the shorter sequence with
/// `truncated` set rather than failing.
pub fn occurrences(
    pattern: &RecurrencePattern,
    limit: usize,
    start_from: Option<NaiveDate>,
) -> Result<OccurrenceSequence, CoreError> {
    let rule = RecurrenceRule::from_pattern(pattern)?;
    let excluded = pattern.excluded_set()?;

    let from = start_from.unwrap_or_else(|| Local::now().date_naive());
    let mut current = pattern.start_date.max(from);
    let horizon = current + Duration::days(SCAN_HORIZON_DAYS);
    let iteration_cap = limit.saturating_mul(ITERATION_CAP_FACTOR);
    let remaining_cap = pattern
        .occurrences_limit
        .map(|cap| (cap - pattern.total_generated).max(0) as usize);

    let mut dates = Vec::new();
    let mut truncated = false;
    let mut iterations = 0usize;

    loop {
        if dates.len() >= limit {
            break;
        }
        if let Some(remaining) = remaining_cap {
            if dates.len() >= remaining {
                break;
            }
        }
        if let Some(end) = pattern.end_date {
            if current > end {
                break;
            }
        }
        if current > horizon {
            truncated = true;
            tracing::warn!(
                "occurrence scan for pattern {} hit the {}-day horizon; returning {} dates",
                pattern.id,
                SCAN_HORIZON_DAYS,
                dates.len()
            );
            break;
        }
        if iterations >= iteration_cap {
            truncated = true;
            tracing::warn!(
                "occurrence scan for pattern {} exhausted {} iterations; returning {} dates",
                pattern.id,
                iteration_cap,
                dates.len()
            );
            break;
        }
        iterations += 1;

        if rule.matches(pattern.start_date, current) && !excluded.contains(&current) {
            dates.push(current);
        }
        current = rule.advance(pattern.start_date, current);
    }

    Ok(OccurrenceSequence { dates, truncated })
}
