use chrono::{NaiveDate, NaiveTime, Timelike};
use serde_json::json;

use crate::models::{
    AppointmentInstance, BlackoutKind, BlackoutRecord, ConflictRecord, ConflictType,
    SuggestedResolution,
};

fn minutes_from_midnight(time: NaiveTime) -> i64 {
    time.num_seconds_from_midnight() as i64 / 60
}

/// Double-booking check over the barber's same-day active instances.
///
/// Uses the half-open interval test: a slot ending exactly when another
/// starts does not conflict. One record per overlapping instance, with the
/// overlap size in the details.
pub fn double_booking_conflicts(
    date: NaiveDate,
    time: NaiveTime,
    duration_minutes: i64,
    existing: &[AppointmentInstance],
) -> Vec<ConflictRecord> {
    let new_start = minutes_from_midnight(time);
    let new_end = new_start + duration_minutes;

    existing
        .iter()
        .filter_map(|appt| {
            let existing_start = minutes_from_midnight(appt.start_time);
            let existing_end = existing_start + appt.duration_minutes;
            if new_end <= existing_start || new_start >= existing_end {
                return None;
            }
            let overlap = new_end.min(existing_end) - new_start.max(existing_start);
            Some(ConflictRecord {
                conflict_type: ConflictType::DoubleBooking,
                date,
                time,
                details: json!({
                    "existing_appointment_id": appt.id,
                    "existing_start_time": appt.start_time,
                    "existing_duration_minutes": appt.duration_minutes,
                    "overlap_minutes": overlap,
                }),
                suggested_resolution: SuggestedResolution::Reschedule,
            })
        })
        .collect()
}

/// Whether a blackout record applies to a request at `time`.
///
/// Whole-day blackouts ignore the requested time entirely. Partial-day
/// blackouts apply only when the time falls inside the inclusive window; a
/// partial record missing its bounds degrades to whole-day. `None` asks
/// about the day as a whole and is covered by any record.
pub fn blackout_window_covers(record: &BlackoutRecord, time: Option<NaiveTime>) -> bool {
    match record.kind {
        BlackoutKind::WholeDay => true,
        BlackoutKind::PartialDay => match (record.start_time, record.end_time) {
            (Some(start), Some(end)) => match time {
                Some(t) => start <= t && t <= end,
                None => true,
            },
            _ => true,
        },
    }
}

/// Builds the conflict record for a blackout that covers the request.
/// Registries that allow emergency bookings get routed to manual review
/// instead of a flat skip.
pub fn blackout_conflict(
    date: NaiveDate,
    time: NaiveTime,
    record: &BlackoutRecord,
) -> ConflictRecord {
    let suggested_resolution = if record.allow_emergency_bookings {
        SuggestedResolution::ManualReview
    } else {
        SuggestedResolution::Skip
    };
    ConflictRecord {
        conflict_type: ConflictType::BlackoutDate,
        date,
        time,
        details: json!({
            "kind": &record.kind,
            "start_time": &record.start_time,
            "end_time": &record.end_time,
            "allow_emergency_bookings": record.allow_emergency_bookings,
            "reason": &record.reason,
        }),
        suggested_resolution,
    }
}

pub fn holiday_conflict(date: NaiveDate, time: NaiveTime, country_code: &str) -> ConflictRecord {
    ConflictRecord {
        conflict_type: ConflictType::Holiday,
        date,
        time,
        details: json!({ "country_code": country_code }),
        suggested_resolution: SuggestedResolution::Skip,
    }
}
