use chrono::{NaiveTime, Timelike};

/// Offsets tried relative to the preferred time when a conflicted date is
/// rescheduled on the same day: nearest negative outward, then nearest
/// positive outward. The fixed order keeps repeated runs reproducible.
pub const RESCHEDULE_OFFSET_MINUTES: [i64; 8] = [-30, -60, -90, -120, 30, 60, 90, 120];

/// Candidate alternative start times for a same-day reschedule, in the order
/// they must be tried. Candidates outside `[open, close)` or falling off the
/// clock are dropped up front; the preferred time itself is never a
/// candidate.
pub fn candidate_times(preferred: NaiveTime, open: NaiveTime, close: NaiveTime) -> Vec<NaiveTime> {
    let base_minutes = preferred.num_seconds_from_midnight() as i64 / 60;

    RESCHEDULE_OFFSET_MINUTES
        .iter()
        .filter_map(|offset| {
            let minutes = base_minutes + offset;
            if !(0..24 * 60).contains(&minutes) {
                return None;
            }
            let candidate =
                NaiveTime::from_num_seconds_from_midnight_opt((minutes * 60) as u32, 0)?;
            (candidate >= open && candidate < close).then_some(candidate)
        })
        .collect()
}
