use crate::conflict;
use crate::error::CoreError;
use crate::models::{ConflictRecord, RecurrencePattern};
use crate::occurrence::{self, OccurrenceSequence};
use crate::repository::{
    AppointmentRepository, BlackoutRegistry, HolidayOracle, PatternRepository, SqliteRepository,
};
use crate::resolver;
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use uuid::Uuid;

#[async_trait]
impl super::SchedulingRepository for SqliteRepository {
    async fn detect_conflicts(
        &self,
        date: NaiveDate,
        time: NaiveTime,
        duration_minutes: i64,
        barber_id: Uuid,
        location_id: Uuid,
        exclude_appointment_id: Option<Uuid>,
    ) -> Result<Vec<ConflictRecord>, CoreError> {
        let mut conflicts = Vec::new();

        // Double-booking first: it is the only check derived from our own
        // store rather than an external registry.
        let existing = self
            .find_active_for_barber_on(barber_id, date, exclude_appointment_id)
            .await?;
        conflicts.extend(conflict::double_booking_conflicts(
            date,
            time,
            duration_minutes,
            &existing,
        ));

        match self
            .is_blocked(date, Some(time), Some(location_id), Some(barber_id))
            .await
        {
            Ok(Some(record)) => conflicts.push(conflict::blackout_conflict(date, time, &record)),
            Ok(None) => {}
            Err(err) if self.config().tolerate_lookup_failures => {
                tracing::warn!(
                    "Blackout lookup failed for {}, continuing without it: {}",
                    date,
                    err
                );
            }
            Err(err) => {
                return Err(CoreError::LookupFailed(format!(
                    "blackout registry for {}: {}",
                    date, err
                )))
            }
        }

        match self.is_holiday(date, &self.config().holiday_country).await {
            Ok(true) => conflicts.push(conflict::holiday_conflict(
                date,
                time,
                &self.config().holiday_country,
            )),
            Ok(false) => {}
            Err(err) if self.config().tolerate_lookup_failures => {
                tracing::warn!(
                    "Holiday lookup failed for {}, continuing without it: {}",
                    date,
                    err
                );
            }
            Err(err) => {
                return Err(CoreError::LookupFailed(format!(
                    "holiday oracle for {}: {}",
                    date, err
                )))
            }
        }

        Ok(conflicts)
    }

    async fn resolve_slot(
        &self,
        date: NaiveDate,
        pattern: &RecurrencePattern,
    ) -> Result<Option<NaiveTime>, CoreError> {
        let candidates = resolver::candidate_times(
            pattern.preferred_time,
            self.config().business_open,
            self.config().business_close,
        );

        for candidate in candidates {
            let conflicts = self
                .detect_conflicts(
                    date,
                    candidate,
                    pattern.duration_minutes,
                    pattern.barber_id,
                    pattern.location_id,
                    None,
                )
                .await?;
            if conflicts.is_empty() {
                tracing::debug!(
                    "Resolved conflicted slot on {} to {} for pattern {}",
                    date,
                    candidate,
                    pattern.id
                );
                return Ok(Some(candidate));
            }
        }

        Ok(None)
    }

    async fn preview_occurrences(
        &self,
        pattern_id: Uuid,
        owner_id: Uuid,
        count: usize,
    ) -> Result<OccurrenceSequence, CoreError> {
        let pattern = self
            .find_pattern(pattern_id, owner_id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("Pattern with id {} not found", pattern_id)))?;

        occurrence::occurrences(&pattern, count, None)
    }
}
