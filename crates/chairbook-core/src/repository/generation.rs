use crate::error::CoreError;
use crate::models::{
    AppointmentInstance, AppointmentStatus, GenerationOutcome, GenerationRequest,
    RecurrencePattern,
};
use crate::occurrence;
use crate::repository::{PatternRepository, SchedulingRepository, SqliteRepository};
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime, Utc};
use uuid::Uuid;

#[async_trait]
impl super::GenerationRepository for SqliteRepository {
    async fn generate(
        &self,
        owner_id: Uuid,
        request: GenerationRequest,
    ) -> Result<GenerationOutcome, CoreError> {
        let pattern = self
            .find_pattern(request.pattern_id, owner_id)
            .await?
            .ok_or_else(|| {
                CoreError::NotFound(format!("Pattern with id {} not found", request.pattern_id))
            })?;

        if !pattern.active {
            return Err(CoreError::Validation(
                "Pattern is deactivated and cannot generate appointments".to_string(),
            ));
        }

        let limit = request.max_appointments.min(self.config().max_batch_size);
        // Resume one day past the watermark so re-runs never revisit dates,
        // including dates that were skipped for conflicts.
        let start_from = pattern.last_generated_date.and_then(|date| date.succ_opt());
        let sequence = occurrence::occurrences(&pattern, limit, start_from)?;

        let mut drafts = Vec::new();
        let mut conflicts = Vec::new();
        let mut skipped_dates = Vec::new();

        for (index, date) in sequence.dates.iter().copied().enumerate() {
            // Skips still consume their ordinal slot, so a draft's sequence
            // number reflects its true position in the occurrence stream.
            let sequence_number = pattern.total_generated + index as i64 + 1;

            let found = self
                .detect_conflicts(
                    date,
                    pattern.preferred_time,
                    pattern.duration_minutes,
                    pattern.barber_id,
                    pattern.location_id,
                    None,
                )
                .await?;

            if found.is_empty() {
                drafts.push(draft_appointment(
                    &pattern,
                    date,
                    pattern.preferred_time,
                    sequence_number,
                ));
                continue;
            }

            conflicts.extend(found);

            if request.auto_resolve_conflicts && pattern.reschedule_on_conflict {
                match self.resolve_slot(date, &pattern).await? {
                    Some(time) => {
                        drafts.push(draft_appointment(&pattern, date, time, sequence_number))
                    }
                    None => skipped_dates.push(date),
                }
            } else {
                skipped_dates.push(date);
            }
        }

        if !request.preview_only && !sequence.dates.is_empty() {
            let mut tx = self.pool().begin().await?;

            for draft in &drafts {
                Self::insert_appointment_in_tx(&mut tx, draft).await?;
            }

            // The counter advances by ordinals consumed, drafts and skips
            // alike, so the next run's sequence numbers continue after the
            // gap instead of reusing a skipped ordinal.
            sqlx::query(
                "UPDATE recurrence_patterns
                 SET last_generated_date = $1, total_generated = total_generated + $2,
                     updated_at = $3
                 WHERE id = $4",
            )
            .bind(sequence.dates.last().copied())
            .bind(sequence.dates.len() as i64)
            .bind(Utc::now())
            .bind(pattern.id)
            .execute(&mut *tx)
            .await?;

            Self::grow_series_for_pattern_in_tx(&mut tx, &pattern, drafts.len() as i64).await?;

            tx.commit().await?;

            tracing::debug!(
                "Persisted {} draft(s) for pattern {}, watermark now {:?}",
                drafts.len(),
                pattern.id,
                sequence.dates.last()
            );
        }

        Ok(GenerationOutcome {
            total_generated: drafts.len(),
            total_conflicts: conflicts.len(),
            drafts,
            conflicts,
            skipped_dates,
        })
    }
}

fn draft_appointment(
    pattern: &RecurrencePattern,
    date: NaiveDate,
    time: NaiveTime,
    sequence_number: i64,
) -> AppointmentInstance {
    let now = Utc::now();
    AppointmentInstance {
        id: Uuid::now_v7(),
        pattern_id: Some(pattern.id),
        owner_id: pattern.owner_id,
        barber_id: pattern.barber_id,
        location_id: pattern.location_id,
        service_id: pattern.service_id,
        start_date: date,
        start_time: time,
        duration_minutes: pattern.duration_minutes,
        buffer_before_minutes: 0,
        buffer_after_minutes: 0,
        sequence_number: Some(sequence_number),
        status: AppointmentStatus::Pending,
        original_scheduled_date: None,
        created_at: now,
        updated_at: now,
    }
}
