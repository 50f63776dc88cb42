use crate::error::CoreError;
use crate::models::{
    AppointmentInstance, AppointmentStatus, ManageAction, ManageRequest, ProgressDelta,
    RecurrencePattern, RecurringSeries, SeriesStatus,
};
use crate::repository::SqliteRepository;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Sqlite, Transaction};
use uuid::Uuid;

/// Recompute a series' completion percentage and status from its totals.
///
/// `completed` is terminal: once a series reaches 100% its status and
/// `completed_at` never move again, even if later mutations change the
/// counters. A series with nothing planned stays at 0% in `draft`.
pub(crate) fn recompute_progress(series: &mut RecurringSeries, now: DateTime<Utc>) {
    if series.total_planned <= 0 {
        series.completion_percentage = 0.0;
        return;
    }

    let pct = (series.total_completed as f64 / series.total_planned as f64) * 100.0;
    series.completion_percentage = pct.min(100.0);

    if series.status == SeriesStatus::Completed {
        return;
    }

    if series.completion_percentage >= 100.0 {
        series.status = SeriesStatus::Completed;
        series.completed_at = Some(now);
    } else if series.total_completed > 0
        || series.total_cancelled > 0
        || series.total_rescheduled > 0
    {
        series.status = SeriesStatus::InProgress;
    }
}

#[async_trait]
impl super::SeriesRepository for SqliteRepository {
    async fn find_series_for_pattern(
        &self,
        pattern_id: Uuid,
    ) -> Result<Option<RecurringSeries>, CoreError> {
        let series = sqlx::query_as("SELECT * FROM recurring_series WHERE pattern_id = $1")
            .bind(pattern_id)
            .fetch_optional(self.pool())
            .await?;
        Ok(series)
    }

    async fn update_progress(
        &self,
        series_id: Uuid,
        delta: ProgressDelta,
    ) -> Result<RecurringSeries, CoreError> {
        let mut tx = self.pool().begin().await?;
        let series = Self::apply_progress_in_tx(&mut tx, series_id, delta).await?;
        tx.commit().await?;
        Ok(series)
    }

    async fn manage(
        &self,
        owner_id: Uuid,
        request: ManageRequest,
    ) -> Result<Vec<AppointmentInstance>, CoreError> {
        let reschedule_target = match request.action {
            ManageAction::Reschedule => match (request.new_date, request.new_time) {
                (Some(date), Some(time)) => Some((date, time)),
                _ => {
                    return Err(CoreError::Validation(
                        "Reschedule requires both new_date and new_time".to_string(),
                    ))
                }
            },
            _ => None,
        };

        let mut tx = self.pool().begin().await?;

        let anchor: AppointmentInstance =
            sqlx::query_as("SELECT * FROM appointments WHERE id = $1 AND owner_id = $2")
                .bind(request.appointment_id)
                .bind(owner_id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or_else(|| {
                    CoreError::NotFound(format!(
                        "Appointment with id {} not found",
                        request.appointment_id
                    ))
                })?;

        // Series scope covers the anchor and every active instance at or
        // after it; already-cancelled or completed instances are left alone.
        let mut affected: Vec<AppointmentInstance> =
            match (request.apply_to_series, anchor.pattern_id) {
                (true, Some(pattern_id)) => {
                    sqlx::query_as(
                        "SELECT * FROM appointments
                         WHERE pattern_id = $1
                         AND status IN ('pending', 'confirmed')
                         AND (start_date > $2 OR (start_date = $2 AND start_time >= $3))
                         ORDER BY start_date, start_time",
                    )
                    .bind(pattern_id)
                    .bind(anchor.start_date)
                    .bind(anchor.start_time)
                    .fetch_all(&mut *tx)
                    .await?
                }
                _ => vec![anchor.clone()],
            };

        let now = Utc::now();
        for appointment in affected.iter_mut() {
            match request.action {
                ManageAction::Reschedule => {
                    if let Some((new_date, new_time)) = reschedule_target {
                        // Only the first reschedule records the original
                        // date; later moves keep the earliest one.
                        if appointment.original_scheduled_date.is_none() {
                            appointment.original_scheduled_date = Some(appointment.start_date);
                        }
                        appointment.start_date = new_date;
                        appointment.start_time = new_time;
                        if let Some(barber_id) = request.new_barber_id {
                            appointment.barber_id = barber_id;
                        }
                    }
                }
                ManageAction::Cancel => appointment.status = AppointmentStatus::Cancelled,
                ManageAction::Complete => appointment.status = AppointmentStatus::Completed,
            }
            appointment.updated_at = now;

            sqlx::query(
                "UPDATE appointments
                 SET start_date = $1, start_time = $2, barber_id = $3, status = $4,
                     original_scheduled_date = $5, updated_at = $6
                 WHERE id = $7",
            )
            .bind(appointment.start_date)
            .bind(appointment.start_time)
            .bind(appointment.barber_id)
            .bind(&appointment.status)
            .bind(appointment.original_scheduled_date)
            .bind(appointment.updated_at)
            .bind(appointment.id)
            .execute(&mut *tx)
            .await?;
        }

        // One batched progress update for the whole mutation.
        if let Some(pattern_id) = anchor.pattern_id {
            let series: Option<RecurringSeries> =
                sqlx::query_as("SELECT * FROM recurring_series WHERE pattern_id = $1")
                    .bind(pattern_id)
                    .fetch_optional(&mut *tx)
                    .await?;
            if let Some(series) = series {
                let count = affected.len() as i64;
                let delta = match request.action {
                    ManageAction::Reschedule => ProgressDelta {
                        rescheduled: count,
                        ..Default::default()
                    },
                    ManageAction::Cancel => ProgressDelta {
                        cancelled: count,
                        ..Default::default()
                    },
                    ManageAction::Complete => ProgressDelta {
                        completed: count,
                        ..Default::default()
                    },
                };
                Self::apply_progress_in_tx(&mut tx, series.id, delta).await?;
            }
        }

        tx.commit().await?;

        tracing::debug!(
            "Applied {} to {} appointment(s) anchored at {}",
            request.action,
            affected.len(),
            request.appointment_id
        );

        Ok(affected)
    }
}

impl SqliteRepository {
    /// Apply a progress delta and recompute derived fields within an
    /// existing transaction.
    pub(crate) async fn apply_progress_in_tx(
        tx: &mut Transaction<'_, Sqlite>,
        series_id: Uuid,
        delta: ProgressDelta,
    ) -> Result<RecurringSeries, CoreError> {
        let mut series: RecurringSeries =
            sqlx::query_as("SELECT * FROM recurring_series WHERE id = $1")
                .bind(series_id)
                .fetch_optional(&mut **tx)
                .await?
                .ok_or_else(|| {
                    CoreError::NotFound(format!("Series with id {} not found", series_id))
                })?;

        series.total_completed += delta.completed;
        series.total_cancelled += delta.cancelled;
        series.total_rescheduled += delta.rescheduled;

        let now = Utc::now();
        recompute_progress(&mut series, now);
        series.updated_at = now;

        Self::persist_series_in_tx(tx, &series).await?;
        Ok(series)
    }

    /// Grow the series tied to a pattern by `additional_planned` instances,
    /// creating the series on the pattern's first generation run.
    pub(crate) async fn grow_series_for_pattern_in_tx(
        tx: &mut Transaction<'_, Sqlite>,
        pattern: &RecurrencePattern,
        additional_planned: i64,
    ) -> Result<(), CoreError> {
        let existing: Option<RecurringSeries> =
            sqlx::query_as("SELECT * FROM recurring_series WHERE pattern_id = $1")
                .bind(pattern.id)
                .fetch_optional(&mut **tx)
                .await?;

        match existing {
            Some(mut series) => {
                series.total_planned += additional_planned;
                let now = Utc::now();
                recompute_progress(&mut series, now);
                series.updated_at = now;
                Self::persist_series_in_tx(tx, &series).await?;
            }
            None => {
                let now = Utc::now();
                let series = RecurringSeries {
                    id: Uuid::now_v7(),
                    pattern_id: pattern.id,
                    owner_id: pattern.owner_id,
                    total_planned: additional_planned,
                    total_completed: 0,
                    total_cancelled: 0,
                    total_rescheduled: 0,
                    completion_percentage: 0.0,
                    status: SeriesStatus::Draft,
                    completed_at: None,
                    created_at: now,
                    updated_at: now,
                };
                sqlx::query(
                    r#"INSERT INTO recurring_series (
                        id, pattern_id, owner_id, total_planned, total_completed,
                        total_cancelled, total_rescheduled, completion_percentage,
                        status, completed_at, created_at, updated_at)
                    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)"#,
                )
                .bind(series.id)
                .bind(series.pattern_id)
                .bind(series.owner_id)
                .bind(series.total_planned)
                .bind(series.total_completed)
                .bind(series.total_cancelled)
                .bind(series.total_rescheduled)
                .bind(series.completion_percentage)
                .bind(&series.status)
                .bind(series.completed_at)
                .bind(series.created_at)
                .bind(series.updated_at)
                .execute(&mut **tx)
                .await?;
            }
        }

        Ok(())
    }

    async fn persist_series_in_tx(
        tx: &mut Transaction<'_, Sqlite>,
        series: &RecurringSeries,
    ) -> Result<(), CoreError> {
        sqlx::query(
            "UPDATE recurring_series
             SET total_planned = $1, total_completed = $2, total_cancelled = $3,
                 total_rescheduled = $4, completion_percentage = $5, status = $6,
                 completed_at = $7, updated_at = $8
             WHERE id = $9",
        )
        .bind(series.total_planned)
        .bind(series.total_completed)
        .bind(series.total_cancelled)
        .bind(series.total_rescheduled)
        .bind(series.completion_percentage)
        .bind(&series.status)
        .bind(series.completed_at)
        .bind(series.updated_at)
        .bind(series.id)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }
}
