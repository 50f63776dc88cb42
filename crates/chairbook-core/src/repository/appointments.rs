use crate::error::CoreError;
use crate::models::{AppointmentInstance, AppointmentStatus, NewAppointmentData};
use crate::repository::SqliteRepository;
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use sqlx::{Sqlite, Transaction};
use uuid::Uuid;

#[async_trait]
impl super::AppointmentRepository for SqliteRepository {
    async fn create_appointment(
        &self,
        data: NewAppointmentData,
    ) -> Result<AppointmentInstance, CoreError> {
        if data.duration_minutes < 1 {
            return Err(CoreError::Validation(
                "duration_minutes must be positive".to_string(),
            ));
        }

        let now = Utc::now();
        let appointment = AppointmentInstance {
            id: Uuid::now_v7(),
            pattern_id: data.pattern_id,
            owner_id: data.owner_id,
            barber_id: data.barber_id,
            location_id: data.location_id,
            service_id: data.service_id,
            start_date: data.start_date,
            start_time: data.start_time,
            duration_minutes: data.duration_minutes,
            buffer_before_minutes: data.buffer_before_minutes,
            buffer_after_minutes: data.buffer_after_minutes,
            sequence_number: data.sequence_number,
            status: data.status.unwrap_or(AppointmentStatus::Pending),
            original_scheduled_date: None,
            created_at: now,
            updated_at: now,
        };

        let mut tx = self.pool().begin().await?;
        Self::insert_appointment_in_tx(&mut tx, &appointment).await?;
        tx.commit().await?;

        Ok(appointment)
    }

    async fn find_appointment(
        &self,
        id: Uuid,
        owner_id: Uuid,
    ) -> Result<Option<AppointmentInstance>, CoreError> {
        let appointment = sqlx::query_as(
            "SELECT * FROM appointments WHERE id = $1 AND owner_id = $2",
        )
        .bind(id)
        .bind(owner_id)
        .fetch_optional(self.pool())
        .await?;
        Ok(appointment)
    }

    async fn find_appointments_for_pattern(
        &self,
        pattern_id: Uuid,
    ) -> Result<Vec<AppointmentInstance>, CoreError> {
        let appointments = sqlx::query_as(
            "SELECT * FROM appointments WHERE pattern_id = $1
             ORDER BY start_date, start_time",
        )
        .bind(pattern_id)
        .fetch_all(self.pool())
        .await?;
        Ok(appointments)
    }

    async fn find_active_for_barber_on(
        &self,
        barber_id: Uuid,
        date: NaiveDate,
        exclude_appointment_id: Option<Uuid>,
    ) -> Result<Vec<AppointmentInstance>, CoreError> {
        let appointments = sqlx::query_as(
            "SELECT * FROM appointments
             WHERE barber_id = $1 AND start_date = $2
             AND status IN ('pending', 'confirmed')
             AND ($3 IS NULL OR id <> $3)
             ORDER BY start_time",
        )
        .bind(barber_id)
        .bind(date)
        .bind(exclude_appointment_id)
        .fetch_all(self.pool())
        .await?;
        Ok(appointments)
    }
}

impl SqliteRepository {
    /// Insert an appointment row within an existing transaction; used by the
    /// orchestrator to persist a whole generation batch atomically.
    pub(crate) async fn insert_appointment_in_tx(
        tx: &mut Transaction<'_, Sqlite>,
        appointment: &AppointmentInstance,
    ) -> Result<(), CoreError> {
        sqlx::query(
            r#"INSERT INTO appointments (
                id, pattern_id, owner_id, barber_id, location_id, service_id,
                start_date, start_time, duration_minutes,
                buffer_before_minutes, buffer_after_minutes, sequence_number,
                status, original_scheduled_date, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13,
                    $14, $15, $16)"#,
        )
        .bind(appointment.id)
        .bind(appointment.pattern_id)
        .bind(appointment.owner_id)
        .bind(appointment.barber_id)
        .bind(appointment.location_id)
        .bind(appointment.service_id)
        .bind(appointment.start_date)
        .bind(appointment.start_time)
        .bind(appointment.duration_minutes)
        .bind(appointment.buffer_before_minutes)
        .bind(appointment.buffer_after_minutes)
        .bind(appointment.sequence_number)
        .bind(&appointment.status)
        .bind(appointment.original_scheduled_date)
        .bind(appointment.created_at)
        .bind(appointment.updated_at)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }
}
