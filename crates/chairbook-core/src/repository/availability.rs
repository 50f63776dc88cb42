use crate::conflict;
use crate::error::CoreError;
use crate::models::{BlackoutRecord, NewBlackoutData, NewHolidayData};
use crate::repository::SqliteRepository;
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime, Utc};
use uuid::Uuid;

#[async_trait]
impl super::BlackoutRegistry for SqliteRepository {
    async fn is_blocked(
        &self,
        date: NaiveDate,
        time: Option<NaiveTime>,
        location_id: Option<Uuid>,
        barber_id: Option<Uuid>,
    ) -> Result<Option<BlackoutRecord>, CoreError> {
        // A record with NULL location/barber applies shop-wide; a scoped
        // record applies only when the caller asks about that scope.
        let records: Vec<BlackoutRecord> = sqlx::query_as(
            "SELECT * FROM blackout_dates
             WHERE date = $1
             AND (location_id IS NULL OR $2 IS NULL OR location_id = $2)
             AND (barber_id IS NULL OR $3 IS NULL OR barber_id = $3)
             ORDER BY created_at",
        )
        .bind(date)
        .bind(location_id)
        .bind(barber_id)
        .fetch_all(self.pool())
        .await?;

        Ok(records
            .into_iter()
            .find(|record| conflict::blackout_window_covers(record, time)))
    }

    async fn add_blackout(&self, data: NewBlackoutData) -> Result<BlackoutRecord, CoreError> {
        let record = BlackoutRecord {
            id: Uuid::now_v7(),
            owner_id: data.owner_id,
            location_id: data.location_id,
            barber_id: data.barber_id,
            date: data.date,
            kind: data.kind,
            start_time: data.start_time,
            end_time: data.end_time,
            allow_emergency_bookings: data.allow_emergency_bookings,
            reason: data.reason,
            created_at: Utc::now(),
        };

        sqlx::query(
            r#"INSERT INTO blackout_dates (
                id, owner_id, location_id, barber_id, date, kind, start_time,
                end_time, allow_emergency_bookings, reason, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)"#,
        )
        .bind(record.id)
        .bind(record.owner_id)
        .bind(record.location_id)
        .bind(record.barber_id)
        .bind(record.date)
        .bind(&record.kind)
        .bind(record.start_time)
        .bind(record.end_time)
        .bind(record.allow_emergency_bookings)
        .bind(&record.reason)
        .bind(record.created_at)
        .execute(self.pool())
        .await?;

        Ok(record)
    }
}

#[async_trait]
impl super::HolidayOracle for SqliteRepository {
    async fn is_holiday(&self, date: NaiveDate, country_code: &str) -> Result<bool, CoreError> {
        let count: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM holidays WHERE date = $1 AND country_code = $2",
        )
        .bind(date)
        .bind(country_code)
        .fetch_one(self.pool())
        .await?;
        Ok(count.0 > 0)
    }

    async fn add_holiday(&self, data: NewHolidayData) -> Result<(), CoreError> {
        sqlx::query(
            r#"INSERT INTO holidays (id, country_code, date, name, created_at)
            VALUES ($1, $2, $3, $4, $5)"#,
        )
        .bind(Uuid::now_v7())
        .bind(&data.country_code)
        .bind(data.date)
        .bind(&data.name)
        .bind(Utc::now())
        .execute(self.pool())
        .await?;
        Ok(())
    }
}
