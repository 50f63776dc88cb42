use crate::error::CoreError;
use crate::models::{NewPatternData, RecurrencePattern, UpdatePatternData};
use crate::occurrence::RecurrenceRule;
use crate::repository::SqliteRepository;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite};
use uuid::Uuid;

#[async_trait]
impl super::PatternRepository for SqliteRepository {
    async fn create_pattern(&self, data: NewPatternData) -> Result<RecurrencePattern, CoreError> {
        if data.duration_minutes < 1 {
            return Err(CoreError::Validation(
                "duration_minutes must be positive".to_string(),
            ));
        }

        let now = Utc::now();
        let pattern = RecurrencePattern {
            id: Uuid::now_v7(),
            owner_id: data.owner_id,
            pattern_type: data.pattern_type,
            interval_value: data.interval_value,
            days_of_week: data.days_of_week,
            day_of_month: data.day_of_month,
            week_of_month: data.week_of_month,
            weekday_of_month: data.weekday_of_month,
            start_date: data.start_date,
            end_date: data.end_date,
            occurrences_limit: data.occurrences_limit,
            preferred_time: data.preferred_time,
            duration_minutes: data.duration_minutes,
            barber_id: data.barber_id,
            location_id: data.location_id,
            service_id: data.service_id,
            reschedule_on_conflict: data.reschedule_on_conflict,
            excluded_dates: data.excluded_dates,
            active: true,
            last_generated_date: None,
            total_generated: 0,
            created_at: now,
            updated_at: now,
        };

        // Reject malformed selector combinations before they reach the store.
        RecurrenceRule::from_pattern(&pattern)?;
        pattern.excluded_set()?;

        sqlx::query(
            r#"INSERT INTO recurrence_patterns (
                id, owner_id, pattern_type, interval_value, days_of_week,
                day_of_month, week_of_month, weekday_of_month, start_date,
                end_date, occurrences_limit, preferred_time, duration_minutes,
                barber_id, location_id, service_id, reschedule_on_conflict,
                excluded_dates, active, last_generated_date, total_generated,
                created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13,
                    $14, $15, $16, $17, $18, $19, $20, $21, $22, $23)"#,
        )
        .bind(pattern.id)
        .bind(pattern.owner_id)
        .bind(&pattern.pattern_type)
        .bind(pattern.interval_value)
        .bind(&pattern.days_of_week)
        .bind(pattern.day_of_month)
        .bind(pattern.week_of_month)
        .bind(&pattern.weekday_of_month)
        .bind(pattern.start_date)
        .bind(pattern.end_date)
        .bind(pattern.occurrences_limit)
        .bind(pattern.preferred_time)
        .bind(pattern.duration_minutes)
        .bind(pattern.barber_id)
        .bind(pattern.location_id)
        .bind(pattern.service_id)
        .bind(pattern.reschedule_on_conflict)
        .bind(&pattern.excluded_dates)
        .bind(pattern.active)
        .bind(pattern.last_generated_date)
        .bind(pattern.total_generated)
        .bind(pattern.created_at)
        .bind(pattern.updated_at)
        .execute(self.pool())
        .await?;

        Ok(pattern)
    }

    async fn find_pattern(
        &self,
        id: Uuid,
        owner_id: Uuid,
    ) -> Result<Option<RecurrencePattern>, CoreError> {
        let pattern = sqlx::query_as(
            "SELECT * FROM recurrence_patterns WHERE id = $1 AND owner_id = $2",
        )
        .bind(id)
        .bind(owner_id)
        .fetch_optional(self.pool())
        .await?;
        Ok(pattern)
    }

    async fn find_patterns_for_owner(
        &self,
        owner_id: Uuid,
    ) -> Result<Vec<RecurrencePattern>, CoreError> {
        let patterns = sqlx::query_as(
            "SELECT * FROM recurrence_patterns WHERE owner_id = $1 ORDER BY created_at",
        )
        .bind(owner_id)
        .fetch_all(self.pool())
        .await?;
        Ok(patterns)
    }

    async fn update_pattern(
        &self,
        id: Uuid,
        owner_id: Uuid,
        data: UpdatePatternData,
    ) -> Result<RecurrencePattern, CoreError> {
        let mut tx = self.pool().begin().await?;

        let existing: RecurrencePattern = sqlx::query_as(
            "SELECT * FROM recurrence_patterns WHERE id = $1 AND owner_id = $2",
        )
        .bind(id)
        .bind(owner_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| CoreError::NotFound(format!("Pattern with id {} not found", id)))?;

        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE recurrence_patterns SET ");
        let mut updated = false;

        if let Some(days_of_week) = &data.days_of_week {
            qb.push("days_of_week = ");
            qb.push_bind(days_of_week.clone());
            updated = true;
        }
        if let Some(day_of_month) = data.day_of_month {
            if updated {
                qb.push(", ");
            }
            qb.push("day_of_month = ");
            qb.push_bind(day_of_month);
            updated = true;
        }
        if let Some(week_of_month) = data.week_of_month {
            if updated {
                qb.push(", ");
            }
            qb.push("week_of_month = ");
            qb.push_bind(week_of_month);
            updated = true;
        }
        if let Some(weekday_of_month) = &data.weekday_of_month {
            if updated {
                qb.push(", ");
            }
            qb.push("weekday_of_month = ");
            qb.push_bind(weekday_of_month.clone());
            updated = true;
        }
        if let Some(end_date) = data.end_date {
            if updated {
                qb.push(", ");
            }
            qb.push("end_date = ");
            qb.push_bind(end_date);
            updated = true;
        }
        if let Some(occurrences_limit) = data.occurrences_limit {
            if updated {
                qb.push(", ");
            }
            qb.push("occurrences_limit = ");
            qb.push_bind(occurrences_limit);
            updated = true;
        }
        if let Some(preferred_time) = data.preferred_time {
            if updated {
                qb.push(", ");
            }
            qb.push("preferred_time = ");
            qb.push_bind(preferred_time);
            updated = true;
        }
        if let Some(duration_minutes) = data.duration_minutes {
            if duration_minutes < 1 {
                return Err(CoreError::Validation(
                    "duration_minutes must be positive".to_string(),
                ));
            }
            if updated {
                qb.push(", ");
            }
            qb.push("duration_minutes = ");
            qb.push_bind(duration_minutes);
            updated = true;
        }
        if let Some(reschedule_on_conflict) = data.reschedule_on_conflict {
            if updated {
                qb.push(", ");
            }
            qb.push("reschedule_on_conflict = ");
            qb.push_bind(reschedule_on_conflict);
            updated = true;
        }
        if let Some(excluded_dates) = &data.excluded_dates {
            if updated {
                qb.push(", ");
            }
            qb.push("excluded_dates = ");
            qb.push_bind(excluded_dates.clone());
            updated = true;
        }
        if let Some(barber_id) = data.barber_id {
            if updated {
                qb.push(", ");
            }
            qb.push("barber_id = ");
            qb.push_bind(barber_id);
            updated = true;
        }

        if !updated {
            return Ok(existing);
        }

        qb.push(", updated_at = ");
        qb.push_bind(Utc::now());
        qb.push(" WHERE id = ");
        qb.push_bind(id);
        qb.push(" AND owner_id = ");
        qb.push_bind(owner_id);

        qb.build().execute(&mut *tx).await?;

        let updated_pattern: RecurrencePattern = sqlx::query_as(
            "SELECT * FROM recurrence_patterns WHERE id = $1 AND owner_id = $2",
        )
        .bind(id)
        .bind(owner_id)
        .fetch_one(&mut *tx)
        .await?;

        // A selector edit must still leave a coherent rule; bail out before
        // commit so the row is untouched on failure.
        RecurrenceRule::from_pattern(&updated_pattern)?;
        updated_pattern.excluded_set()?;

        tx.commit().await?;
        Ok(updated_pattern)
    }

    async fn deactivate_pattern(&self, id: Uuid, owner_id: Uuid) -> Result<(), CoreError> {
        let result = sqlx::query(
            "UPDATE recurrence_patterns SET active = false, updated_at = $1
             WHERE id = $2 AND owner_id = $3",
        )
        .bind(Utc::now())
        .bind(id)
        .bind(owner_id)
        .execute(self.pool())
        .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::NotFound(format!(
                "Pattern with id {} not found",
                id
            )));
        }

        Ok(())
    }
}
