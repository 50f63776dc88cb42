use crate::config::SchedulerConfig;
use crate::db::DbPool;
use crate::error::CoreError;
use crate::models::{
    AppointmentInstance, BlackoutRecord, ConflictRecord, GenerationOutcome, GenerationRequest,
    ManageRequest, NewAppointmentData, NewBlackoutData, NewHolidayData, NewPatternData,
    ProgressDelta, RecurrencePattern, RecurringSeries, UpdatePatternData,
};
use crate::occurrence::OccurrenceSequence;
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use uuid::Uuid;

// Re-export domain modules
pub mod appointments;
pub mod availability;
pub mod generation;
pub mod patterns;
pub mod scheduling;
pub mod series;

// Traits are defined in this module and implemented in respective domain modules

/// Domain-specific trait for recurrence pattern operations.
///
/// Patterns are owned rows: every lookup is scoped by `owner_id`, and they
/// are deactivated rather than deleted so generated lineages stay intact.
#[async_trait]
pub trait PatternRepository {
    async fn create_pattern(&self, data: NewPatternData) -> Result<RecurrencePattern, CoreError>;
    async fn find_pattern(
        &self,
        id: Uuid,
        owner_id: Uuid,
    ) -> Result<Option<RecurrencePattern>, CoreError>;
    async fn find_patterns_for_owner(
        &self,
        owner_id: Uuid,
    ) -> Result<Vec<RecurrencePattern>, CoreError>;
    async fn update_pattern(
        &self,
        id: Uuid,
        owner_id: Uuid,
        data: UpdatePatternData,
    ) -> Result<RecurrencePattern, CoreError>;
    async fn deactivate_pattern(&self, id: Uuid, owner_id: Uuid) -> Result<(), CoreError>;
}

/// Domain-specific trait for appointment instance operations.
#[async_trait]
pub trait AppointmentRepository {
    async fn create_appointment(
        &self,
        data: NewAppointmentData,
    ) -> Result<AppointmentInstance, CoreError>;
    async fn find_appointment(
        &self,
        id: Uuid,
        owner_id: Uuid,
    ) -> Result<Option<AppointmentInstance>, CoreError>;
    async fn find_appointments_for_pattern(
        &self,
        pattern_id: Uuid,
    ) -> Result<Vec<AppointmentInstance>, CoreError>;
    /// Same-day pending/confirmed instances for a barber, the input to
    /// double-booking detection.
    async fn find_active_for_barber_on(
        &self,
        barber_id: Uuid,
        date: NaiveDate,
        exclude_appointment_id: Option<Uuid>,
    ) -> Result<Vec<AppointmentInstance>, CoreError>;
}

/// Domain-specific trait for series lifecycle tracking and bulk mutation.
#[async_trait]
pub trait SeriesRepository {
    async fn find_series_for_pattern(
        &self,
        pattern_id: Uuid,
    ) -> Result<Option<RecurringSeries>, CoreError>;
    async fn update_progress(
        &self,
        series_id: Uuid,
        delta: ProgressDelta,
    ) -> Result<RecurringSeries, CoreError>;
    /// Reschedule/cancel/complete one appointment or its whole future
    /// lineage; returns the affected instances.
    async fn manage(
        &self,
        owner_id: Uuid,
        request: ManageRequest,
    ) -> Result<Vec<AppointmentInstance>, CoreError>;
}

/// Domain-specific trait for conflict detection, slot resolution and series
/// generation.
#[async_trait]
pub trait SchedulingRepository {
    async fn detect_conflicts(
        &self,
        date: NaiveDate,
        time: NaiveTime,
        duration_minutes: i64,
        barber_id: Uuid,
        location_id: Uuid,
        exclude_appointment_id: Option<Uuid>,
    ) -> Result<Vec<ConflictRecord>, CoreError>;
    /// Tries the fixed same-day offsets around the pattern's preferred time;
    /// `None` means the date should be skipped.
    async fn resolve_slot(
        &self,
        date: NaiveDate,
        pattern: &RecurrencePattern,
    ) -> Result<Option<NaiveTime>, CoreError>;
    /// Powers "preview next N occurrences" without touching the store.
    async fn preview_occurrences(
        &self,
        pattern_id: Uuid,
        owner_id: Uuid,
        count: usize,
    ) -> Result<OccurrenceSequence, CoreError>;
}

/// Domain-specific trait for the series orchestrator: materializes drafts
/// from a pattern's occurrence stream.
#[async_trait]
pub trait GenerationRepository {
    async fn generate(
        &self,
        owner_id: Uuid,
        request: GenerationRequest,
    ) -> Result<GenerationOutcome, CoreError>;
}

/// External blackout lookup, consumed by conflict detection. Faults
/// propagate so detection fails closed by default.
#[async_trait]
pub trait BlackoutRegistry {
    async fn is_blocked(
        &self,
        date: NaiveDate,
        time: Option<NaiveTime>,
        location_id: Option<Uuid>,
        barber_id: Option<Uuid>,
    ) -> Result<Option<BlackoutRecord>, CoreError>;
    async fn add_blackout(&self, data: NewBlackoutData) -> Result<BlackoutRecord, CoreError>;
}

/// External holiday lookup, consumed by conflict detection.
#[async_trait]
pub trait HolidayOracle {
    async fn is_holiday(&self, date: NaiveDate, country_code: &str) -> Result<bool, CoreError>;
    async fn add_holiday(&self, data: NewHolidayData) -> Result<(), CoreError>;
}

/// Main repository trait that composes all domain traits
#[async_trait]
pub trait Repository:
    PatternRepository
    + AppointmentRepository
    + SeriesRepository
    + SchedulingRepository
    + GenerationRepository
    + BlackoutRegistry
    + HolidayOracle
{
    // This trait automatically composes all domain-specific repositories
    // Individual domain operations are defined in their respective traits
}

/// SQLite implementation of the repository pattern
pub struct SqliteRepository {
    pool: DbPool,
    config: SchedulerConfig,
}

impl SqliteRepository {
    pub fn new(pool: DbPool, config: SchedulerConfig) -> Self {
        Self { pool, config }
    }

    /// Get a reference to the database pool for internal use across modules
    pub(crate) fn pool(&self) -> &DbPool {
        &self.pool
    }

    /// Get a reference to the scheduler configuration
    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }
}

// The main Repository trait implementation will automatically be available
// when all domain trait implementations are defined
impl Repository for SqliteRepository {}
