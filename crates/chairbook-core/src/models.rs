use chrono::{DateTime, NaiveDate, NaiveTime, Utc, Weekday};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::collections::HashSet;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

use crate::error::CoreError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PatternType {
    Daily,
    Weekly,
    Biweekly,
    Monthly,
}

#[derive(Error, Debug, PartialEq)]
#[error("Invalid pattern type: {0}")]
pub struct ParsePatternTypeError(String);

impl FromStr for PatternType {
    type Err = ParsePatternTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "daily" => Ok(PatternType::Daily),
            "weekly" => Ok(PatternType::Weekly),
            "biweekly" => Ok(PatternType::Biweekly),
            "monthly" => Ok(PatternType::Monthly),
            _ => Err(ParsePatternTypeError(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
    Completed,
    Cancelled,
    NoShow,
}

impl AppointmentStatus {
    /// Active appointments hold their slot and participate in
    /// double-booking detection.
    pub fn is_active(&self) -> bool {
        matches!(self, AppointmentStatus::Pending | AppointmentStatus::Confirmed)
    }
}

#[derive(Error, Debug, PartialEq)]
#[error("Invalid appointment status: {0}")]
pub struct ParseAppointmentStatusError(String);

impl FromStr for AppointmentStatus {
    type Err = ParseAppointmentStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(AppointmentStatus::Pending),
            "confirmed" => Ok(AppointmentStatus::Confirmed),
            "completed" => Ok(AppointmentStatus::Completed),
            "cancelled" => Ok(AppointmentStatus::Cancelled),
            "no_show" => Ok(AppointmentStatus::NoShow),
            _ => Err(ParseAppointmentStatusError(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SeriesStatus {
    Draft,
    InProgress,
    Completed,
}

#[derive(Error, Debug, PartialEq)]
#[error("Invalid series status: {0}")]
pub struct ParseSeriesStatusError(String);

impl FromStr for SeriesStatus {
    type Err = ParseSeriesStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "draft" => Ok(SeriesStatus::Draft),
            "in_progress" => Ok(SeriesStatus::InProgress),
            "completed" => Ok(SeriesStatus::Completed),
            _ => Err(ParseSeriesStatusError(s.to_string())),
        }
    }
}

/// Represents a recurring appointment rule owned by a shop.
///
/// The selector columns are interpreted per `pattern_type`:
/// - `daily`: `interval_value` days between occurrences
/// - `weekly`/`biweekly`: `days_of_week` (CSV of weekday names)
/// - `monthly`: either `day_of_month`, or `week_of_month` + `weekday_of_month`
///
/// Exactly one selector set must be populated for the type;
/// `RecurrenceRule::from_pattern` compiles and validates the combination.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RecurrencePattern {
    #[serde(with = "uuid::serde::compact")]
    pub id: Uuid,
    #[serde(with = "uuid::serde::compact")]
    pub owner_id: Uuid,
    pub pattern_type: PatternType,
    pub interval_value: i64,
    pub days_of_week: Option<String>,
    pub day_of_month: Option<i64>,
    pub week_of_month: Option<i64>,
    pub weekday_of_month: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    /// Lifetime cap on generated occurrences, independent of `end_date`;
    /// whichever stop condition is hit first wins.
    pub occurrences_limit: Option<i64>,
    pub preferred_time: NaiveTime,
    pub duration_minutes: i64,
    pub barber_id: Uuid,
    pub location_id: Uuid,
    pub service_id: Uuid,
    pub reschedule_on_conflict: bool,
    /// CSV of ISO dates the pattern must never produce.
    pub excluded_dates: Option<String>,
    /// Patterns are never hard-deleted, only deactivated.
    pub active: bool,
    /// Generation watermark: the last occurrence date a generation run has
    /// consumed. Updated transactionally by the orchestrator only.
    pub last_generated_date: Option<NaiveDate>,
    /// Occurrence ordinals consumed so far, counting conflict-skipped dates
    /// as well as drafts. Doubles as the sequence-number base for the next
    /// run, so ordinals never collide across runs.
    pub total_generated: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RecurrencePattern {
    /// Parses `days_of_week` into weekdays, in CSV order.
    pub fn weekday_set(&self) -> Result<Vec<Weekday>, CoreError> {
        let raw = self.days_of_week.as_deref().unwrap_or("");
        let mut days = Vec::new();
        for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let day = part.parse::<Weekday>().map_err(|_| {
                CoreError::Validation(format!("Invalid weekday in days_of_week: {}", part))
            })?;
            if !days.contains(&day) {
                days.push(day);
            }
        }
        Ok(days)
    }

    /// Parses `excluded_dates` into a lookup set.
    pub fn excluded_set(&self) -> Result<HashSet<NaiveDate>, CoreError> {
        let raw = self.excluded_dates.as_deref().unwrap_or("");
        let mut dates = HashSet::new();
        for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let date = NaiveDate::from_str(part).map_err(|_| {
                CoreError::Validation(format!("Invalid date in excluded_dates: {}", part))
            })?;
            dates.insert(date);
        }
        Ok(dates)
    }
}

/// One concrete appointment slot, either materialized from a pattern or
/// booked directly (`pattern_id = None`).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AppointmentInstance {
    #[serde(with = "uuid::serde::compact")]
    pub id: Uuid,
    pub pattern_id: Option<Uuid>,
    #[serde(with = "uuid::serde::compact")]
    pub owner_id: Uuid,
    pub barber_id: Uuid,
    pub location_id: Uuid,
    pub service_id: Uuid,
    pub start_date: NaiveDate,
    pub start_time: NaiveTime,
    pub duration_minutes: i64,
    pub buffer_before_minutes: i64,
    pub buffer_after_minutes: i64,
    /// Position in the pattern's occurrence lineage. Skipped dates still
    /// consume their ordinal, so this is stable across regeneration.
    pub sequence_number: Option<i64>,
    pub status: AppointmentStatus,
    /// Set once, on the first reschedule only. Later reschedules keep the
    /// original date.
    pub original_scheduled_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Aggregate lifecycle of the instances generated from one pattern.
///
/// `status` is monotonic: once `completed`, later mutations never revert it
/// and `completed_at` is never cleared.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RecurringSeries {
    #[serde(with = "uuid::serde::compact")]
    pub id: Uuid,
    #[serde(with = "uuid::serde::compact")]
    pub pattern_id: Uuid,
    #[serde(with = "uuid::serde::compact")]
    pub owner_id: Uuid,
    pub total_planned: i64,
    pub total_completed: i64,
    pub total_cancelled: i64,
    pub total_rescheduled: i64,
    pub completion_percentage: f64,
    pub status: SeriesStatus,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ConflictType {
    DoubleBooking,
    BlackoutDate,
    Holiday,
}

impl std::fmt::Display for ConflictType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConflictType::DoubleBooking => write!(f, "double_booking"),
            ConflictType::BlackoutDate => write!(f, "blackout_date"),
            ConflictType::Holiday => write!(f, "holiday"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SuggestedResolution {
    Reschedule,
    Skip,
    ManualReview,
}

impl std::fmt::Display for SuggestedResolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SuggestedResolution::Reschedule => write!(f, "reschedule"),
            SuggestedResolution::Skip => write!(f, "skip"),
            SuggestedResolution::ManualReview => write!(f, "manual_review"),
        }
    }
}

/// A detected reason a candidate slot cannot be booked as-is.
///
/// Conflicts are first-class return data, never errors: detection is a
/// frequent, expected outcome.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConflictRecord {
    pub conflict_type: ConflictType,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub details: serde_json::Value,
    pub suggested_resolution: SuggestedResolution,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum BlackoutKind {
    WholeDay,
    PartialDay,
}

/// An explicitly closed window for a location or barber, as served by the
/// blackout registry.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct BlackoutRecord {
    #[serde(with = "uuid::serde::compact")]
    pub id: Uuid,
    #[serde(with = "uuid::serde::compact")]
    pub owner_id: Uuid,
    pub location_id: Option<Uuid>,
    pub barber_id: Option<Uuid>,
    pub date: NaiveDate,
    pub kind: BlackoutKind,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub allow_emergency_bookings: bool,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Data Transfer Objects (DTOs)
// ============================================================================

/// Data required to create a new recurrence pattern. The rule selectors are
/// validated on insert.
#[derive(Debug, Clone)]
pub struct NewPatternData {
    pub owner_id: Uuid,
    pub pattern_type: PatternType,
    pub interval_value: i64,
    pub days_of_week: Option<String>,
    pub day_of_month: Option<i64>,
    pub week_of_month: Option<i64>,
    pub weekday_of_month: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub occurrences_limit: Option<i64>,
    pub preferred_time: NaiveTime,
    pub duration_minutes: i64,
    pub barber_id: Uuid,
    pub location_id: Uuid,
    pub service_id: Uuid,
    pub reschedule_on_conflict: bool,
    pub excluded_dates: Option<String>,
}

/// Partial update for an existing pattern. Outer `None` means "leave
/// unchanged"; the inner `Option` clears nullable columns.
#[derive(Debug, Clone, Default)]
pub struct UpdatePatternData {
    pub days_of_week: Option<Option<String>>,
    pub day_of_month: Option<Option<i64>>,
    pub week_of_month: Option<Option<i64>>,
    pub weekday_of_month: Option<Option<String>>,
    pub end_date: Option<Option<NaiveDate>>,
    pub occurrences_limit: Option<Option<i64>>,
    pub preferred_time: Option<NaiveTime>,
    pub duration_minutes: Option<i64>,
    pub reschedule_on_conflict: Option<bool>,
    pub excluded_dates: Option<Option<String>>,
    pub barber_id: Option<Uuid>,
}

/// Data for booking an appointment directly or from a draft.
#[derive(Debug, Clone)]
pub struct NewAppointmentData {
    pub pattern_id: Option<Uuid>,
    pub owner_id: Uuid,
    pub barber_id: Uuid,
    pub location_id: Uuid,
    pub service_id: Uuid,
    pub start_date: NaiveDate,
    pub start_time: NaiveTime,
    pub duration_minutes: i64,
    pub buffer_before_minutes: i64,
    pub buffer_after_minutes: i64,
    pub sequence_number: Option<i64>,
    pub status: Option<AppointmentStatus>,
}

#[derive(Debug, Clone)]
pub struct NewBlackoutData {
    pub owner_id: Uuid,
    pub location_id: Option<Uuid>,
    pub barber_id: Option<Uuid>,
    pub date: NaiveDate,
    pub kind: BlackoutKind,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub allow_emergency_bookings: bool,
    pub reason: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewHolidayData {
    pub country_code: String,
    pub date: NaiveDate,
    pub name: Option<String>,
}

/// Parameters for one generation run against a pattern.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub pattern_id: Uuid,
    /// Upper bound on drafts for this run, further capped by the configured
    /// batch size.
    pub max_appointments: usize,
    /// When set, nothing is persisted; conflicts and skips are reported
    /// identically either way.
    pub preview_only: bool,
    /// Combined with the pattern's `reschedule_on_conflict` flag to decide
    /// whether the slot resolver runs for conflicted dates.
    pub auto_resolve_conflicts: bool,
}

/// Result of one generation run.
#[derive(Debug, Clone)]
pub struct GenerationOutcome {
    pub drafts: Vec<AppointmentInstance>,
    pub conflicts: Vec<ConflictRecord>,
    pub skipped_dates: Vec<NaiveDate>,
    pub total_generated: usize,
    pub total_conflicts: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManageAction {
    Reschedule,
    Cancel,
    Complete,
}

impl std::fmt::Display for ManageAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ManageAction::Reschedule => write!(f, "reschedule"),
            ManageAction::Cancel => write!(f, "cancel"),
            ManageAction::Complete => write!(f, "complete"),
        }
    }
}

#[derive(Error, Debug, PartialEq)]
#[error("Invalid manage action: {0}")]
pub struct ParseManageActionError(String);

impl FromStr for ManageAction {
    type Err = ParseManageActionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "reschedule" => Ok(ManageAction::Reschedule),
            "cancel" => Ok(ManageAction::Cancel),
            "complete" => Ok(ManageAction::Complete),
            _ => Err(ParseManageActionError(s.to_string())),
        }
    }
}

/// A bulk mutation against one appointment, optionally cascading to every
/// future active instance of its pattern.
#[derive(Debug, Clone)]
pub struct ManageRequest {
    pub appointment_id: Uuid,
    pub action: ManageAction,
    pub apply_to_series: bool,
    pub new_date: Option<NaiveDate>,
    pub new_time: Option<NaiveTime>,
    pub new_barber_id: Option<Uuid>,
}

/// Batched increments applied to a series' totals.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProgressDelta {
    pub completed: i64,
    pub cancelled: i64,
    pub rescheduled: i64,
}
