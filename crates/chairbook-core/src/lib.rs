//! # Chairbook Core Library
//!
//! The scheduling engine behind recurring barbershop appointments: recurrence
//! patterns, occurrence calculation, conflict detection, same-day slot
//! resolution, and series lifecycle tracking.
//!
//! ## Features
//!
//! - **Recurrence Patterns**: daily, weekly, biweekly, and monthly rules
//!   (by day-of-month or nth-weekday) with exclusions, end dates, and
//!   occurrence caps
//! - **Conflict Detection**: double-booking, blackout date, and public
//!   holiday checks that report conflicts as data rather than failures
//! - **Slot Resolution**: deterministic same-day rescheduling within
//!   business hours for conflicted occurrences
//! - **Series Tracking**: per-pattern progress rollups with a terminal
//!   completion state
//! - **Preview Mode**: full generation dry-runs that leave the store
//!   untouched
//!
//! ## Core Modules
//!
//! - [`db`]: Database connection and migration management
//! - [`models`]: Core data structures and transfer objects
//! - [`repository`]: Data access layer with Repository pattern
//! - [`occurrence`]: Pattern-to-dates occurrence calculation
//! - [`conflict`]: Pure conflict predicates and record builders
//! - [`resolver`]: Same-day alternative slot candidates
//! - [`config`]: Business-hours and lookup-policy configuration
//! - [`error`]: Error types shared across the crate
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use chairbook_core::{
//!     config::SchedulerConfig,
//!     db,
//!     models::{GenerationRequest, NewPatternData, PatternType},
//!     repository::{GenerationRepository, PatternRepository, SqliteRepository},
//! };
//! use chrono::{NaiveDate, NaiveTime};
//! use uuid::Uuid;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     // Initialize database
//!     let pool = db::establish_connection("chairbook.db").await?;
//!     let repo = SqliteRepository::new(pool, SchedulerConfig::default());
//!
//!     let owner_id = Uuid::now_v7();
//!     let pattern = repo
//!         .create_pattern(NewPatternData {
//!             owner_id,
//!             pattern_type: PatternType::Weekly,
//!             interval_value: 1,
//!             days_of_week: Some("tue,thu".to_string()),
//!             day_of_month: None,
//!             week_of_month: None,
//!             weekday_of_month: None,
//!             start_date: NaiveDate::from_ymd_opt(2026, 9, 1).unwrap(),
//!             end_date: None,
//!             occurrences_limit: Some(12),
//!             preferred_time: NaiveTime::from_hms_opt(14, 0, 0).unwrap(),
//!             duration_minutes: 30,
//!             barber_id: Uuid::now_v7(),
//!             location_id: Uuid::now_v7(),
//!             service_id: Uuid::now_v7(),
//!             reschedule_on_conflict: true,
//!             excluded_dates: None,
//!         })
//!         .await?;
//!
//!     // Preview the next batch without persisting anything.
//!     let outcome = repo
//!         .generate(
//!             owner_id,
//!             GenerationRequest {
//!                 pattern_id: pattern.id,
//!                 max_appointments: 10,
//!                 preview_only: true,
//!                 auto_resolve_conflicts: true,
//!             },
//!         )
//!         .await?;
//!     println!("{} draft(s), {} conflict(s)", outcome.total_generated, outcome.total_conflicts);
//!
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod conflict;
pub mod db;
pub mod error;
pub mod models;
pub mod occurrence;
pub mod repository;
pub mod resolver;
