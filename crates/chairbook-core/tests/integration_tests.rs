use chairbook_core::config::SchedulerConfig;
use chairbook_core::db::establish_connection;
use chairbook_core::error::CoreError;
use chairbook_core::models::{
    AppointmentStatus, BlackoutKind, ConflictType, GenerationRequest, ManageAction, ManageRequest,
    NewAppointmentData, NewBlackoutData, NewHolidayData, NewPatternData, PatternType,
    ProgressDelta, RecurrencePattern, SeriesStatus,
};
use chairbook_core::repository::{
    AppointmentRepository, BlackoutRegistry, GenerationRepository, HolidayOracle,
    PatternRepository, SchedulingRepository, SeriesRepository, SqliteRepository,
};
use chrono::{NaiveDate, NaiveTime};
use tempfile::TempDir;
use uuid::Uuid;

/// Helper function to create a test database
async fn setup_test_db() -> (SqliteRepository, TempDir) {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
    let db_path = temp_dir.path().join("test.db");

    let pool = establish_connection(&db_path.to_string_lossy())
        .await
        .expect("Failed to establish test database connection");

    let repository = SqliteRepository::new(pool, SchedulerConfig::default());

    (repository, temp_dir)
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn time(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

/// Weekly Tuesday pattern starting 2030-01-01 (a Tuesday), far enough in the
/// future that generation always starts from the pattern's own start date.
fn weekly_pattern_data(owner_id: Uuid, barber_id: Uuid) -> NewPatternData {
    NewPatternData {
        owner_id,
        pattern_type: PatternType::Weekly,
        interval_value: 1,
        days_of_week: Some("tue".to_string()),
        day_of_month: None,
        week_of_month: None,
        weekday_of_month: None,
        start_date: date(2030, 1, 1),
        end_date: None,
        occurrences_limit: None,
        preferred_time: time(14, 0),
        duration_minutes: 30,
        barber_id,
        location_id: Uuid::now_v7(),
        service_id: Uuid::now_v7(),
        reschedule_on_conflict: false,
        excluded_dates: None,
    }
}

async fn create_weekly_pattern(
    repo: &SqliteRepository,
    owner_id: Uuid,
    barber_id: Uuid,
) -> RecurrencePattern {
    repo.create_pattern(weekly_pattern_data(owner_id, barber_id))
        .await
        .expect("Failed to create test pattern")
}

fn generation_request(pattern_id: Uuid, max: usize) -> GenerationRequest {
    GenerationRequest {
        pattern_id,
        max_appointments: max,
        preview_only: false,
        auto_resolve_conflicts: false,
    }
}

#[tokio::test]
async fn preview_reports_conflicts_without_persisting() {
    let (repo, _temp_dir) = setup_test_db().await;
    let owner_id = Uuid::now_v7();
    let pattern = create_weekly_pattern(&repo, owner_id, Uuid::now_v7()).await;

    repo.add_holiday(NewHolidayData {
        country_code: "US".to_string(),
        date: date(2030, 1, 8),
        name: Some("Test holiday".to_string()),
    })
    .await
    .unwrap();

    let outcome = repo
        .generate(
            owner_id,
            GenerationRequest {
                preview_only: true,
                ..generation_request(pattern.id, 3)
            },
        )
        .await
        .unwrap();

    assert_eq!(outcome.total_generated, 2);
    assert_eq!(outcome.total_conflicts, 1);
    assert_eq!(outcome.conflicts[0].conflict_type, ConflictType::Holiday);
    assert_eq!(outcome.skipped_dates, vec![date(2030, 1, 8)]);
    assert_eq!(
        outcome
            .drafts
            .iter()
            .map(|d| d.start_date)
            .collect::<Vec<_>>(),
        vec![date(2030, 1, 1), date(2030, 1, 15)]
    );

    // Nothing was written: no appointments, no watermark, no series.
    let stored = repo.find_appointments_for_pattern(pattern.id).await.unwrap();
    assert!(stored.is_empty());
    let reloaded = repo.find_pattern(pattern.id, owner_id).await.unwrap().unwrap();
    assert_eq!(reloaded.last_generated_date, None);
    assert_eq!(reloaded.total_generated, 0);
    assert!(repo.find_series_for_pattern(pattern.id).await.unwrap().is_none());
}

#[tokio::test]
async fn generate_persists_batch_watermark_and_series() {
    let (repo, _temp_dir) = setup_test_db().await;
    let owner_id = Uuid::now_v7();
    let pattern = create_weekly_pattern(&repo, owner_id, Uuid::now_v7()).await;

    let outcome = repo
        .generate(owner_id, generation_request(pattern.id, 2))
        .await
        .unwrap();
    assert_eq!(outcome.total_generated, 2);

    let stored = repo.find_appointments_for_pattern(pattern.id).await.unwrap();
    assert_eq!(stored.len(), 2);
    assert_eq!(stored[0].start_date, date(2030, 1, 1));
    assert_eq!(stored[0].start_time, time(14, 0));
    assert_eq!(stored[0].sequence_number, Some(1));
    assert_eq!(stored[0].status, AppointmentStatus::Pending);
    assert_eq!(stored[1].start_date, date(2030, 1, 8));
    assert_eq!(stored[1].sequence_number, Some(2));

    let reloaded = repo.find_pattern(pattern.id, owner_id).await.unwrap().unwrap();
    assert_eq!(reloaded.last_generated_date, Some(date(2030, 1, 8)));
    assert_eq!(reloaded.total_generated, 2);

    let series = repo
        .find_series_for_pattern(pattern.id)
        .await
        .unwrap()
        .expect("series should be created on first generation");
    assert_eq!(series.total_planned, 2);
    assert_eq!(series.status, SeriesStatus::Draft);

    // A second run resumes past the watermark instead of re-generating.
    let outcome = repo
        .generate(owner_id, generation_request(pattern.id, 2))
        .await
        .unwrap();
    assert_eq!(
        outcome
            .drafts
            .iter()
            .map(|d| d.start_date)
            .collect::<Vec<_>>(),
        vec![date(2030, 1, 15), date(2030, 1, 22)]
    );
    assert_eq!(outcome.drafts[0].sequence_number, Some(3));

    let series = repo.find_series_for_pattern(pattern.id).await.unwrap().unwrap();
    assert_eq!(series.total_planned, 4);
}

#[tokio::test]
async fn double_booking_is_detected_and_auto_resolved() {
    let (repo, _temp_dir) = setup_test_db().await;
    let owner_id = Uuid::now_v7();
    let barber_id = Uuid::now_v7();

    // Pre-existing walk-in at the preferred slot.
    repo.create_appointment(NewAppointmentData {
        pattern_id: None,
        owner_id,
        barber_id,
        location_id: Uuid::now_v7(),
        service_id: Uuid::now_v7(),
        start_date: date(2030, 1, 1),
        start_time: time(14, 0),
        duration_minutes: 30,
        buffer_before_minutes: 0,
        buffer_after_minutes: 0,
        sequence_number: None,
        status: Some(AppointmentStatus::Confirmed),
    })
    .await
    .unwrap();

    let pattern = repo
        .create_pattern(NewPatternData {
            reschedule_on_conflict: true,
            ..weekly_pattern_data(owner_id, barber_id)
        })
        .await
        .unwrap();

    let outcome = repo
        .generate(
            owner_id,
            GenerationRequest {
                auto_resolve_conflicts: true,
                ..generation_request(pattern.id, 1)
            },
        )
        .await
        .unwrap();

    assert_eq!(outcome.total_conflicts, 1);
    assert_eq!(
        outcome.conflicts[0].conflict_type,
        ConflictType::DoubleBooking
    );
    assert!(outcome.skipped_dates.is_empty());
    // The nearest earlier offset is free.
    assert_eq!(outcome.drafts.len(), 1);
    assert_eq!(outcome.drafts[0].start_date, date(2030, 1, 1));
    assert_eq!(outcome.drafts[0].start_time, time(13, 30));
}

#[tokio::test]
async fn conflicted_date_is_skipped_but_consumed_without_auto_resolve() {
    let (repo, _temp_dir) = setup_test_db().await;
    let owner_id = Uuid::now_v7();
    let barber_id = Uuid::now_v7();

    repo.add_blackout(NewBlackoutData {
        owner_id,
        location_id: None,
        barber_id: None,
        date: date(2030, 1, 1),
        kind: BlackoutKind::WholeDay,
        start_time: None,
        end_time: None,
        allow_emergency_bookings: false,
        reason: Some("Renovation".to_string()),
    })
    .await
    .unwrap();

    let pattern = create_weekly_pattern(&repo, owner_id, barber_id).await;

    let outcome = repo
        .generate(owner_id, generation_request(pattern.id, 1))
        .await
        .unwrap();
    assert_eq!(outcome.total_generated, 0);
    assert_eq!(outcome.skipped_dates, vec![date(2030, 1, 1)]);

    // The skipped date still advances the watermark and consumes its
    // ordinal so the next run moves on.
    let reloaded = repo.find_pattern(pattern.id, owner_id).await.unwrap().unwrap();
    assert_eq!(reloaded.last_generated_date, Some(date(2030, 1, 1)));
    assert_eq!(reloaded.total_generated, 1);

    let outcome = repo
        .generate(owner_id, generation_request(pattern.id, 1))
        .await
        .unwrap();
    assert_eq!(outcome.drafts[0].start_date, date(2030, 1, 8));
}

#[tokio::test]
async fn partial_blackout_resolves_to_a_clear_slot() {
    let (repo, _temp_dir) = setup_test_db().await;
    let owner_id = Uuid::now_v7();
    let barber_id = Uuid::now_v7();

    repo.add_blackout(NewBlackoutData {
        owner_id,
        location_id: None,
        barber_id: None,
        date: date(2030, 1, 1),
        kind: BlackoutKind::PartialDay,
        start_time: Some(time(13, 45)),
        end_time: Some(time(14, 15)),
        allow_emergency_bookings: false,
        reason: None,
    })
    .await
    .unwrap();

    let pattern = repo
        .create_pattern(NewPatternData {
            reschedule_on_conflict: true,
            ..weekly_pattern_data(owner_id, barber_id)
        })
        .await
        .unwrap();

    let outcome = repo
        .generate(
            owner_id,
            GenerationRequest {
                auto_resolve_conflicts: true,
                ..generation_request(pattern.id, 1)
            },
        )
        .await
        .unwrap();

    assert_eq!(outcome.conflicts[0].conflict_type, ConflictType::BlackoutDate);
    assert_eq!(outcome.drafts.len(), 1);
    assert_eq!(outcome.drafts[0].start_time, time(13, 30));
}

#[tokio::test]
async fn sequence_numbers_preserve_skipped_ordinals() {
    let (repo, _temp_dir) = setup_test_db().await;
    let owner_id = Uuid::now_v7();
    let pattern = create_weekly_pattern(&repo, owner_id, Uuid::now_v7()).await;

    repo.add_holiday(NewHolidayData {
        country_code: "US".to_string(),
        date: date(2030, 1, 8),
        name: None,
    })
    .await
    .unwrap();

    let outcome = repo
        .generate(owner_id, generation_request(pattern.id, 3))
        .await
        .unwrap();

    assert_eq!(
        outcome
            .drafts
            .iter()
            .map(|d| d.sequence_number)
            .collect::<Vec<_>>(),
        vec![Some(1), Some(3)]
    );
}

#[tokio::test]
async fn sequence_numbers_stay_unique_across_runs() {
    let (repo, _temp_dir) = setup_test_db().await;
    let owner_id = Uuid::now_v7();
    let pattern = create_weekly_pattern(&repo, owner_id, Uuid::now_v7()).await;

    // The second occurrence (2030-01-08) is skipped for a holiday; its
    // ordinal must stay consumed when the next run picks up.
    repo.add_holiday(NewHolidayData {
        country_code: "US".to_string(),
        date: date(2030, 1, 8),
        name: None,
    })
    .await
    .unwrap();

    repo.generate(owner_id, generation_request(pattern.id, 3))
        .await
        .unwrap();
    repo.generate(owner_id, generation_request(pattern.id, 2))
        .await
        .unwrap();

    let stored = repo.find_appointments_for_pattern(pattern.id).await.unwrap();
    let sequence_numbers: Vec<i64> = stored
        .iter()
        .map(|a| a.sequence_number.expect("generated instances are numbered"))
        .collect();
    assert_eq!(sequence_numbers, vec![1, 3, 4, 5]);
    for pair in sequence_numbers.windows(2) {
        assert!(pair[0] < pair[1]);
    }
}

#[tokio::test]
async fn generate_rejects_unknown_and_deactivated_patterns() {
    let (repo, _temp_dir) = setup_test_db().await;
    let owner_id = Uuid::now_v7();

    let result = repo
        .generate(owner_id, generation_request(Uuid::now_v7(), 1))
        .await;
    assert!(matches!(result, Err(CoreError::NotFound(_))));

    let pattern = create_weekly_pattern(&repo, owner_id, Uuid::now_v7()).await;
    repo.deactivate_pattern(pattern.id, owner_id).await.unwrap();

    let result = repo
        .generate(owner_id, generation_request(pattern.id, 1))
        .await;
    assert!(matches!(result, Err(CoreError::Validation(_))));
}

#[tokio::test]
async fn preview_occurrences_lists_upcoming_dates() {
    let (repo, _temp_dir) = setup_test_db().await;
    let owner_id = Uuid::now_v7();
    let pattern = create_weekly_pattern(&repo, owner_id, Uuid::now_v7()).await;

    let sequence = repo
        .preview_occurrences(pattern.id, owner_id, 3)
        .await
        .unwrap();
    assert_eq!(
        sequence.dates,
        vec![date(2030, 1, 1), date(2030, 1, 8), date(2030, 1, 15)]
    );
    assert!(!sequence.truncated);

    let result = repo.preview_occurrences(Uuid::now_v7(), owner_id, 3).await;
    assert!(matches!(result, Err(CoreError::NotFound(_))));
}

#[tokio::test]
async fn detect_conflicts_excludes_the_appointment_being_moved() {
    let (repo, _temp_dir) = setup_test_db().await;
    let owner_id = Uuid::now_v7();
    let barber_id = Uuid::now_v7();

    let appointment = repo
        .create_appointment(NewAppointmentData {
            pattern_id: None,
            owner_id,
            barber_id,
            location_id: Uuid::now_v7(),
            service_id: Uuid::now_v7(),
            start_date: date(2030, 1, 1),
            start_time: time(14, 0),
            duration_minutes: 30,
            buffer_before_minutes: 0,
            buffer_after_minutes: 0,
            sequence_number: None,
            status: None,
        })
        .await
        .unwrap();

    let conflicts = repo
        .detect_conflicts(
            date(2030, 1, 1),
            time(14, 0),
            30,
            barber_id,
            appointment.location_id,
            None,
        )
        .await
        .unwrap();
    assert_eq!(conflicts.len(), 1);

    let conflicts = repo
        .detect_conflicts(
            date(2030, 1, 1),
            time(14, 0),
            30,
            barber_id,
            appointment.location_id,
            Some(appointment.id),
        )
        .await
        .unwrap();
    assert!(conflicts.is_empty());
}

#[tokio::test]
async fn manage_reschedule_validates_and_records_original_date() {
    let (repo, _temp_dir) = setup_test_db().await;
    let owner_id = Uuid::now_v7();
    let pattern = create_weekly_pattern(&repo, owner_id, Uuid::now_v7()).await;
    repo.generate(owner_id, generation_request(pattern.id, 2))
        .await
        .unwrap();
    let stored = repo.find_appointments_for_pattern(pattern.id).await.unwrap();
    let first = stored[0].clone();

    // Reschedule without a target slot is rejected up front.
    let result = repo
        .manage(
            owner_id,
            ManageRequest {
                appointment_id: first.id,
                action: ManageAction::Reschedule,
                apply_to_series: false,
                new_date: Some(date(2030, 1, 2)),
                new_time: None,
                new_barber_id: None,
            },
        )
        .await;
    assert!(matches!(result, Err(CoreError::Validation(_))));

    let affected = repo
        .manage(
            owner_id,
            ManageRequest {
                appointment_id: first.id,
                action: ManageAction::Reschedule,
                apply_to_series: false,
                new_date: Some(date(2030, 1, 2)),
                new_time: Some(time(10, 0)),
                new_barber_id: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(affected.len(), 1);
    assert_eq!(affected[0].start_date, date(2030, 1, 2));
    assert_eq!(affected[0].start_time, time(10, 0));
    assert_eq!(affected[0].original_scheduled_date, Some(date(2030, 1, 1)));

    // A second move keeps the earliest original date.
    let affected = repo
        .manage(
            owner_id,
            ManageRequest {
                appointment_id: first.id,
                action: ManageAction::Reschedule,
                apply_to_series: false,
                new_date: Some(date(2030, 1, 3)),
                new_time: Some(time(11, 0)),
                new_barber_id: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(affected[0].start_date, date(2030, 1, 3));
    assert_eq!(affected[0].original_scheduled_date, Some(date(2030, 1, 1)));

    let series = repo.find_series_for_pattern(pattern.id).await.unwrap().unwrap();
    assert_eq!(series.total_rescheduled, 2);
    assert_eq!(series.status, SeriesStatus::InProgress);
}

#[tokio::test]
async fn manage_cancel_applies_to_future_instances_only() {
    let (repo, _temp_dir) = setup_test_db().await;
    let owner_id = Uuid::now_v7();
    let pattern = create_weekly_pattern(&repo, owner_id, Uuid::now_v7()).await;
    repo.generate(owner_id, generation_request(pattern.id, 3))
        .await
        .unwrap();
    let stored = repo.find_appointments_for_pattern(pattern.id).await.unwrap();

    let affected = repo
        .manage(
            owner_id,
            ManageRequest {
                appointment_id: stored[1].id,
                action: ManageAction::Cancel,
                apply_to_series: true,
                new_date: None,
                new_time: None,
                new_barber_id: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(affected.len(), 2);
    assert!(affected
        .iter()
        .all(|a| a.status == AppointmentStatus::Cancelled));

    let stored = repo.find_appointments_for_pattern(pattern.id).await.unwrap();
    assert_eq!(stored[0].status, AppointmentStatus::Pending);
    assert_eq!(stored[1].status, AppointmentStatus::Cancelled);
    assert_eq!(stored[2].status, AppointmentStatus::Cancelled);

    let series = repo.find_series_for_pattern(pattern.id).await.unwrap().unwrap();
    assert_eq!(series.total_cancelled, 2);
    assert_eq!(series.status, SeriesStatus::InProgress);
}

#[tokio::test]
async fn manage_unknown_appointment_is_not_found() {
    let (repo, _temp_dir) = setup_test_db().await;

    let result = repo
        .manage(
            Uuid::now_v7(),
            ManageRequest {
                appointment_id: Uuid::now_v7(),
                action: ManageAction::Cancel,
                apply_to_series: false,
                new_date: None,
                new_time: None,
                new_barber_id: None,
            },
        )
        .await;
    assert!(matches!(result, Err(CoreError::NotFound(_))));
}

#[tokio::test]
async fn completing_every_instance_finishes_the_series_for_good() {
    let (repo, _temp_dir) = setup_test_db().await;
    let owner_id = Uuid::now_v7();
    let pattern = create_weekly_pattern(&repo, owner_id, Uuid::now_v7()).await;
    repo.generate(owner_id, generation_request(pattern.id, 2))
        .await
        .unwrap();
    let stored = repo.find_appointments_for_pattern(pattern.id).await.unwrap();

    repo.manage(
        owner_id,
        ManageRequest {
            appointment_id: stored[0].id,
            action: ManageAction::Complete,
            apply_to_series: true,
            new_date: None,
            new_time: None,
            new_barber_id: None,
        },
    )
    .await
    .unwrap();

    let series = repo.find_series_for_pattern(pattern.id).await.unwrap().unwrap();
    assert_eq!(series.total_completed, 2);
    assert_eq!(series.completion_percentage, 100.0);
    assert_eq!(series.status, SeriesStatus::Completed);
    let completed_at = series.completed_at.expect("completed_at should be set");

    // Completion is terminal: further progress never reopens the series.
    let series = repo
        .update_progress(
            series.id,
            ProgressDelta {
                cancelled: 1,
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(series.status, SeriesStatus::Completed);
    assert_eq!(series.completed_at, Some(completed_at));
}

#[tokio::test]
async fn blackout_lookup_respects_barber_and_location_scope() {
    let (repo, _temp_dir) = setup_test_db().await;
    let owner_id = Uuid::now_v7();
    let scoped_barber = Uuid::now_v7();
    let other_barber = Uuid::now_v7();

    repo.add_blackout(NewBlackoutData {
        owner_id,
        location_id: None,
        barber_id: Some(scoped_barber),
        date: date(2030, 1, 1),
        kind: BlackoutKind::WholeDay,
        start_time: None,
        end_time: None,
        allow_emergency_bookings: false,
        reason: Some("Vacation".to_string()),
    })
    .await
    .unwrap();

    let blocked = repo
        .is_blocked(date(2030, 1, 1), Some(time(14, 0)), None, Some(scoped_barber))
        .await
        .unwrap();
    assert!(blocked.is_some());

    let blocked = repo
        .is_blocked(date(2030, 1, 1), Some(time(14, 0)), None, Some(other_barber))
        .await
        .unwrap();
    assert!(blocked.is_none());

    assert!(!repo.is_holiday(date(2030, 1, 1), "US").await.unwrap());
}
