use chairbook_core::models::{PatternType, RecurrencePattern};
use chairbook_core::occurrence;
use chrono::{NaiveDate, NaiveTime, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use uuid::Uuid;

fn base_pattern() -> RecurrencePattern {
    RecurrencePattern {
        id: Uuid::now_v7(),
        owner_id: Uuid::now_v7(),
        pattern_type: PatternType::Weekly,
        interval_value: 1,
        days_of_week: Some("mon,wed,fri".to_string()),
        day_of_month: None,
        week_of_month: None,
        weekday_of_month: None,
        start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        end_date: None,
        occurrences_limit: None,
        preferred_time: NaiveTime::from_hms_opt(14, 0, 0).unwrap(),
        duration_minutes: 30,
        barber_id: Uuid::now_v7(),
        location_id: Uuid::now_v7(),
        service_id: Uuid::now_v7(),
        reschedule_on_conflict: true,
        excluded_dates: None,
        active: true,
        last_generated_date: None,
        total_generated: 0,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

fn bench_weekly_occurrences(c: &mut Criterion) {
    let pattern = base_pattern();
    let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();

    let mut group = c.benchmark_group("weekly_occurrences");
    for limit in [10usize, 50, 200] {
        group.bench_with_input(BenchmarkId::from_parameter(limit), &limit, |b, &limit| {
            b.iter(|| {
                occurrence::occurrences(black_box(&pattern), black_box(limit), Some(start))
                    .unwrap()
            })
        });
    }
    group.finish();
}

fn bench_monthly_nth_weekday_occurrences(c: &mut Criterion) {
    let pattern = RecurrencePattern {
        pattern_type: PatternType::Monthly,
        days_of_week: None,
        week_of_month: Some(2),
        weekday_of_month: Some("mon".to_string()),
        ..base_pattern()
    };
    let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();

    c.bench_function("monthly_nth_weekday_occurrences_24", |b| {
        b.iter(|| occurrence::occurrences(black_box(&pattern), black_box(24), Some(start)).unwrap())
    });
}

fn bench_occurrences_with_exclusions(c: &mut Criterion) {
    let pattern = RecurrencePattern {
        excluded_dates: Some(
            "2024-01-03,2024-01-10,2024-02-07,2024-03-06,2024-04-03".to_string(),
        ),
        ..base_pattern()
    };
    let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();

    c.bench_function("weekly_occurrences_with_exclusions_50", |b| {
        b.iter(|| occurrence::occurrences(black_box(&pattern), black_box(50), Some(start)).unwrap())
    });
}

criterion_group!(
    benches,
    bench_weekly_occurrences,
    bench_monthly_nth_weekday_occurrences,
    bench_occurrences_with_exclusions
);
criterion_main!(benches);
