use chrono::{Duration, FixedOffset, NaiveDate, TimeZone, Utc};
use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;
use gym_tracker::models::stats::{compute_stats, group_by_weekday, workout_streak};
use gym_tracker::models::{Workout, WorkoutExercise, WorkoutSet};

const CATEGORIES: [&str; 6] = ["Chest", "Back", "Legs", "Shoulders", "Arms", "Core"];

/// Roughly three years of near-daily training.
fn history(days: i64) -> Vec<Workout> {
    let start = Utc.with_ymd_and_hms(2023, 1, 1, 7, 30, 0).unwrap();

    (0..days)
        .filter(|day| day % 7 != 6)
        .map(|day| {
            let category = CATEGORIES[(day as usize) % CATEGORIES.len()];
            Workout {
                id: format!("w{day}"),
                user_id: "bench-user".to_string(),
                name: format!("{category} day"),
                date: start + Duration::days(day),
                category: category.to_string(),
                categories: vec![category.to_string()],
                exercises: (0..5)
                    .map(|i| WorkoutExercise {
                        name: format!("Exercise {i}"),
                        sets: vec![WorkoutSet { reps: 10, weight: 40.0 + i as f64 * 5.0 }; 4],
                    })
                    .collect(),
                total_sets: 20,
                duration: 60,
                notes: None,
                completed: true,
                completed_at: None,
                image_url: None,
                created_at: None,
                updated_at: None,
            }
        })
        .collect()
}

fn benchmark_stats(c: &mut Criterion) {
    let workouts = history(1100);
    let offset = FixedOffset::east_opt(-7 * 3600).unwrap();
    let today = NaiveDate::from_ymd_opt(2026, 1, 5).unwrap();

    let mut group = c.benchmark_group("workout_stats");

    group.bench_function("compute_stats", |b| {
        b.iter(|| compute_stats(black_box(&workouts), today, offset))
    });

    group.bench_function("streak", |b| {
        b.iter(|| workout_streak(black_box(&workouts), today, offset))
    });

    group.bench_function("group_by_weekday", |b| {
        b.iter(|| group_by_weekday(black_box(&workouts), offset))
    });

    group.finish();
}

criterion_group!(benches, benchmark_stats);
criterion_main!(benches);
