// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Workout aggregation for the dashboard, calendar and stats views.
//!
//! Everything here is pure: callers pass the user's workouts, "today" and the
//! client's UTC offset, so results are deterministic and cheap to test.

use chrono::{Datelike, Duration, FixedOffset, NaiveDate, Weekday};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::models::Workout;
use crate::time_utils::local_date;

/// Weekdays in display order (Monday first).
pub const WEEK: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

/// Totals over a set of workouts.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PeriodTotals {
    pub workouts: u32,
    pub exercises: u32,
    pub sets: u32,
    pub minutes: u32,
    /// Sum of reps × weight (kg)
    pub volume: f64,
}

impl PeriodTotals {
    pub fn add(&mut self, workout: &Workout) {
        let exercises = u32::try_from(workout.exercises.len()).unwrap_or(u32::MAX);
        self.workouts = self.workouts.saturating_add(1);
        self.exercises = self.exercises.saturating_add(exercises);
        self.sets = self.sets.saturating_add(workout.total_sets);
        self.minutes = self.minutes.saturating_add(workout.duration);
        self.volume += workout.volume();
    }

    pub fn hours(&self) -> f64 {
        f64::from(self.minutes) / 60.0
    }
}

/// Aggregate for the stats view.
#[derive(Debug, Clone, Serialize)]
pub struct WorkoutStats {
    pub all_time: PeriodTotals,
    pub this_month: PeriodTotals,
    pub last_month: PeriodTotals,
    /// Workouts this month minus workouts last month
    pub month_over_month: i64,
    pub popular_category: Option<String>,
    pub popular_category_count: u32,
    pub category_counts: BTreeMap<String, u32>,
    /// Workout count per month ("YYYY-MM")
    pub workouts_by_month: BTreeMap<String, u32>,
    pub streak: u32,
}

/// Count consecutive training days ending today or yesterday.
///
/// Dates after `today` are ignored. Returns 0 when the most recent workout is
/// older than yesterday.
pub fn streak(dates: &[NaiveDate], today: NaiveDate) -> u32 {
    let mut days: Vec<NaiveDate> = dates.iter().copied().filter(|d| *d <= today).collect();
    days.sort_unstable_by(|a, b| b.cmp(a));
    days.dedup();

    let Some(&latest) = days.first() else {
        return 0;
    };

    if latest != today && latest != today - Duration::days(1) {
        return 0;
    }

    let mut count = 1;
    for pair in days.windows(2) {
        if pair[0] - pair[1] == Duration::days(1) {
            count += 1;
        } else {
            break;
        }
    }
    count
}

/// Streak computed from workouts at the given offset.
pub fn workout_streak(workouts: &[Workout], today: NaiveDate, offset: FixedOffset) -> u32 {
    let dates: Vec<NaiveDate> = workouts.iter().map(|w| local_date(w.date, offset)).collect();
    streak(&dates, today)
}

/// Monday-based dates of the week containing `today`.
pub fn week_dates(today: NaiveDate) -> [NaiveDate; 7] {
    let monday = today - Duration::days(i64::from(today.weekday().num_days_from_monday()));
    std::array::from_fn(|i| monday + Duration::days(i as i64))
}

/// Bucket workouts by local weekday, Monday first.
pub fn group_by_weekday(workouts: &[Workout], offset: FixedOffset) -> [Vec<&Workout>; 7] {
    let mut buckets: [Vec<&Workout>; 7] = Default::default();
    for workout in workouts {
        let day = local_date(workout.date, offset).weekday();
        buckets[day.num_days_from_monday() as usize].push(workout);
    }
    buckets
}

/// Group workouts by local calendar date.
pub fn group_by_date(workouts: &[Workout], offset: FixedOffset) -> BTreeMap<NaiveDate, Vec<&Workout>> {
    let mut grouped: BTreeMap<NaiveDate, Vec<&Workout>> = BTreeMap::new();
    for workout in workouts {
        grouped
            .entry(local_date(workout.date, offset))
            .or_default()
            .push(workout);
    }
    grouped
}

/// Count workouts per individual category.
pub fn category_counts<'a, I>(workouts: I) -> BTreeMap<String, u32>
where
    I: IntoIterator<Item = &'a Workout>,
{
    let mut counts = BTreeMap::new();
    for workout in workouts {
        for category in workout.category_list() {
            *counts.entry(category).or_insert(0) += 1;
        }
    }
    counts
}

/// Most frequent category; ties resolve to the alphabetically first.
pub fn most_frequent_category(counts: &BTreeMap<String, u32>) -> Option<(String, u32)> {
    // BTreeMap iterates alphabetically, so the first maximum wins.
    counts
        .iter()
        .fold(None, |best: Option<(&String, u32)>, (name, &count)| match best {
            Some((_, best_count)) if best_count >= count => best,
            _ => Some((name, count)),
        })
        .map(|(name, count)| (name.clone(), count))
}

/// "YYYY-MM" key for a date.
pub fn month_key(date: NaiveDate) -> String {
    format!("{:04}-{:02}", date.year(), date.month())
}

/// Year and month preceding the given one.
pub fn previous_month(year: i32, month: u32) -> (i32, u32) {
    if month == 1 {
        (year - 1, 12)
    } else {
        (year, month - 1)
    }
}

/// Compute the stats view for a user's workouts.
pub fn compute_stats(workouts: &[Workout], today: NaiveDate, offset: FixedOffset) -> WorkoutStats {
    let current = (today.year(), today.month());
    let previous = previous_month(today.year(), today.month());

    let mut all_time = PeriodTotals::default();
    let mut this_month = PeriodTotals::default();
    let mut last_month = PeriodTotals::default();
    let mut workouts_by_month = BTreeMap::new();

    for workout in workouts {
        let date = local_date(workout.date, offset);
        all_time.add(workout);

        let ym = (date.year(), date.month());
        if ym == current {
            this_month.add(workout);
        } else if ym == previous {
            last_month.add(workout);
        }

        *workouts_by_month.entry(month_key(date)).or_insert(0) += 1;
    }

    let counts = category_counts(workouts);
    let popular = most_frequent_category(&counts);

    WorkoutStats {
        month_over_month: i64::from(this_month.workouts) - i64::from(last_month.workouts),
        all_time,
        this_month,
        last_month,
        popular_category_count: popular.as_ref().map(|(_, c)| *c).unwrap_or(0),
        popular_category: popular.map(|(name, _)| name),
        category_counts: counts,
        workouts_by_month,
        streak: workout_streak(workouts, today, offset),
    }
}
