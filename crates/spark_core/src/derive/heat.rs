//! Completion heat map, streak and flame summary.
//!
//! # Responsibility
//! - Bucket completions by local calendar day.
//! - Produce zero-filled day windows and week columns for calendar display.
//! - Derive the "today" flame intensity and streak.
//!
//! # Invariants
//! - Day buckets truncate to local midnight in the caller-supplied timezone.
//! - "Today" is recomputed from the supplied instant on every call.
//! - Archived completions still count; archiving only hides tasks from the flow.

use crate::model::task::TaskNode;
use chrono::{DateTime, Days, Local, NaiveDate, TimeZone};
use std::collections::BTreeMap;

/// Completions above this count all render at full intensity.
pub const MAX_FLAME_INTENSITY: u8 = 5;

const DAYS_PER_WEEK: usize = 7;

/// Completion count for one local calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayBucket {
    pub day: NaiveDate,
    pub count: usize,
}

/// Message tier shown under the flame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowPhase {
    /// Nothing completed yet today.
    Idle,
    /// One or two completions.
    Warmup,
    /// Three or four completions.
    Optimal,
    /// Five or more completions.
    Overclocking,
}

impl FlowPhase {
    pub fn from_count(count: usize) -> Self {
        match count {
            0 => Self::Idle,
            1..=2 => Self::Warmup,
            3..=4 => Self::Optimal,
            _ => Self::Overclocking,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Warmup => "warmup",
            Self::Optimal => "optimal_flow",
            Self::Overclocking => "overclocking",
        }
    }
}

/// Everything the flame view shows for one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlameSummary {
    pub completed_today: usize,
    /// `min(completed_today, MAX_FLAME_INTENSITY)`.
    pub intensity: u8,
    pub phase: FlowPhase,
    pub streak_days: u32,
}

/// Local calendar day containing `timestamp_ms`.
pub fn day_bucket<Tz: TimeZone>(timestamp_ms: i64, tz: &Tz) -> Option<NaiveDate> {
    tz.timestamp_millis_opt(timestamp_ms)
        .single()
        .map(|local| local.date_naive())
}

/// Completed tasks per local day. Days without completions are absent.
pub fn daily_completions<Tz: TimeZone>(
    tasks: &[TaskNode],
    tz: &Tz,
) -> BTreeMap<NaiveDate, usize> {
    let mut buckets = BTreeMap::new();
    for task in tasks.iter().filter(|task| task.is_completed()) {
        let Some(day) = task
            .completed_at
            .and_then(|completed_at| day_bucket(completed_at, tz))
        else {
            continue;
        };
        *buckets.entry(day).or_insert(0) += 1;
    }
    buckets
}

/// `days` consecutive buckets ending at `end_day`, oldest first, zero-filled.
pub fn heat_window<Tz: TimeZone>(
    tasks: &[TaskNode],
    end_day: NaiveDate,
    days: u32,
    tz: &Tz,
) -> Vec<DayBucket> {
    let counts = daily_completions(tasks, tz);
    (0..days)
        .rev()
        .filter_map(|offset| end_day.checked_sub_days(Days::new(u64::from(offset))))
        .map(|day| DayBucket {
            day,
            count: counts.get(&day).copied().unwrap_or(0),
        })
        .collect()
}

/// Groups a window into calendar columns of seven consecutive days.
///
/// The last column is short when the window length is not a multiple of 7.
pub fn week_columns(buckets: &[DayBucket]) -> Vec<Vec<DayBucket>> {
    buckets
        .chunks(DAYS_PER_WEEK)
        .map(<[DayBucket]>::to_vec)
        .collect()
}

/// Completions whose local day equals the local day of `now`.
pub fn completed_today<Tz: TimeZone>(tasks: &[TaskNode], now: &DateTime<Tz>) -> usize {
    let today = now.date_naive();
    let tz = now.timezone();
    tasks
        .iter()
        .filter(|task| task.is_completed())
        .filter_map(|task| task.completed_at)
        .filter(|completed_at| day_bucket(*completed_at, &tz) == Some(today))
        .count()
}

/// Consecutive days with at least one completion, ending at `today`.
///
/// An empty `today` does not break the streak yet: counting then starts from
/// the day before.
pub fn current_streak<Tz: TimeZone>(tasks: &[TaskNode], today: NaiveDate, tz: &Tz) -> u32 {
    let counts = daily_completions(tasks, tz);
    let mut cursor = if counts.contains_key(&today) {
        Some(today)
    } else {
        today.checked_sub_days(Days::new(1))
    };

    let mut streak = 0;
    while let Some(day) = cursor {
        if !counts.contains_key(&day) {
            break;
        }
        streak += 1;
        cursor = day.checked_sub_days(Days::new(1));
    }
    streak
}

pub fn flame_intensity(completed_today: usize) -> u8 {
    u8::try_from(completed_today)
        .unwrap_or(u8::MAX)
        .min(MAX_FLAME_INTENSITY)
}

/// Flame view summary at `now`.
pub fn flame_summary<Tz: TimeZone>(tasks: &[TaskNode], now: &DateTime<Tz>) -> FlameSummary {
    let completed = completed_today(tasks, now);
    FlameSummary {
        completed_today: completed,
        intensity: flame_intensity(completed),
        phase: FlowPhase::from_count(completed),
        streak_days: current_streak(tasks, now.date_naive(), &now.timezone()),
    }
}

/// [`flame_summary`] at the current local time.
pub fn flame_summary_now(tasks: &[TaskNode]) -> FlameSummary {
    flame_summary(tasks, &Local::now())
}
