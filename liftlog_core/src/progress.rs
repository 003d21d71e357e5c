//! Progress analytics for a single exercise.
//!
//! Turns the raw sets of every session that recorded an exercise into:
//! - a per-session history (max weight, volume, estimated 1RM), oldest first
//! - summary statistics (current and all-time bests, trend percentages)
//!
//! Trend percentages compare the average of the three most recent sessions
//! against the average of the three oldest ones. With fewer than six sessions
//! the two windows overlap, and with three or fewer they are identical.

use crate::estimate::{estimate_one_rm, round1};
use crate::store::WorkoutStore;
use crate::{require_user, ExerciseRecord, Result, SessionRecord, SetRecord, UserId};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Number of sessions in the recent and baseline trend windows
pub const TREND_WINDOW: usize = 3;

/// Performance of one exercise within one session
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct HistoryEntry {
    pub date: NaiveDate,
    /// Ordered by set number
    pub sets: Vec<SetRecord>,
    pub max_weight: Option<f64>,
    pub total_volume: f64,
    pub estimated_one_rm: Option<f64>,
}

/// Summary statistics over all relevant sessions
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Default)]
pub struct ProgressSummary {
    pub total_sessions: usize,
    pub current_max_weight: Option<f64>,
    pub all_time_max_weight: Option<f64>,
    pub current_estimated_one_rm: Option<f64>,
    pub all_time_max_one_rm: Option<f64>,
    pub weight_progress_percent: Option<f64>,
    pub volume_progress_percent: Option<f64>,
}

/// History and summary for one exercise
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ExerciseProgress {
    pub exercise: ExerciseRecord,
    /// Oldest first
    pub history: Vec<HistoryEntry>,
    pub summary: ProgressSummary,
}

/// Result of a progress query
///
/// `NotFound` covers both a missing exercise and one owned by another user.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ProgressOutcome {
    NotFound,
    /// The exercise exists but no session recorded a set for it
    Empty(ExerciseProgress),
    Populated(ExerciseProgress),
}

impl ProgressOutcome {
    pub fn progress(&self) -> Option<&ExerciseProgress> {
        match self {
            ProgressOutcome::NotFound => None,
            ProgressOutcome::Empty(p) | ProgressOutcome::Populated(p) => Some(p),
        }
    }

    pub fn into_progress(self) -> Option<ExerciseProgress> {
        match self {
            ProgressOutcome::NotFound => None,
            ProgressOutcome::Empty(p) | ProgressOutcome::Populated(p) => Some(p),
        }
    }

    pub fn summary(&self) -> Option<&ProgressSummary> {
        self.progress().map(|p| &p.summary)
    }
}

#[derive(Default)]
struct SetTotals {
    max_weight: Option<f64>,
    volume: f64,
    best_one_rm: Option<f64>,
}

fn max_opt(current: Option<f64>, candidate: f64) -> Option<f64> {
    Some(current.map_or(candidate, |c| c.max(candidate)))
}

/// Build the history entry for one session's sets
pub fn history_entry(date: NaiveDate, sets: &[SetRecord]) -> HistoryEntry {
    let mut sets = sets.to_vec();
    sets.sort_by_key(|s| s.set_number);

    let totals = sets.iter().fold(SetTotals::default(), |acc, set| {
        let Some(weight) = set.weight else {
            return acc;
        };
        let max_weight = max_opt(acc.max_weight, weight);
        match set.reps {
            Some(reps) if reps > 0 => SetTotals {
                max_weight,
                volume: acc.volume + weight * f64::from(reps),
                best_one_rm: max_opt(acc.best_one_rm, estimate_one_rm(weight, reps)),
            },
            _ => SetTotals { max_weight, ..acc },
        }
    });

    HistoryEntry {
        date,
        sets,
        max_weight: totals.max_weight,
        total_volume: totals.volume,
        estimated_one_rm: totals.best_one_rm.filter(|v| *v > 0.0).map(round1),
    }
}

fn average(entries: &[HistoryEntry], value: impl Fn(&HistoryEntry) -> f64) -> f64 {
    if entries.is_empty() {
        return 0.0;
    }
    entries.iter().map(value).sum::<f64>() / entries.len() as f64
}

fn percent_change(recent: f64, baseline: f64) -> Option<f64> {
    (baseline > 0.0).then(|| round1((recent - baseline) / baseline * 100.0))
}

/// Summarize a history ordered newest first
pub fn summarize(newest_first: &[HistoryEntry]) -> ProgressSummary {
    let Some(current) = newest_first.first() else {
        return ProgressSummary::default();
    };

    let all_time_max_weight = newest_first
        .iter()
        .map(|h| h.max_weight.unwrap_or(0.0))
        .fold(0.0, f64::max);
    let all_time_max_one_rm = newest_first
        .iter()
        .map(|h| h.estimated_one_rm.unwrap_or(0.0))
        .fold(0.0, f64::max);

    let window = TREND_WINDOW.min(newest_first.len());
    let recent = &newest_first[..window];
    let baseline = &newest_first[newest_first.len() - window..];

    let weight = |h: &HistoryEntry| h.max_weight.unwrap_or(0.0);
    let volume = |h: &HistoryEntry| h.total_volume;

    ProgressSummary {
        total_sessions: newest_first.len(),
        current_max_weight: current.max_weight,
        all_time_max_weight: (all_time_max_weight > 0.0).then_some(all_time_max_weight),
        current_estimated_one_rm: current.estimated_one_rm,
        all_time_max_one_rm: (all_time_max_one_rm > 0.0).then(|| round1(all_time_max_one_rm)),
        weight_progress_percent: percent_change(
            average(recent, weight),
            average(baseline, weight),
        ),
        volume_progress_percent: percent_change(
            average(recent, volume),
            average(baseline, volume),
        ),
    }
}

/// Build progress for an exercise from the sessions that include it
///
/// Sessions whose entry for the exercise has no sets are ignored.
pub fn build_progress(exercise: ExerciseRecord, sessions: &[SessionRecord]) -> ProgressOutcome {
    let mut relevant: Vec<(NaiveDate, &[SetRecord])> = sessions
        .iter()
        .filter_map(|s| s.entry_for(exercise.id).map(|e| (s.date, e.sets.as_slice())))
        .filter(|(_, sets)| !sets.is_empty())
        .collect();
    relevant.sort_by(|a, b| b.0.cmp(&a.0));

    let mut history: Vec<HistoryEntry> = relevant
        .into_iter()
        .map(|(date, sets)| history_entry(date, sets))
        .collect();
    let summary = summarize(&history);
    history.reverse();

    let progress = ExerciseProgress {
        exercise,
        history,
        summary,
    };

    if progress.history.is_empty() {
        ProgressOutcome::Empty(progress)
    } else {
        ProgressOutcome::Populated(progress)
    }
}

/// Compute progress for one exercise of the given user
///
/// Fails with [`crate::Error::Unauthorized`] when there is no user context.
pub fn compute_progress<S: WorkoutStore + ?Sized>(
    store: &S,
    user: Option<&UserId>,
    exercise_id: Uuid,
) -> Result<ProgressOutcome> {
    let user = require_user(user)?;

    let Some(exercise) = store.fetch_exercise(user, exercise_id)? else {
        tracing::debug!("Exercise {} not found for user {}", exercise_id, user);
        return Ok(ProgressOutcome::NotFound);
    };

    let sessions = store.fetch_sessions_with_exercise(user, exercise_id)?;
    let outcome = build_progress(exercise, &sessions);

    if let Some(summary) = outcome.summary() {
        tracing::debug!(
            "Computed progress for {} ({}): {} sessions, max {:?} kg",
            exercise_id,
            user,
            summary.total_sessions,
            summary.all_time_max_weight
        );
    }

    Ok(outcome)
}
