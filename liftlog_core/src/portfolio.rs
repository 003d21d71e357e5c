//! Progress overview across every exercise of a user.

use crate::progress::compute_progress;
use crate::store::WorkoutStore;
use crate::{require_user, ExerciseRecord, Result, UserId};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Condensed progress for one exercise
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct PortfolioEntry {
    pub exercise: ExerciseRecord,
    pub session_count: usize,
    pub max_weight: Option<f64>,
    pub max_one_rm: Option<f64>,
    pub weight_progress_percent: Option<f64>,
}

/// Progress for all exercises of `user`, most trained first
///
/// Exercises are computed in parallel against the same store. Ties keep the
/// store's name ordering.
pub fn exercises_with_progress<S: WorkoutStore + Sync + ?Sized>(
    store: &S,
    user: Option<&UserId>,
) -> Result<Vec<PortfolioEntry>> {
    let user = require_user(user)?;
    let exercises = store.list_exercises(user)?;

    let mut entries = exercises
        .into_par_iter()
        .map(|exercise| -> Result<PortfolioEntry> {
            let outcome = compute_progress(store, Some(user), exercise.id)?;
            let summary = outcome.summary().cloned().unwrap_or_default();
            Ok(PortfolioEntry {
                exercise,
                session_count: summary.total_sessions,
                max_weight: summary.all_time_max_weight,
                max_one_rm: summary.all_time_max_one_rm,
                weight_progress_percent: summary.weight_progress_percent,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    entries.sort_by(|a, b| b.session_count.cmp(&a.session_count));

    tracing::info!("Computed progress for {} exercises of {}", entries.len(), user);
    Ok(entries)
}
