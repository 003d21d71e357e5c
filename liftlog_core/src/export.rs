//! CSV export of an exercise history.
//!
//! One row per set, with the session aggregates repeated on each row so the
//! file can be charted directly.

use crate::progress::ExerciseProgress;
use crate::Result;
use std::fs::File;
use std::path::Path;

/// A row in the CSV output
#[derive(Debug, serde::Serialize)]
struct CsvRow {
    date: String,
    set_number: u32,
    weight: Option<f64>,
    reps: Option<u32>,
    rpe: Option<u8>,
    max_weight: Option<f64>,
    total_volume: f64,
    estimated_one_rm: Option<f64>,
}

/// Write the history of `progress` to `path`, replacing any existing file
///
/// Returns the number of rows written. The file is synced before returning.
pub fn export_history_csv(progress: &ExerciseProgress, path: &Path) -> Result<usize> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file = File::create(path)?;
    let mut writer = csv::WriterBuilder::new()
        .has_headers(true)
        .from_writer(file);

    let mut rows = 0;
    for entry in &progress.history {
        for set in &entry.sets {
            writer.serialize(CsvRow {
                date: entry.date.to_string(),
                set_number: set.set_number,
                weight: set.weight,
                reps: set.reps,
                rpe: set.rpe,
                max_weight: entry.max_weight,
                total_volume: entry.total_volume,
                estimated_one_rm: entry.estimated_one_rm,
            })?;
            rows += 1;
        }
    }

    writer.flush()?;
    let file = writer
        .into_inner()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
    file.sync_all()?;

    tracing::info!(
        "Exported {} rows for {} to {:?}",
        rows,
        progress.exercise.name,
        path
    );
    Ok(rows)
}
