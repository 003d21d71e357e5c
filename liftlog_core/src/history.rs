//! Session history loading from the journal.
//!
//! The journal holds one snapshot per write. Folding keeps the latest
//! snapshot for each (user, date), which is what makes a session unique per
//! user and day. A tombstoned snapshot removes the session.

use crate::{Result, SessionRecord, SetRecord, UserId};
use chrono::NaiveDate;
use std::collections::HashMap;
use std::path::Path;
use uuid::Uuid;

/// Load the current set of sessions from a journal file
///
/// Returns sessions sorted by user, then date (newest first).
pub fn load_sessions(journal_path: &Path) -> Result<Vec<SessionRecord>> {
    let snapshots = crate::journal::read_snapshots(journal_path)?;
    let snapshot_count = snapshots.len();
    let sessions = fold_snapshots(snapshots);

    tracing::info!(
        "Loaded {} sessions from {} journal snapshots",
        sessions.len(),
        snapshot_count
    );

    Ok(sessions)
}

/// Collapse snapshots so the last one per (user, date) wins
pub fn fold_snapshots(snapshots: Vec<SessionRecord>) -> Vec<SessionRecord> {
    let mut latest: HashMap<(UserId, NaiveDate), SessionRecord> = HashMap::new();
    for snapshot in snapshots {
        latest.insert((snapshot.user_id.clone(), snapshot.date), snapshot);
    }

    let mut sessions: Vec<_> = latest.into_values().filter(|s| !s.deleted).collect();
    sessions.sort_by(|a, b| a.user_id.cmp(&b.user_id).then(b.date.cmp(&a.date)));
    sessions
}

/// Find the session of `user` on `date`
pub fn find_session<'a>(
    sessions: &'a [SessionRecord],
    user: &UserId,
    date: NaiveDate,
) -> Option<&'a SessionRecord> {
    sessions
        .iter()
        .find(|s| &s.user_id == user && s.date == date)
}

/// Sets from the most recent session strictly before `before` that recorded
/// at least one set for `exercise_id`
///
/// Used to prefill a new entry with what the user did last time.
pub fn last_sets_before(
    sessions: &[SessionRecord],
    user: &UserId,
    exercise_id: Uuid,
    before: NaiveDate,
) -> Option<Vec<SetRecord>> {
    sessions
        .iter()
        .filter(|s| &s.user_id == user && s.date < before)
        .filter_map(|s| s.entry_for(exercise_id).map(|entry| (s.date, entry)))
        .filter(|(_, entry)| !entry.sets.is_empty())
        .max_by_key(|(date, _)| *date)
        .map(|(_, entry)| {
            let mut sets = entry.sets.clone();
            sets.sort_by_key(|s| s.set_number);
            sets
        })
}
