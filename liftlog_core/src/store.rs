//! Read-side data access used by the progress calculator.
//!
//! The calculator only sees the [`WorkoutStore`] trait. [`MemoryStore`] answers
//! queries from an in-memory snapshot; [`FileStore`] loads such a snapshot from
//! the data directory for each query.

use crate::library::Library;
use crate::{ExerciseRecord, Result, SessionRecord, UserId};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// File name of the exercise/preset library inside the data directory
pub const LIBRARY_FILE: &str = "library.json";

/// File name of the session journal inside the data directory
pub const JOURNAL_FILE: &str = "sessions.jsonl";

/// Lock file held by session writers for a whole read-modify-append cycle
pub const JOURNAL_LOCK_FILE: &str = "sessions.lock";

/// Queries the progress calculator depends on
pub trait WorkoutStore {
    /// Exercise by id, `None` if missing or owned by someone else
    fn fetch_exercise(&self, user: &UserId, exercise_id: Uuid) -> Result<Option<ExerciseRecord>>;

    /// Sessions of `user` that contain `exercise_id`, newest first.
    ///
    /// Each session's entries are filtered down to the target exercise.
    fn fetch_sessions_with_exercise(
        &self,
        user: &UserId,
        exercise_id: Uuid,
    ) -> Result<Vec<SessionRecord>>;

    /// All exercises owned by `user`, ordered by name
    fn list_exercises(&self, user: &UserId) -> Result<Vec<ExerciseRecord>>;
}

/// Immutable in-memory snapshot of exercises and sessions
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    library: Library,
    sessions: Vec<SessionRecord>,
}

impl MemoryStore {
    pub fn new(library: Library, sessions: Vec<SessionRecord>) -> Self {
        Self { library, sessions }
    }

    pub fn library(&self) -> &Library {
        &self.library
    }

    pub fn sessions(&self) -> &[SessionRecord] {
        &self.sessions
    }
}

impl WorkoutStore for MemoryStore {
    fn fetch_exercise(&self, user: &UserId, exercise_id: Uuid) -> Result<Option<ExerciseRecord>> {
        Ok(self.library.find_exercise(user, exercise_id).cloned())
    }

    fn fetch_sessions_with_exercise(
        &self,
        user: &UserId,
        exercise_id: Uuid,
    ) -> Result<Vec<SessionRecord>> {
        let mut sessions: Vec<SessionRecord> = self
            .sessions
            .iter()
            .filter(|s| &s.user_id == user)
            .filter(|s| s.exercises.iter().any(|e| e.exercise_id == exercise_id))
            .map(|s| {
                let mut session = s.clone();
                session.exercises.retain(|e| e.exercise_id == exercise_id);
                session.exercises.sort_by_key(|e| e.order);
                session
            })
            .collect();
        sessions.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(sessions)
    }

    fn list_exercises(&self, user: &UserId) -> Result<Vec<ExerciseRecord>> {
        Ok(self.library.exercises_for(user))
    }
}

/// Store backed by the files in a data directory
#[derive(Clone, Debug)]
pub struct FileStore {
    data_dir: PathBuf,
}

impl FileStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn library_path(&self) -> PathBuf {
        self.data_dir.join(LIBRARY_FILE)
    }

    pub fn journal_path(&self) -> PathBuf {
        self.data_dir.join(JOURNAL_FILE)
    }

    pub fn journal_lock_path(&self) -> PathBuf {
        self.data_dir.join(JOURNAL_LOCK_FILE)
    }

    /// Load a consistent in-memory snapshot of the data directory
    pub fn snapshot(&self) -> Result<MemoryStore> {
        let library = Library::load(&self.library_path())?;
        let sessions = crate::history::load_sessions(&self.journal_path())?;
        Ok(MemoryStore::new(library, sessions))
    }
}

impl WorkoutStore for FileStore {
    fn fetch_exercise(&self, user: &UserId, exercise_id: Uuid) -> Result<Option<ExerciseRecord>> {
        let library = Library::load(&self.library_path())?;
        Ok(library.find_exercise(user, exercise_id).cloned())
    }

    fn fetch_sessions_with_exercise(
        &self,
        user: &UserId,
        exercise_id: Uuid,
    ) -> Result<Vec<SessionRecord>> {
        self.snapshot()?
            .fetch_sessions_with_exercise(user, exercise_id)
    }

    fn list_exercises(&self, user: &UserId) -> Result<Vec<ExerciseRecord>> {
        let library = Library::load(&self.library_path())?;
        Ok(library.exercises_for(user))
    }
}
