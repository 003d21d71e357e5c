//! Write-side operations: exercises, presets, sessions and sets.
//!
//! Every session change is written as a new snapshot to the session journal
//! while the journal lock is held. Set numbers and entry order are kept dense
//! by every operation here.

use crate::history::{find_session, last_sets_before};
use crate::journal::{JsonlJournal, SessionSink};
use crate::library::Library;
use crate::lock::LockFile;
use crate::store::FileStore;
use crate::{
    require_user, BodyPart, Error, ExerciseEntry, ExerciseKind, ExerciseRecord, Preset, Result,
    SessionRecord, SetRecord, UserId,
};
use chrono::{NaiveDate, Utc};
use std::str::FromStr;
use uuid::Uuid;

/// Values for a set about to be recorded
#[derive(Clone, Debug, PartialEq, Default)]
pub struct NewSet {
    pub weight: Option<f64>,
    pub reps: Option<u32>,
    pub rpe: Option<u8>,
}

impl NewSet {
    fn validate(&self) -> Result<()> {
        if let Some(weight) = self.weight {
            if !weight.is_finite() || weight < 0.0 {
                return Err(Error::Validation(format!("Invalid weight: {}", weight)));
            }
        }
        if let Some(rpe) = self.rpe {
            if !(1..=10).contains(&rpe) {
                return Err(Error::Validation(format!("RPE must be 1-10, got {}", rpe)));
            }
        }
        Ok(())
    }
}

/// Parse `WEIGHTxREPS[@RPE]`, e.g. `80x5`, `82.5x3@9`, `x12` (no weight)
impl FromStr for NewSet {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::Validation(format!("Invalid set '{}', expected WEIGHTxREPS[@RPE]", s));

        let s = s.trim().to_lowercase();
        let (body, rpe) = match s.split_once('@') {
            Some((body, rpe)) => (body, Some(rpe.parse::<u8>().map_err(|_| invalid())?)),
            None => (s.as_str(), None),
        };
        let (weight, reps) = body.split_once('x').ok_or_else(invalid)?;

        let weight = match weight {
            "" => None,
            w => Some(w.parse::<f64>().map_err(|_| invalid())?),
        };
        let reps = match reps {
            "" => None,
            r => Some(r.parse::<u32>().map_err(|_| invalid())?),
        };

        let set = NewSet { weight, reps, rpe };
        set.validate()?;
        Ok(set)
    }
}

/// Changes to a set; `None` leaves a field as is, `Some(None)` clears it
#[derive(Clone, Debug, PartialEq, Default)]
pub struct SetUpdate {
    pub weight: Option<Option<f64>>,
    pub reps: Option<Option<u32>>,
    pub rpe: Option<Option<u8>>,
}

/// Replace every value of the set
impl From<NewSet> for SetUpdate {
    fn from(set: NewSet) -> Self {
        Self {
            weight: Some(set.weight),
            reps: Some(set.reps),
            rpe: Some(set.rpe),
        }
    }
}

/// Changes to a session's own fields
#[derive(Clone, Debug, PartialEq, Default)]
pub struct SessionUpdate {
    pub memo: Option<Option<String>>,
    pub is_rest_day: Option<bool>,
}

/// Changes to an exercise
#[derive(Clone, Debug, PartialEq, Default)]
pub struct ExerciseUpdate {
    pub name: Option<String>,
    pub kind: Option<ExerciseKind>,
    pub body_part: Option<Option<BodyPart>>,
}

/// File-backed logbook for one data directory
///
/// Library changes run under the library lock, session changes under the
/// journal lock, so each operation sees the writes of the ones before it.
pub struct Logbook {
    store: FileStore,
    journal: JsonlJournal,
}

impl Logbook {
    pub fn open(store: FileStore) -> Self {
        let journal = JsonlJournal::new(store.journal_path());
        Self { store, journal }
    }

    pub fn store(&self) -> &FileStore {
        &self.store
    }

    // ------------------------------------------------------------------
    // Exercises and presets
    // ------------------------------------------------------------------

    /// Register a new exercise for `user`
    pub fn create_exercise(
        &self,
        user: Option<&UserId>,
        name: &str,
        kind: ExerciseKind,
        body_part: Option<BodyPart>,
    ) -> Result<ExerciseRecord> {
        let user = require_user(user)?;
        let name = valid_name(name, "Exercise")?;

        let exercise = ExerciseRecord {
            id: Uuid::new_v4(),
            user_id: user.clone(),
            name,
            kind,
            body_part,
            created_at: Utc::now(),
        };

        Library::update(&self.store.library_path(), |library| {
            library.add_exercise(exercise.clone());
            Ok(())
        })?;

        tracing::info!("Created exercise {} ({}) for {}", exercise.name, exercise.id, user);
        Ok(exercise)
    }

    /// Rename or retag an exercise
    pub fn update_exercise(
        &self,
        user: Option<&UserId>,
        exercise_id: Uuid,
        changes: ExerciseUpdate,
    ) -> Result<ExerciseRecord> {
        let user = require_user(user)?;
        let name = changes
            .name
            .as_deref()
            .map(|n| valid_name(n, "Exercise"))
            .transpose()?;

        Library::update(&self.store.library_path(), |library| {
            let exercise = library
                .find_exercise_mut(user, exercise_id)
                .ok_or_else(|| Error::NotFound(format!("exercise {}", exercise_id)))?;
            if let Some(name) = name {
                exercise.name = name;
            }
            if let Some(kind) = changes.kind {
                exercise.kind = kind;
            }
            if let Some(body_part) = changes.body_part {
                exercise.body_part = body_part;
            }
            tracing::info!("Updated exercise {} ({})", exercise.name, exercise.id);
            Ok(exercise.clone())
        })
    }

    /// Delete an exercise that no session records, removing it from presets
    pub fn delete_exercise(&self, user: Option<&UserId>, exercise_id: Uuid) -> Result<()> {
        let user = require_user(user)?;

        Library::update(&self.store.library_path(), |library| {
            if library.find_exercise(user, exercise_id).is_none() {
                return Err(Error::NotFound(format!("exercise {}", exercise_id)));
            }

            let sessions = crate::history::load_sessions(&self.store.journal_path())?;
            let recorded = sessions
                .iter()
                .filter(|s| &s.user_id == user && s.entry_for(exercise_id).is_some())
                .count();
            if recorded > 0 {
                return Err(Error::Validation(format!(
                    "Exercise {} is recorded in {} sessions",
                    exercise_id, recorded
                )));
            }

            library.remove_exercise(user, exercise_id);
            tracing::info!("Deleted exercise {} of {}", exercise_id, user);
            Ok(())
        })
    }

    /// Register a preset; every exercise must belong to `user`
    pub fn create_preset(
        &self,
        user: Option<&UserId>,
        name: &str,
        exercise_ids: &[Uuid],
    ) -> Result<Preset> {
        let user = require_user(user)?;
        let name = valid_name(name, "Preset")?;

        Library::update(&self.store.library_path(), |library| {
            ensure_owned(library, user, exercise_ids)?;

            let mut preset = Preset {
                id: Uuid::new_v4(),
                user_id: user.clone(),
                name,
                exercise_ids: Vec::new(),
                created_at: Utc::now(),
            };
            push_unique(&mut preset.exercise_ids, exercise_ids);
            library.add_preset(preset.clone());
            tracing::info!("Created preset {} ({}) for {}", preset.name, preset.id, user);
            Ok(preset)
        })
    }

    pub fn rename_preset(&self, user: Option<&UserId>, preset_id: Uuid, name: &str) -> Result<Preset> {
        let user = require_user(user)?;
        let name = valid_name(name, "Preset")?;
        self.edit_preset(user, preset_id, |_, preset| {
            preset.name = name;
            Ok(())
        })
    }

    /// Append exercises to a preset, skipping ones it already has
    pub fn add_exercises_to_preset(
        &self,
        user: Option<&UserId>,
        preset_id: Uuid,
        exercise_ids: &[Uuid],
    ) -> Result<Preset> {
        let user = require_user(user)?;
        self.edit_preset(user, preset_id, |library, preset| {
            ensure_owned(library, user, exercise_ids)?;
            push_unique(&mut preset.exercise_ids, exercise_ids);
            Ok(())
        })
    }

    pub fn remove_exercise_from_preset(
        &self,
        user: Option<&UserId>,
        preset_id: Uuid,
        exercise_id: Uuid,
    ) -> Result<Preset> {
        let user = require_user(user)?;
        self.edit_preset(user, preset_id, |_, preset| {
            let before = preset.exercise_ids.len();
            preset.exercise_ids.retain(|id| *id != exercise_id);
            if preset.exercise_ids.len() == before {
                return Err(Error::NotFound(format!(
                    "exercise {} in preset {}",
                    exercise_id, preset_id
                )));
            }
            Ok(())
        })
    }

    /// Move the listed exercises to the front, in the given order
    ///
    /// Ids not in the preset are ignored; unlisted exercises keep their
    /// relative order after the listed ones.
    pub fn reorder_preset(
        &self,
        user: Option<&UserId>,
        preset_id: Uuid,
        exercise_ids: &[Uuid],
    ) -> Result<Preset> {
        let user = require_user(user)?;
        self.edit_preset(user, preset_id, |_, preset| {
            let mut ordered: Vec<Uuid> = Vec::with_capacity(preset.exercise_ids.len());
            let listed: Vec<Uuid> = exercise_ids
                .iter()
                .copied()
                .filter(|id| preset.exercise_ids.contains(id))
                .collect();
            push_unique(&mut ordered, &listed);
            push_unique(&mut ordered, &preset.exercise_ids);
            preset.exercise_ids = ordered;
            Ok(())
        })
    }

    /// Delete a preset no session refers to
    pub fn delete_preset(&self, user: Option<&UserId>, preset_id: Uuid) -> Result<()> {
        let user = require_user(user)?;

        Library::update(&self.store.library_path(), |library| {
            if library.find_preset(user, preset_id).is_none() {
                return Err(Error::NotFound(format!("preset {}", preset_id)));
            }

            let sessions = crate::history::load_sessions(&self.store.journal_path())?;
            if let Some(session) = sessions
                .iter()
                .find(|s| &s.user_id == user && s.preset_id == Some(preset_id))
            {
                return Err(Error::Validation(format!(
                    "Preset {} is used by the session on {}",
                    preset_id, session.date
                )));
            }

            library.remove_preset(user, preset_id);
            tracing::info!("Deleted preset {} of {}", preset_id, user);
            Ok(())
        })
    }

    fn edit_preset<F>(&self, user: &UserId, preset_id: Uuid, edit: F) -> Result<Preset>
    where
        F: FnOnce(&Library, &mut Preset) -> Result<()>,
    {
        Library::update(&self.store.library_path(), |library| {
            let mut preset = library
                .find_preset(user, preset_id)
                .cloned()
                .ok_or_else(|| Error::NotFound(format!("preset {}", preset_id)))?;
            edit(library, &mut preset)?;

            if let Some(stored) = library.find_preset_mut(user, preset_id) {
                *stored = preset.clone();
            }
            tracing::info!("Updated preset {} ({})", preset.name, preset.id);
            Ok(preset)
        })
    }

    // ------------------------------------------------------------------
    // Sessions
    // ------------------------------------------------------------------

    /// The session of `user` on `date`, if any
    pub fn session(&self, user: Option<&UserId>, date: NaiveDate) -> Result<Option<SessionRecord>> {
        let user = require_user(user)?;
        let snapshot = self.store.snapshot()?;
        Ok(find_session(snapshot.sessions(), user, date).cloned())
    }

    /// Set the memo or rest-day flag of the session on `date`, creating it if needed
    pub fn update_session(
        &mut self,
        user: Option<&UserId>,
        date: NaiveDate,
        changes: SessionUpdate,
    ) -> Result<SessionRecord> {
        let user = require_user(user)?;
        let _lock = self.lock_sessions()?;
        let snapshot = self.store.snapshot()?;

        let mut session = session_or_new(snapshot.sessions(), user, date);
        if let Some(memo) = changes.memo {
            session.memo = memo.filter(|m| !m.trim().is_empty());
        }
        if let Some(is_rest_day) = changes.is_rest_day {
            session.is_rest_day = is_rest_day;
        }

        self.commit(&mut session)?;
        Ok(session)
    }

    /// Add an exercise to the session on `date`, prefilled with the sets of
    /// the last earlier session that recorded it
    pub fn add_exercise_to_session(
        &mut self,
        user: Option<&UserId>,
        date: NaiveDate,
        exercise_id: Uuid,
    ) -> Result<SessionRecord> {
        let user = require_user(user)?;
        let _lock = self.lock_sessions()?;
        let snapshot = self.store.snapshot()?;
        if snapshot.library().find_exercise(user, exercise_id).is_none() {
            return Err(Error::NotFound(format!("exercise {}", exercise_id)));
        }

        let mut session = session_or_new(snapshot.sessions(), user, date);
        if attach_exercise(&mut session, snapshot.sessions(), exercise_id) {
            self.commit(&mut session)?;
        }
        Ok(session)
    }

    /// Drop an exercise and its sets from the session on `date`
    pub fn remove_exercise_from_session(
        &mut self,
        user: Option<&UserId>,
        date: NaiveDate,
        exercise_id: Uuid,
    ) -> Result<SessionRecord> {
        let user = require_user(user)?;
        let _lock = self.lock_sessions()?;
        let snapshot = self.store.snapshot()?;
        let mut session = existing_session(snapshot.sessions(), user, date)?;

        let before = session.exercises.len();
        session.exercises.retain(|e| e.exercise_id != exercise_id);
        if session.exercises.len() == before {
            return Err(Error::NotFound(format!("exercise {} on {}", exercise_id, date)));
        }
        session.exercises.sort_by_key(|e| e.order);
        for (i, entry) in session.exercises.iter_mut().enumerate() {
            entry.order = i as u32;
        }

        self.commit(&mut session)?;
        Ok(session)
    }

    /// Set or clear the memo of an exercise within the session on `date`
    pub fn update_entry_memo(
        &mut self,
        user: Option<&UserId>,
        date: NaiveDate,
        exercise_id: Uuid,
        memo: Option<String>,
    ) -> Result<()> {
        let user = require_user(user)?;
        let _lock = self.lock_sessions()?;
        let snapshot = self.store.snapshot()?;
        let mut session = existing_session(snapshot.sessions(), user, date)?;

        existing_entry(&mut session, exercise_id)?.memo = memo.filter(|m| !m.trim().is_empty());
        self.commit(&mut session)
    }

    /// Point the session on `date` at a preset and add its exercises in order
    pub fn apply_preset(
        &mut self,
        user: Option<&UserId>,
        date: NaiveDate,
        preset_id: Uuid,
    ) -> Result<SessionRecord> {
        let user = require_user(user)?;
        let _lock = self.lock_sessions()?;
        let snapshot = self.store.snapshot()?;
        let preset = snapshot
            .library()
            .find_preset(user, preset_id)
            .ok_or_else(|| Error::NotFound(format!("preset {}", preset_id)))?;

        let mut session = session_or_new(snapshot.sessions(), user, date);
        session.preset_id = Some(preset_id);

        let added = preset
            .exercise_ids
            .iter()
            .filter(|id| attach_exercise(&mut session, snapshot.sessions(), **id))
            .count();

        self.commit(&mut session)?;
        tracing::info!(
            "Applied preset {} to {} on {} ({} exercises added)",
            preset.name,
            user,
            date,
            added
        );
        Ok(session)
    }

    /// Append a set to the exercise on `date`, creating session/entry as needed
    pub fn add_set(
        &mut self,
        user: Option<&UserId>,
        date: NaiveDate,
        exercise_id: Uuid,
        new_set: NewSet,
    ) -> Result<SetRecord> {
        let user = require_user(user)?;
        new_set.validate()?;

        let _lock = self.lock_sessions()?;
        let snapshot = self.store.snapshot()?;
        let exercise = snapshot
            .library()
            .find_exercise(user, exercise_id)
            .ok_or_else(|| Error::NotFound(format!("exercise {}", exercise_id)))?;
        if exercise.kind == ExerciseKind::Cardio {
            return Err(Error::Validation(format!(
                "{} is a cardio exercise; record a duration instead",
                exercise.name
            )));
        }

        let mut session = session_or_new(snapshot.sessions(), user, date);
        let entry = entry_or_new(&mut session, exercise_id);

        let set = SetRecord {
            set_number: entry.sets.len() as u32 + 1,
            weight: new_set.weight,
            reps: new_set.reps,
            rpe: new_set.rpe,
        };
        entry.sets.push(set.clone());

        self.commit(&mut session)?;
        Ok(set)
    }

    /// Change the values of one recorded set
    pub fn update_set(
        &mut self,
        user: Option<&UserId>,
        date: NaiveDate,
        exercise_id: Uuid,
        set_number: u32,
        changes: SetUpdate,
    ) -> Result<SetRecord> {
        let user = require_user(user)?;
        let _lock = self.lock_sessions()?;
        let snapshot = self.store.snapshot()?;
        let mut session = existing_session(snapshot.sessions(), user, date)?;

        let set = existing_entry(&mut session, exercise_id)?
            .sets
            .iter_mut()
            .find(|s| s.set_number == set_number)
            .ok_or_else(|| Error::NotFound(format!("set {}", set_number)))?;

        let updated = NewSet {
            weight: changes.weight.unwrap_or(set.weight),
            reps: changes.reps.unwrap_or(set.reps),
            rpe: changes.rpe.unwrap_or(set.rpe),
        };
        updated.validate()?;
        set.weight = updated.weight;
        set.reps = updated.reps;
        set.rpe = updated.rpe;
        let set = set.clone();

        self.commit(&mut session)?;
        Ok(set)
    }

    /// Record the duration of a cardio exercise on `date`
    pub fn set_duration(
        &mut self,
        user: Option<&UserId>,
        date: NaiveDate,
        exercise_id: Uuid,
        minutes: u32,
    ) -> Result<()> {
        let user = require_user(user)?;
        let _lock = self.lock_sessions()?;
        let snapshot = self.store.snapshot()?;
        let exercise = snapshot
            .library()
            .find_exercise(user, exercise_id)
            .ok_or_else(|| Error::NotFound(format!("exercise {}", exercise_id)))?;
        if exercise.kind != ExerciseKind::Cardio {
            return Err(Error::Validation(format!(
                "{} is a strength exercise; record sets instead",
                exercise.name
            )));
        }

        let mut session = session_or_new(snapshot.sessions(), user, date);
        entry_or_new(&mut session, exercise_id).duration_minutes = Some(minutes);

        self.commit(&mut session)
    }

    /// Remove one set and renumber the rest
    pub fn remove_set(
        &mut self,
        user: Option<&UserId>,
        date: NaiveDate,
        exercise_id: Uuid,
        set_number: u32,
    ) -> Result<()> {
        let user = require_user(user)?;
        let _lock = self.lock_sessions()?;
        let snapshot = self.store.snapshot()?;
        let mut session = existing_session(snapshot.sessions(), user, date)?;

        let entry = existing_entry(&mut session, exercise_id)?;
        let before = entry.sets.len();
        entry.sets.retain(|s| s.set_number != set_number);
        if entry.sets.len() == before {
            return Err(Error::NotFound(format!("set {}", set_number)));
        }
        entry.sets.sort_by_key(|s| s.set_number);
        for (i, set) in entry.sets.iter_mut().enumerate() {
            set.set_number = i as u32 + 1;
        }

        self.commit(&mut session)
    }

    /// Delete the session of `user` on `date`
    pub fn delete_session(&mut self, user: Option<&UserId>, date: NaiveDate) -> Result<()> {
        let user = require_user(user)?;
        let _lock = self.lock_sessions()?;
        let snapshot = self.store.snapshot()?;
        let mut session = existing_session(snapshot.sessions(), user, date)?;

        session.deleted = true;
        self.commit(&mut session)?;
        tracing::info!("Deleted session of {} on {}", user, date);
        Ok(())
    }

    /// Held from reading the snapshot until the new one is appended
    fn lock_sessions(&self) -> Result<LockFile> {
        LockFile::acquire(&self.store.journal_lock_path())
    }

    fn commit(&mut self, session: &mut SessionRecord) -> Result<()> {
        session.updated_at = Utc::now();
        self.journal.append(session)
    }
}

fn valid_name(name: &str, what: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::Validation(format!("{} name must not be empty", what)));
    }
    Ok(name.to_string())
}

fn ensure_owned(library: &Library, user: &UserId, exercise_ids: &[Uuid]) -> Result<()> {
    match exercise_ids
        .iter()
        .find(|id| library.find_exercise(user, **id).is_none())
    {
        Some(missing) => Err(Error::NotFound(format!("exercise {}", missing))),
        None => Ok(()),
    }
}

fn push_unique(ids: &mut Vec<Uuid>, extra: &[Uuid]) {
    for id in extra {
        if !ids.contains(id) {
            ids.push(*id);
        }
    }
}

fn session_or_new(sessions: &[SessionRecord], user: &UserId, date: NaiveDate) -> SessionRecord {
    find_session(sessions, user, date)
        .cloned()
        .unwrap_or_else(|| SessionRecord::new(user.clone(), date))
}

fn existing_session(sessions: &[SessionRecord], user: &UserId, date: NaiveDate) -> Result<SessionRecord> {
    find_session(sessions, user, date)
        .cloned()
        .ok_or_else(|| Error::NotFound(format!("session on {}", date)))
}

fn existing_entry(session: &mut SessionRecord, exercise_id: Uuid) -> Result<&mut ExerciseEntry> {
    let date = session.date;
    session
        .entry_for_mut(exercise_id)
        .ok_or_else(|| Error::NotFound(format!("exercise {} on {}", exercise_id, date)))
}

fn entry_or_new(session: &mut SessionRecord, exercise_id: Uuid) -> &mut ExerciseEntry {
    let existing = session
        .exercises
        .iter()
        .enumerate()
        .filter(|(_, e)| e.exercise_id == exercise_id)
        .min_by_key(|(_, e)| e.order)
        .map(|(index, _)| index);

    let index = existing.unwrap_or_else(|| {
        let order = session.exercises.len() as u32;
        session.exercises.push(ExerciseEntry::new(exercise_id, order));
        session.exercises.len() - 1
    });
    &mut session.exercises[index]
}

/// Add an entry for `exercise_id` unless present. Returns whether it was added.
fn attach_exercise(
    session: &mut SessionRecord,
    history: &[SessionRecord],
    exercise_id: Uuid,
) -> bool {
    if session.entry_for(exercise_id).is_some() {
        return false;
    }

    let mut entry = ExerciseEntry::new(exercise_id, session.exercises.len() as u32);
    if let Some(previous) = last_sets_before(history, &session.user_id, exercise_id, session.date) {
        entry.sets = previous
            .into_iter()
            .enumerate()
            .map(|(i, set)| SetRecord {
                set_number: i as u32 + 1,
                ..set
            })
            .collect();
        tracing::debug!(
            "Prefilled {} sets for exercise {}",
            entry.sets.len(),
            exercise_id
        );
    }
    session.exercises.push(entry);
    true
}
