//! Exercise and preset library persistence with file locking.
//!
//! The library is small and rewritten as a whole on every change, so it is
//! stored as a single JSON document replaced atomically.

use crate::lock::LockFile;
use crate::{Error, ExerciseRecord, Preset, Result, UserId};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use uuid::Uuid;

/// All exercises and presets, across users
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Library {
    #[serde(default)]
    pub exercises: Vec<ExerciseRecord>,
    #[serde(default)]
    pub presets: Vec<Preset>,
}

impl Library {
    /// Load the library from a file with shared locking
    ///
    /// Returns an empty library if the file doesn't exist.
    /// If the file is corrupted, logs a warning and returns an empty library.
    /// Writers go through [`Library::update`], which refuses corrupted files.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = match read_shared(path) {
            Ok(Some(contents)) => contents,
            Ok(None) => {
                tracing::info!("No library file found, starting empty");
                return Ok(Self::default());
            }
            Err(e) => {
                tracing::warn!("Failed to read library {:?}: {}. Starting empty.", path, e);
                return Ok(Self::default());
            }
        };

        match Self::parse(&contents) {
            Ok(library) => {
                tracing::debug!(
                    "Loaded library from {:?} ({} exercises, {} presets)",
                    path,
                    library.exercises.len(),
                    library.presets.len()
                );
                Ok(library)
            }
            Err(e) => {
                tracing::warn!("Failed to parse library {:?}: {}. Starting empty.", path, e);
                Ok(Self::default())
            }
        }
    }

    fn parse(contents: &str) -> serde_json::Result<Self> {
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(contents)
    }

    /// Strict load for writers: an unreadable file is an error
    fn load_for_update(path: &Path) -> Result<Self> {
        let Some(contents) = read_shared(path)? else {
            return Ok(Self::default());
        };
        Self::parse(&contents).map_err(|e| {
            tracing::error!("Refusing to rewrite unreadable library {:?}: {}", path, e);
            Error::Json(e)
        })
    }

    /// Sidecar lock file serializing updates of the library at `path`
    pub fn lock_path(path: &Path) -> PathBuf {
        path.with_extension("lock")
    }

    /// Save the library atomically (temp file, fsync, rename)
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let temp = NamedTempFile::new_in(path.parent().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::Other, "library path missing parent")
        })?)?;

        temp.as_file().lock_exclusive()?;

        {
            let mut writer = std::io::BufWriter::new(temp.as_file());
            let contents = serde_json::to_string(self)?;
            writer.write_all(contents.as_bytes())?;
            writer.flush()?;
        }

        temp.as_file().sync_all()?;
        temp.as_file().unlock()?;

        temp.persist(path).map_err(|e| Error::Io(e.error))?;

        tracing::debug!("Saved library to {:?}", path);
        Ok(())
    }

    /// Load, modify, and save back while holding the library lock
    ///
    /// Fails without writing if the current file cannot be parsed.
    pub fn update<F, T>(path: &Path, f: F) -> Result<T>
    where
        F: FnOnce(&mut Library) -> Result<T>,
    {
        let _lock = LockFile::acquire(&Self::lock_path(path))?;
        let mut library = Self::load_for_update(path)?;
        let value = f(&mut library)?;
        library.save(path)?;
        Ok(value)
    }

    /// Exercises owned by `user`, ordered by name
    pub fn exercises_for(&self, user: &UserId) -> Vec<ExerciseRecord> {
        let mut exercises: Vec<_> = self
            .exercises
            .iter()
            .filter(|e| &e.user_id == user)
            .cloned()
            .collect();
        exercises.sort_by(|a, b| a.name.cmp(&b.name));
        exercises
    }

    /// Exercise by id, only if owned by `user`
    pub fn find_exercise(&self, user: &UserId, id: Uuid) -> Option<&ExerciseRecord> {
        self.exercises
            .iter()
            .find(|e| e.id == id && &e.user_id == user)
    }

    /// Preset by id, only if owned by `user`
    pub fn find_preset(&self, user: &UserId, id: Uuid) -> Option<&Preset> {
        self.presets.iter().find(|p| p.id == id && &p.user_id == user)
    }

    pub fn add_exercise(&mut self, exercise: ExerciseRecord) {
        self.exercises.push(exercise);
    }

    pub fn add_preset(&mut self, preset: Preset) {
        self.presets.push(preset);
    }

    pub fn find_exercise_mut(&mut self, user: &UserId, id: Uuid) -> Option<&mut ExerciseRecord> {
        self.exercises
            .iter_mut()
            .find(|e| e.id == id && &e.user_id == user)
    }

    pub fn find_preset_mut(&mut self, user: &UserId, id: Uuid) -> Option<&mut Preset> {
        self.presets
            .iter_mut()
            .find(|p| p.id == id && &p.user_id == user)
    }

    /// Remove an exercise of `user` and drop it from that user's presets
    pub fn remove_exercise(&mut self, user: &UserId, id: Uuid) -> Option<ExerciseRecord> {
        let index = self
            .exercises
            .iter()
            .position(|e| e.id == id && &e.user_id == user)?;
        for preset in self.presets.iter_mut().filter(|p| &p.user_id == user) {
            preset.exercise_ids.retain(|e| *e != id);
        }
        Some(self.exercises.remove(index))
    }

    /// Remove a preset of `user`
    pub fn remove_preset(&mut self, user: &UserId, id: Uuid) -> Option<Preset> {
        let index = self
            .presets
            .iter()
            .position(|p| p.id == id && &p.user_id == user)?;
        Some(self.presets.remove(index))
    }
}

/// Raw file contents read under a shared lock, `None` if the file is missing
fn read_shared(path: &Path) -> Result<Option<String>> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    file.lock_shared()?;
    let mut contents = String::new();
    let read = std::io::BufReader::new(&file).read_to_string(&mut contents);
    file.unlock()?;
    read?;

    Ok(Some(contents))
}
