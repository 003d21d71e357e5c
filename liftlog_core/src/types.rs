//! Core domain types for the Liftlog system.
//!
//! This module defines the persisted records the rest of the crate reads:
//! - User identity
//! - Exercises and presets
//! - Workout sessions, their exercise entries and sets

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

// ============================================================================
// Identity
// ============================================================================

/// Identity of an authenticated user, as handed over by the auth layer
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Resolve an optional user context into a user id.
///
/// Every user-scoped operation calls this first so that a missing context
/// aborts before any data is touched.
pub fn require_user(user: Option<&UserId>) -> crate::Result<&UserId> {
    user.ok_or(crate::Error::Unauthorized)
}

// ============================================================================
// Exercise Types
// ============================================================================

/// How an exercise is recorded
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ExerciseKind {
    /// Weighted sets of reps
    Strength,
    /// A single duration per session
    Cardio,
}

/// Body part tag for grouping exercises
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BodyPart {
    Chest,
    Back,
    Legs,
    Shoulders,
    Arms,
    Core,
}

impl FromStr for BodyPart {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "chest" => Ok(BodyPart::Chest),
            "back" => Ok(BodyPart::Back),
            "legs" => Ok(BodyPart::Legs),
            "shoulders" => Ok(BodyPart::Shoulders),
            "arms" => Ok(BodyPart::Arms),
            "core" => Ok(BodyPart::Core),
            other => Err(crate::Error::Validation(format!(
                "Unknown body part: {}",
                other
            ))),
        }
    }
}

/// An exercise owned by a single user (e.g., "Bench Press")
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ExerciseRecord {
    pub id: Uuid,
    pub user_id: UserId,
    pub name: String,
    pub kind: ExerciseKind,
    pub body_part: Option<BodyPart>,
    pub created_at: DateTime<Utc>,
}

/// A named, ordered template of exercises
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Preset {
    pub id: Uuid,
    pub user_id: UserId,
    pub name: String,
    pub exercise_ids: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Session Types
// ============================================================================

/// A single recorded set.
///
/// `set_number` is 1-based and dense within its entry.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SetRecord {
    pub set_number: u32,
    /// Kilograms
    pub weight: Option<f64>,
    pub reps: Option<u32>,
    /// 1-10
    pub rpe: Option<u8>,
}

/// One exercise performed within a session
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ExerciseEntry {
    pub id: Uuid,
    pub exercise_id: Uuid,
    pub order: u32,
    #[serde(default)]
    pub memo: Option<String>,
    /// Cardio only
    #[serde(default)]
    pub duration_minutes: Option<u32>,
    #[serde(default)]
    pub sets: Vec<SetRecord>,
}

impl ExerciseEntry {
    pub fn new(exercise_id: Uuid, order: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            exercise_id,
            order,
            memo: None,
            duration_minutes: None,
            sets: Vec::new(),
        }
    }
}

/// A workout session, unique per (user, date)
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SessionRecord {
    pub id: Uuid,
    pub user_id: UserId,
    pub date: NaiveDate,
    pub preset_id: Option<Uuid>,
    #[serde(default)]
    pub memo: Option<String>,
    #[serde(default)]
    pub is_rest_day: bool,
    /// Tombstone marker used by the session journal
    #[serde(default)]
    pub deleted: bool,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub exercises: Vec<ExerciseEntry>,
}

impl SessionRecord {
    /// Create an empty session for a user on a given day
    pub fn new(user_id: UserId, date: NaiveDate) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            date,
            preset_id: None,
            memo: None,
            is_rest_day: false,
            deleted: false,
            updated_at: Utc::now(),
            exercises: Vec::new(),
        }
    }

    /// First entry (by order) for the given exercise
    pub fn entry_for(&self, exercise_id: Uuid) -> Option<&ExerciseEntry> {
        self.exercises
            .iter()
            .filter(|e| e.exercise_id == exercise_id)
            .min_by_key(|e| e.order)
    }

    /// Mutable counterpart of [`SessionRecord::entry_for`]
    pub fn entry_for_mut(&mut self, exercise_id: Uuid) -> Option<&mut ExerciseEntry> {
        self.exercises
            .iter_mut()
            .filter(|e| e.exercise_id == exercise_id)
            .min_by_key(|e| e.order)
    }
}
