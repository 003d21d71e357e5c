#![forbid(unsafe_code)]

//! Core domain model and business logic for Liftlog.
//!
//! This crate provides:
//! - Domain types (exercises, presets, sessions, sets)
//! - Progress analytics (history, estimated 1RM, trends)
//! - Persistence (session journal, exercise library)
//! - Logbook operations for recording workouts

pub mod types;
pub mod error;
pub mod config;
pub mod logging;
pub mod estimate;
pub mod lock;
pub mod journal;
pub mod library;
pub mod history;
pub mod store;
pub mod progress;
pub mod portfolio;
pub mod logbook;
pub mod export;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use config::Config;
pub use store::{FileStore, MemoryStore, WorkoutStore};
pub use progress::{compute_progress, ExerciseProgress, HistoryEntry, ProgressOutcome, ProgressSummary};
pub use portfolio::{exercises_with_progress, PortfolioEntry};
pub use logbook::{ExerciseUpdate, Logbook, NewSet, SessionUpdate, SetUpdate};
pub use export::export_history_csv;
