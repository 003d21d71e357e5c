use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use liftlog_core::*;
use serde::Serialize;
use std::path::PathBuf;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "liftlog")]
#[command(about = "Workout log with strength progress tracking", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Use a specific config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// User to act as (falls back to [user] id in the config)
    #[arg(long, global = true, env = "LIFTLOG_USER")]
    user: Option<String>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Debug logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage exercises
    Exercise {
        #[command(subcommand)]
        action: ExerciseCommand,
    },

    /// Manage presets
    Preset {
        #[command(subcommand)]
        action: PresetCommand,
    },

    /// Show the session on DATE
    Show { date: NaiveDate },

    /// Set the memo or rest-day flag of the session on DATE
    Session {
        date: NaiveDate,

        /// Session memo; an empty string clears it
        #[arg(long)]
        memo: Option<String>,

        /// Mark the day as a rest day (true/false)
        #[arg(long)]
        rest_day: Option<bool>,
    },

    /// Add an exercise to the session on DATE, prefilled with last time's sets
    AddExercise { date: NaiveDate, exercise_id: Uuid },

    /// Remove an exercise and its sets from the session on DATE
    RemoveExercise { date: NaiveDate, exercise_id: Uuid },

    /// Set the memo of an exercise in the session on DATE; omit to clear
    Memo {
        date: NaiveDate,
        exercise_id: Uuid,
        memo: Option<String>,
    },

    /// Add a preset's exercises to the session on DATE
    ApplyPreset { date: NaiveDate, preset_id: Uuid },

    /// Record a set, written as WEIGHTxREPS[@RPE] (e.g. 80x5@8)
    Log {
        date: NaiveDate,
        exercise_id: Uuid,
        set: String,
    },

    /// Replace the values of a recorded set, written as WEIGHTxREPS[@RPE]
    EditSet {
        date: NaiveDate,
        exercise_id: Uuid,
        set_number: u32,
        set: String,
    },

    /// Record the duration of a cardio exercise
    Cardio {
        date: NaiveDate,
        exercise_id: Uuid,
        minutes: u32,
    },

    /// Remove a set and renumber the remaining ones
    RemoveSet {
        date: NaiveDate,
        exercise_id: Uuid,
        set_number: u32,
    },

    /// Delete the whole session on DATE
    DeleteSession { date: NaiveDate },

    /// Show history and progress for one exercise
    Progress {
        exercise_id: Uuid,

        /// Also export the history as CSV
        #[arg(long)]
        csv: Option<PathBuf>,
    },

    /// Show progress for every exercise, most trained first
    Portfolio,
}

#[derive(Subcommand)]
enum ExerciseCommand {
    /// Create an exercise
    Add {
        name: String,

        /// Record a duration instead of sets
        #[arg(long)]
        cardio: bool,

        /// chest, back, legs, shoulders, arms or core
        #[arg(long)]
        body_part: Option<String>,
    },

    /// Rename or retag an exercise
    Edit {
        exercise_id: Uuid,

        #[arg(long)]
        name: Option<String>,

        /// Switch to a duration-based exercise
        #[arg(long, conflicts_with = "strength")]
        cardio: bool,

        /// Switch to a set-based exercise
        #[arg(long)]
        strength: bool,

        /// chest, back, legs, shoulders, arms or core
        #[arg(long)]
        body_part: Option<String>,
    },

    /// Delete an exercise no session has recorded
    Delete { exercise_id: Uuid },

    /// List exercises
    List,
}

#[derive(Subcommand)]
enum PresetCommand {
    /// Create a preset from an ordered list of exercises
    Add {
        name: String,
        #[arg(required = true)]
        exercise_ids: Vec<Uuid>,
    },

    /// Rename a preset
    Rename { preset_id: Uuid, name: String },

    /// Append exercises to a preset
    AddExercises {
        preset_id: Uuid,
        #[arg(required = true)]
        exercise_ids: Vec<Uuid>,
    },

    /// Remove an exercise from a preset
    RemoveExercise { preset_id: Uuid, exercise_id: Uuid },

    /// Move the given exercises to the front of a preset, in order
    Reorder {
        preset_id: Uuid,
        #[arg(required = true)]
        exercise_ids: Vec<Uuid>,
    },

    /// Delete a preset no session uses
    Delete { preset_id: Uuid },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    liftlog_core::logging::init_with_level(if cli.verbose { "debug" } else { "warn" });

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    let data_dir = cli
        .data_dir
        .clone()
        .unwrap_or_else(|| config.data.data_dir.clone());
    let user = cli
        .user
        .as_deref()
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .map(UserId::new)
        .or_else(|| config.user_id());

    tracing::debug!("Using data directory {:?}", data_dir);
    let store = FileStore::new(data_dir);
    let out = Output { json: cli.json };

    match cli.command {
        Commands::Exercise { action } => cmd_exercise(store, user.as_ref(), action, &out),
        Commands::Preset { action } => cmd_preset(store, user.as_ref(), action, &out),
        Commands::Show { date } => {
            let session = Logbook::open(store).session(user.as_ref(), date)?;
            out.emit(&session, || match &session {
                Some(session) => display_session(session),
                None => println!("No session on {}", date),
            })
        }
        Commands::Session {
            date,
            memo,
            rest_day,
        } => {
            let changes = SessionUpdate {
                memo: memo.map(Some),
                is_rest_day: rest_day,
            };
            let session = Logbook::open(store).update_session(user.as_ref(), date, changes)?;
            out.emit(&session, || println!("✓ Updated session {}", session.date))
        }
        Commands::AddExercise { date, exercise_id } => {
            let session =
                Logbook::open(store).add_exercise_to_session(user.as_ref(), date, exercise_id)?;
            out.emit(&session, || {
                println!(
                    "✓ Session {} now has {} exercises",
                    session.date,
                    session.exercises.len()
                )
            })
        }
        Commands::RemoveExercise { date, exercise_id } => {
            let session = Logbook::open(store).remove_exercise_from_session(
                user.as_ref(),
                date,
                exercise_id,
            )?;
            out.emit(&session, || {
                println!("✓ Removed exercise {} from {}", exercise_id, session.date)
            })
        }
        Commands::Memo {
            date,
            exercise_id,
            memo,
        } => {
            Logbook::open(store).update_entry_memo(user.as_ref(), date, exercise_id, memo.clone())?;
            out.emit(&memo, || println!("✓ Updated memo"))
        }
        Commands::ApplyPreset { date, preset_id } => {
            let session = Logbook::open(store).apply_preset(user.as_ref(), date, preset_id)?;
            out.emit(&session, || {
                println!(
                    "✓ Session {} now has {} exercises",
                    session.date,
                    session.exercises.len()
                )
            })
        }
        Commands::Log {
            date,
            exercise_id,
            set,
        } => {
            let new_set: NewSet = set.parse()?;
            let set = Logbook::open(store).add_set(user.as_ref(), date, exercise_id, new_set)?;
            out.emit(&set, || println!("✓ Logged set {}: {}", set.set_number, format_set(&set)))
        }
        Commands::EditSet {
            date,
            exercise_id,
            set_number,
            set,
        } => {
            let new_set: NewSet = set.parse()?;
            let set = Logbook::open(store).update_set(
                user.as_ref(),
                date,
                exercise_id,
                set_number,
                new_set.into(),
            )?;
            out.emit(&set, || println!("✓ Updated set {}: {}", set.set_number, format_set(&set)))
        }
        Commands::Cardio {
            date,
            exercise_id,
            minutes,
        } => {
            Logbook::open(store).set_duration(user.as_ref(), date, exercise_id, minutes)?;
            out.emit(&minutes, || println!("✓ Logged {} minutes", minutes))
        }
        Commands::RemoveSet {
            date,
            exercise_id,
            set_number,
        } => {
            Logbook::open(store).remove_set(user.as_ref(), date, exercise_id, set_number)?;
            out.emit(&set_number, || println!("✓ Removed set {}", set_number))
        }
        Commands::DeleteSession { date } => {
            Logbook::open(store).delete_session(user.as_ref(), date)?;
            out.emit(&date, || println!("✓ Deleted session {}", date))
        }
        Commands::Progress { exercise_id, csv } => {
            cmd_progress(store, user.as_ref(), exercise_id, csv, &out)
        }
        Commands::Portfolio => cmd_portfolio(store, user.as_ref(), &out),
    }
}

/// Chooses between JSON and human-readable output
struct Output {
    json: bool,
}

impl Output {
    fn emit<T: Serialize>(&self, value: &T, text: impl FnOnce()) -> Result<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(value)?);
        } else {
            text();
        }
        Ok(())
    }
}

fn cmd_exercise(
    store: FileStore,
    user: Option<&UserId>,
    action: ExerciseCommand,
    out: &Output,
) -> Result<()> {
    match action {
        ExerciseCommand::Add {
            name,
            cardio,
            body_part,
        } => {
            let kind = if cardio {
                ExerciseKind::Cardio
            } else {
                ExerciseKind::Strength
            };
            let body_part = body_part.map(|b| b.parse::<BodyPart>()).transpose()?;
            let exercise = Logbook::open(store).create_exercise(user, &name, kind, body_part)?;
            out.emit(&exercise, || {
                println!("✓ Created exercise {} ({})", exercise.name, exercise.id)
            })
        }
        ExerciseCommand::Edit {
            exercise_id,
            name,
            cardio,
            strength,
            body_part,
        } => {
            let kind = match (cardio, strength) {
                (true, _) => Some(ExerciseKind::Cardio),
                (_, true) => Some(ExerciseKind::Strength),
                _ => None,
            };
            let body_part = body_part
                .map(|b| b.parse::<BodyPart>())
                .transpose()?
                .map(Some);
            let changes = ExerciseUpdate {
                name,
                kind,
                body_part,
            };
            let exercise = Logbook::open(store).update_exercise(user, exercise_id, changes)?;
            out.emit(&exercise, || {
                println!("✓ Updated exercise {} ({})", exercise.name, exercise.id)
            })
        }
        ExerciseCommand::Delete { exercise_id } => {
            Logbook::open(store).delete_exercise(user, exercise_id)?;
            out.emit(&exercise_id, || println!("✓ Deleted exercise {}", exercise_id))
        }
        ExerciseCommand::List => {
            let user = require_user(user)?;
            let exercises = store.list_exercises(user)?;
            out.emit(&exercises, || {
                if exercises.is_empty() {
                    println!("No exercises yet.");
                }
                for e in &exercises {
                    println!("  {}  {} ({:?})", e.id, e.name, e.kind);
                }
            })
        }
    }
}

fn cmd_preset(
    store: FileStore,
    user: Option<&UserId>,
    action: PresetCommand,
    out: &Output,
) -> Result<()> {
    let logbook = Logbook::open(store);
    let (preset, verb) = match action {
        PresetCommand::Add { name, exercise_ids } => {
            (logbook.create_preset(user, &name, &exercise_ids)?, "Created")
        }
        PresetCommand::Rename { preset_id, name } => {
            (logbook.rename_preset(user, preset_id, &name)?, "Renamed")
        }
        PresetCommand::AddExercises {
            preset_id,
            exercise_ids,
        } => (
            logbook.add_exercises_to_preset(user, preset_id, &exercise_ids)?,
            "Updated",
        ),
        PresetCommand::RemoveExercise {
            preset_id,
            exercise_id,
        } => (
            logbook.remove_exercise_from_preset(user, preset_id, exercise_id)?,
            "Updated",
        ),
        PresetCommand::Reorder {
            preset_id,
            exercise_ids,
        } => (
            logbook.reorder_preset(user, preset_id, &exercise_ids)?,
            "Reordered",
        ),
        PresetCommand::Delete { preset_id } => {
            logbook.delete_preset(user, preset_id)?;
            return out.emit(&preset_id, || println!("✓ Deleted preset {}", preset_id));
        }
    };

    out.emit(&preset, || {
        println!(
            "✓ {} preset {} ({}, {} exercises)",
            verb,
            preset.name,
            preset.id,
            preset.exercise_ids.len()
        )
    })
}

fn cmd_progress(
    store: FileStore,
    user: Option<&UserId>,
    exercise_id: Uuid,
    csv: Option<PathBuf>,
    out: &Output,
) -> Result<()> {
    let snapshot = store.snapshot()?;
    let outcome = compute_progress(&snapshot, user, exercise_id)?;

    let Some(progress) = outcome.progress() else {
        eprintln!("Exercise not found: {}", exercise_id);
        return Err(Error::NotFound(format!("exercise {}", exercise_id)));
    };

    if let Some(path) = csv {
        let rows = export_history_csv(progress, &path)?;
        if !out.json {
            println!("✓ Exported {} sets to {}", rows, path.display());
        }
    }

    out.emit(&outcome, || display_progress(progress))
}

fn cmd_portfolio(store: FileStore, user: Option<&UserId>, out: &Output) -> Result<()> {
    let snapshot = store.snapshot()?;
    let entries = exercises_with_progress(&snapshot, user)?;

    out.emit(&entries, || {
        if entries.is_empty() {
            println!("No exercises yet.");
        }
        for entry in &entries {
            println!(
                "  {:<24} {:>3} sessions  max {:>8}  e1RM {:>8}  trend {}",
                entry.exercise.name,
                entry.session_count,
                format_kg(entry.max_weight),
                format_kg(entry.max_one_rm),
                format_percent(entry.weight_progress_percent)
            );
        }
    })
}

fn display_progress(progress: &ExerciseProgress) {
    let summary = &progress.summary;
    println!();
    println!("  {} ({:?})", progress.exercise.name, progress.exercise.kind);
    println!();

    if progress.history.is_empty() {
        println!("  No sets recorded yet.");
        println!();
        return;
    }

    println!("  Sessions:       {}", summary.total_sessions);
    println!("  Current max:    {}", format_kg(summary.current_max_weight));
    println!("  All-time max:   {}", format_kg(summary.all_time_max_weight));
    println!("  Current e1RM:   {}", format_kg(summary.current_estimated_one_rm));
    println!("  All-time e1RM:  {}", format_kg(summary.all_time_max_one_rm));
    println!("  Weight trend:   {}", format_percent(summary.weight_progress_percent));
    println!("  Volume trend:   {}", format_percent(summary.volume_progress_percent));
    println!();

    for entry in &progress.history {
        println!(
            "  {}  max {:>8}  volume {:>8.1}  e1RM {:>8}",
            entry.date,
            format_kg(entry.max_weight),
            entry.total_volume,
            format_kg(entry.estimated_one_rm)
        );
    }
    println!();
}

fn display_session(session: &SessionRecord) {
    println!();
    print!("  {}", session.date);
    if session.is_rest_day {
        print!("  (rest day)");
    }
    println!();
    if let Some(memo) = &session.memo {
        println!("  {}", memo);
    }

    let mut entries: Vec<_> = session.exercises.iter().collect();
    entries.sort_by_key(|e| e.order);
    for entry in entries {
        println!();
        println!("  {}", entry.exercise_id);
        if let Some(memo) = &entry.memo {
            println!("    {}", memo);
        }
        if let Some(minutes) = entry.duration_minutes {
            println!("    {} minutes", minutes);
        }
        for set in &entry.sets {
            println!("    {}. {}", set.set_number, format_set(set));
        }
    }
    println!();
}

fn format_kg(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{:.1} kg", v))
}

fn format_percent(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{:+.1}%", v))
}

fn format_set(set: &SetRecord) -> String {
    let weight = set.weight.map_or_else(|| "bodyweight".to_string(), |w| format!("{} kg", w));
    let reps = set.reps.map_or_else(|| "?".to_string(), |r| r.to_string());
    match set.rpe {
        Some(rpe) => format!("{} x {} @ RPE {}", weight, reps, rpe),
        None => format!("{} x {}", weight, reps),
    }
}
