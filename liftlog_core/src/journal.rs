//! Append-only session journal.
//!
//! Every change to a session appends a full snapshot of that session as one
//! JSON line. Appends hold an exclusive lock on the journal, reads a shared
//! one. Readers fold the snapshots; see [`crate::history::load_sessions`].
//!
//! A writer that died mid-line leaves a torn tail. The next append starts on
//! a fresh line so only the torn fragment is lost.

use crate::{Result, SessionRecord};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Destination for session snapshots
pub trait SessionSink {
    fn append(&mut self, session: &SessionRecord) -> Result<()>;
}

/// JSON Lines file of session snapshots
pub struct JsonlJournal {
    path: PathBuf,
}

impl JsonlJournal {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionSink for JsonlJournal {
    fn append(&mut self, session: &SessionRecord) -> Result<()> {
        let mut record = serde_json::to_vec(session)?;
        record.push(b'\n');

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(&self.path)?;

        file.lock_exclusive()?;
        let written = write_record(&mut file, &record);
        file.unlock()?;
        written?;

        tracing::debug!(
            "Appended snapshot of session {} ({} {}) to journal",
            session.id,
            session.user_id,
            session.date
        );
        Ok(())
    }
}

/// Write one record, first terminating a torn last line if there is one
fn write_record(file: &mut File, record: &[u8]) -> io::Result<()> {
    if !ends_with_newline(file)? {
        tracing::warn!("Journal ends in a partial line; starting a new one");
        file.write_all(b"\n")?;
    }
    file.write_all(record)?;
    file.sync_data()
}

fn ends_with_newline(file: &mut File) -> io::Result<bool> {
    if file.metadata()?.len() == 0 {
        return Ok(true);
    }
    let mut last = [0u8; 1];
    file.seek(SeekFrom::End(-1))?;
    file.read_exact(&mut last)?;
    Ok(last[0] == b'\n')
}

/// Read every snapshot from a journal file, in write order
///
/// Blank lines are ignored. Lines that do not parse (including a torn last
/// line) are skipped with a warning.
pub fn read_snapshots(path: &Path) -> Result<Vec<SessionRecord>> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    file.lock_shared()?;
    let parsed = parse_snapshots(BufReader::new(&file));
    file.unlock()?;

    let snapshots = parsed?;
    tracing::debug!("Read {} snapshots from journal", snapshots.len());
    Ok(snapshots)
}

fn parse_snapshots(reader: impl BufRead) -> io::Result<Vec<SessionRecord>> {
    let mut snapshots = Vec::new();
    for (index, line) in reader.split(b'\n').enumerate() {
        let line = line?;
        if line.iter().all(u8::is_ascii_whitespace) {
            continue;
        }
        match serde_json::from_slice::<SessionRecord>(&line) {
            Ok(session) => snapshots.push(session),
            Err(e) => tracing::warn!("Skipping journal line {}: {}", index + 1, e),
        }
    }
    Ok(snapshots)
}
