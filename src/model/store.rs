//! Durable storage for the whole poll collection.
//!
//! The collection is always read and written as one snapshot: loaded in full
//! at startup, saved in full after every successful mutation.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
#[cfg(test)]
use std::sync::{Arc, Mutex};

use log::{debug, info};
use rocket::serde::json::serde_json;
use thiserror::Error;

use super::poll::Poll;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Snapshot I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("Snapshot is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Somewhere to keep the poll collection between runs.
pub trait SnapshotStore: Send {
    /// Read the full collection. An absent snapshot is an empty collection.
    fn load(&self) -> Result<Vec<Poll>, StoreError>;

    /// Replace the stored collection with `polls`.
    fn save(&mut self, polls: &[Poll]) -> Result<(), StoreError>;
}

/// A snapshot kept as a JSON array in a single file.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sibling file that a save is written to before being moved into place.
    fn staging_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl SnapshotStore for JsonFileStore {
    fn load(&self) -> Result<Vec<Poll>, StoreError> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!("No snapshot at {}, starting empty", self.path.display());
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };
        let polls: Vec<Poll> = serde_json::from_reader(BufReader::new(file))?;
        info!("Loaded {} polls from {}", polls.len(), self.path.display());
        Ok(polls)
    }

    fn save(&mut self, polls: &[Poll]) -> Result<(), StoreError> {
        // Write the whole snapshot aside, then rename over the old one, so a
        // crash mid-write never leaves a truncated file behind.
        let staging = self.staging_path();
        {
            let mut writer = BufWriter::new(File::create(&staging)?);
            serde_json::to_writer(&mut writer, polls)?;
            writer.flush()?;
        }
        fs::rename(&staging, &self.path)?;
        debug!("Saved {} polls to {}", polls.len(), self.path.display());
        Ok(())
    }
}

/// An in-process store for tests. Clones share the same contents, so a test can keep
/// one handle and inspect what the ledger saved through another.
#[cfg(test)]
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<MemoryContents>>,
}

#[cfg(test)]
#[derive(Debug, Default)]
struct MemoryContents {
    polls: Vec<Poll>,
    saves: usize,
}

#[cfg(test)]
impl MemoryStore {
    /// A store pre-populated with `polls`.
    pub fn with_polls(polls: Vec<Poll>) -> Self {
        let store = Self::default();
        store.lock().polls = polls;
        store
    }

    /// The last saved collection.
    pub fn polls(&self) -> Vec<Poll> {
        self.lock().polls.clone()
    }

    /// How many times the collection has been saved.
    pub fn saves(&self) -> usize {
        self.lock().saves
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryContents> {
        // A poisoned lock still holds a complete snapshot; keep using it.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
impl SnapshotStore for MemoryStore {
    fn load(&self) -> Result<Vec<Poll>, StoreError> {
        Ok(self.polls())
    }

    fn save(&mut self, polls: &[Poll]) -> Result<(), StoreError> {
        let mut contents = self.lock();
        contents.polls = polls.to_vec();
        contents.saves += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::model::poll::{Candidate, Voter, PLACEHOLDER_PHOTO};

    fn temp_path() -> PathBuf {
        let random: u32 = rand::random();
        std::env::temp_dir().join(format!("poll-ledger-store-{random}.json"))
    }

    fn sample_polls() -> Vec<Poll> {
        let now = Utc::now();
        let mut poll = Poll::new("Sample".into(), "Round trip".into(), now, now);
        let mut candidate = Candidate::new("Alice".into(), "m".into(), None, PLACEHOLDER_PHOTO);
        candidate.votes = 3;
        poll.candidates.push(candidate);
        let mut voter = Voter::new("Vic".into(), "v1".into());
        voter.has_voted = true;
        poll.voters.push(voter);
        let empty = Poll::new("Empty".into(), "".into(), now, now);
        vec![poll, empty]
    }

    #[test]
    fn missing_file_loads_empty() {
        let store = JsonFileStore::new(temp_path());
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn file_round_trip() {
        let path = temp_path();
        let mut store = JsonFileStore::new(&path);
        let polls = sample_polls();

        store.save(&polls).unwrap();
        assert!(!store.staging_path().exists());
        let loaded = JsonFileStore::new(&path).load().unwrap();
        assert_eq!(loaded, polls);

        // A second save replaces the first.
        store.save(&polls[1..]).unwrap();
        assert_eq!(store.load().unwrap(), &polls[1..]);

        fs::remove_file(path).unwrap();
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let path = temp_path();
        fs::write(&path, "{ not json").unwrap();
        let result = JsonFileStore::new(&path).load();
        assert!(matches!(result, Err(StoreError::Json(_))));
        fs::remove_file(path).unwrap();
    }

    #[test]
    fn memory_store_counts_saves() {
        let polls = sample_polls();
        let store = MemoryStore::with_polls(polls.clone());
        assert_eq!(store.load().unwrap(), polls);
        assert_eq!(store.saves(), 0);

        let mut handle = store.clone();
        handle.save(&polls[..1]).unwrap();
        assert_eq!(store.saves(), 1);
        assert_eq!(store.polls(), &polls[..1]);
    }
}
