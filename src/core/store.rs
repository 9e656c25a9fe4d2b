//! Purpose: Local persistent roster slot used when no remote endpoint is set.
//! Exports: `RecordStore`.
//! Role: Durable key-value slot holding the full serialized roster array.
//! Invariants: Every operation rewrites and returns the whole array; the
//! slot is never partially written (temp file + rename under a file lock).
//! Invariants: Deleted ids are never reused; new ids carry a time suffix.

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use fs2::FileExt;

use crate::core::error::{Error, ErrorKind};
use crate::core::record::{StudentRecord, seed_roster};

const SLOT_FILE: &str = "roster.json";
const LOCK_FILE: &str = "roster.lock";

pub struct RecordStore {
    slot_path: PathBuf,
    lock_path: PathBuf,
    simulated_latency: Option<Duration>,
}

impl RecordStore {
    pub fn open(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        Self {
            slot_path: data_dir.join(SLOT_FILE),
            lock_path: data_dir.join(LOCK_FILE),
            simulated_latency: None,
        }
    }

    /// Fixed per-operation delay for timing parity with the remote path.
    /// Cosmetic only; no behavior depends on it.
    pub fn with_simulated_latency(mut self, latency: Option<Duration>) -> Self {
        self.simulated_latency = latency;
        self
    }

    pub fn slot_path(&self) -> &Path {
        &self.slot_path
    }

    /// Read the stored roster, initializing the slot with the seed dataset
    /// on first access.
    pub fn read(&self) -> Result<Vec<StudentRecord>, Error> {
        self.simulate_latency();
        let _lock = self.lock_slot()?;
        self.load_or_seed()
    }

    /// Replace the entry matching the record's `id` in place, or assign a
    /// fresh unique id and append. Returns the full resulting roster.
    pub fn write(&self, record: &StudentRecord) -> Result<Vec<StudentRecord>, Error> {
        self.simulate_latency();
        let _lock = self.lock_slot()?;
        let mut roster = self.load_or_seed()?;

        let existing = if record.id.is_empty() {
            None
        } else {
            roster.iter().position(|entry| entry.id == record.id)
        };
        match existing {
            Some(position) => {
                roster[position] = record.clone();
            }
            None => {
                let mut fresh = record.clone();
                fresh.id = next_record_id(roster.len())?;
                roster.push(fresh);
            }
        }

        self.persist(&roster)?;
        Ok(roster)
    }

    /// Filter out the matching entry. Absent ids are a no-op, so a repeated
    /// delete yields the same roster.
    pub fn remove(&self, id: &str) -> Result<Vec<StudentRecord>, Error> {
        self.simulate_latency();
        let _lock = self.lock_slot()?;
        let mut roster = self.load_or_seed()?;
        roster.retain(|entry| entry.id != id);
        self.persist(&roster)?;
        Ok(roster)
    }

    fn load_or_seed(&self) -> Result<Vec<StudentRecord>, Error> {
        match fs::read(&self.slot_path) {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|err| {
                Error::new(ErrorKind::Corrupt)
                    .with_message(format!(
                        "roster slot is not a valid record array: {}",
                        self.slot_path.display()
                    ))
                    .with_source(err)
            }),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.slot_path.display(), "initializing roster slot with seed dataset");
                let seed = seed_roster();
                self.persist(&seed)?;
                Ok(seed)
            }
            Err(err) => Err(Error::new(ErrorKind::Io)
                .with_message(format!(
                    "failed to read roster slot: {}",
                    self.slot_path.display()
                ))
                .with_source(err)),
        }
    }

    fn persist(&self, roster: &[StudentRecord]) -> Result<(), Error> {
        let bytes = serde_json::to_vec_pretty(roster).map_err(|err| {
            Error::new(ErrorKind::Internal)
                .with_message("failed to encode roster slot")
                .with_source(err)
        })?;
        let tmp_path = self.slot_path.with_extension("json.tmp");
        fs::write(&tmp_path, bytes).map_err(|err| {
            Error::new(ErrorKind::Io)
                .with_message(format!(
                    "failed to write roster slot: {}",
                    tmp_path.display()
                ))
                .with_source(err)
        })?;
        fs::rename(&tmp_path, &self.slot_path).map_err(|err| {
            Error::new(ErrorKind::Io)
                .with_message(format!(
                    "failed to replace roster slot: {}",
                    self.slot_path.display()
                ))
                .with_source(err)
        })
    }

    fn lock_slot(&self) -> Result<File, Error> {
        if let Some(parent) = self.lock_path.parent() {
            fs::create_dir_all(parent).map_err(|err| {
                Error::new(ErrorKind::Io)
                    .with_message(format!("failed to create data dir: {}", parent.display()))
                    .with_source(err)
            })?;
        }
        let lock = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&self.lock_path)
            .map_err(|err| {
                Error::new(ErrorKind::Io)
                    .with_message(format!(
                        "failed to open slot lock: {}",
                        self.lock_path.display()
                    ))
                    .with_source(err)
            })?;
        lock.lock_exclusive().map_err(|err| {
            Error::new(ErrorKind::Io)
                .with_message(format!(
                    "failed to lock roster slot: {}",
                    self.lock_path.display()
                ))
                .with_source(err)
        })?;
        Ok(lock)
    }

    fn simulate_latency(&self) {
        if let Some(latency) = self.simulated_latency {
            std::thread::sleep(latency);
        }
    }
}

/// Sequence number plus a time-based suffix, so ids stay unique even after
/// deletions shrink the roster.
fn next_record_id(roster_len: usize) -> Result<String, Error> {
    Ok(format!("S{:03}-{}", roster_len + 1, now_ms()?))
}

fn now_ms() -> Result<u64, Error> {
    let duration = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|err| {
            Error::new(ErrorKind::Internal)
                .with_message("time went backwards")
                .with_source(err)
        })?;
    Ok(duration.as_millis() as u64)
}

#[cfg(test)]
mod tests {
    use super::RecordStore;
    use crate::core::error::ErrorKind;
    use crate::core::record::{StudentRecord, seed_roster};
    use tempfile::tempdir;

    fn new_record(student_id: &str, name: &str) -> StudentRecord {
        StudentRecord {
            student_id: student_id.to_string(),
            student_name: name.to_string(),
            roll_no: "77".to_string(),
            ..StudentRecord::default()
        }
    }

    #[test]
    fn first_read_seeds_the_slot() {
        let dir = tempdir().expect("tempdir");
        let store = RecordStore::open(dir.path());
        let roster = store.read().expect("read");
        assert_eq!(roster, seed_roster());
        assert!(store.slot_path().exists());
    }

    #[test]
    fn write_without_id_appends_with_fresh_id() {
        let dir = tempdir().expect("tempdir");
        let store = RecordStore::open(dir.path());
        let before = store.read().expect("read");

        let roster = store.write(&new_record("S010", "Asha Verma")).expect("write");
        assert_eq!(roster.len(), before.len() + 1);
        let added = roster.last().expect("appended record");
        assert!(added.id.starts_with("S005-"), "unexpected id {}", added.id);
        assert!(before.iter().all(|entry| entry.id != added.id));
    }

    #[test]
    fn write_with_existing_id_replaces_in_place() {
        let dir = tempdir().expect("tempdir");
        let store = RecordStore::open(dir.path());
        let before = store.read().expect("read");

        let mut edited = before[1].clone();
        edited.student_name = "Priya S. Singh".to_string();
        let roster = store.write(&edited).expect("write");

        assert_eq!(roster.len(), before.len());
        assert_eq!(roster[1].student_name, "Priya S. Singh");
        assert_eq!(roster[1].id, before[1].id);
        // Neighbors keep their positions.
        assert_eq!(roster[0], before[0]);
        assert_eq!(roster[2], before[2]);
    }

    #[test]
    fn write_with_unknown_id_appends_under_fresh_id() {
        let dir = tempdir().expect("tempdir");
        let store = RecordStore::open(dir.path());
        let before = store.read().expect("read");

        let mut record = new_record("S011", "Kiran Rao");
        record.id = "no-such-id".to_string();
        let roster = store.write(&record).expect("write");
        assert_eq!(roster.len(), before.len() + 1);
        assert_ne!(roster.last().expect("appended").id, "no-such-id");
    }

    #[test]
    fn remove_is_idempotent() {
        let dir = tempdir().expect("tempdir");
        let store = RecordStore::open(dir.path());
        store.read().expect("seed");

        let once = store.remove("2").expect("remove");
        assert_eq!(once.len(), 3);
        let twice = store.remove("2").expect("remove again");
        assert_eq!(twice, once);
    }

    #[test]
    fn roster_survives_reopen() {
        let dir = tempdir().expect("tempdir");
        {
            let store = RecordStore::open(dir.path());
            store.write(&new_record("S010", "Asha Verma")).expect("write");
        }
        let store = RecordStore::open(dir.path());
        let roster = store.read().expect("read");
        assert_eq!(roster.len(), 5);
        assert_eq!(roster[4].student_name, "Asha Verma");
    }

    #[test]
    fn corrupt_slot_surfaces_corrupt_error() {
        let dir = tempdir().expect("tempdir");
        let store = RecordStore::open(dir.path());
        store.read().expect("seed");
        std::fs::write(store.slot_path(), b"not json").expect("scribble");
        let err = store.read().expect_err("corrupt");
        assert_eq!(err.kind(), ErrorKind::Corrupt);
    }
}
