//! Shared fixtures for run lifecycle tests

#![allow(dead_code)]

use ayah_bot::checkpoint::{Checkpoint, CheckpointStore};
use ayah_bot::delivery::{Delivery, DeliveryOutcome};
use ayah_bot::error::PersistenceError;
use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

pub const HEADER: &str = "surah_no,surah_name_en,ayah_no_surah,ayah_ar,ayah_en";

/// Delivery stub that replays a script of outcomes.
///
/// Once the script runs down to its last entry, that entry repeats forever.
pub struct ScriptedDelivery {
    script: Mutex<VecDeque<DeliveryOutcome>>,
    sent: Mutex<Vec<String>>,
}

impl ScriptedDelivery {
    pub fn new(script: Vec<DeliveryOutcome>) -> Self {
        assert!(!script.is_empty(), "script needs at least one outcome");
        Self {
            script: Mutex::new(script.into()),
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn always(outcome: DeliveryOutcome) -> Self {
        Self::new(vec![outcome])
    }

    /// Every message handed to `send`, in order
    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }

    pub fn send_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

impl Delivery for ScriptedDelivery {
    fn send(&self, message: &str, _destination: &str) -> DeliveryOutcome {
        self.sent.lock().unwrap().push(message.to_string());
        let mut script = self.script.lock().unwrap();
        if script.len() > 1 {
            script.pop_front().unwrap()
        } else {
            script.front().cloned().unwrap()
        }
    }
}

/// In-process checkpoint store.
///
/// Writes can be made to fail, which exercises the path where delivery was
/// confirmed but progress could not be saved.
#[derive(Debug, Default)]
pub struct MemoryCheckpointStore {
    inner: Mutex<MemoryInner>,
}

#[derive(Debug, Default)]
struct MemoryInner {
    stored: Option<Checkpoint>,
    writes: usize,
    fail_writes: bool,
}

impl MemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_checkpoint(checkpoint: Checkpoint) -> Self {
        let store = Self::default();
        store.lock().stored = Some(checkpoint);
        store
    }

    /// Make every subsequent `write` fail
    pub fn fail_writes(&self, fail: bool) {
        self.lock().fail_writes = fail;
    }

    /// Number of successful writes
    pub fn write_count(&self) -> usize {
        self.lock().writes
    }

    fn lock(&self) -> MutexGuard<'_, MemoryInner> {
        self.inner.lock().unwrap()
    }
}

impl CheckpointStore for MemoryCheckpointStore {
    fn read(&self) -> Result<Checkpoint, PersistenceError> {
        Ok(self.lock().stored.clone().unwrap_or_default())
    }

    fn write(&self, checkpoint: &Checkpoint) -> Result<(), PersistenceError> {
        let mut inner = self.lock();
        if inner.fail_writes {
            return Err(PersistenceError::Unavailable(
                "writes disabled on memory store".to_string(),
            ));
        }
        inner.stored = Some(checkpoint.clone());
        inner.writes += 1;
        Ok(())
    }
}

/// Write a dataset whose verses carry the given Arabic texts, in order
pub fn write_dataset(dir: &Path, texts: &[&str]) -> PathBuf {
    let path = dir.join("quran_dataset.csv");
    let mut csv = format!("{HEADER}\n");
    for (i, text) in texts.iter().enumerate() {
        csv.push_str(&format!("1,Al-Test,{},{text},translation {i}\n", i + 1));
    }
    fs::write(&path, csv).unwrap();
    path
}
