//! High score persistence
//!
//! The engine only needs a single best score. Storage is a collaborator so the
//! driver can keep it in a JSON file while tests and embedders keep it in memory.
//! Loading and saving never fail the game: problems are logged and ignored.

use std::cell::Cell;
use std::path::{Path as FsPath, PathBuf};
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Where the best score lives between runs
pub trait HighScoreStore {
    /// Best score so far, 0 when nothing was stored
    fn load_high_score(&self) -> u64;
    /// Persist a new best score (fire and forget)
    fn save_high_score(&mut self, score: u64);
}

impl<S: HighScoreStore + ?Sized> HighScoreStore for Box<S> {
    fn load_high_score(&self) -> u64 {
        (**self).load_high_score()
    }

    fn save_high_score(&mut self, score: u64) {
        (**self).save_high_score(score)
    }
}

/// In-memory store. Clones share the same value, so a test can keep one handle
/// and give the other to an engine.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    value: Rc<Cell<u64>>,
    saves: Rc<Cell<u32>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_score(score: u64) -> Self {
        let store = Self::default();
        store.value.set(score);
        store
    }

    /// Number of saves received
    pub fn save_count(&self) -> u32 {
        self.saves.get()
    }
}

impl HighScoreStore for MemoryStore {
    fn load_high_score(&self) -> u64 {
        self.value.get()
    }

    fn save_high_score(&mut self, score: u64) {
        self.value.set(score);
        self.saves.set(self.saves.get() + 1);
    }
}

/// On-disk record
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HighScoreRecord {
    pub high_score: u64,
}

/// JSON file store
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &FsPath {
        &self.path
    }

    /// Read the record, surfacing any error
    pub fn try_load(&self) -> Result<HighScoreRecord> {
        let json = std::fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Write the record, surfacing any error
    pub fn try_save(&self, record: &HighScoreRecord) -> Result<()> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)?;
        }
        let json = serde_json::to_string_pretty(record)?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }
}

impl HighScoreStore for JsonFileStore {
    fn load_high_score(&self) -> u64 {
        if !self.path.exists() {
            log::info!("No high score at {}, starting fresh", self.path.display());
            return 0;
        }
        match self.try_load() {
            Ok(record) => {
                log::info!("Loaded high score {}", record.high_score);
                record.high_score
            }
            Err(e) => {
                log::warn!("Failed to read high score from {}: {}", self.path.display(), e);
                0
            }
        }
    }

    fn save_high_score(&mut self, score: u64) {
        match self.try_save(&HighScoreRecord { high_score: score }) {
            Ok(()) => log::info!("High score {} saved", score),
            Err(e) => log::warn!("Failed to save high score to {}: {}", self.path.display(), e),
        }
    }
}
