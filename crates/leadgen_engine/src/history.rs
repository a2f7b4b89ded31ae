use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;

use engine_logging::{engine_info, engine_warn};
use thiserror::Error;

use crate::persist::{AtomicFileWriter, PersistError};

pub const HISTORY_FILENAME: &str = "leadgen_history.json";

/// Normalized website -> emails found for it (empty when nothing was found).
pub type HistoryMap = BTreeMap<String, Vec<String>>;

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("failed to read history from {path}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("failed to encode history: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("failed to write history: {0}")]
    Write(#[from] PersistError),
}

/// Where previously attempted websites are kept between sessions.
pub trait HistoryStore: Send + Sync {
    fn load(&self) -> Result<HistoryMap, HistoryError>;
    /// Replace the stored history with `entries` as a single write.
    fn store(&self, entries: &HistoryMap) -> Result<(), HistoryError>;
}

/// One JSON object in the data directory, rewritten atomically on every store.
#[derive(Debug, Clone)]
pub struct JsonFileHistoryStore {
    writer: AtomicFileWriter,
}

impl JsonFileHistoryStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            writer: AtomicFileWriter::new(data_dir),
        }
    }

    pub fn path(&self) -> PathBuf {
        self.writer.dir().join(HISTORY_FILENAME)
    }
}

impl HistoryStore for JsonFileHistoryStore {
    fn load(&self) -> Result<HistoryMap, HistoryError> {
        let path = self.path();
        let content = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(HistoryMap::new()),
            Err(source) => return Err(HistoryError::Read { path, source }),
        };
        match serde_json::from_str::<HistoryMap>(&content) {
            Ok(entries) => {
                engine_info!("Loaded {} history entries from {:?}", entries.len(), path);
                Ok(entries)
            }
            Err(err) => {
                engine_warn!("Ignoring unreadable history file {:?}: {}", path, err);
                Ok(HistoryMap::new())
            }
        }
    }

    fn store(&self, entries: &HistoryMap) -> Result<(), HistoryError> {
        let content = serde_json::to_vec_pretty(entries)?;
        let path = self.writer.write(HISTORY_FILENAME, &content)?;
        engine_info!("Saved {} history entries to {:?}", entries.len(), path);
        Ok(())
    }
}

/// Keeps history in memory; used where no file should be touched.
#[derive(Debug, Default)]
pub struct InMemoryHistoryStore {
    entries: Mutex<HistoryMap>,
}

impl InMemoryHistoryStore {
    pub fn new(entries: HistoryMap) -> Self {
        Self {
            entries: Mutex::new(entries),
        }
    }
}

impl HistoryStore for InMemoryHistoryStore {
    fn load(&self) -> Result<HistoryMap, HistoryError> {
        Ok(lock(&self.entries).clone())
    }

    fn store(&self, entries: &HistoryMap) -> Result<(), HistoryError> {
        *lock(&self.entries) = entries.clone();
        Ok(())
    }
}

fn lock(entries: &Mutex<HistoryMap>) -> std::sync::MutexGuard<'_, HistoryMap> {
    entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
