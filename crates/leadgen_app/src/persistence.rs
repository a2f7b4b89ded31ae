use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use engine_logging::{engine_info, engine_warn};
use leadgen_core::{History, RecordId, RecordSnapshot, Status};
use leadgen_engine::{AtomicFileWriter, HistoryMap};
use serde::{Deserialize, Serialize};

pub const SESSION_FILENAME: &str = ".leadgen_session.ron";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PersistedRecord {
    #[serde(default)]
    id: RecordId,
    url: String,
    status: String,
    #[serde(default)]
    emails: Vec<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct PersistedSession {
    #[serde(default)]
    audience: String,
    #[serde(default)]
    next_record_id: RecordId,
    #[serde(default)]
    records: Vec<PersistedRecord>,
}

/// Active record list and audience carried between invocations.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Session {
    pub audience: String,
    pub next_record_id: RecordId,
    pub records: Vec<RecordSnapshot>,
}

pub fn load_session(data_dir: &Path) -> Session {
    let path = data_dir.join(SESSION_FILENAME);
    let content = match fs::read_to_string(&path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Session::default(),
        Err(err) => {
            engine_warn!("Failed to read session from {:?}: {}", path, err);
            return Session::default();
        }
    };

    let persisted: PersistedSession = match ron::from_str(&content) {
        Ok(state) => state,
        Err(err) => {
            engine_warn!("Failed to parse session from {:?}: {}", path, err);
            return Session::default();
        }
    };

    let records = persisted
        .records
        .into_iter()
        .map(|record| RecordSnapshot {
            id: record.id,
            status: Status::parse(&record.status).unwrap_or_else(|| {
                engine_warn!("Unknown status {:?} for {}; treating as idle", record.status, record.url);
                Status::Idle
            }),
            url: record.url,
            emails: record.emails,
            error: record.error,
        })
        .collect::<Vec<_>>();

    engine_info!("Loaded session with {} record(s) from {:?}", records.len(), path);
    Session {
        audience: persisted.audience,
        next_record_id: persisted.next_record_id,
        records,
    }
}

pub fn save_session(data_dir: &Path, session: &Session) -> Result<PathBuf> {
    let persisted = PersistedSession {
        audience: session.audience.clone(),
        next_record_id: session.next_record_id,
        records: session
            .records
            .iter()
            .map(|record| PersistedRecord {
                id: record.id,
                url: record.url.clone(),
                status: record.status.as_str().to_string(),
                emails: record.emails.clone(),
                error: record.error.clone(),
            })
            .collect(),
    };

    let content = ron::ser::to_string_pretty(&persisted, ron::ser::PrettyConfig::new())
        .context("serializing session")?;
    AtomicFileWriter::new(data_dir)
        .write(SESSION_FILENAME, content.as_bytes())
        .with_context(|| format!("writing session to {}", data_dir.display()))
}

pub fn history_from_map(entries: HistoryMap) -> History {
    History::from_entries(entries)
}

pub fn history_to_map(history: &History) -> HistoryMap {
    history
        .entries()
        .map(|(url, emails)| (url.to_string(), emails.to_vec()))
        .collect()
}
