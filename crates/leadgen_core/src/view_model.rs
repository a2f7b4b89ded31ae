use crate::{Record, RecordId, Status};

/// Outcome of the last add-URLs intent.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AddStats {
    pub added: usize,
    /// Already present in the active list (or repeated within the batch).
    pub skipped_duplicate: usize,
    /// Already attempted in a previous session.
    pub skipped_history: usize,
}

/// Derived on every read, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Stats {
    pub total: usize,
    pub processed: usize,
    pub found: usize,
    /// Percentage of processed records with at least one email, rounded.
    pub success_rate: u32,
}

impl Stats {
    pub fn from_records<'a, I>(records: I) -> Self
    where
        I: IntoIterator<Item = &'a Record>,
    {
        let mut stats = Stats::default();
        for record in records {
            stats.total += 1;
            if record.status.is_terminal() {
                stats.processed += 1;
            }
            if record.has_emails() {
                stats.found += 1;
            }
        }
        if stats.processed > 0 {
            let rate = stats.found as f64 * 100.0 / stats.processed as f64;
            stats.success_rate = rate.round() as u32;
        }
        stats
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppViewModel {
    pub records: Vec<RecordRow>,
    pub stats: Stats,
    pub running: bool,
    pub audience: String,
    pub history_len: usize,
    pub last_add_stats: Option<AddStats>,
    pub notice: Option<String>,
    pub dirty: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordRow {
    pub record_id: RecordId,
    pub url: String,
    pub status: Status,
    pub emails: Vec<String>,
    pub error: Option<String>,
}

impl RecordRow {
    pub fn emails_joined(&self) -> String {
        self.emails.join(", ")
    }
}

impl From<&Record> for RecordRow {
    fn from(record: &Record) -> Self {
        Self {
            record_id: record.id,
            url: record.url.clone(),
            status: record.status,
            emails: record.emails.clone(),
            error: record.error.clone(),
        }
    }
}
