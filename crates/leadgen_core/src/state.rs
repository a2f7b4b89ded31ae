use std::collections::{BTreeMap, HashSet};

use crate::view_model::{AddStats, AppViewModel, RecordRow, Stats};
use crate::{History, PendingLookup, Record, RecordId, RecordSnapshot, Status};

pub const RATE_LIMIT_NOTICE: &str =
    "Rate limit reached. The queue is paused; wait a minute, then start again to resume.";

/// Dedupe key for a website: trimmed, lowercased, scheme and trailing slashes removed.
pub fn normalize_url_for_dedupe(url: &str) -> String {
    let lowered = url.trim().to_ascii_lowercase();
    let without_scheme = lowered
        .strip_prefix("https://")
        .or_else(|| lowered.strip_prefix("http://"))
        .unwrap_or(&lowered);
    without_scheme.trim_end_matches('/').to_string()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppState {
    records: BTreeMap<RecordId, Record>,
    next_record_id: RecordId,
    history: History,
    audience: String,
    running: bool,
    last_add_stats: Option<AddStats>,
    notice: Option<String>,
    dirty: bool,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            records: BTreeMap::new(),
            next_record_id: 1,
            history: History::new(),
            audience: String::new(),
            running: false,
            last_add_stats: None,
            notice: None,
            dirty: false,
        }
    }
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn view(&self) -> AppViewModel {
        AppViewModel {
            records: self.records.values().map(RecordRow::from).collect(),
            stats: Stats::from_records(self.records.values()),
            running: self.running,
            audience: self.audience.clone(),
            history_len: self.history.len(),
            last_add_stats: self.last_add_stats.clone(),
            notice: self.notice.clone(),
            dirty: self.dirty,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn audience(&self) -> &str {
        &self.audience
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn record(&self, record_id: RecordId) -> Option<&Record> {
        self.records.get(&record_id)
    }

    pub fn records(&self) -> impl Iterator<Item = &Record> {
        self.records.values()
    }

    /// Id the next added record will get.
    pub fn next_record_id(&self) -> RecordId {
        self.next_record_id
    }

    pub fn session_snapshot(&self) -> Vec<RecordSnapshot> {
        self.records.values().map(RecordSnapshot::from).collect()
    }

    /// Returns whether a render is due and clears the flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub(crate) fn add_urls(&mut self, urls: Vec<String>) -> AddStats {
        let mut active: HashSet<String> = self
            .records
            .values()
            .map(|record| normalize_url_for_dedupe(&record.url))
            .collect();
        let mut stats = AddStats::default();
        for url in urls {
            let url = url.trim().to_string();
            if url.is_empty() {
                continue;
            }
            let key = normalize_url_for_dedupe(&url);
            if active.contains(&key) {
                stats.skipped_duplicate += 1;
            } else if self.history.has(&key) {
                stats.skipped_history += 1;
            } else {
                active.insert(key);
                self.insert_record(url);
                stats.added += 1;
            }
        }
        self.last_add_stats = Some(stats.clone());
        self.mark_dirty();
        stats
    }

    fn insert_record(&mut self, url: String) -> RecordId {
        let id = self.allocate_id();
        self.records.insert(id, Record::new(id, url));
        id
    }

    fn allocate_id(&mut self) -> RecordId {
        let id = self.next_record_id;
        self.next_record_id += 1;
        id
    }

    pub(crate) fn set_audience(&mut self, audience: String) {
        let audience = audience.trim().to_string();
        if audience != self.audience {
            self.audience = audience;
            self.mark_dirty();
        }
    }

    pub(crate) fn restore_history(&mut self, history: History) {
        self.history = history;
        self.mark_dirty();
    }

    /// Reinstate records under their saved ids. Ids are never handed out twice:
    /// the counter moves past both `next_record_id` and every restored id.
    pub(crate) fn restore_session(
        &mut self,
        snapshots: Vec<RecordSnapshot>,
        next_record_id: RecordId,
    ) {
        let highest = snapshots.iter().map(|snapshot| snapshot.id).max().unwrap_or(0);
        self.next_record_id = self
            .next_record_id
            .max(next_record_id)
            .max(highest.saturating_add(1));
        for snapshot in snapshots {
            let id = if snapshot.id == 0 || self.records.contains_key(&snapshot.id) {
                self.allocate_id()
            } else {
                snapshot.id
            };
            let mut record = Record::new(id, snapshot.url);
            record.status = snapshot.status;
            record.emails = snapshot.emails;
            record.error = snapshot.error;
            self.records.insert(id, record);
        }
        self.mark_dirty();
    }

    pub(crate) fn remove_record(&mut self, record_id: RecordId) -> bool {
        let in_flight = self
            .records
            .get(&record_id)
            .is_some_and(|record| self.running && record.status == Status::Processing);
        if in_flight {
            return false;
        }
        let removed = self.records.remove(&record_id).is_some();
        if removed {
            self.mark_dirty();
        }
        removed
    }

    pub(crate) fn clear_records(&mut self) -> bool {
        if self.running || self.records.is_empty() {
            return false;
        }
        self.records.clear();
        self.last_add_stats = None;
        self.mark_dirty();
        true
    }

    /// Merge finished records into history and empty the list. Returns the new
    /// history when something was cleared.
    pub(crate) fn save_and_clear(&mut self) -> Option<History> {
        if self.running || self.records.is_empty() {
            return None;
        }
        self.history.merge(self.records.values());
        self.records.clear();
        self.last_add_stats = None;
        self.mark_dirty();
        Some(self.history.clone())
    }

    pub(crate) fn has_records(&self) -> bool {
        !self.records.is_empty()
    }

    /// Snapshot the idle records in list order and flag the run as active.
    pub(crate) fn begin_run(&mut self) -> Option<Vec<PendingLookup>> {
        if self.running {
            return None;
        }
        let lookups: Vec<PendingLookup> = self
            .records
            .values()
            .filter(|record| record.status == Status::Idle)
            .map(|record| PendingLookup {
                record_id: record.id,
                url: record.url.clone(),
            })
            .collect();
        if lookups.is_empty() {
            return None;
        }
        self.running = true;
        self.notice = None;
        self.mark_dirty();
        Some(lookups)
    }

    pub(crate) fn apply_started(&mut self, record_id: RecordId) {
        if let Some(record) = self.transition(record_id, Status::Processing) {
            record.error = None;
        }
    }

    pub(crate) fn apply_succeeded(&mut self, record_id: RecordId, emails: Vec<String>) {
        if let Some(record) = self.transition(record_id, Status::Completed) {
            record.emails = emails;
            record.error = None;
        }
    }

    pub(crate) fn apply_failed(&mut self, record_id: RecordId, message: String) {
        if let Some(record) = self.transition(record_id, Status::Failed) {
            record.emails.clear();
            record.error = Some(message);
        }
    }

    pub(crate) fn apply_rate_limited(&mut self, record_id: RecordId) {
        self.transition(record_id, Status::Idle);
        self.running = false;
        self.notice = Some(RATE_LIMIT_NOTICE.to_string());
        self.mark_dirty();
    }

    pub(crate) fn finish_run(&mut self) {
        if self.running {
            self.running = false;
            self.mark_dirty();
        }
    }

    fn transition(&mut self, record_id: RecordId, next: Status) -> Option<&mut Record> {
        let record = self.records.get_mut(&record_id)?;
        if !record.status.can_transition_to(next) {
            return None;
        }
        record.status = next;
        self.dirty = true;
        Some(record)
    }
}
