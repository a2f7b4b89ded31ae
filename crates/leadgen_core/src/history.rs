use std::collections::BTreeMap;

use crate::{normalize_url_for_dedupe, Record, Status};

/// Previously attempted websites and the emails found for them.
///
/// Keys are always normalized, so there is at most one entry per website no
/// matter how the address was spelled when it was looked up. An empty email
/// list means "already tried, nothing found".
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct History {
    entries: BTreeMap<String, Vec<String>>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries<I, K>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, Vec<String>)>,
        K: AsRef<str>,
    {
        let mut history = Self::new();
        for (url, emails) in entries {
            history
                .entries
                .insert(normalize_url_for_dedupe(url.as_ref()), emails);
        }
        history
    }

    pub fn has(&self, url: &str) -> bool {
        self.entries.contains_key(&normalize_url_for_dedupe(url))
    }

    pub fn get(&self, url: &str) -> Option<&[String]> {
        self.entries
            .get(&normalize_url_for_dedupe(url))
            .map(Vec::as_slice)
    }

    /// Fold finished records into the history. Completed records contribute
    /// their emails, failed ones an empty list; anything else is skipped.
    /// Returns how many records were merged.
    pub fn merge<'a, I>(&mut self, records: I) -> usize
    where
        I: IntoIterator<Item = &'a Record>,
    {
        let mut merged = 0;
        for record in records {
            let emails = match record.status {
                Status::Completed => record.emails.clone(),
                Status::Failed => Vec::new(),
                Status::Idle | Status::Pending | Status::Processing => continue,
            };
            self.entries
                .insert(normalize_url_for_dedupe(&record.url), emails);
            merged += 1;
        }
        merged
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(url, emails)| (url.as_str(), emails.as_slice()))
    }
}
