use std::fmt;

pub type RecordId = u64;

/// Lookup lifecycle of a single website.
///
/// Reachable transitions are `Idle -> Processing -> {Completed | Failed}` plus the
/// rate-limit rollback `Processing -> Idle`. `Pending` is reserved and never
/// entered by the queue controller; it is kept so persisted sessions and exports
/// keep a stable five-value vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Status {
    #[default]
    Idle,
    Pending,
    Processing,
    Completed,
    Failed,
}

impl Status {
    pub const ALL: [Status; 5] = [
        Status::Idle,
        Status::Pending,
        Status::Processing,
        Status::Completed,
        Status::Failed,
    ];

    pub fn can_transition_to(self, next: Status) -> bool {
        matches!(
            (self, next),
            (Status::Idle, Status::Processing)
                | (Status::Processing, Status::Completed)
                | (Status::Processing, Status::Failed)
                | (Status::Processing, Status::Idle)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Status::Completed | Status::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Status::Idle => "IDLE",
            Status::Pending => "PENDING",
            Status::Processing => "PROCESSING",
            Status::Completed => "COMPLETED",
            Status::Failed => "FAILED",
        }
    }

    pub fn parse(label: &str) -> Option<Status> {
        Status::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(label.trim()))
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub id: RecordId,
    pub url: String,
    pub status: Status,
    pub emails: Vec<String>,
    pub error: Option<String>,
}

impl Record {
    pub(crate) fn new(id: RecordId, url: String) -> Self {
        Self {
            id,
            url,
            status: Status::Idle,
            emails: Vec::new(),
            error: None,
        }
    }

    pub fn has_emails(&self) -> bool {
        !self.emails.is_empty()
    }
}

/// Copy of a record, used to persist and restore a session. A zero id asks
/// for a fresh one on restore.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordSnapshot {
    pub id: RecordId,
    pub url: String,
    pub status: Status,
    pub emails: Vec<String>,
    pub error: Option<String>,
}

impl From<&Record> for RecordSnapshot {
    fn from(record: &Record) -> Self {
        Self {
            id: record.id,
            url: record.url.clone(),
            status: record.status,
            emails: record.emails.clone(),
            error: record.error.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Status;

    #[test]
    fn only_enumerated_transitions_are_allowed() {
        let allowed: Vec<_> = Status::ALL
            .into_iter()
            .flat_map(|from| Status::ALL.into_iter().map(move |to| (from, to)))
            .filter(|(from, to)| from.can_transition_to(*to))
            .collect();
        assert_eq!(
            allowed,
            vec![
                (Status::Idle, Status::Processing),
                (Status::Processing, Status::Idle),
                (Status::Processing, Status::Completed),
                (Status::Processing, Status::Failed),
            ]
        );
    }

    #[test]
    fn pending_is_never_entered() {
        assert!(Status::ALL
            .into_iter()
            .all(|from| !from.can_transition_to(Status::Pending)));
    }

    #[test]
    fn labels_parse_back() {
        for status in Status::ALL {
            assert_eq!(Status::parse(status.as_str()), Some(status));
        }
        assert_eq!(Status::parse(" completed "), Some(Status::Completed));
        assert_eq!(Status::parse("done"), None);
    }
}
