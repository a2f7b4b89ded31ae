use std::fmt;

pub type RecordId = u64;

pub const GENERIC_FAILURE_MESSAGE: &str = "Lookup failed";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupRequest {
    pub record_id: RecordId,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueEvent {
    LookupStarted {
        record_id: RecordId,
    },
    LookupSucceeded {
        record_id: RecordId,
        emails: Vec<String>,
    },
    LookupFailed {
        record_id: RecordId,
        message: String,
    },
    /// The record goes back to idle and the run stops after this event.
    RateLimited {
        record_id: RecordId,
        message: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Another run was active; nothing was attempted.
    AlreadyRunning,
    Finished { attempted: usize },
    Paused { record_id: RecordId, attempted: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    Queue(QueueEvent),
    RunFinished(RunOutcome),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct LookupError {
    pub kind: FailureKind,
    pub message: String,
}

impl LookupError {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Build an error whose kind is derived from whatever the transport reported.
    pub fn classified(http_status: Option<u16>, code: Option<&str>, message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            kind: classify_failure(http_status, code, &message),
            message,
        }
    }

    pub fn is_rate_limit(&self) -> bool {
        self.kind.is_rate_limit()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    RateLimited,
    Unauthorized,
    HttpStatus(u16),
    Api,
    Timeout,
    Network,
    InvalidRequest,
}

impl FailureKind {
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, FailureKind::RateLimited)
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::RateLimited => write!(f, "rate limited"),
            FailureKind::Unauthorized => write!(f, "unauthorized"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Api => write!(f, "api error"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::Network => write!(f, "network error"),
            FailureKind::InvalidRequest => write!(f, "invalid request"),
        }
    }
}

/// Single place that decides whether a failed call means "quota exhausted".
///
/// Rate limits show up as an HTTP 429, a `429` inside an error code or message,
/// a quota marker, or the `RESOURCE_EXHAUSTED` status used by Google APIs.
pub fn classify_failure(http_status: Option<u16>, code: Option<&str>, message: &str) -> FailureKind {
    if http_status == Some(429)
        || code.is_some_and(mentions_rate_limit)
        || mentions_rate_limit(message)
    {
        return FailureKind::RateLimited;
    }
    match http_status {
        Some(401) | Some(403) => FailureKind::Unauthorized,
        Some(status) => FailureKind::HttpStatus(status),
        None => FailureKind::Api,
    }
}

fn mentions_rate_limit(text: &str) -> bool {
    let lowered = text.to_ascii_lowercase();
    lowered.contains("429")
        || lowered.contains("quota")
        || lowered.contains("resource_exhausted")
        || lowered.contains("resource exhausted")
}
