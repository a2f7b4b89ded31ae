#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// User pasted free text; websites are extracted from it.
    TextPasted(String),
    /// Website candidates already extracted elsewhere (e.g. a spreadsheet).
    UrlsAdded(Vec<String>),
    /// User edited the target audience description.
    AudienceChanged(String),
    /// Persisted history was read at startup.
    HistoryLoaded(crate::History),
    /// Restore the active record list of a previous session, ids included.
    RestoreSession {
        records: Vec<crate::RecordSnapshot>,
        next_record_id: crate::RecordId,
    },
    RemoveRecord {
        record_id: crate::RecordId,
    },
    ClearAll,
    /// Merge finished records into history, then empty the list.
    SaveAndClear,
    ExportClicked,
    StartClicked,
    /// Queue controller picked up a record.
    LookupStarted {
        record_id: crate::RecordId,
    },
    LookupSucceeded {
        record_id: crate::RecordId,
        emails: Vec<String>,
    },
    LookupFailed {
        record_id: crate::RecordId,
        message: String,
    },
    /// The external service refused the call for quota reasons; the run halts.
    LookupRateLimited {
        record_id: crate::RecordId,
    },
    /// Queue controller returned without a rate-limit stop.
    RunFinished,
}
