use crate::RecordId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingLookup {
    pub record_id: RecordId,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Hand the snapshot of idle records to the queue controller.
    StartRun {
        lookups: Vec<PendingLookup>,
        audience: Option<String>,
    },
    /// Persist the full history map; written as a whole or not at all.
    PersistHistory(crate::History),
    ExportRequested,
}
