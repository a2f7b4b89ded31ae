//! Leadgen engine: email lookups, the extraction queue and file IO.
mod engine;
mod export;
mod finder;
mod history;
mod import;
mod persist;
mod queue;
mod types;

pub use engine::EngineHandle;
pub use export::{
    export_rows, ExportError, ExportFormat, ExportOptions, ExportRow, ExportSummary, EXPORT_HEADER,
};
pub use finder::{
    build_prompt, parse_email_payload, EmailFinder, FinderSettings, GeminiFinder,
    DEFAULT_BASE_URL, DEFAULT_MODEL,
};
pub use history::{
    HistoryError, HistoryMap, HistoryStore, InMemoryHistoryStore, JsonFileHistoryStore,
    HISTORY_FILENAME,
};
pub use import::{read_url_source, ImportError, ImportedInput};
pub use persist::{ensure_output_dir, AtomicFileWriter, DirLock, PersistError, LOCK_FILENAME};
pub use queue::{ChannelQueueSink, QueueController, QueueSettings, QueueSink};
pub use types::{
    classify_failure, EngineEvent, FailureKind, LookupError, LookupRequest, QueueEvent,
    RecordId, RunOutcome, GENERIC_FAILURE_MESSAGE,
};
