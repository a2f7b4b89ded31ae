use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use engine_logging::{engine_info, engine_warn};
use leadgen_core::{AppState, Effect, Msg, PendingLookup};
use leadgen_engine::{
    export_rows, EngineEvent, EngineHandle, ExportFormat, ExportOptions, ExportRow, ExportSummary,
    HistoryStore, LookupRequest, QueueEvent, RunOutcome,
};

use crate::persistence::history_to_map;

/// Executes core effects against the engine and the file system.
pub struct EffectRunner {
    history_store: Arc<dyn HistoryStore>,
    engine: Option<EngineHandle>,
    export_dir: PathBuf,
    export_format: ExportFormat,
    last_export: Option<ExportSummary>,
}

impl EffectRunner {
    pub fn new(history_store: Arc<dyn HistoryStore>, export_dir: PathBuf) -> Self {
        Self {
            history_store,
            engine: None,
            export_dir,
            export_format: ExportFormat::default(),
            last_export: None,
        }
    }

    pub fn set_export_dir(&mut self, export_dir: PathBuf) {
        self.export_dir = export_dir;
    }

    pub fn set_export_format(&mut self, format: ExportFormat) {
        self.export_format = format;
    }

    pub fn attach_engine(&mut self, engine: EngineHandle) {
        self.engine = Some(engine);
    }

    pub fn take_last_export(&mut self) -> Option<ExportSummary> {
        self.last_export.take()
    }

    pub fn execute(&mut self, effects: Vec<Effect>, state: &AppState) -> Result<()> {
        for effect in effects {
            match effect {
                Effect::StartRun { lookups, audience } => {
                    let engine = self
                        .engine
                        .as_ref()
                        .ok_or_else(|| anyhow!("lookup engine is not available"))?;
                    engine_info!(
                        "StartRun lookups={} audience={:?}",
                        lookups.len(),
                        audience
                    );
                    engine.start_run(lookups.into_iter().map(to_request).collect(), audience);
                }
                Effect::PersistHistory(history) => {
                    self.history_store
                        .store(&history_to_map(&history))
                        .context("saving history")?;
                }
                Effect::ExportRequested => {
                    let rows: Vec<ExportRow> = state.records().map(export_row).collect();
                    let options = ExportOptions {
                        format: self.export_format,
                        ..ExportOptions::default()
                    };
                    let summary = export_rows(&self.export_dir, &rows, &options)
                        .context("exporting records")?;
                    self.last_export = Some(summary);
                }
            }
        }
        Ok(())
    }

    /// Blocks for the next engine event and maps it to a core message. The
    /// second value is the run outcome once the run has ended.
    pub fn next_msg(&self) -> Option<(Msg, Option<RunOutcome>)> {
        let event = self.engine.as_ref()?.recv()?;
        Some(match event {
            EngineEvent::Queue(event) => (map_queue_event(event), None),
            EngineEvent::RunFinished(outcome) => (Msg::RunFinished, Some(outcome)),
        })
    }
}

fn to_request(lookup: PendingLookup) -> LookupRequest {
    LookupRequest {
        record_id: lookup.record_id,
        url: lookup.url,
    }
}

fn map_queue_event(event: QueueEvent) -> Msg {
    match event {
        QueueEvent::LookupStarted { record_id } => Msg::LookupStarted { record_id },
        QueueEvent::LookupSucceeded { record_id, emails } => {
            Msg::LookupSucceeded { record_id, emails }
        }
        QueueEvent::LookupFailed { record_id, message } => {
            Msg::LookupFailed { record_id, message }
        }
        QueueEvent::RateLimited { record_id, message } => {
            engine_warn!("Record {} rate limited: {}", record_id, message);
            Msg::LookupRateLimited { record_id }
        }
    }
}

fn export_row(record: &leadgen_core::Record) -> ExportRow {
    ExportRow {
        website: record.url.clone(),
        status: record.status.as_str().to_string(),
        emails: record.emails.clone(),
        note: record.error.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use leadgen_core::{update, History, RecordSnapshot, Status};
    use leadgen_engine::InMemoryHistoryStore;
    use tempfile::TempDir;

    #[test]
    fn persist_effect_writes_the_store() {
        let temp = TempDir::new().unwrap();
        let store = Arc::new(InMemoryHistoryStore::default());
        let mut runner = EffectRunner::new(store.clone(), temp.path().to_path_buf());
        let history = History::from_entries([("a.com", vec!["x@a.com".to_string()])]);

        runner
            .execute(vec![Effect::PersistHistory(history)], &AppState::new())
            .unwrap();

        let stored = store.load().unwrap();
        assert_eq!(stored.get("a.com"), Some(&vec!["x@a.com".to_string()]));
    }

    #[test]
    fn export_effect_writes_every_record() {
        let temp = TempDir::new().unwrap();
        let mut runner =
            EffectRunner::new(Arc::new(InMemoryHistoryStore::default()), temp.path().to_path_buf());
        runner.set_export_format(ExportFormat::Csv);
        let (state, _) = update(
            AppState::new(),
            Msg::RestoreSession {
                records: vec![RecordSnapshot {
                    id: 1,
                    url: "acme.com".to_string(),
                    status: Status::Failed,
                    emails: Vec::new(),
                    error: Some("timeout".to_string()),
                }],
                next_record_id: 2,
            },
        );

        runner.execute(vec![Effect::ExportRequested], &state).unwrap();

        let summary = runner.take_last_export().expect("export summary");
        assert_eq!(summary.row_count, 1);
        let content = std::fs::read_to_string(summary.output_path).unwrap();
        assert!(content.ends_with("acme.com,FAILED,,timeout\n"));
    }

    #[test]
    fn start_without_engine_is_an_error() {
        let temp = TempDir::new().unwrap();
        let mut runner =
            EffectRunner::new(Arc::new(InMemoryHistoryStore::default()), temp.path().to_path_buf());
        let effect = Effect::StartRun {
            lookups: Vec::new(),
            audience: None,
        };
        assert!(runner.execute(vec![effect], &AppState::new()).is_err());
    }

    #[test]
    fn export_defaults_to_a_workbook() {
        let temp = TempDir::new().unwrap();
        let mut runner =
            EffectRunner::new(Arc::new(InMemoryHistoryStore::default()), temp.path().to_path_buf());
        runner.execute(vec![Effect::ExportRequested], &AppState::new()).unwrap();

        let summary = runner.take_last_export().expect("export summary");
        assert_eq!(summary.row_count, 0);
        assert_eq!(
            summary.output_path.extension().and_then(|ext| ext.to_str()),
            Some("xlsx")
        );
    }
}
