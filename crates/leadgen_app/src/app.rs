use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use engine_logging::{engine_info, engine_warn};
use leadgen_core::{
    extract_urls_from_cells, extract_urls_from_text, update, AppState, Effect, Msg, RecordId,
    RecordRow, Status,
};
use leadgen_engine::{
    read_url_source, DirLock, EngineHandle, ExportFormat, GeminiFinder, HistoryStore, ImportedInput,
    JsonFileHistoryStore, QueueController, RunOutcome,
};

use crate::cli::{Cli, Command};
use crate::config::{api_key_from_env, AppConfig, API_KEY_VARS};
use crate::effects::EffectRunner;
use crate::persistence::{history_from_map, load_session, save_session, Session};
use crate::render;

const ALREADY_RUNNING: &str = "A run is already in progress.";

pub fn run(cli: Cli) -> Result<()> {
    let config = AppConfig::load(&cli.data_dir)?;

    // Declared before the app so the lock outlives every session write.
    let _lock = if cli.command.changes_session() {
        match DirLock::try_acquire(&cli.data_dir).context("locking data directory")? {
            Some(lock) => Some(lock),
            None if matches!(cli.command, Command::Run { .. }) => {
                engine_warn!("Data directory {:?} is locked; run skipped", cli.data_dir);
                println!("{ALREADY_RUNNING}");
                return Ok(());
            }
            None => bail!(
                "{} is in use by another leadgen command, most likely a run; try again when it finishes",
                cli.data_dir.display()
            ),
        }
    } else {
        None
    };
    let mut app = App::open(&cli.data_dir, &config)?;

    match cli.command {
        Command::Add { text, file } => app.add(text, file),
        Command::List => {
            app.print_list();
            Ok(())
        }
        Command::Remove { id } => app.remove(id),
        Command::Clear => app.clear(),
        Command::Save => app.save(),
        Command::Export { out, csv } => {
            let format = if csv {
                ExportFormat::Csv
            } else {
                ExportFormat::Xlsx
            };
            app.export(out, format)
        }
        Command::Run {
            audience,
            delay_ms,
            model,
        } => {
            let mut config = config;
            if let Some(delay_ms) = delay_ms {
                config.request_delay_ms = delay_ms;
            }
            if let Some(model) = model {
                config.model = model;
            }
            app.run_queue(&config, audience)
        }
        Command::History => {
            app.print_history();
            Ok(())
        }
    }
}

struct App {
    state: AppState,
    data_dir: PathBuf,
    runner: EffectRunner,
}

impl App {
    fn open(data_dir: &Path, config: &AppConfig) -> Result<Self> {
        let history_store = Arc::new(JsonFileHistoryStore::new(data_dir));
        let history = history_store.load().context("loading history")?;
        let Session {
            audience,
            next_record_id,
            records,
        } = load_session(data_dir);
        let export_dir = config
            .export_dir
            .clone()
            .unwrap_or_else(|| data_dir.to_path_buf());

        let mut app = Self {
            state: AppState::new(),
            data_dir: data_dir.to_path_buf(),
            runner: EffectRunner::new(history_store, export_dir),
        };
        app.apply(Msg::HistoryLoaded(history_from_map(history)));
        app.apply(Msg::RestoreSession {
            records,
            next_record_id,
        });
        app.apply(Msg::AudienceChanged(audience));
        // Restoring is not a change worth writing back.
        app.state.consume_dirty();
        Ok(app)
    }

    fn apply(&mut self, msg: Msg) -> Vec<Effect> {
        let state = std::mem::take(&mut self.state);
        let (state, effects) = update(state, msg);
        self.state = state;
        effects
    }

    /// Apply `msg`, run its effects, then persist the session if anything changed.
    /// A failing effect leaves the session file untouched.
    fn dispatch(&mut self, msg: Msg) -> Result<()> {
        let effects = self.apply(msg);
        self.runner.execute(effects, &self.state)?;
        if self.state.consume_dirty() {
            let session = Session {
                audience: self.state.audience().to_string(),
                next_record_id: self.state.next_record_id(),
                records: self.state.session_snapshot(),
            };
            save_session(&self.data_dir, &session)?;
        }
        Ok(())
    }

    fn add(&mut self, text: Vec<String>, file: Option<PathBuf>) -> Result<()> {
        if text.is_empty() && file.is_none() {
            bail!("nothing to add: pass websites as arguments or use --file");
        }

        let mut urls = extract_urls_from_text(&text.join("\n"));
        if let Some(path) = file {
            let from_file = match read_url_source(&path)? {
                ImportedInput::Cells(cells) => extract_urls_from_cells(cells),
                ImportedInput::Text(raw) => extract_urls_from_text(&raw),
            };
            if from_file.is_empty() {
                bail!("no website addresses found in {}", path.display());
            }
            engine_info!("Found {} website(s) in {:?}", from_file.len(), path);
            urls.extend(from_file);
        }
        if urls.is_empty() {
            bail!("no website addresses found in the given text");
        }

        self.dispatch(Msg::UrlsAdded(urls))?;
        if let Some(stats) = self.state.view().last_add_stats {
            println!("{}", render::render_add_stats(&stats));
        }
        Ok(())
    }

    fn remove(&mut self, record_id: RecordId) -> Result<()> {
        if self.state.record(record_id).is_none() {
            bail!("no website with id {record_id}");
        }
        self.dispatch(Msg::RemoveRecord { record_id })?;
        println!("Removed website {record_id}.");
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        let count = self.state.view().records.len();
        self.dispatch(Msg::ClearAll)?;
        println!("Cleared {count} website(s).");
        Ok(())
    }

    fn save(&mut self) -> Result<()> {
        let count = self.state.view().records.len();
        if count == 0 {
            println!("Nothing to save.");
            return Ok(());
        }
        self.dispatch(Msg::SaveAndClear)?;
        println!(
            "Cleared {} website(s); history now holds {}.",
            count,
            self.state.history().len()
        );
        Ok(())
    }

    fn export(&mut self, out: Option<PathBuf>, format: ExportFormat) -> Result<()> {
        if let Some(dir) = out {
            self.runner.set_export_dir(dir);
        }
        self.runner.set_export_format(format);
        self.dispatch(Msg::ExportClicked)?;
        match self.runner.take_last_export() {
            Some(summary) => println!(
                "Exported {} row(s) to {}",
                summary.row_count,
                summary.output_path.display()
            ),
            None => println!("Nothing to export."),
        }
        Ok(())
    }

    fn run_queue(&mut self, config: &AppConfig, audience: Option<String>) -> Result<()> {
        if let Some(audience) = audience {
            self.dispatch(Msg::AudienceChanged(audience))?;
        }
        let idle = self
            .state
            .records()
            .filter(|record| record.status == Status::Idle)
            .count();
        if idle == 0 {
            println!("No idle websites to look up.");
            return Ok(());
        }

        let api_key = api_key_from_env()
            .ok_or_else(|| anyhow!("no API key: set {}", API_KEY_VARS.join(" or ")))?;
        let finder =
            GeminiFinder::new(config.finder_settings(api_key)).context("building email finder")?;
        let controller = Arc::new(QueueController::new(
            Arc::new(finder),
            config.queue_settings(),
        ));
        self.runner
            .attach_engine(EngineHandle::new(controller).context("starting lookup engine")?);

        println!(
            "Looking up {} website(s), {} ms apart...",
            idle, config.request_delay_ms
        );
        self.dispatch(Msg::StartClicked)?;

        while let Some((msg, outcome)) = self.runner.next_msg() {
            let record_id = record_id_of(&msg);
            self.dispatch(msg)?;
            if let Some(record) = record_id.and_then(|id| self.state.record(id)) {
                println!("{}", render::render_progress(&RecordRow::from(record)));
            }
            match outcome {
                Some(RunOutcome::Paused { record_id, .. }) => {
                    engine_warn!("Queue paused at record {}", record_id);
                    if let Some(notice) = self.state.view().notice {
                        println!("{notice}");
                    }
                    break;
                }
                Some(RunOutcome::Finished { attempted }) => {
                    println!("Finished {attempted} lookup(s).");
                    break;
                }
                Some(RunOutcome::AlreadyRunning) => {
                    println!("{ALREADY_RUNNING}");
                    break;
                }
                None => {}
            }
        }

        println!("{}", render::render_stats(&self.state.view()));
        Ok(())
    }

    fn print_list(&self) {
        let view = self.state.view();
        print!("{}", render::render_table(&view));
        if !view.audience.is_empty() {
            println!("audience: {}", view.audience);
        }
        println!("{}", render::render_stats(&view));
    }

    fn print_history(&self) {
        let history = self.state.history();
        println!("{} website(s) in history", history.len());
        for (url, emails) in history.entries() {
            if emails.is_empty() {
                println!("  {url}: (none)");
            } else {
                println!("  {url}: {}", emails.join(", "));
            }
        }
    }
}

fn record_id_of(msg: &Msg) -> Option<RecordId> {
    match msg {
        Msg::LookupStarted { record_id }
        | Msg::LookupSucceeded { record_id, .. }
        | Msg::LookupFailed { record_id, .. }
        | Msg::LookupRateLimited { record_id } => Some(*record_id),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::SESSION_FILENAME;
    use leadgen_engine::HISTORY_FILENAME;

    fn open(dir: &Path) -> App {
        App::open(dir, &AppConfig::default()).expect("open app")
    }

    #[test]
    fn added_websites_survive_reopening() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = open(dir.path());
        app.add(vec!["acme.com, beta.io".to_string()], None).unwrap();
        assert!(dir.path().join(SESSION_FILENAME).exists());

        let reopened = open(dir.path());
        let urls: Vec<_> = reopened.state.records().map(|r| r.url.clone()).collect();
        assert_eq!(urls, vec!["acme.com".to_string(), "beta.io".to_string()]);
    }

    #[test]
    fn add_without_input_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = open(dir.path());
        assert!(app.add(Vec::new(), None).is_err());
        assert!(app.add(vec!["not a website".to_string()], None).is_err());
    }

    #[test]
    fn add_reads_websites_from_a_text_file() {
        let dir = tempfile::tempdir().unwrap();
        let list = dir.path().join("sites.txt");
        std::fs::write(&list, "acme.com\nhello\nbeta.io\n").unwrap();

        let mut app = open(dir.path());
        app.add(Vec::new(), Some(list)).unwrap();
        assert_eq!(app.state.records().count(), 2);
    }

    #[test]
    fn save_clears_the_list_and_writes_history_for_finished_records() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = open(dir.path());
        app.add(vec!["acme.com".to_string()], None).unwrap();
        let id = app.state.records().next().unwrap().id;
        app.apply(Msg::StartClicked);
        app.apply(Msg::LookupStarted { record_id: id });
        app.apply(Msg::LookupSucceeded {
            record_id: id,
            emails: vec!["info@acme.com".to_string()],
        });
        app.apply(Msg::RunFinished);

        app.save().unwrap();
        assert_eq!(app.state.records().count(), 0);
        assert!(dir.path().join(HISTORY_FILENAME).exists());

        let mut reopened = open(dir.path());
        assert!(reopened.state.history().has("https://acme.com/"));
        reopened.add(vec!["acme.com".to_string()], None).unwrap();
        assert_eq!(reopened.state.records().count(), 0);
    }

    fn cli(dir: &Path, args: &[&str]) -> Cli {
        use clap::Parser;
        let dir = dir.to_str().expect("utf-8 temp dir");
        let argv = ["leadgen", "--data-dir", dir].into_iter().chain(args.iter().copied());
        Cli::parse_from(argv)
    }

    fn ids_and_urls(app: &App) -> Vec<(RecordId, String)> {
        app.state.records().map(|r| (r.id, r.url.clone())).collect()
    }

    #[test]
    fn ids_shown_earlier_stay_valid_after_reopening() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = open(dir.path());
        app.add(vec!["a.com, b.com, c.com".to_string()], None).unwrap();
        app.remove(1).unwrap();

        let mut reopened = open(dir.path());
        assert_eq!(
            ids_and_urls(&reopened),
            vec![(2, "b.com".to_string()), (3, "c.com".to_string())]
        );
        reopened.remove(2).unwrap();

        let mut reopened = open(dir.path());
        assert_eq!(ids_and_urls(&reopened), vec![(3, "c.com".to_string())]);
        reopened.add(vec!["d.com".to_string()], None).unwrap();
        assert_eq!(
            ids_and_urls(&reopened),
            vec![(3, "c.com".to_string()), (4, "d.com".to_string())]
        );
    }

    #[test]
    fn run_while_the_data_dir_is_locked_does_nothing() {
        let dir = tempfile::tempdir().unwrap();
        run(cli(dir.path(), &["add", "a.com, b.com"])).unwrap();
        let before = open(dir.path()).state.session_snapshot();

        let held = DirLock::try_acquire(dir.path()).unwrap().expect("lock");
        run(cli(dir.path(), &["run"])).unwrap();
        drop(held);

        let after = open(dir.path()).state.session_snapshot();
        assert_eq!(after, before);
        assert!(after.iter().all(|record| record.status == Status::Idle));
    }

    #[test]
    fn session_changes_are_refused_while_the_data_dir_is_locked() {
        let dir = tempfile::tempdir().unwrap();
        run(cli(dir.path(), &["add", "a.com, b.com"])).unwrap();

        let held = DirLock::try_acquire(dir.path()).unwrap().expect("lock");
        assert!(run(cli(dir.path(), &["add", "c.com"])).is_err());
        assert!(run(cli(dir.path(), &["remove", "1"])).is_err());
        assert!(run(cli(dir.path(), &["clear"])).is_err());
        assert!(run(cli(dir.path(), &["list"])).is_ok());
        drop(held);

        let urls: Vec<_> = ids_and_urls(&open(dir.path()))
            .into_iter()
            .map(|(_, url)| url)
            .collect();
        assert_eq!(urls, vec!["a.com".to_string(), "b.com".to_string()]);

        run(cli(dir.path(), &["add", "c.com"])).unwrap();
        assert_eq!(open(dir.path()).state.records().count(), 3);
    }

    #[test]
    fn export_writes_a_workbook_unless_csv_is_asked_for() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        let mut app = open(dir.path());
        app.add(vec!["acme.com".to_string()], None).unwrap();

        app.export(Some(out.clone()), ExportFormat::Xlsx).unwrap();
        app.export(Some(out.clone()), ExportFormat::Csv).unwrap();

        let mut names: Vec<_> = std::fs::read_dir(&out)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().into_string().unwrap())
            .collect();
        names.sort();
        assert_eq!(names.len(), 2);
        assert!(names[0].starts_with("leads_export_") && names[0].ends_with(".csv"));
        assert!(names[1].ends_with(".xlsx"));
    }

    #[test]
    fn removing_an_unknown_id_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = open(dir.path());
        assert!(app.remove(42).is_err());
    }
}
