use crate::{extract_urls_from_text, AppState, Effect, Msg};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: AppState, msg: Msg) -> (AppState, Vec<Effect>) {
    let effects = match msg {
        Msg::TextPasted(raw) => {
            state.add_urls(extract_urls_from_text(&raw));
            Vec::new()
        }
        Msg::UrlsAdded(urls) => {
            state.add_urls(urls);
            Vec::new()
        }
        Msg::AudienceChanged(audience) => {
            state.set_audience(audience);
            Vec::new()
        }
        Msg::HistoryLoaded(history) => {
            state.restore_history(history);
            Vec::new()
        }
        Msg::RestoreSession {
            records,
            next_record_id,
        } => {
            state.restore_session(records, next_record_id);
            Vec::new()
        }
        Msg::RemoveRecord { record_id } => {
            state.remove_record(record_id);
            Vec::new()
        }
        Msg::ClearAll => {
            state.clear_records();
            Vec::new()
        }
        Msg::SaveAndClear => match state.save_and_clear() {
            Some(history) => vec![Effect::PersistHistory(history)],
            None => Vec::new(),
        },
        Msg::ExportClicked => {
            if state.has_records() {
                vec![Effect::ExportRequested]
            } else {
                Vec::new()
            }
        }
        Msg::StartClicked => match state.begin_run() {
            Some(lookups) => {
                let audience = Some(state.audience().to_string()).filter(|a| !a.is_empty());
                vec![Effect::StartRun { lookups, audience }]
            }
            None => Vec::new(),
        },
        Msg::LookupStarted { record_id } => {
            state.apply_started(record_id);
            Vec::new()
        }
        Msg::LookupSucceeded { record_id, emails } => {
            state.apply_succeeded(record_id, emails);
            Vec::new()
        }
        Msg::LookupFailed { record_id, message } => {
            state.apply_failed(record_id, message);
            Vec::new()
        }
        Msg::LookupRateLimited { record_id } => {
            state.apply_rate_limited(record_id);
            Vec::new()
        }
        Msg::RunFinished => {
            state.finish_run();
            Vec::new()
        }
    };

    (state, effects)
}
