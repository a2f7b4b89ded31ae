use std::sync::Once;

use leadgen_core::{update, AddStats, AppState, History, Msg, RecordSnapshot, Status};
use pretty_assertions::assert_eq;

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(engine_logging::initialize_for_tests);
}

fn paste(state: AppState, input: &str) -> AppState {
    let (state, effects) = update(state, Msg::TextPasted(input.to_string()));
    assert!(effects.is_empty());
    state
}

fn last_stats(state: &AppState) -> AddStats {
    state.view().last_add_stats.expect("add stats recorded")
}

#[test]
fn pasted_text_creates_idle_records_in_order() {
    init_logging();
    let mut state = paste(AppState::new(), " b.com \n\na.com; not a site, c.org\n");
    let view = state.view();

    let urls: Vec<_> = view.records.iter().map(|r| r.url.as_str()).collect();
    assert_eq!(urls, vec!["b.com", "a.com", "c.org"]);
    assert!(view.records.iter().all(|r| r.status == Status::Idle));
    let ids: Vec<_> = view.records.iter().map(|r| r.record_id).collect();
    assert_eq!(ids, vec![1, 2, 3]);
    assert_eq!(
        last_stats(&state),
        AddStats {
            added: 3,
            skipped_duplicate: 0,
            skipped_history: 0
        }
    );
    assert!(state.consume_dirty());
}

#[test]
fn duplicate_of_active_record_is_skipped() {
    init_logging();
    let state = paste(AppState::new(), "https://example.com/\n");
    let state = paste(state, "EXAMPLE.com\nhttp://example.com\nnew.io\n");

    assert_eq!(state.view().records.len(), 2);
    assert_eq!(
        last_stats(&state),
        AddStats {
            added: 1,
            skipped_duplicate: 2,
            skipped_history: 0
        }
    );
}

#[test]
fn url_in_history_is_skipped() {
    init_logging();
    let history = History::from_entries([
        ("seen.com", vec!["info@seen.com".to_string()]),
        ("tried.com", Vec::new()),
    ]);
    let (state, _) = update(AppState::new(), Msg::HistoryLoaded(history));
    let (state, _) = update(
        state,
        Msg::UrlsAdded(vec![
            "https://Seen.com".to_string(),
            "tried.com/".to_string(),
            "fresh.com".to_string(),
        ]),
    );

    let view = state.view();
    assert_eq!(view.records.len(), 1);
    assert_eq!(view.records[0].url, "fresh.com");
    assert_eq!(view.history_len, 2);
    assert_eq!(
        last_stats(&state),
        AddStats {
            added: 1,
            skipped_duplicate: 0,
            skipped_history: 2
        }
    );
}

#[test]
fn remove_and_clear_records() {
    init_logging();
    let state = paste(AppState::new(), "a.com\nb.com\nc.com");
    let (state, _) = update(state, Msg::RemoveRecord { record_id: 2 });
    let urls: Vec<_> = state.view().records.into_iter().map(|r| r.url).collect();
    assert_eq!(urls, vec!["a.com", "c.com"]);

    let (mut state, _) = update(state, Msg::RemoveRecord { record_id: 99 });
    assert!(state.consume_dirty());
    let (mut state, _) = update(state, Msg::RemoveRecord { record_id: 99 });
    assert!(!state.consume_dirty());

    let (state, effects) = update(state, Msg::ClearAll);
    assert!(effects.is_empty());
    assert!(state.view().records.is_empty());
    assert!(state.history().is_empty());
}

#[test]
fn ids_keep_growing_after_removal() {
    init_logging();
    let state = paste(AppState::new(), "a.com");
    let (state, _) = update(state, Msg::ClearAll);
    let state = paste(state, "b.com");

    assert_eq!(state.view().records[0].record_id, 2);
}

#[test]
fn audience_is_trimmed() {
    init_logging();
    let (state, _) = update(AppState::new(), Msg::AudienceChanged("  CEOs ".to_string()));
    assert_eq!(state.audience(), "CEOs");
}

fn idle_snapshot(id: u64, url: &str) -> RecordSnapshot {
    RecordSnapshot {
        id,
        url: url.to_string(),
        status: Status::Idle,
        emails: Vec::new(),
        error: None,
    }
}

fn ids_and_urls(state: &AppState) -> Vec<(u64, String)> {
    state.records().map(|r| (r.id, r.url.clone())).collect()
}

#[test]
fn restored_records_keep_their_ids() {
    let state = paste(AppState::new(), "a.com, b.com, c.com");
    let (state, _) = update(state, Msg::RemoveRecord { record_id: 1 });

    let (restored, _) = update(
        AppState::new(),
        Msg::RestoreSession {
            records: state.session_snapshot(),
            next_record_id: state.next_record_id(),
        },
    );
    assert_eq!(
        ids_and_urls(&restored),
        vec![(2, "b.com".to_string()), (3, "c.com".to_string())]
    );

    let (restored, _) = update(restored, Msg::RemoveRecord { record_id: 2 });
    assert_eq!(ids_and_urls(&restored), vec![(3, "c.com".to_string())]);
}

#[test]
fn restore_never_reuses_an_id() {
    // The record with the highest id was removed before saving.
    let (state, _) = update(
        AppState::new(),
        Msg::RestoreSession {
            records: vec![idle_snapshot(2, "b.com")],
            next_record_id: 4,
        },
    );
    let state = paste(state, "d.com");
    assert_eq!(
        ids_and_urls(&state),
        vec![(2, "b.com".to_string()), (4, "d.com".to_string())]
    );

    // A stale counter is moved past the restored ids.
    let (state, _) = update(
        AppState::new(),
        Msg::RestoreSession {
            records: vec![idle_snapshot(7, "g.com")],
            next_record_id: 1,
        },
    );
    assert_eq!(state.next_record_id(), 8);
}

#[test]
fn snapshots_without_usable_ids_get_fresh_ones() {
    let (state, _) = update(
        AppState::new(),
        Msg::RestoreSession {
            records: vec![
                idle_snapshot(0, "a.com"),
                idle_snapshot(3, "c.com"),
                idle_snapshot(3, "dup.com"),
            ],
            next_record_id: 1,
        },
    );
    assert_eq!(
        ids_and_urls(&state),
        vec![
            (3, "c.com".to_string()),
            (4, "a.com".to_string()),
            (5, "dup.com".to_string()),
        ]
    );
}
