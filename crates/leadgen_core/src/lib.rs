//! Leadgen core: pure state machine, URL intake and view-model helpers.
mod effect;
mod extract;
mod history;
mod msg;
mod record;
mod state;
mod update;
mod view_model;

pub use effect::{Effect, PendingLookup};
pub use extract::{extract_urls_from_cells, extract_urls_from_text, is_website_candidate};
pub use history::History;
pub use msg::Msg;
pub use record::{Record, RecordId, RecordSnapshot, Status};
pub use state::{normalize_url_for_dedupe, AppState, RATE_LIMIT_NOTICE};
pub use update::update;
pub use view_model::{AddStats, AppViewModel, RecordRow, Stats};
