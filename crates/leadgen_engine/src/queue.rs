use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::time::Duration;

use engine_logging::{engine_info, engine_warn};

use crate::{EmailFinder, EngineEvent, LookupRequest, QueueEvent, RunOutcome, GENERIC_FAILURE_MESSAGE};

#[derive(Debug, Clone)]
pub struct QueueSettings {
    /// Pause between two lookups; keeps the run under the service's per-minute ceiling.
    pub request_delay: Duration,
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            request_delay: Duration::from_secs(4),
        }
    }
}

pub trait QueueSink: Send + Sync {
    fn emit(&self, event: QueueEvent);
}

pub struct ChannelQueueSink {
    tx: mpsc::Sender<EngineEvent>,
}

impl ChannelQueueSink {
    pub fn new(tx: mpsc::Sender<EngineEvent>) -> Self {
        Self { tx }
    }
}

impl QueueSink for ChannelQueueSink {
    fn emit(&self, event: QueueEvent) {
        let _ = self.tx.send(EngineEvent::Queue(event));
    }
}

/// Walks a snapshot of idle records one lookup at a time.
pub struct QueueController {
    finder: Arc<dyn EmailFinder>,
    settings: QueueSettings,
    running: AtomicBool,
}

impl QueueController {
    pub fn new(finder: Arc<dyn EmailFinder>, settings: QueueSettings) -> Self {
        Self {
            finder,
            settings,
            running: AtomicBool::new(false),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Process `lookups` strictly in order.
    ///
    /// A rate-limited lookup is reported with [`QueueEvent::RateLimited`] and ends
    /// the run immediately; the remaining lookups are not touched. Any other
    /// failure is reported on its record and the run carries on. A call made
    /// while a run is active returns [`RunOutcome::AlreadyRunning`] without
    /// emitting anything.
    pub async fn run(
        &self,
        lookups: Vec<LookupRequest>,
        audience: Option<&str>,
        sink: &dyn QueueSink,
    ) -> RunOutcome {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            engine_warn!("Queue run requested while another run is active; ignoring");
            return RunOutcome::AlreadyRunning;
        }
        let _guard = RunGuard(&self.running);

        engine_info!("Queue run started with {} lookup(s)", lookups.len());
        let mut attempted = 0;
        let mut pending = lookups.into_iter().peekable();
        while let Some(LookupRequest { record_id, url }) = pending.next() {
            sink.emit(QueueEvent::LookupStarted { record_id });
            attempted += 1;

            match self.finder.find(&url, audience).await {
                Ok(emails) => {
                    sink.emit(QueueEvent::LookupSucceeded { record_id, emails });
                }
                Err(err) if err.is_rate_limit() => {
                    engine_warn!(
                        "Rate limit hit on record {} ({}): {}; pausing queue",
                        record_id,
                        url,
                        err
                    );
                    sink.emit(QueueEvent::RateLimited {
                        record_id,
                        message: err.message,
                    });
                    return RunOutcome::Paused {
                        record_id,
                        attempted,
                    };
                }
                Err(err) => {
                    engine_warn!("Lookup failed for record {} ({}): {} [{}]", record_id, url, err, err.kind);
                    let message = if err.message.trim().is_empty() {
                        GENERIC_FAILURE_MESSAGE.to_string()
                    } else {
                        err.message
                    };
                    sink.emit(QueueEvent::LookupFailed { record_id, message });
                }
            }

            if pending.peek().is_some() && !self.settings.request_delay.is_zero() {
                tokio::time::sleep(self.settings.request_delay).await;
            }
        }

        engine_info!("Queue run finished after {} lookup(s)", attempted);
        RunOutcome::Finished { attempted }
    }
}

/// Clears the running flag however the run ends.
struct RunGuard<'a>(&'a AtomicBool);

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}
