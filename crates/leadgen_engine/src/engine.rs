use std::io;
use std::sync::{mpsc, Arc};
use std::thread;

use engine_logging::engine_debug;

use crate::queue::{ChannelQueueSink, QueueController};
use crate::{EngineEvent, LookupRequest};

enum EngineCommand {
    StartRun {
        lookups: Vec<LookupRequest>,
        audience: Option<String>,
    },
}

/// Runs the queue controller on a background runtime and reports back over a channel.
pub struct EngineHandle {
    cmd_tx: mpsc::Sender<EngineCommand>,
    event_rx: mpsc::Receiver<EngineEvent>,
}

impl EngineHandle {
    pub fn new(controller: Arc<QueueController>) -> io::Result<Self> {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_time()
            .enable_io()
            .build()?;

        thread::Builder::new()
            .name("leadgen-engine".to_string())
            .spawn(move || {
                while let Ok(command) = cmd_rx.recv() {
                    let controller = controller.clone();
                    let event_tx = event_tx.clone();
                    runtime.spawn(async move {
                        handle_command(controller.as_ref(), command, event_tx).await;
                    });
                }
                engine_debug!("Engine command channel closed");
            })?;

        Ok(Self { cmd_tx, event_rx })
    }

    pub fn start_run(&self, lookups: Vec<LookupRequest>, audience: Option<String>) {
        let _ = self
            .cmd_tx
            .send(EngineCommand::StartRun { lookups, audience });
    }

    /// Blocks until the next event; `None` once the engine thread is gone.
    pub fn recv(&self) -> Option<EngineEvent> {
        self.event_rx.recv().ok()
    }
}

async fn handle_command(
    controller: &QueueController,
    command: EngineCommand,
    event_tx: mpsc::Sender<EngineEvent>,
) {
    match command {
        EngineCommand::StartRun { lookups, audience } => {
            let sink = ChannelQueueSink::new(event_tx.clone());
            let outcome = controller.run(lookups, audience.as_deref(), &sink).await;
            let _ = event_tx.send(EngineEvent::RunFinished(outcome));
        }
    }
}
