//! Pipeline engine seam
//!
//! The engine runs the whole pipeline and yields a stream of `RunEvent`s.
//! The stream is a bounded channel: the engine side pushes events as it goes,
//! the coordinator pulls them one at a time, in order. It cannot be
//! restarted; once drained or dropped it is gone.

mod replay;

pub use replay::ReplayEngine;

use async_trait::async_trait;
use sluice_core::domain::event::RunEvent;
use sluice_core::domain::pipeline::PipelineDescriptor;
use tokio::sync::mpsc;

use crate::secrets::ResolvedSecrets;

/// External pipeline engine
#[async_trait]
pub trait PipelineEngine: Send + Sync {
    /// Starts one execution of `pipeline`
    ///
    /// Returns once the engine has started; events arrive on the returned
    /// stream. Errors here mean nothing ran at all.
    async fn run(
        &self,
        pipeline: &PipelineDescriptor,
        secrets: ResolvedSecrets,
    ) -> anyhow::Result<RunEventStream>;
}

/// Creates a connected sender/stream pair with room for `capacity` events
pub fn event_channel(capacity: usize) -> (RunEventSender, RunEventStream) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (RunEventSender { tx }, RunEventStream { rx })
}

/// Engine side of an event stream
#[derive(Debug, Clone)]
pub struct RunEventSender {
    tx: mpsc::Sender<RunEvent>,
}

impl RunEventSender {
    /// Pushes an event, waiting for room in the channel
    ///
    /// # Errors
    /// Fails once the consumer has dropped the stream (for example after a
    /// cancellation); the engine should stop producing.
    pub async fn send(&self, event: RunEvent) -> anyhow::Result<()> {
        self.tx
            .send(event)
            .await
            .map_err(|_| anyhow::anyhow!("run event stream closed by consumer"))
    }

    /// Whether the consumer has gone away
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Resolves once the consumer has dropped the stream
    pub async fn closed(&self) {
        self.tx.closed().await
    }
}

/// Consumer side of an event stream
#[derive(Debug)]
pub struct RunEventStream {
    rx: mpsc::Receiver<RunEvent>,
}

impl RunEventStream {
    /// Next event in emission order, `None` once every sender is gone
    pub async fn next(&mut self) -> Option<RunEvent> {
        self.rx.recv().await
    }
}
