//! Replay engine
//!
//! Plays back a recorded sequence of run events instead of running a real
//! pipeline. Used by `sluice replay` to re-drive a captured run through the
//! bridge, and by tests.

use anyhow::Context;
use async_trait::async_trait;
use sluice_core::domain::event::RunEvent;
use sluice_core::domain::pipeline::PipelineDescriptor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::debug;

use super::{PipelineEngine, RunEventStream, event_channel};
use crate::secrets::ResolvedSecrets;

/// Engine that replays a fixed list of events on every run
#[derive(Debug)]
pub struct ReplayEngine {
    events: Vec<RunEvent>,
    /// Pause between events
    delay: Duration,
    /// Stop after the last event without closing the stream
    hold_open: bool,
    capacity: usize,
    invocations: AtomicUsize,
}

impl ReplayEngine {
    pub fn new(events: Vec<RunEvent>) -> Self {
        Self {
            events,
            delay: Duration::ZERO,
            hold_open: false,
            capacity: 64,
            invocations: AtomicUsize::new(0),
        }
    }

    /// Parses newline-delimited JSON events, skipping blank lines
    pub fn from_json_lines(input: &str) -> anyhow::Result<Self> {
        let events = input
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(idx, line)| {
                serde_json::from_str::<RunEvent>(line)
                    .with_context(|| format!("invalid run event on line {}", idx + 1))
            })
            .collect::<anyhow::Result<Vec<_>>>()?;

        Ok(Self::new(events))
    }

    /// Waits `delay` before each event
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Keeps the stream open after the last event, like an engine that hangs
    pub fn hold_open(mut self) -> Self {
        self.hold_open = true;
        self
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn events(&self) -> &[RunEvent] {
        &self.events
    }

    /// Number of times `run` has been called
    pub fn invocations(&self) -> usize {
        self.invocations.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PipelineEngine for ReplayEngine {
    async fn run(
        &self,
        pipeline: &PipelineDescriptor,
        secrets: ResolvedSecrets,
    ) -> anyhow::Result<RunEventStream> {
        self.invocations.fetch_add(1, Ordering::SeqCst);
        debug!(
            "Replaying {} events for pipeline '{}' ({} secrets)",
            self.events.len(),
            pipeline.name,
            secrets.len()
        );

        let (tx, stream) = event_channel(self.capacity);
        let events = self.events.clone();
        let delay = self.delay;
        let hold_open = self.hold_open;

        tokio::spawn(async move {
            for event in events {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                if tx.send(event).await.is_err() {
                    debug!("Replay consumer went away, stopping");
                    return;
                }
            }

            if hold_open {
                // Resolves once the coordinator drops the stream
                tx.closed().await;
            }
        });

        Ok(stream)
    }
}
