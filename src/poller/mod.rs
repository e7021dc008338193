//! Poll-compute-write loop
//!
//! A single task drives a repeating timer. Every tick reads tag1, tag2 and
//! the exit tag, hands `tag1 + tag2` to the [`WriteDispatcher`], and stops
//! the timer when the exit tag reads exactly 1. Failed reads are logged and
//! the tick is skipped; the loop keeps going.

pub mod cycle;
pub mod dispatcher;
pub mod signal;
pub mod tick;

use std::sync::Arc;

use log::{info, warn};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::MissedTickBehavior;

use crate::config::{Config, TagConfig};
use crate::error::{GatewayError, Result, TagloopError};
use crate::gateway::{Gateway, Sample};

pub use dispatcher::{WriteDispatcher, WriteStats};
pub use signal::{StopReason, StopSignal};
pub use tick::{OverlapPolicy, PollSummary, TickConfig, TickState};

pub struct Poller<G: Gateway + 'static> {
    gateway: Arc<G>,
    tags: TagConfig,
    tick: TickConfig,
}

impl<G: Gateway + 'static> Poller<G> {
    pub fn new(gateway: Arc<G>, tags: TagConfig, tick: TickConfig) -> Self {
        Self { gateway, tags, tick }
    }

    pub fn from_config(gateway: Arc<G>, config: &Config) -> Self {
        Self::new(gateway, config.tags.clone(), TickConfig::from(&config.poll))
    }

    /// Spawn the loop on the current runtime. The first tick fires immediately.
    pub fn start(self) -> PollHandle {
        let signal = Arc::new(StopSignal::new());
        let task = tokio::spawn(self.run(signal.clone()));
        PollHandle { signal, task }
    }

    async fn run(self, signal: Arc<StopSignal>) -> PollSummary {
        info!(
            "Starting poll loop: every {:?}, {:?} ticks, reading {}",
            self.tick.tick_interval,
            self.tick.overlap,
            self.tags.read_ids().join(", ")
        );

        let mut interval = tokio::time::interval(self.tick.tick_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut state = TickState::new();
        let mut dispatcher = WriteDispatcher::new(self.gateway.clone());
        if self.tick.overlap == OverlapPolicy::Serialize {
            dispatcher = dispatcher.ordered();
        }
        let mut cycles: JoinSet<std::result::Result<Sample, GatewayError>> = JoinSet::new();

        loop {
            tokio::select! {
                biased;

                _ = signal.stopped() => break,

                Some(joined) = cycles.join_next(), if !cycles.is_empty() => {
                    let result = joined.unwrap_or_else(|e| Err(GatewayError::Transport(format!("read task failed: {}", e))));
                    self.complete(result, &mut state, &mut dispatcher, &signal);
                }

                _ = interval.tick() => {
                    state.tick();
                    log::debug!("Tick {}", state.tick_count);

                    match self.tick.overlap {
                        OverlapPolicy::Serialize => {
                            let result = cycle::read_sample(self.gateway.as_ref(), &self.tags).await;
                            self.complete(result, &mut state, &mut dispatcher, &signal);
                        }
                        OverlapPolicy::Overlap => {
                            let gateway = self.gateway.clone();
                            let tags = self.tags.clone();
                            cycles.spawn(async move { cycle::read_sample(gateway.as_ref(), &tags).await });
                        }
                    }

                    if self.tick.limit_reached(state.tick_count) {
                        signal.stop(StopReason::MaxTicks);
                    }
                }
            }
        }

        // The timer is gone but reads already issued still complete and write
        while let Some(joined) = cycles.join_next().await {
            let result = joined.unwrap_or_else(|e| Err(GatewayError::Transport(format!("read task failed: {}", e))));
            self.complete(result, &mut state, &mut dispatcher, &signal);
        }
        let writes = dispatcher.drain().await;

        let summary = state.into_summary(writes, signal.reason());
        info!(
            "Poll loop finished after {} ticks: {} reads ok, {} failed, {} writes ok, {} failed",
            summary.ticks, summary.reads_ok, summary.reads_failed, writes.succeeded, writes.failed
        );
        summary
    }

    fn complete(
        &self,
        result: std::result::Result<Sample, GatewayError>,
        state: &mut TickState,
        dispatcher: &mut WriteDispatcher<G>,
        signal: &StopSignal,
    ) {
        match result {
            Ok(sample) => {
                state.read_ok(sample.sum);
                dispatcher.dispatch(cycle::write_request(&self.tags, &sample));
                if sample.should_exit() {
                    signal.stop(StopReason::ExitSentinel);
                }
            }
            Err(e) => {
                state.read_failed();
                warn!("Read failed ({}), skipping write: {}", e.kind(), e);
            }
        }
    }
}

/// Owned handle to a running poll loop
pub struct PollHandle {
    signal: Arc<StopSignal>,
    task: JoinHandle<PollSummary>,
}

impl PollHandle {
    /// Stop the timer. In-flight reads and writes still finish.
    ///
    /// Returns false if the loop had already stopped.
    pub fn cancel(&self) -> bool {
        self.signal.stop(StopReason::Cancelled)
    }

    /// Shared stop signal, e.g. for a Ctrl-C handler
    pub fn signal(&self) -> Arc<StopSignal> {
        self.signal.clone()
    }

    /// Wait for the loop and its pending writes to finish
    pub async fn join(self) -> Result<PollSummary> {
        self.task
            .await
            .map_err(|e| TagloopError::Task(format!("poll loop task failed: {}", e)))
    }
}
