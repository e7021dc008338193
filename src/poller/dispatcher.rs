//! Write dispatcher - fire-and-forget writes of computed results
//!
//! `dispatch` returns immediately; the write runs on its own task and only
//! its outcome is logged and counted. Failed writes never reach the loop.
//! An ordered dispatcher still returns immediately, but each write starts
//! only after the previous one finished, so the gateway sees them in order.

use std::sync::Arc;

use log::{info, warn};
use tokio::sync::oneshot;
use tokio::task::{JoinError, JoinSet};

use crate::gateway::{Gateway, WriteRequest};

/// Write counters for one poll run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteStats {
    pub dispatched: u64,
    pub succeeded: u64,
    pub failed: u64,
}

impl WriteStats {
    /// Writes dispatched but not finished yet
    pub fn pending(&self) -> u64 {
        self.dispatched - self.succeeded - self.failed
    }
}

pub struct WriteDispatcher<G: Gateway + 'static> {
    gateway: Arc<G>,
    in_flight: JoinSet<bool>,
    stats: WriteStats,
    ordered: bool,
    /// Fires when the most recently dispatched write finishes
    previous: Option<oneshot::Receiver<()>>,
}

impl<G: Gateway + 'static> WriteDispatcher<G> {
    pub fn new(gateway: Arc<G>) -> Self {
        Self {
            gateway,
            in_flight: JoinSet::new(),
            stats: WriteStats::default(),
            ordered: false,
            previous: None,
        }
    }

    /// Chain writes so each waits for the one dispatched before it
    pub fn ordered(mut self) -> Self {
        self.ordered = true;
        self
    }

    /// Start a write without waiting for it
    pub fn dispatch(&mut self, request: WriteRequest) {
        self.reap();
        self.stats.dispatched += 1;

        let chain = if self.ordered {
            let (done_tx, done_rx) = oneshot::channel();
            Some((self.previous.replace(done_rx), done_tx))
        } else {
            None
        };

        let gateway = self.gateway.clone();
        self.in_flight.spawn(async move {
            let done = match chain {
                Some((previous, done)) => {
                    if let Some(previous) = previous {
                        // Err means the previous task died; nothing left to wait for
                        let _ = previous.await;
                    }
                    Some(done)
                }
                None => None,
            };

            let ok = write_once(gateway.as_ref(), &request).await;
            if let Some(done) = done {
                let _ = done.send(());
            }
            ok
        });
    }

    /// Wait for every outstanding write to finish
    pub async fn drain(&mut self) -> WriteStats {
        while let Some(joined) = self.in_flight.join_next().await {
            self.record(joined);
        }
        self.stats
    }

    /// Collect writes that already finished
    fn reap(&mut self) {
        while let Some(joined) = self.in_flight.try_join_next() {
            self.record(joined);
        }
    }

    fn record(&mut self, joined: Result<bool, JoinError>) {
        match joined {
            Ok(true) => self.stats.succeeded += 1,
            Ok(false) => self.stats.failed += 1,
            Err(e) => {
                warn!("Write task did not complete: {}", e);
                self.stats.failed += 1;
            }
        }
    }
}

async fn write_once<G: Gateway + ?Sized>(gateway: &G, request: &WriteRequest) -> bool {
    match gateway.write(request).await {
        Ok(response) => {
            for rejected in response.failures() {
                warn!(
                    "Gateway rejected write of {}: {}",
                    rejected.id,
                    rejected.r.as_deref().unwrap_or("no reason given")
                );
            }
            info!("Write successful: {}", request);
            true
        }
        Err(e) => {
            warn!("Write failed ({}): {}", e.kind(), e);
            false
        }
    }
}
