//! Scripted in-memory gateway for tests and dry runs

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::GatewayError;
use crate::gateway::client::Gateway;
use crate::gateway::types::{ReadResponse, TagReading, WriteRequest, WriteResponse};

/// Gateway that replays scripted read results.
///
/// Reads walk through the script in order; once it is exhausted the last
/// entry repeats. Every write is recorded.
pub struct MockGateway {
    reads: Vec<Result<ReadResponse, GatewayError>>,
    write_result: Result<WriteResponse, GatewayError>,
    read_delay: Duration,
    write_delays: Vec<Duration>,
    read_calls: AtomicUsize,
    write_calls: AtomicUsize,
    reads_in_flight: AtomicUsize,
    max_reads_in_flight: AtomicUsize,
    writes: Mutex<Vec<WriteRequest>>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self {
            reads: Vec::new(),
            write_result: Ok(WriteResponse::default()),
            read_delay: Duration::ZERO,
            write_delays: Vec::new(),
            read_calls: AtomicUsize::new(0),
            write_calls: AtomicUsize::new(0),
            reads_in_flight: AtomicUsize::new(0),
            max_reads_in_flight: AtomicUsize::new(0),
            writes: Mutex::new(Vec::new()),
        }
    }

    /// Build a read response for the default three tag ids
    pub fn reading(tag1: i64, tag2: i64, exit: i64) -> ReadResponse {
        ReadResponse::new(vec![
            TagReading::new("Channel1.SimuDev.Tag1", tag1),
            TagReading::new("Channel1.SimuDev.Tag2", tag2),
            TagReading::new("Channel1.SimuDev.exitLoop", exit),
        ])
    }

    pub fn with_read(mut self, response: ReadResponse) -> Self {
        self.reads.push(Ok(response));
        self
    }

    pub fn with_read_error(mut self, error: GatewayError) -> Self {
        self.reads.push(Err(error));
        self
    }

    pub fn with_failing_writes(mut self, error: GatewayError) -> Self {
        self.write_result = Err(error);
        self
    }

    pub fn with_read_delay(mut self, delay: Duration) -> Self {
        self.read_delay = delay;
        self
    }

    /// Delay the nth write call by `delays[n]` before recording it
    pub fn with_write_delays(mut self, delays: Vec<Duration>) -> Self {
        self.write_delays = delays;
        self
    }

    pub fn read_calls(&self) -> usize {
        self.read_calls.load(Ordering::SeqCst)
    }

    /// Highest number of reads observed running at the same time
    pub fn max_reads_in_flight(&self) -> usize {
        self.max_reads_in_flight.load(Ordering::SeqCst)
    }

    pub async fn writes(&self) -> Vec<WriteRequest> {
        self.writes.lock().await.clone()
    }
}

impl Default for MockGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Gateway for MockGateway {
    async fn read(&self, _ids: &[&str]) -> Result<ReadResponse, GatewayError> {
        let index = self.read_calls.fetch_add(1, Ordering::SeqCst);
        let in_flight = self.reads_in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_reads_in_flight.fetch_max(in_flight, Ordering::SeqCst);

        if !self.read_delay.is_zero() {
            tokio::time::sleep(self.read_delay).await;
        }
        self.reads_in_flight.fetch_sub(1, Ordering::SeqCst);

        match self.reads.get(index).or_else(|| self.reads.last()) {
            Some(result) => result.clone(),
            None => Err(GatewayError::Transport("no scripted read response".to_string())),
        }
    }

    async fn write(&self, request: &WriteRequest) -> Result<WriteResponse, GatewayError> {
        let index = self.write_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.write_delays.get(index).filter(|d| !d.is_zero()) {
            tokio::time::sleep(*delay).await;
        }

        self.writes.lock().await.push(request.clone());
        self.write_result.clone()
    }
}
