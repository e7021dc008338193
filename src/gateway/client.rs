//! Gateway client trait

use async_trait::async_trait;

use crate::error::GatewayError;
use crate::gateway::types::{ReadResponse, WriteRequest, WriteResponse};

/// Read/write access to the IoT gateway REST endpoints
#[async_trait]
pub trait Gateway: Send + Sync {
    /// Read the given tag identifiers; results come back in request order
    async fn read(&self, ids: &[&str]) -> Result<ReadResponse, GatewayError>;

    /// Write one or more tag values
    async fn write(&self, request: &WriteRequest) -> Result<WriteResponse, GatewayError>;
}
