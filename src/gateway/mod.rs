//! IoT gateway access - wire types, client trait, HTTP and mock clients

pub mod client;
pub mod http;
pub mod mock;
pub mod types;

pub use client::Gateway;
pub use http::HttpGateway;
pub use mock::MockGateway;
pub use types::{
    ReadResponse, Sample, TagReading, TagValue, WriteRecord, WriteRequest, WriteResponse, WriteResult,
};
