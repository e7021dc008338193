//! tagloop - poll an IoT gateway, sum two tags, write the result back
//!
//! Every tick reads two tag values and an exit tag from the gateway's REST
//! read endpoint, writes `tag1 + tag2` to a destination tag, and stops once
//! the exit tag reads 1.

pub mod config;
pub mod error;
pub mod gateway;
pub mod poller;

pub use error::{GatewayError, Result, TagloopError};
