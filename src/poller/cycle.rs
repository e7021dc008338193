//! One read-compute step of a tick

use log::{info, warn};

use crate::config::TagConfig;
use crate::error::GatewayError;
use crate::gateway::{Gateway, Sample, WriteRequest};

/// Read the configured tags and compute their sum.
pub async fn read_sample<G: Gateway + ?Sized>(gateway: &G, tags: &TagConfig) -> Result<Sample, GatewayError> {
    let response = gateway.read(&tags.read_ids()).await?;

    for reading in response.read_results.iter().filter(|r| r.is_bad_quality()) {
        warn!(
            "Gateway reported a failed read for {}: {}",
            reading.id,
            reading.r.as_deref().unwrap_or("no reason given")
        );
    }

    let sample = response.sample()?;
    info!("Tag1 is: {}. Tag2 is: {}", sample.tag1, sample.tag2);
    info!("Post-processed result (Tag1 + Tag2) = {}", sample.sum);
    Ok(sample)
}

/// The write carrying a sample's sum to the destination tag
pub fn write_request(tags: &TagConfig, sample: &Sample) -> WriteRequest {
    WriteRequest::single(&tags.sum, sample.sum)
}
