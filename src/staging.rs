//! Staging uploader
//!
//! Serializes an aggregated dataset and writes it as a single object in the
//! staging bucket. The write is atomic at object granularity: it either lands
//! whole under the configured name (overwriting any prior object) or the
//! error propagates to the caller.

use anyhow::{Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use tracing::{debug, info};

use crate::dataset::AggregatedDataset;

pub const STAGING_CONTENT_TYPE: &str = "text/csv";

/// Object storage boundary used for staged datasets
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Write a blob under `key`, replacing any existing object of that name
    async fn put_object(&self, key: &str, bytes: Bytes, content_type: &str) -> Result<()>;

    /// The URI the warehouse loader will read the object from
    fn object_uri(&self, key: &str) -> String;
}

/// Serialize the dataset and upload it under `object_name`. Returns the
/// staged object's URI.
pub async fn stage(
    store: &dyn ObjectStore,
    object_name: &str,
    dataset: &AggregatedDataset,
) -> Result<String> {
    let body = dataset
        .to_csv()
        .context("Failed to serialize dataset for staging")?;
    debug!(
        "Staging {} records ({} bytes) as {}",
        dataset.len(),
        body.len(),
        object_name
    );

    store
        .put_object(object_name, Bytes::from(body), STAGING_CONTENT_TYPE)
        .await
        .context(format!("Failed to stage object {}", object_name))?;

    let uri = store.object_uri(object_name);
    info!("Staged dataset at {}", uri);
    Ok(uri)
}
