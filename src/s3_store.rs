//! S3-compatible object store
//!
//! Staging bucket client for AWS S3 and S3-compatible services (Cloudflare
//! R2, MinIO, and similar) with custom endpoint configuration.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use aws_config::meta::region::RegionProviderChain;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client as S3Client;
use bytes::Bytes;
use tracing::debug;

use crate::config::StorageConfig;
use crate::staging::ObjectStore;

/// S3 provider types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum S3Provider {
    /// Amazon Web Services S3
    AwsS3,
    /// Cloudflare R2
    CloudflareR2,
    /// Generic S3-compatible service
    Generic,
}

impl S3Provider {
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "aws" | "s3" | "aws-s3" => S3Provider::AwsS3,
            "r2" | "cloudflare" | "cloudflare-r2" => S3Provider::CloudflareR2,
            _ => S3Provider::Generic,
        }
    }
}

/// Staging bucket client
pub struct S3Store {
    client: S3Client,
    config: StorageConfig,
}

impl S3Store {
    pub async fn new(config: StorageConfig) -> Result<Self> {
        let client = Self::create_client(&config)
            .await
            .context("Failed to create S3 client")?;

        Ok(Self { client, config })
    }

    async fn create_client(config: &StorageConfig) -> Result<S3Client> {
        let provider = S3Provider::parse(&config.provider);

        let credentials = Credentials::new(
            &config.access_key_id,
            &config.secret_access_key,
            None,
            None,
            "config",
        );

        let region = config.region.clone().unwrap_or_else(|| match provider {
            S3Provider::AwsS3 | S3Provider::Generic => "us-east-1".to_string(),
            S3Provider::CloudflareR2 => "auto".to_string(),
        });
        let region_provider = RegionProviderChain::first_try(Region::new(region));

        let aws_config = aws_config::defaults(BehaviorVersion::latest())
            .region(region_provider)
            .credentials_provider(credentials)
            .load()
            .await;

        let mut builder = aws_sdk_s3::config::Builder::from(&aws_config);

        if let Some(endpoint) = &config.endpoint {
            builder = builder
                .endpoint_url(endpoint)
                .force_path_style(config.force_path_style.unwrap_or(true));
        } else {
            match provider {
                S3Provider::AwsS3 => {
                    builder = builder.force_path_style(config.force_path_style.unwrap_or(false));
                }
                S3Provider::CloudflareR2 => {
                    bail!("Cloudflare R2 requires an endpoint URL (e.g., https://<account-id>.r2.cloudflarestorage.com)");
                }
                S3Provider::Generic => {
                    bail!("Generic S3 provider requires an endpoint URL");
                }
            }
        }

        Ok(S3Client::from_conf(builder.build()))
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn put_object(&self, key: &str, bytes: Bytes, content_type: &str) -> Result<()> {
        debug!(
            "Uploading {} bytes to s3://{}/{}",
            bytes.len(),
            self.config.bucket,
            key
        );

        let response = self
            .client
            .put_object()
            .bucket(&self.config.bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(bytes))
            .send()
            .await
            .context(format!("Failed to upload object to S3: {}", key))?;

        let etag = response.e_tag().unwrap_or("unknown").to_string();
        debug!("Successfully uploaded {} (ETag: {})", key, etag);
        Ok(())
    }

    fn object_uri(&self, key: &str) -> String {
        format!("s3://{}/{}", self.config.bucket, key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_parsing() {
        assert_eq!(S3Provider::parse("aws"), S3Provider::AwsS3);
        assert_eq!(S3Provider::parse("R2"), S3Provider::CloudflareR2);
        assert_eq!(S3Provider::parse("minio"), S3Provider::Generic);
    }

    #[tokio::test]
    async fn test_object_uri() {
        let store = S3Store::new(StorageConfig {
            provider: "generic".to_string(),
            bucket: "stock-staging".to_string(),
            access_key_id: "AK".to_string(),
            secret_access_key: "SK".to_string(),
            region: None,
            endpoint: Some("http://localhost:9000".to_string()),
            force_path_style: None,
        })
        .await
        .unwrap();

        assert_eq!(store.object_uri("daily.csv"), "s3://stock-staging/daily.csv");
    }

    #[tokio::test]
    async fn test_r2_without_endpoint_is_rejected() {
        let result = S3Store::new(StorageConfig {
            provider: "r2".to_string(),
            bucket: "stock-staging".to_string(),
            access_key_id: "AK".to_string(),
            secret_access_key: "SK".to_string(),
            region: None,
            endpoint: None,
            force_path_style: None,
        })
        .await;

        assert!(result.is_err());
    }
}
