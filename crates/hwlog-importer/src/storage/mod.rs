//! Object storage stream source
//!
//! Resolves a storage locator into a readable byte stream. Fetch failures
//! abort the session immediately; there are no retries at this layer.

use aws_sdk_s3::{
    config::{Credentials, Region},
    error::DisplayErrorContext,
    Client,
};
use hwlog_common::{ImportError, Result};
use tokio::io::AsyncRead;
use tracing::{debug, info, instrument};

use crate::event::ObjectLocator;

mod config;

pub use config::StorageConfig;

/// S3-compatible storage client.
#[derive(Clone)]
pub struct Storage {
    client: Client,
}

impl Storage {
    pub async fn new(config: StorageConfig) -> anyhow::Result<Self> {
        debug!("Initializing storage with config: {:?}", config);

        let credentials = Credentials::new(
            &config.access_key,
            &config.secret_key,
            None,
            None,
            "hwlog-storage",
        );

        let mut s3_config_builder = aws_sdk_s3::Config::builder()
            .credentials_provider(credentials)
            .region(Region::new(config.region.clone()))
            .force_path_style(config.path_style);

        if let Some(endpoint) = &config.endpoint {
            s3_config_builder = s3_config_builder.endpoint_url(endpoint);
        }

        let client = Client::from_conf(s3_config_builder.build());

        info!(region = %config.region, "Storage client initialized");

        Ok(Self { client })
    }

    /// Open a byte stream for the located object.
    ///
    /// A missing or inaccessible object is a [`ImportError::Retrieval`];
    /// locator key decoding happens upstream in [`crate::event`].
    #[instrument(skip(self))]
    pub async fn object_reader(
        &self,
        locator: &ObjectLocator,
    ) -> Result<impl AsyncRead + Unpin + Send + 'static> {
        debug!("Opening stream for {}", locator);

        let response = self
            .client
            .get_object()
            .bucket(&locator.bucket)
            .key(&locator.key)
            .send()
            .await
            .map_err(|e| {
                ImportError::retrieval(format!(
                    "failed to fetch {}: {}",
                    locator,
                    DisplayErrorContext(&e)
                ))
            })?;

        Ok(response.body.into_async_read())
    }
}
