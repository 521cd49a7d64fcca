//! Shared AWS plumbing for the blocking adapters
//!
//! The pipeline is synchronous. Each AWS adapter holds an [`AwsContext`]
//! which owns a current-thread Tokio runtime and the loaded SDK
//! configuration, and blocks on every SDK call.

use std::future::Future;
use std::sync::Arc;

use aws_config::{BehaviorVersion, SdkConfig};

/// Runtime and SDK configuration shared by the AWS adapters
pub struct AwsContext {
    runtime: tokio::runtime::Runtime,
    config: SdkConfig,
    endpoint_url: Option<String>,
}

impl AwsContext {
    /// Load credentials and region from the environment
    ///
    /// Credentials are resolved in the SDK's default order: environment
    /// variables, shared credentials file, then the instance role.
    pub fn load(region: Option<&str>, endpoint_url: Option<&str>) -> std::io::Result<Arc<Self>> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;

        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = region {
            loader = loader.region(aws_config::Region::new(region.to_string()));
        }
        let config = runtime.block_on(loader.load());

        Ok(Arc::new(Self {
            runtime,
            config,
            endpoint_url: endpoint_url.map(str::to_string),
        }))
    }

    pub fn sdk_config(&self) -> &SdkConfig {
        &self.config
    }

    /// Custom endpoint for S3-compatible storage
    pub fn endpoint_url(&self) -> Option<&str> {
        self.endpoint_url.as_deref()
    }

    pub fn region(&self) -> Option<String> {
        self.config.region().map(|r| r.to_string())
    }

    /// Run an SDK future to completion
    pub fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }
}
