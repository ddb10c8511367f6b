//! Azure connection
//!
//! Binds one credential, subscription and region to its drivers.

use crate::arm::ArmClient;
use crate::compute::ComputeApi;
use crate::config::AzureConfig;
use crate::error::{AzureError, PROVIDER, Result};
use crate::image::AzureImageDriver;
use crate::keypair::AzureKeyPairDriver;
use cloudspan_cloud::{
    CloudConnection, CredentialInfo, ImageDriver, KeyPairDriver, KeyPairStore, KeyStoreConfig,
};
use std::sync::Arc;

pub struct AzureConnection {
    config: AzureConfig,
    images: Arc<AzureImageDriver>,
    keypairs: Arc<AzureKeyPairDriver>,
}

impl AzureConnection {
    /// Assemble a connection from an existing compute client and key store
    pub fn new(
        config: AzureConfig,
        credential: &CredentialInfo,
        compute: Arc<dyn ComputeApi>,
        store: Arc<KeyPairStore>,
    ) -> Result<Self> {
        config.validate()?;
        if let Some(subscription) = credential.get("SubscriptionId") {
            if subscription != config.subscription_id {
                return Err(AzureError::InvalidConfig(format!(
                    "credential subscription '{}' does not match configured '{}'",
                    subscription, config.subscription_id
                )));
            }
        }

        let scope = credential.scope()?;
        let images = Arc::new(AzureImageDriver::new(compute, &config));
        let keypairs = Arc::new(AzureKeyPairDriver::new(store, scope));
        Ok(Self {
            config,
            images,
            keypairs,
        })
    }

    /// Connect over the Resource Manager API with a caller-supplied token
    pub fn connect(
        config: AzureConfig,
        credential: &CredentialInfo,
        access_token: impl Into<String>,
        key_store: KeyStoreConfig,
    ) -> Result<Self> {
        let compute = Arc::new(ArmClient::new(&config, access_token)?);
        let store = Arc::new(KeyPairStore::new(key_store)?);
        tracing::info!(
            "Connected to Azure subscription {} in {}",
            config.subscription_id,
            config.region
        );
        Self::new(config, credential, compute, store)
    }

    pub fn config(&self) -> &AzureConfig {
        &self.config
    }

    pub fn images(&self) -> &Arc<AzureImageDriver> {
        &self.images
    }

    pub fn keypairs(&self) -> &Arc<AzureKeyPairDriver> {
        &self.keypairs
    }
}

impl CloudConnection for AzureConnection {
    fn provider(&self) -> &str {
        PROVIDER
    }

    fn region(&self) -> &str {
        &self.config.region
    }

    fn image_driver(&self) -> Arc<ImageDriver> {
        self.images.clone()
    }

    fn keypair_driver(&self) -> Arc<KeyPairDriver> {
        self.keypairs.clone()
    }
}
