//! Azure adapter configuration

use crate::error::{AzureError, Result};
use cloudspan_cloud::{CredentialInfo, WaitConfig};
use serde::{Deserialize, Serialize};

pub const DEFAULT_ENDPOINT: &str = "https://management.azure.com";
pub const DEFAULT_API_VERSION: &str = "2018-06-01";
pub const DEFAULT_MAX_IMAGES: usize = 500;

/// Account, placement and polling settings for one connection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AzureConfig {
    pub subscription_id: String,

    /// Resource group holding managed images
    pub resource_group: String,

    /// Location, e.g. "koreacentral"
    pub region: String,

    /// Resource Manager endpoint
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Compute API version
    #[serde(default = "default_api_version")]
    pub api_version: String,

    #[serde(default)]
    pub image_list: ImageListConfig,

    #[serde(default)]
    pub wait: WaitConfig,
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_api_version() -> String {
    DEFAULT_API_VERSION.to_string()
}

/// Bounds for the marketplace image enumeration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageListConfig {
    /// Only enumerate these publishers (all when unset)
    #[serde(default)]
    pub publishers: Option<Vec<String>>,

    /// Stop once this many images have been collected; `null` walks the
    /// whole catalog
    #[serde(default = "default_max_images")]
    pub max_images: Option<usize>,
}

fn default_max_images() -> Option<usize> {
    Some(DEFAULT_MAX_IMAGES)
}

impl Default for ImageListConfig {
    fn default() -> Self {
        Self {
            publishers: None,
            max_images: default_max_images(),
        }
    }
}

impl ImageListConfig {
    pub fn allows(&self, publisher: &str) -> bool {
        match &self.publishers {
            Some(allowed) => allowed.iter().any(|p| p.eq_ignore_ascii_case(publisher)),
            None => true,
        }
    }
}

impl AzureConfig {
    pub fn new(
        subscription_id: impl Into<String>,
        resource_group: impl Into<String>,
        region: impl Into<String>,
    ) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            resource_group: resource_group.into(),
            region: region.into(),
            endpoint: default_endpoint(),
            api_version: default_api_version(),
            image_list: ImageListConfig::default(),
            wait: WaitConfig::default(),
        }
    }

    /// Take the subscription from the credential's `SubscriptionId` field
    pub fn from_credential(
        credential: &CredentialInfo,
        resource_group: impl Into<String>,
        region: impl Into<String>,
    ) -> Result<Self> {
        let subscription_id = credential.require("SubscriptionId")?;
        Ok(Self::new(subscription_id, resource_group, region))
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_image_list(mut self, image_list: ImageListConfig) -> Self {
        self.image_list = image_list;
        self
    }

    pub fn with_wait(mut self, wait: WaitConfig) -> Self {
        self.wait = wait;
        self
    }

    pub fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("subscription_id", &self.subscription_id),
            ("resource_group", &self.resource_group),
            ("region", &self.region),
            ("endpoint", &self.endpoint),
            ("api_version", &self.api_version),
        ] {
            if value.trim().is_empty() {
                return Err(AzureError::InvalidConfig(format!("{} must be set", field)));
            }
        }
        Ok(())
    }
}
