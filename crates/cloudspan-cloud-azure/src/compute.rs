//! Compute capability consumed by the Azure drivers
//!
//! [`ComputeApi`] is the provider boundary: everything the image driver
//! needs from Azure, in Azure's own vocabulary. [`crate::arm::ArmClient`]
//! implements it over the Resource Manager REST API.

use crate::error::Result;
use async_trait::async_trait;
use cloudspan_cloud::{ImageSource, LongRunningOperation, MarketplaceImageRef, OsType};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Managed image in a resource group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagedImage {
    /// Full resource id
    pub id: Option<String>,
    pub name: String,
    pub location: String,
    pub os_type: Option<String>,
    /// `provisioningState` as reported
    pub provisioning_state: Option<String>,
}

/// Marketplace image version
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VmImage {
    pub id: String,
    /// Version string, e.g. "18.04.201908210"
    pub name: String,
    pub location: String,
    pub operating_system: Option<String>,
}

/// Body of an image creation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageCreateParams {
    pub location: String,
    pub os_type: OsType,
    pub source: ImageSource,
}

#[async_trait]
pub trait ComputeApi: Send + Sync {
    /// Managed image by name, `None` when absent
    async fn get_image(&self, name: &str) -> Result<Option<ManagedImage>>;

    async fn list_images(&self) -> Result<Vec<ManagedImage>>;

    async fn begin_create_image(
        &self,
        name: &str,
        params: &ImageCreateParams,
    ) -> Result<Box<dyn LongRunningOperation>>;

    async fn begin_delete_image(&self, name: &str) -> Result<Box<dyn LongRunningOperation>>;

    async fn list_publishers(&self) -> Result<Vec<String>>;

    async fn list_offers(&self, publisher: &str) -> Result<Vec<String>>;

    async fn list_skus(&self, publisher: &str, offer: &str) -> Result<Vec<String>>;

    async fn list_image_versions(
        &self,
        publisher: &str,
        offer: &str,
        sku: &str,
    ) -> Result<Vec<String>>;

    /// One pinned marketplace image version
    async fn get_vm_image(&self, image: &MarketplaceImageRef) -> Result<VmImage>;
}

/// Order dotted version strings numerically where possible
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let mut left = a.split('.');
    let mut right = b.split('.');
    loop {
        match (left.next(), right.next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) => {
                let ordering = match (x.parse::<u64>(), y.parse::<u64>()) {
                    (Ok(x), Ok(y)) => x.cmp(&y),
                    _ => x.cmp(y),
                };
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
        }
    }
}

/// Highest version in the list
pub fn latest_version(versions: &[String]) -> Option<&String> {
    versions.iter().max_by(|a, b| compare_versions(a, b))
}
