//! Image driver
//!
//! Two kinds of image share one NameID space:
//!
//! - managed images live in the configured resource group and are named by
//!   a plain NameID
//! - marketplace images are named `publisher:offer:sku[:version]`; an
//!   unpinned NameID resolves to the latest published version
//!
//! Only managed images can be created or deleted.

use crate::compute::{ComputeApi, ImageCreateParams, ManagedImage, VmImage, latest_version};
use crate::config::{AzureConfig, ImageListConfig};
use crate::error::AzureError;
use async_trait::async_trait;
use cloudspan_cloud::iid::is_composite;
use cloudspan_cloud::{
    CallContext, CloudError, Iid, ImageInfo, ImageRequest, KeyValue, Listing, MarketplaceImageRef,
    OperationWaiter, ResourceDriver, ResourceKind, Result, ensure_absent,
};
use std::sync::Arc;

pub const RESOURCE_GROUP_KEY: &str = "ResourceGroup";
pub const LOCATION_KEY: &str = "Location";
pub const VERSION_KEY: &str = "Version";

pub struct AzureImageDriver {
    compute: Arc<dyn ComputeApi>,
    resource_group: String,
    region: String,
    list_config: ImageListConfig,
    waiter: OperationWaiter,
}

impl AzureImageDriver {
    pub fn new(compute: Arc<dyn ComputeApi>, config: &AzureConfig) -> Self {
        Self {
            compute,
            resource_group: config.resource_group.clone(),
            region: config.region.clone(),
            list_config: config.image_list.clone(),
            waiter: OperationWaiter::new(config.wait.clone()),
        }
    }

    fn managed_info(&self, name_id: &str, image: ManagedImage) -> ImageInfo {
        let system_id = image.id.clone().unwrap_or_else(|| image.name.clone());
        ImageInfo {
            iid: Iid::new(name_id, system_id),
            guest_os: image.os_type.unwrap_or_default(),
            status: image.provisioning_state,
            key_value_list: vec![
                KeyValue::new(RESOURCE_GROUP_KEY, &self.resource_group),
                KeyValue::new(LOCATION_KEY, image.location),
            ],
        }
    }

    fn marketplace_info(
        &self,
        name_id: &str,
        pinned: &MarketplaceImageRef,
        image: VmImage,
    ) -> Result<ImageInfo> {
        let version = pinned.version.clone().unwrap_or_else(|| image.name.clone());
        Ok(ImageInfo {
            iid: Iid::new(name_id, pinned.encode()?),
            guest_os: image.operating_system.unwrap_or_default(),
            status: None,
            key_value_list: vec![
                KeyValue::new(RESOURCE_GROUP_KEY, &self.resource_group),
                KeyValue::new(LOCATION_KEY, image.location),
                KeyValue::new(VERSION_KEY, version),
            ],
        })
    }

    /// Resolve a marketplace NameID, pinning the latest version when none is given
    async fn get_marketplace(&self, name_id: &str, ctx: &CallContext) -> Result<ImageInfo> {
        let wanted = MarketplaceImageRef::decode(name_id)?;
        let pinned = match &wanted.version {
            Some(_) => wanted.clone(),
            None => {
                let versions = self
                    .compute
                    .list_image_versions(&wanted.publisher, &wanted.offer, &wanted.sku)
                    .await
                    .map_err(CloudError::from)?;
                let latest = latest_version(&versions).ok_or_else(|| {
                    CloudError::NotFound(format!("marketplace image '{}' has no versions", wanted))
                })?;
                wanted.clone().with_version(latest.clone())
            }
        };
        if ctx.is_cancelled() {
            return Err(CloudError::Cancelled(format!("get image {}", name_id)));
        }

        let image = self
            .compute
            .get_vm_image(&pinned)
            .await
            .map_err(CloudError::from)?;
        self.marketplace_info(name_id, &pinned, image)
    }

    /// Walk publishers, offers and skus; a failing branch is recorded and skipped
    async fn list_marketplace(&self, listing: &mut Listing<ImageInfo>, ctx: &CallContext) {
        let publishers = match self.compute.list_publishers().await {
            Ok(publishers) => publishers,
            Err(e) => {
                tracing::warn!("Failed to list image publishers: {}", e);
                listing.skip(format!("publishers: {}", e));
                return;
            }
        };

        for publisher in publishers
            .iter()
            .filter(|p| self.list_config.allows(p.as_str()))
        {
            let offers = match self.compute.list_offers(publisher).await {
                Ok(offers) => offers,
                Err(e) => {
                    tracing::warn!("Skipping publisher {}: {}", publisher, e);
                    listing.skip(format!("{}: {}", publisher, e));
                    continue;
                }
            };

            for offer in &offers {
                let skus = match self.compute.list_skus(publisher, offer).await {
                    Ok(skus) => skus,
                    Err(e) => {
                        tracing::warn!("Skipping offer {}:{}: {}", publisher, offer, e);
                        listing.skip(format!("{}:{}: {}", publisher, offer, e));
                        continue;
                    }
                };

                for sku in &skus {
                    if ctx.is_cancelled() || self.is_full(listing) {
                        return;
                    }
                    let image = MarketplaceImageRef::new(publisher, offer, sku);
                    match self.latest_in_sku(&image).await {
                        Ok(Some(info)) => listing.items.push(info),
                        Ok(None) => {}
                        Err(e) => {
                            tracing::warn!("Skipping image {}: {}", image, e);
                            listing.skip(format!("{}:{}:{}: {}", publisher, offer, sku, e));
                        }
                    }
                }
            }
        }
    }

    /// Latest image of one sku; `None` only when the sku has no versions
    async fn latest_in_sku(&self, image: &MarketplaceImageRef) -> Result<Option<ImageInfo>> {
        let versions = match self
            .compute
            .list_image_versions(&image.publisher, &image.offer, &image.sku)
            .await
        {
            Ok(versions) => versions,
            Err(e) if is_not_found(&e) => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let Some(latest) = latest_version(&versions) else {
            return Ok(None);
        };

        let pinned = image.clone().with_version(latest.clone());
        let found = self
            .compute
            .get_vm_image(&pinned)
            .await
            .map_err(CloudError::from)?;
        self.marketplace_info(&image.encode()?, &pinned, found)
            .map(Some)
    }

    fn is_full(&self, listing: &Listing<ImageInfo>) -> bool {
        self.list_config
            .max_images
            .is_some_and(|max| listing.len() >= max)
    }
}

fn is_not_found(err: &AzureError) -> bool {
    matches!(
        err,
        AzureError::NotFound(_) | AzureError::Api { status: 404, .. }
    )
}

/// Create-side error mapping: a conflict means the name is taken
fn create_error(name_id: &str, err: AzureError) -> CloudError {
    match err {
        AzureError::Api {
            status: 409,
            message,
            ..
        } => CloudError::AlreadyExists(format!("image '{}': {}", name_id, message)),
        other => other.into(),
    }
}

fn marketplace_immutable(name_id: &str) -> CloudError {
    CloudError::Validation(format!(
        "marketplace image '{}' cannot be created or deleted",
        name_id
    ))
}

#[async_trait]
impl ResourceDriver for AzureImageDriver {
    type Request = ImageRequest;
    type Info = ImageInfo;

    fn kind(&self) -> ResourceKind {
        ResourceKind::Image
    }

    async fn create(&self, request: ImageRequest, ctx: &CallContext) -> Result<ImageInfo> {
        let name_id = request.name_id();
        if is_composite(name_id) {
            return Err(marketplace_immutable(name_id));
        }
        ensure_absent(self, name_id, ctx).await?;

        tracing::info!("Creating image {} in {}", name_id, self.resource_group);
        let params = ImageCreateParams {
            location: self.region.clone(),
            os_type: request.os_type(),
            source: request.source().clone(),
        };
        let operation = ctx
            .guard(&format!("create image {}", name_id), async {
                self.compute
                    .begin_create_image(name_id, &params)
                    .await
                    .map_err(|e| create_error(name_id, e))
            })
            .await?;
        self.waiter.wait(operation, ctx).await?;

        self.get(&Iid::from_name(name_id), ctx).await
    }

    async fn list(&self, ctx: &CallContext) -> Result<Listing<ImageInfo>> {
        let managed = self
            .compute
            .list_images()
            .await
            .map_err(CloudError::from)?;
        let mut listing = Listing::complete(
            managed
                .into_iter()
                .map(|image| {
                    let name = image.name.clone();
                    self.managed_info(&name, image)
                })
                .collect(),
        );

        if !self.is_full(&listing) {
            self.list_marketplace(&mut listing, ctx).await;
        }
        if ctx.is_cancelled() {
            return Err(CloudError::Cancelled("list images".to_string()));
        }
        if let Some(max) = self.list_config.max_images {
            listing.items.truncate(max);
        }

        tracing::debug!(
            "Listed {} images ({} branches skipped)",
            listing.len(),
            listing.skipped.len()
        );
        Ok(listing)
    }

    async fn get(&self, iid: &Iid, ctx: &CallContext) -> Result<ImageInfo> {
        iid.validate()?;
        if is_composite(&iid.name_id) {
            return self.get_marketplace(&iid.name_id, ctx).await;
        }

        match self.compute.get_image(&iid.name_id).await {
            Ok(Some(image)) => Ok(self.managed_info(&iid.name_id, image)),
            Ok(None) => Err(CloudError::NotFound(format!("image '{}'", iid.name_id))),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, iid: &Iid, ctx: &CallContext) -> Result<()> {
        iid.validate()?;
        if is_composite(&iid.name_id) {
            return Err(marketplace_immutable(&iid.name_id));
        }

        tracing::info!("Deleting image {} from {}", iid.name_id, self.resource_group);
        let operation = ctx
            .guard(&format!("delete image {}", iid.name_id), async {
                match self.compute.begin_delete_image(&iid.name_id).await {
                    Ok(operation) => Ok(operation),
                    Err(e) if is_not_found(&e) => {
                        Err(CloudError::NotFound(format!("image '{}'", iid.name_id)))
                    }
                    Err(e) => Err(e.into()),
                }
            })
            .await?;
        self.waiter.wait(operation, ctx).await
    }
}
