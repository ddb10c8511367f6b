//! Driver contract
//!
//! Each provider implements [`ResourceDriver`] once per resource kind and
//! exposes the drivers through a [`CloudConnection`]. The contract is the
//! same everywhere:
//!
//! - `create` refuses a NameID that already resolves (`AlreadyExists`) and
//!   returns only once the provider reports a terminal state
//! - `get` and `delete` on an unknown NameID return `NotFound`
//! - `list` may come back partial when the provider's enumeration is nested
//!
//! Nothing here serializes concurrent calls for the same NameID; callers
//! that race `create` against `delete` must order them themselves.

use crate::error::{CloudError, Result};
use crate::iid::Iid;
use crate::operation::CallContext;
use crate::resource::{
    ImageInfo, ImageRequest, KeyPairInfo, KeyPairRequest, Listing, ResourceKind, ResourceRequest,
};
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;

/// CRUD contract for one resource kind
#[async_trait]
pub trait ResourceDriver: Send + Sync {
    type Request: Send + Sync;
    type Info: Send;

    fn kind(&self) -> ResourceKind;

    /// Create the resource and wait for the provider to finish
    async fn create(&self, request: Self::Request, ctx: &CallContext) -> Result<Self::Info>;

    /// Enumerate resources visible to this connection
    async fn list(&self, ctx: &CallContext) -> Result<Listing<Self::Info>>;

    /// Resolve a resource by its NameID
    async fn get(&self, iid: &Iid, ctx: &CallContext) -> Result<Self::Info>;

    /// Delete the resource and wait for the provider to finish
    async fn delete(&self, iid: &Iid, ctx: &CallContext) -> Result<()>;
}

pub type ImageDriver = dyn ResourceDriver<Request = ImageRequest, Info = ImageInfo>;
pub type KeyPairDriver = dyn ResourceDriver<Request = KeyPairRequest, Info = KeyPairInfo>;

/// Idempotency guard for `create`: `Ok` only when `name_id` does not resolve
pub async fn ensure_absent<D>(driver: &D, name_id: &str, ctx: &CallContext) -> Result<()>
where
    D: ResourceDriver + ?Sized,
{
    match driver.get(&Iid::from_name(name_id), ctx).await {
        Ok(_) => Err(CloudError::AlreadyExists(format!(
            "{} '{}'",
            driver.kind(),
            name_id
        ))),
        Err(CloudError::NotFound(_)) => Ok(()),
        Err(e) => Err(e),
    }
}

/// Connection to one provider account and region
pub trait CloudConnection: Send + Sync {
    /// Provider name, e.g. "azure"
    fn provider(&self) -> &str;

    fn region(&self) -> &str;

    fn image_driver(&self) -> Arc<ImageDriver>;

    fn keypair_driver(&self) -> Arc<KeyPairDriver>;
}

/// Result of a kind-agnostic create
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResourceInfo {
    Image(ImageInfo),
    KeyPair(KeyPairInfo),
}

impl ResourceInfo {
    pub fn iid(&self) -> &Iid {
        match self {
            ResourceInfo::Image(info) => &info.iid,
            ResourceInfo::KeyPair(info) => &info.iid,
        }
    }
}

/// Dispatch a creation request to the matching driver
pub async fn create_resource(
    connection: &dyn CloudConnection,
    request: ResourceRequest,
    ctx: &CallContext,
) -> Result<ResourceInfo> {
    tracing::debug!(
        "Creating {} '{}' on {}",
        request.kind(),
        request.name_id(),
        connection.provider()
    );
    match request {
        ResourceRequest::Image(req) => connection
            .image_driver()
            .create(req, ctx)
            .await
            .map(ResourceInfo::Image),
        ResourceRequest::KeyPair(req) => connection
            .keypair_driver()
            .create(req, ctx)
            .await
            .map(ResourceInfo::KeyPair),
    }
}
