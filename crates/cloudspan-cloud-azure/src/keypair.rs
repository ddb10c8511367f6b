//! Key pair driver
//!
//! Azure keeps no key pair resource of its own. Key pairs are generated
//! locally and live in the [`KeyPairStore`] under the connection's
//! credential scope; VMs receive the public half at creation time.

use async_trait::async_trait;
use cloudspan_cloud::{
    CallContext, CloudError, CredentialScope, Iid, KeyPairInfo, KeyPairRequest, KeyPairStore,
    Listing, ResourceDriver, ResourceKind, Result,
};
use std::sync::Arc;

pub struct AzureKeyPairDriver {
    store: Arc<KeyPairStore>,
    scope: CredentialScope,
}

impl AzureKeyPairDriver {
    pub fn new(store: Arc<KeyPairStore>, scope: CredentialScope) -> Self {
        Self { store, scope }
    }

    pub fn scope(&self) -> &CredentialScope {
        &self.scope
    }

    fn check_cancelled(ctx: &CallContext, what: &str) -> Result<()> {
        if ctx.is_cancelled() {
            return Err(CloudError::Cancelled(what.to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl ResourceDriver for AzureKeyPairDriver {
    type Request = KeyPairRequest;
    type Info = KeyPairInfo;

    fn kind(&self) -> ResourceKind {
        ResourceKind::KeyPair
    }

    async fn create(&self, request: KeyPairRequest, ctx: &CallContext) -> Result<KeyPairInfo> {
        Self::check_cancelled(ctx, "create keypair")?;
        self.store.create(&self.scope, request.name_id()).await
    }

    async fn list(&self, ctx: &CallContext) -> Result<Listing<KeyPairInfo>> {
        Self::check_cancelled(ctx, "list keypairs")?;
        Ok(Listing::complete(self.store.list(&self.scope).await?))
    }

    async fn get(&self, iid: &Iid, ctx: &CallContext) -> Result<KeyPairInfo> {
        Self::check_cancelled(ctx, "get keypair")?;
        self.store.get(&self.scope, &iid.name_id).await
    }

    async fn delete(&self, iid: &Iid, ctx: &CallContext) -> Result<()> {
        Self::check_cancelled(ctx, "delete keypair")?;
        self.store.delete(&self.scope, &iid.name_id).await
    }
}
