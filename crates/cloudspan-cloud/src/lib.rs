//! cloudspan cloud core
//!
//! Provider-independent half of cloudspan: one CRUD contract for cloud
//! resources that every provider adapter implements, plus the local state
//! a provider will not keep for us.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │                     caller                       │
//! └─────────────────┬───────────────────────────────┘
//!                   │  create / list / get / delete
//! ┌─────────────────▼───────────────────────────────┐
//! │                cloudspan-cloud                   │
//! │  ┌──────────────────────────────────────────┐   │
//! │  │   trait ResourceDriver / CloudConnection │   │
//! │  └──────────────────────────────────────────┘   │
//! │  ┌──────────┐ ┌──────────────┐ ┌────────────┐   │
//! │  │   Iid    │ │ Op. waiter   │ │ Key store  │   │
//! │  └──────────┘ └──────────────┘ └────────────┘   │
//! └───────┬─────────────────────────────────────────┘
//!         │
//! ┌───────▼───────┐
//! │    azure      │
//! │   adapter     │
//! └───────────────┘
//! ```

pub mod credential;
pub mod driver;
pub mod error;
pub mod iid;
pub mod keygen;
pub mod keystore;
pub mod operation;
pub mod resource;

// Re-exports
pub use credential::{CredentialInfo, CredentialScope};
pub use driver::{
    CloudConnection, ImageDriver, KeyPairDriver, ResourceDriver, ResourceInfo, create_resource,
    ensure_absent,
};
pub use error::{CloudError, ErrorKind, Result};
pub use iid::{Iid, MarketplaceImageRef, compose, decompose};
pub use keygen::{KeyGenerator, KeyMaterial, RsaKeyGenerator};
pub use keystore::{KeyIndex, KeyPairStore, KeyStoreConfig};
pub use operation::{
    CallContext, CompletedOperation, LongRunningOperation, OperationState, OperationWaiter,
    WaitConfig,
};
pub use resource::{
    ImageInfo, ImageRequest, ImageSource, KeyPairInfo, KeyPairRequest, KeyValue, Listing, OsType,
    ResourceKind, ResourceRequest,
};

// Callers build cancellation tokens without depending on tokio-util directly
pub use tokio_util::sync::CancellationToken;
