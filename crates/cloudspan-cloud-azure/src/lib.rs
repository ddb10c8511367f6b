//! Azure provider for cloudspan
//!
//! Implements the cloudspan driver contract for Azure images and key pairs.
//!
//! # Features
//!
//! - Managed images: create from a managed disk or VHD blob, get, list, delete
//! - Marketplace images: get and list by `publisher:offer:sku[:version]`
//! - Key pairs: generated locally, kept in the credential-scoped key store
//!
//! # Requirements
//!
//! - An OAuth2 bearer token for `https://management.azure.com`
//! - A service-principal credential (`ClientId`, `ClientSecret`, `TenantId`,
//!   `SubscriptionId`), used to partition local key pairs
//!
//! # Example
//!
//! ```ignore
//! use cloudspan_cloud::{CallContext, CredentialInfo, Iid, KeyStoreConfig, CloudConnection};
//! use cloudspan_cloud_azure::{AzureConfig, AzureConnection};
//!
//! let credential = CredentialInfo::azure(client_id, secret, tenant, subscription);
//! let config = AzureConfig::from_credential(&credential, "rg-prod", "koreacentral")?;
//! let connection = AzureConnection::connect(
//!     config,
//!     &credential,
//!     token,
//!     KeyStoreConfig::under("/var/lib/cloudspan"),
//! )?;
//!
//! let ctx = CallContext::new();
//! let image = connection
//!     .image_driver()
//!     .get(&Iid::from_name("Canonical:UbuntuServer:18.04-LTS"), &ctx)
//!     .await?;
//! ```

pub mod arm;
pub mod compute;
pub mod config;
pub mod connection;
pub mod error;
pub mod image;
pub mod keypair;

pub use arm::{ArmClient, ArmOperation};
pub use compute::{ComputeApi, ImageCreateParams, ManagedImage, VmImage};
pub use config::{AzureConfig, ImageListConfig};
pub use connection::AzureConnection;
pub use error::{AzureError, PROVIDER, Result};
pub use image::AzureImageDriver;
pub use keypair::AzureKeyPairDriver;
