//! Normalized resource shapes and creation requests

use crate::error::{CloudError, Result};
use crate::iid::{Iid, is_composite, validate_name_id};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Free-form auxiliary attribute
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyValue {
    pub key: String,
    pub value: String,
}

impl KeyValue {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Look up a value in a key-value list
pub fn find_value<'a>(list: &'a [KeyValue], key: &str) -> Option<&'a str> {
    list.iter()
        .find(|kv| kv.key == key)
        .map(|kv| kv.value.as_str())
}

/// Resource kinds covered by the driver contract
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Image,
    KeyPair,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKind::Image => write!(f, "image"),
            ResourceKind::KeyPair => write!(f, "keypair"),
        }
    }
}

/// Image as reported by the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageInfo {
    pub iid: Iid,

    /// Guest OS family, e.g. "Linux"
    pub guest_os: String,

    /// Provider-reported status, verbatim. Marketplace images carry none.
    pub status: Option<String>,

    pub key_value_list: Vec<KeyValue>,
}

/// Key pair as held by the local secret store
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyPairInfo {
    pub iid: Iid,

    /// Authorized-key text (`ssh-rsa AAAA...`)
    pub public_key: String,

    /// PEM-encoded private key
    pub private_key: String,

    pub key_value_list: Vec<KeyValue>,
}

impl fmt::Debug for KeyPairInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPairInfo")
            .field("iid", &self.iid)
            .field("public_key", &self.public_key)
            .field("private_key", &"<redacted>")
            .field("key_value_list", &self.key_value_list)
            .finish()
    }
}

/// Guest OS family of an image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OsType {
    Linux,
    Windows,
}

impl OsType {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "linux" => Some(Self::Linux),
            "windows" => Some(Self::Windows),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OsType::Linux => "Linux",
            OsType::Windows => "Windows",
        }
    }
}

impl fmt::Display for OsType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a new image's OS disk comes from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ImageSource {
    /// Provider resource id of a managed disk
    ManagedDisk(String),
    /// URI of a VHD blob
    BlobUri(String),
}

/// Request to create an image
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageRequest {
    name_id: String,
    os_type: OsType,
    source: ImageSource,
}

impl ImageRequest {
    pub fn new(name_id: impl Into<String>, os_type: OsType, source: ImageSource) -> Result<Self> {
        let name_id = name_id.into();
        validate_name_id(&name_id)?;
        if is_composite(&name_id) {
            return Err(CloudError::Validation(format!(
                "image name '{}' must not be a composite identifier",
                name_id
            )));
        }
        let source_value = match &source {
            ImageSource::ManagedDisk(id) => id,
            ImageSource::BlobUri(uri) => uri,
        };
        if source_value.trim().is_empty() {
            return Err(CloudError::Validation(format!(
                "image '{}' needs a non-empty source",
                name_id
            )));
        }
        Ok(Self {
            name_id,
            os_type,
            source,
        })
    }

    pub fn name_id(&self) -> &str {
        &self.name_id
    }

    pub fn os_type(&self) -> OsType {
        self.os_type
    }

    pub fn source(&self) -> &ImageSource {
        &self.source
    }
}

/// Request to create a key pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyPairRequest {
    name_id: String,
}

impl KeyPairRequest {
    pub fn new(name_id: impl Into<String>) -> Result<Self> {
        let name_id = name_id.into();
        validate_key_name(&name_id)?;
        Ok(Self { name_id })
    }

    pub fn name_id(&self) -> &str {
        &self.name_id
    }
}

/// Key pair names become file names, so path syntax is rejected
pub fn validate_key_name(name_id: &str) -> Result<()> {
    validate_name_id(name_id)?;
    if name_id == "." || name_id == ".." {
        return Err(CloudError::Validation(format!(
            "key pair name '{}' is reserved",
            name_id
        )));
    }
    if name_id.contains(['/', '\\']) {
        return Err(CloudError::Validation(format!(
            "key pair name '{}' must not contain path separators",
            name_id
        )));
    }
    if name_id.ends_with(".pub") {
        return Err(CloudError::Validation(format!(
            "key pair name '{}' must not end with '.pub'",
            name_id
        )));
    }
    Ok(())
}

/// Creation request for any resource kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResourceRequest {
    Image(ImageRequest),
    KeyPair(KeyPairRequest),
}

impl ResourceRequest {
    pub fn kind(&self) -> ResourceKind {
        match self {
            ResourceRequest::Image(_) => ResourceKind::Image,
            ResourceRequest::KeyPair(_) => ResourceKind::KeyPair,
        }
    }

    pub fn name_id(&self) -> &str {
        match self {
            ResourceRequest::Image(req) => req.name_id(),
            ResourceRequest::KeyPair(req) => req.name_id(),
        }
    }
}

/// Result of a list call, possibly missing branches that failed
#[derive(Debug, Clone)]
pub struct Listing<T> {
    pub items: Vec<T>,

    /// Descriptions of enumeration branches that were skipped
    pub skipped: Vec<String>,
}

impl<T> Listing<T> {
    pub fn complete(items: Vec<T>) -> Self {
        Self {
            items,
            skipped: Vec::new(),
        }
    }

    pub fn is_partial(&self) -> bool {
        !self.skipped.is_empty()
    }

    pub fn skip(&mut self, branch: impl Into<String>) {
        self.skipped.push(branch.into());
    }

    /// Items, or `PartialResult` if any branch was skipped
    pub fn strict(self) -> Result<Vec<T>> {
        if self.is_partial() {
            Err(CloudError::PartialResult {
                skipped: self.skipped,
            })
        } else {
            Ok(self.items)
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<T> Default for Listing<T> {
    fn default() -> Self {
        Self::complete(Vec::new())
    }
}
