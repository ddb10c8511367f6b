//! Resource identity
//!
//! Every resource is addressed by an [`Iid`]: the user-chosen `name_id`
//! that callers hold on to, and the `system_id` the provider assigned.
//! Structured provider identifiers (for example marketplace image paths)
//! are flattened into a `name_id` with [`compose`] and recovered with
//! [`decompose`].

use crate::error::{CloudError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Delimiter between the parts of a composite identifier
pub const ID_DELIMITER: char = ':';

/// Two-part resource identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Iid {
    /// User-chosen name, stable for the resource's lifetime
    pub name_id: String,

    /// Provider-assigned identifier; may equal `name_id`
    pub system_id: String,
}

impl Iid {
    pub fn new(name_id: impl Into<String>, system_id: impl Into<String>) -> Self {
        Self {
            name_id: name_id.into(),
            system_id: system_id.into(),
        }
    }

    /// Identifier for providers without a separate system id
    pub fn from_name(name_id: impl Into<String>) -> Self {
        let name_id = name_id.into();
        Self {
            system_id: name_id.clone(),
            name_id,
        }
    }

    /// Reject an empty or whitespace-padded name before any remote call
    pub fn validate(&self) -> Result<()> {
        validate_name_id(&self.name_id)
    }
}

impl fmt::Display for Iid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.name_id == self.system_id || self.system_id.is_empty() {
            write!(f, "{}", self.name_id)
        } else {
            write!(f, "{} ({})", self.name_id, self.system_id)
        }
    }
}

pub fn validate_name_id(name_id: &str) -> Result<()> {
    if name_id.is_empty() {
        return Err(CloudError::Validation("NameID must not be empty".into()));
    }
    if name_id.trim() != name_id {
        return Err(CloudError::Validation(format!(
            "NameID '{}' has leading or trailing whitespace",
            name_id
        )));
    }
    if name_id.chars().any(char::is_control) {
        return Err(CloudError::Validation(format!(
            "NameID '{}' contains control characters",
            name_id.escape_debug()
        )));
    }
    Ok(())
}

/// Join parts into a colon-delimited NameID
///
/// Parts that are empty or contain the delimiter are rejected.
pub fn compose<S: AsRef<str>>(parts: &[S]) -> Result<String> {
    if parts.is_empty() {
        return Err(CloudError::Validation(
            "cannot compose a NameID from zero parts".into(),
        ));
    }
    for part in parts {
        let part = part.as_ref();
        if part.is_empty() {
            return Err(CloudError::Validation(
                "NameID parts must not be empty".into(),
            ));
        }
        if part.contains(ID_DELIMITER) {
            return Err(CloudError::Validation(format!(
                "NameID part '{}' contains the delimiter '{}'",
                part, ID_DELIMITER
            )));
        }
    }
    let joined = parts
        .iter()
        .map(|p| p.as_ref())
        .collect::<Vec<_>>()
        .join(&ID_DELIMITER.to_string());
    validate_name_id(&joined)?;
    Ok(joined)
}

/// Split a composite NameID back into its parts
pub fn decompose(name_id: &str) -> Result<Vec<String>> {
    validate_name_id(name_id)?;
    let parts: Vec<String> = name_id.split(ID_DELIMITER).map(str::to_string).collect();
    if parts.iter().any(String::is_empty) {
        return Err(CloudError::Validation(format!(
            "NameID '{}' has an empty part",
            name_id
        )));
    }
    Ok(parts)
}

/// Whether a NameID is a composite of more than one part
pub fn is_composite(name_id: &str) -> bool {
    name_id.contains(ID_DELIMITER)
}

/// Marketplace image path: `publisher:offer:sku[:version]`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MarketplaceImageRef {
    pub publisher: String,
    pub offer: String,
    pub sku: String,
    pub version: Option<String>,
}

impl MarketplaceImageRef {
    pub fn new(
        publisher: impl Into<String>,
        offer: impl Into<String>,
        sku: impl Into<String>,
    ) -> Self {
        Self {
            publisher: publisher.into(),
            offer: offer.into(),
            sku: sku.into(),
            version: None,
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Same image path without a pinned version
    pub fn unversioned(&self) -> Self {
        Self {
            version: None,
            ..self.clone()
        }
    }

    pub fn encode(&self) -> Result<String> {
        match &self.version {
            Some(version) => compose(&[&self.publisher, &self.offer, &self.sku, version]),
            None => compose(&[&self.publisher, &self.offer, &self.sku]),
        }
    }

    pub fn decode(name_id: &str) -> Result<Self> {
        let mut parts = decompose(name_id)?.into_iter();
        match (parts.next(), parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(publisher), Some(offer), Some(sku), version, None) => Ok(Self {
                publisher,
                offer,
                sku,
                version,
            }),
            _ => Err(CloudError::Validation(format!(
                "'{}' is not a marketplace image reference (publisher:offer:sku[:version])",
                name_id
            ))),
        }
    }
}

impl fmt::Display for MarketplaceImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.publisher, self.offer, self.sku)?;
        if let Some(version) = &self.version {
            write!(f, "/{}", version)?;
        }
        Ok(())
    }
}
