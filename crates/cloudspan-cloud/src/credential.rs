//! Credential material and the namespace token derived from it
//!
//! Local artifacts are partitioned by [`CredentialScope`], a SHA-256 digest
//! over the canonical form of every credential field. The token never
//! leaves the host.

use crate::error::{CloudError, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;

/// Length of a scope token in hex characters
pub const SCOPE_TOKEN_LEN: usize = 64;

/// Provider credential as a set of named fields
///
/// Field order never matters: the fields are kept sorted by name.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialInfo {
    fields: BTreeMap<String, String>,
}

impl CredentialInfo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    /// Required field, or a validation error naming it
    pub fn require(&self, key: &str) -> Result<&str> {
        self.get(key)
            .ok_or_else(|| CloudError::Validation(format!("credential field '{}' is missing", key)))
    }

    /// Azure service-principal credential
    pub fn azure(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        tenant_id: impl Into<String>,
        subscription_id: impl Into<String>,
    ) -> Self {
        Self::new()
            .with("ClientId", client_id)
            .with("ClientSecret", client_secret)
            .with("TenantId", tenant_id)
            .with("SubscriptionId", subscription_id)
    }

    /// Sorted fields with empty values dropped
    fn canonical(&self) -> BTreeMap<&str, &str> {
        self.fields
            .iter()
            .filter(|(_, v)| !v.is_empty())
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect()
    }

    /// Derive the namespace token for this credential
    pub fn scope(&self) -> Result<CredentialScope> {
        CredentialScope::derive(self)
    }
}

impl fmt::Debug for CredentialInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let keys: Vec<&str> = self.fields.keys().map(String::as_str).collect();
        f.debug_struct("CredentialInfo")
            .field("fields", &keys)
            .finish()
    }
}

/// Namespace token for locally persisted artifacts
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CredentialScope(String);

impl CredentialScope {
    /// Hash the canonical serialization of the credential
    ///
    /// A credential without any non-empty field is rejected rather than
    /// mapped to a shared token.
    pub fn derive(credential: &CredentialInfo) -> Result<Self> {
        let canonical = credential.canonical();
        if canonical.is_empty() {
            return Err(CloudError::Validation(
                "credential has no fields to derive a scope from".into(),
            ));
        }
        let serialized = serde_json::to_vec(&canonical)?;
        let mut hasher = Sha256::new();
        hasher.update(&serialized);
        Ok(Self(format!("{:x}", hasher.finalize())))
    }

    /// Accept a token read back from storage
    pub fn parse(token: &str) -> Option<Self> {
        let valid = token.len() == SCOPE_TOKEN_LEN
            && token
                .chars()
                .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c));
        valid.then(|| Self(token.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CredentialScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
