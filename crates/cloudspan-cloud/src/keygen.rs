//! Asymmetric key generation for key pairs

use crate::error::{CloudError, Result};
use rsa::RsaPrivateKey;
use rsa::pkcs1::{EncodeRsaPrivateKey, LineEnding};
use ssh_key::public::{KeyData, RsaPublicKey};

/// Default RSA modulus size
pub const DEFAULT_KEY_BITS: usize = 4096;

/// Smallest modulus accepted for new keys
pub const MIN_KEY_BITS: usize = 2048;

/// Freshly generated key pair in its persisted text forms
pub struct KeyMaterial {
    /// Authorized-key line, newline terminated
    pub public_key: String,
    /// PKCS#1 PEM
    pub private_key: String,
}

/// Source of new key pairs
///
/// Generation is CPU bound; callers run it off the async executor.
pub trait KeyGenerator: Send + Sync {
    fn generate(&self) -> Result<KeyMaterial>;
}

/// RSA keys from the operating system's secure random source
#[derive(Debug, Clone)]
pub struct RsaKeyGenerator {
    bits: usize,
}

impl RsaKeyGenerator {
    pub fn new(bits: usize) -> Result<Self> {
        if bits < MIN_KEY_BITS {
            return Err(CloudError::Validation(format!(
                "RSA key size {} is below the minimum of {} bits",
                bits, MIN_KEY_BITS
            )));
        }
        Ok(Self { bits })
    }

    pub fn bits(&self) -> usize {
        self.bits
    }
}

impl Default for RsaKeyGenerator {
    fn default() -> Self {
        Self {
            bits: DEFAULT_KEY_BITS,
        }
    }
}

impl KeyGenerator for RsaKeyGenerator {
    fn generate(&self) -> Result<KeyMaterial> {
        let mut rng = rand::rngs::OsRng;
        let private = RsaPrivateKey::new(&mut rng, self.bits)
            .map_err(|e| CloudError::KeyGeneration(e.to_string()))?;
        private
            .validate()
            .map_err(|e| CloudError::KeyGeneration(e.to_string()))?;

        let private_pem = private
            .to_pkcs1_pem(LineEnding::LF)
            .map_err(|e| CloudError::KeyGeneration(e.to_string()))?;

        let public = RsaPublicKey::try_from(&private.to_public_key())
            .map_err(|e| CloudError::KeyGeneration(e.to_string()))?;
        let authorized = ssh_key::PublicKey::new(KeyData::Rsa(public), "")
            .to_openssh()
            .map_err(|e| CloudError::KeyGeneration(e.to_string()))?;

        tracing::debug!("Generated {}-bit RSA key pair", self.bits);
        Ok(KeyMaterial {
            public_key: format!("{}\n", authorized.trim_end()),
            private_key: private_pem.to_string(),
        })
    }
}
