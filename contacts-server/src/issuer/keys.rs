//! Ed25519 signing key of the embedded issuer

use super::IssuerError;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use ed25519_dalek::pkcs8::EncodePrivateKey;
use ed25519_dalek::SigningKey as Ed25519SigningKey;
use jsonwebtoken::{DecodingKey, EncodingKey};
use log::info;
use rand::RngCore;
use sha2::{Digest, Sha256};
use std::path::Path;

const SEED_LEN: usize = 32;
const KID_LEN: usize = 16;

/// Signing key used to mint access tokens.
///
/// The private seed never leaves this struct except through [`IssuerKey::load_or_create`]
/// writing it to the configured key file.
pub struct IssuerKey {
    signing_key: Ed25519SigningKey,
    encoding_key: EncodingKey,
    kid: String,
}

impl std::fmt::Debug for IssuerKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IssuerKey").field("kid", &self.kid).finish()
    }
}

impl IssuerKey {
    /// Generates a temporary key that lives as long as the process
    pub fn generate() -> Result<Self, IssuerError> {
        let mut seed = [0u8; SEED_LEN];
        rand::thread_rng().fill_bytes(&mut seed);
        Self::from_seed(seed)
    }

    pub fn from_seed(seed: [u8; SEED_LEN]) -> Result<Self, IssuerError> {
        let signing_key = Ed25519SigningKey::from_bytes(&seed);
        // jsonwebtoken only accepts EdDSA private keys as PKCS8 DER
        let der = signing_key
            .to_pkcs8_der()
            .map_err(|e| IssuerError::InvalidKey(format!("failed to encode Ed25519 key: {e}")))?;
        let encoding_key = EncodingKey::from_ed_der(der.as_bytes());
        let kid = derive_kid(&signing_key.verifying_key().to_bytes());

        Ok(Self {
            signing_key,
            encoding_key,
            kid,
        })
    }

    /// Loads the seed stored at `path`, creating the file with a fresh key when it
    /// does not exist yet.
    pub fn load_or_create(path: &Path) -> Result<Self, IssuerError> {
        if path.exists() {
            let contents = std::fs::read_to_string(path).map_err(|source| IssuerError::KeyFile {
                path: path.display().to_string(),
                source,
            })?;
            let seed = decode_seed(contents.trim())?;
            let key = Self::from_seed(seed)?;
            info!("Loaded signing key {} from {}", key.kid, path.display());
            return Ok(key);
        }

        let key = Self::generate()?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| IssuerError::KeyFile {
                path: parent.display().to_string(),
                source,
            })?;
        }
        std::fs::write(path, key.encoded_seed()).map_err(|source| IssuerError::KeyFile {
            path: path.display().to_string(),
            source,
        })?;
        info!("Created signing key {} at {}", key.kid, path.display());
        Ok(key)
    }

    /// Key id published in the JWKS and stamped into token headers
    pub fn kid(&self) -> &str {
        &self.kid
    }

    pub fn encoding_key(&self) -> &EncodingKey {
        &self.encoding_key
    }

    /// Public key as the base64url `x` member of an OKP JWK
    pub fn public_x(&self) -> String {
        URL_SAFE_NO_PAD.encode(self.signing_key.verifying_key().to_bytes())
    }

    pub fn decoding_key(&self) -> Result<DecodingKey, IssuerError> {
        Ok(DecodingKey::from_ed_components(&self.public_x())?)
    }

    fn encoded_seed(&self) -> String {
        URL_SAFE_NO_PAD.encode(self.signing_key.to_bytes())
    }
}

/// First bytes of the SHA-256 of the public key, so restarts with the same key
/// keep the same kid.
fn derive_kid(public_key: &[u8]) -> String {
    let digest = Sha256::digest(public_key);
    URL_SAFE_NO_PAD.encode(&digest[..KID_LEN])
}

fn decode_seed(encoded: &str) -> Result<[u8; SEED_LEN], IssuerError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(encoded)
        .map_err(|e| IssuerError::InvalidKey(format!("key file is not base64url: {e}")))?;
    bytes.try_into().map_err(|bytes: Vec<u8>| {
        IssuerError::InvalidKey(format!(
            "expected a {SEED_LEN} byte seed, found {} bytes",
            bytes.len()
        ))
    })
}
