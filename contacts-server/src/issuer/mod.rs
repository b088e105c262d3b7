//! Embedded OAuth2 client-credentials token issuer.
//!
//! Mints EdDSA access tokens for the configured test client and publishes the
//! discovery document and key set that the authorization gate consumes.

pub mod documents;
pub mod keys;

use crate::auth::claims::{AccessTokenClaims, Audience, ScopeClaim};
use crate::config::IssuerConfig;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Utc;
use documents::{JsonWebKey, JsonWebKeySet, OpenIdConfiguration};
use jsonwebtoken::{Algorithm, Header, Validation};
use keys::IssuerKey;
use log::debug;
use rand::RngCore;
use sha2::{Digest, Sha256};
use thiserror::Error;

pub const DISCOVERY_PATH: &str = "/.well-known/openid-configuration";
pub const JWKS_PATH: &str = "/.well-known/openid-configuration/jwks";
pub const TOKEN_PATH: &str = "/connect/token";
pub const INTROSPECTION_PATH: &str = "/connect/introspect";

pub const CLIENT_CREDENTIALS_GRANT: &str = "client_credentials";
const ACCESS_TOKEN_TYPE: &str = "at+jwt";

/// Errors that can occur while issuing or checking tokens
#[derive(Debug, Error)]
pub enum IssuerError {
    #[error("Failed to access key file {path}: {source}")]
    KeyFile {
        path: String,
        source: std::io::Error,
    },
    #[error("Invalid signing key: {0}")]
    InvalidKey(String),
    #[error("Scope '{0}' is not allowed for this client")]
    InvalidScope(String),
    #[error("JWT error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),
}

/// A freshly minted access token
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub access_token: String,
    pub expires_in: u64,
    pub scopes: Vec<String>,
}

pub struct TokenIssuer {
    config: IssuerConfig,
    key: IssuerKey,
    client_secret_digest: Vec<u8>,
}

impl TokenIssuer {
    /// Creates the issuer with the key from `signing_key_file`, or a temporary key
    /// when no file is configured.
    pub fn new(config: IssuerConfig) -> Result<Self, IssuerError> {
        let key = match &config.signing_key_file {
            Some(path) => IssuerKey::load_or_create(path)?,
            None => IssuerKey::generate()?,
        };
        Ok(Self::with_key(config, key))
    }

    pub fn with_key(config: IssuerConfig, key: IssuerKey) -> Self {
        let client_secret_digest = Sha256::digest(config.client_secret.as_bytes()).to_vec();
        Self {
            config,
            key,
            client_secret_digest,
        }
    }

    pub fn issuer(&self) -> &str {
        self.config.issuer()
    }

    /// Checks the client credentials. Secrets are compared by digest.
    pub fn authenticate_client(&self, client_id: &str, client_secret: &str) -> bool {
        let digest = Sha256::digest(client_secret.as_bytes());
        client_id == self.config.client_id
            && digest.as_slice() == self.client_secret_digest.as_slice()
    }

    /// Resolves the scopes to grant for a space-delimited `scope` request parameter.
    ///
    /// No requested scope grants every allowed scope.
    pub fn grant_scopes(&self, requested: Option<&str>) -> Result<Vec<String>, IssuerError> {
        let allowed = self.config.get_allowed_scopes();
        let requested: Vec<&str> = requested
            .map(|s| s.split_whitespace().collect())
            .unwrap_or_default();

        if requested.is_empty() {
            return Ok(allowed);
        }

        let mut granted: Vec<String> = Vec::with_capacity(requested.len());
        for scope in requested {
            if !allowed.iter().any(|a| a == scope) {
                return Err(IssuerError::InvalidScope(scope.to_string()));
            }
            if !granted.iter().any(|g| g == scope) {
                granted.push(scope.to_string());
            }
        }
        Ok(granted)
    }

    /// Mints a signed access token for `client_id` carrying `scopes`
    pub fn mint(&self, client_id: &str, scopes: Vec<String>) -> Result<IssuedToken, IssuerError> {
        let now = Utc::now().timestamp();
        let expires_in = self.config.token_ttl;
        let claims = AccessTokenClaims {
            iss: self.issuer().to_string(),
            sub: client_id.to_string(),
            aud: Audience::Single(self.config.audience.clone()),
            client_id: Some(client_id.to_string()),
            scope: ScopeClaim::List(scopes.clone()),
            iat: now,
            nbf: Some(now),
            exp: now.saturating_add(i64::try_from(expires_in).unwrap_or(i64::MAX)),
            jti: Some(new_token_id()),
        };

        let access_token = self.sign(&claims)?;
        debug!(
            "Issued access token to '{}' with scopes {:?}",
            client_id, scopes
        );

        Ok(IssuedToken {
            access_token,
            expires_in,
            scopes,
        })
    }

    /// Signs arbitrary claims with the issuer key
    pub(crate) fn sign(&self, claims: &AccessTokenClaims) -> Result<String, IssuerError> {
        let mut header = Header::new(Algorithm::EdDSA);
        header.kid = Some(self.key.kid().to_string());
        header.typ = Some(ACCESS_TOKEN_TYPE.to_string());

        Ok(jsonwebtoken::encode(&header, claims, self.key.encoding_key())?)
    }

    /// Verifies a token minted by this issuer, used by introspection
    pub fn verify(&self, token: &str) -> Result<AccessTokenClaims, IssuerError> {
        let mut validation = Validation::new(Algorithm::EdDSA);
        validation.set_issuer(&[self.issuer()]);
        validation.set_audience(&[self.config.audience.as_str()]);
        validation.leeway = 0;

        let data =
            jsonwebtoken::decode::<AccessTokenClaims>(token, &self.key.decoding_key()?, &validation)?;
        Ok(data.claims)
    }

    pub fn jwks(&self) -> JsonWebKeySet {
        JsonWebKeySet {
            keys: vec![JsonWebKey {
                kty: "OKP".to_string(),
                crv: "Ed25519".to_string(),
                alg: "EdDSA".to_string(),
                use_field: "sig".to_string(),
                kid: self.key.kid().to_string(),
                x: self.key.public_x(),
            }],
        }
    }

    pub fn discovery(&self) -> OpenIdConfiguration {
        OpenIdConfiguration {
            issuer: self.issuer().to_string(),
            jwks_uri: self.config.endpoint_url(JWKS_PATH),
            token_endpoint: self.config.endpoint_url(TOKEN_PATH),
            introspection_endpoint: self.config.endpoint_url(INTROSPECTION_PATH),
            grant_types_supported: vec![CLIENT_CREDENTIALS_GRANT.to_string()],
            scopes_supported: self.config.get_allowed_scopes(),
            token_endpoint_auth_methods_supported: vec![
                "client_secret_basic".to_string(),
                "client_secret_post".to_string(),
            ],
            response_types_supported: vec!["token".to_string()],
            id_token_signing_alg_values_supported: vec!["EdDSA".to_string()],
        }
    }
}

fn new_token_id() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}
