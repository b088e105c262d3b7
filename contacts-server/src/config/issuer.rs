//! Embedded token issuer configuration

use confique::Config;
use std::path::PathBuf;

/// Configuration for the embedded OpenID Connect token issuer
#[derive(Debug, Config, Clone)]
pub struct IssuerConfig {
    /// Mount the issuer endpoints under /openid (default: true)
    #[config(env = "CONTACTS_ISSUER_ENABLED", default = true)]
    pub enabled: bool,

    /// Public base URL of the issuer, written to the `iss` claim
    /// (default: http://localhost:5000/openid)
    #[config(env = "CONTACTS_ISSUER_AUTHORITY", default = "http://localhost:5000/openid")]
    pub authority: String,

    /// API resource the tokens are issued for, written to the `aud` claim (default: contacts)
    #[config(env = "CONTACTS_ISSUER_AUDIENCE", default = "contacts")]
    pub audience: String,

    /// Access token lifetime in seconds (default: 3600 = 1 hour)
    #[config(env = "CONTACTS_ISSUER_TOKEN_TTL", default = 3600)]
    pub token_ttl: u64,

    /// Client identifier of the test client (default: client)
    #[config(env = "CONTACTS_ISSUER_CLIENT_ID", default = "client")]
    pub client_id: String,

    /// Client secret of the test client (default: secret)
    #[config(env = "CONTACTS_ISSUER_CLIENT_SECRET", default = "secret")]
    pub client_secret: String,

    /// Comma-separated scopes the test client may request (default: "read,write")
    #[config(env = "CONTACTS_ISSUER_ALLOWED_SCOPES", default = "read,write")]
    pub allowed_scopes: String,

    /// File holding the Ed25519 signing key seed. Created on first start when missing.
    /// A fresh key is generated on every start when unset.
    #[config(env = "CONTACTS_ISSUER_SIGNING_KEY_FILE")]
    pub signing_key_file: Option<PathBuf>,
}

impl IssuerConfig {
    /// The authority as it appears in tokens and the discovery document
    pub fn issuer(&self) -> &str {
        self.authority.trim_end_matches('/')
    }

    /// Returns a URL below the issuer authority for the given path
    pub fn endpoint_url<S: AsRef<str>>(&self, path: S) -> String {
        let path = path.as_ref();
        if path.starts_with('/') {
            format!("{}{}", self.issuer(), path)
        } else {
            format!("{}/{}", self.issuer(), path)
        }
    }

    /// Allowed scopes as a vector, empty entries removed
    pub fn get_allowed_scopes(&self) -> Vec<String> {
        self.allowed_scopes
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }
}
