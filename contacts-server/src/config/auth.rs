//! Bearer token validation configuration

use confique::Config;
use std::time::Duration;

/// Configuration for validating bearer tokens on the contacts API
#[derive(Debug, Config, Clone)]
pub struct AuthConfig {
    /// Token authority, the expected `iss` claim and the base of the discovery document
    /// (default: http://localhost:5000/openid)
    #[config(env = "CONTACTS_AUTH_AUTHORITY", default = "http://localhost:5000/openid")]
    pub authority: String,

    /// Audience the tokens must be issued for (default: contacts)
    #[config(env = "CONTACTS_AUTH_AUDIENCE", default = "contacts")]
    pub audience: String,

    /// Scope required by safe methods (default: read)
    #[config(env = "CONTACTS_AUTH_READ_SCOPE", default = "read")]
    pub read_scope: String,

    /// Scope required by mutating methods (default: write)
    #[config(env = "CONTACTS_AUTH_WRITE_SCOPE", default = "write")]
    pub write_scope: String,

    /// How long discovery documents and signing keys are cached, in seconds (default: 3600)
    #[config(env = "CONTACTS_AUTH_JWKS_CACHE_TTL", default = 3600)]
    pub jwks_cache_ttl: u64,

    /// Allowed clock skew when checking `exp` and `nbf`, in seconds (default: 0)
    #[config(env = "CONTACTS_AUTH_CLOCK_SKEW", default = 0)]
    pub clock_skew: u64,

    /// Timeout for discovery and JWKS requests, in seconds (default: 5)
    #[config(env = "CONTACTS_AUTH_HTTP_TIMEOUT", default = 5)]
    pub http_timeout: u64,
}

impl AuthConfig {
    /// URL of the OpenID Connect discovery document for the authority
    pub fn discovery_url(&self) -> String {
        format!(
            "{}/.well-known/openid-configuration",
            self.authority.trim_end_matches('/')
        )
    }

    /// The authority as it must appear in the `iss` claim
    pub fn issuer(&self) -> &str {
        self.authority.trim_end_matches('/')
    }

    pub fn jwks_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.jwks_cache_ttl)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout)
    }
}
