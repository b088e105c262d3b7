pub(crate) use crate::config::auth::AuthConfig;
pub(crate) use crate::config::issuer::IssuerConfig;
use confique::Config;
use std::time::Duration;
use url::{Host, Url};

pub mod auth;
pub mod issuer;

/// Environment variable holding the path of the optional TOML settings file
pub const CONFIG_FILE_ENV: &str = "CONTACTS_CONFIG_FILE";

/// Settings file looked up in the working directory when `CONTACTS_CONFIG_FILE` is unset
pub const DEFAULT_CONFIG_FILE: &str = "contacts.toml";

/// Main configuration structure for the contacts server
#[derive(Debug, Config, Clone)]
pub struct Settings {
    /// The port the server will listen to (default: 5000)
    #[config(env = "CONTACTS_PORT", default = 5000)]
    pub port: u16,

    /// Default log filter, overridden by RUST_LOG (default: info)
    #[config(env = "CONTACTS_LOG_LEVEL", default = "info")]
    pub log_level: String,

    /// Per-request timeout in seconds (default: 30)
    #[config(env = "CONTACTS_REQUEST_TIMEOUT", default = 30)]
    pub request_timeout: u64,

    /// Seed the in-memory store with a few sample contacts (default: false)
    #[config(env = "CONTACTS_SEED_SAMPLE_CONTACTS", default = false)]
    pub seed_sample_contacts: bool,

    /// Bearer token validation for the contacts API
    #[config(nested)]
    pub auth: AuthConfig,

    /// Embedded token issuer
    #[config(nested)]
    pub issuer: IssuerConfig,
}

impl Settings {
    /// Loads the settings from the environment, then the optional TOML file.
    ///
    /// Environment variables take precedence over the file.
    pub fn load() -> Result<Self, confique::Error> {
        let path = std::env::var(CONFIG_FILE_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_FILE.into());
        Self::builder().env().file(path).load()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }

    /// Port of a local authority served by the embedded issuer when it differs
    /// from the listening port, in which case the gate cannot reach its keys
    pub fn authority_port_mismatch(&self) -> Option<u16> {
        if !self.issuer.enabled || self.auth.issuer() != self.issuer.issuer() {
            return None;
        }
        let url = Url::parse(&self.auth.authority).ok()?;
        let local = match url.host()? {
            Host::Domain(domain) => domain.eq_ignore_ascii_case("localhost"),
            Host::Ipv4(ip) => ip.is_loopback() || ip.is_unspecified(),
            Host::Ipv6(ip) => ip.is_loopback() || ip.is_unspecified(),
        };
        let port = url.port_or_known_default()?;
        (local && port != self.port).then_some(port)
    }

    /// Settings wired to a single authority, used by the test fixture
    #[cfg(test)]
    pub fn for_test(authority: &str) -> Self {
        Self {
            port: 0, // Let the OS choose a port
            log_level: "debug".to_string(),
            request_timeout: 5,
            seed_sample_contacts: false,
            auth: AuthConfig {
                authority: authority.to_string(),
                audience: "contacts".to_string(),
                read_scope: "read".to_string(),
                write_scope: "write".to_string(),
                jwks_cache_ttl: 60,
                clock_skew: 0,
                http_timeout: 2,
            },
            issuer: IssuerConfig {
                enabled: true,
                authority: authority.to_string(),
                audience: "contacts".to_string(),
                token_ttl: 300,
                client_id: "client".to_string(),
                client_secret: "secret".to_string(),
                allowed_scopes: "read,write".to_string(),
                signing_key_file: None,
            },
        }
    }
}
