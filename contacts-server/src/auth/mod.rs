//! Bearer token authorization gate.
//!
//! Every protected request goes through [`AuthorizationGate::decide`] before any
//! handler runs. The gate fails closed: any error while reading, verifying or
//! checking the token results in a denial.

pub mod claims;
pub mod keys;

use crate::config::AuthConfig;
use claims::AccessTokenClaims;
use http::{HeaderValue, Method, StatusCode};
use jsonwebtoken::{Algorithm, Validation};
use keys::{KeySource, KeySourceError};
use log::debug;
use std::sync::Arc;
use thiserror::Error;

/// Reasons for denying a request
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GateError {
    #[error("Missing bearer token")]
    MissingCredential,
    #[error("Invalid bearer token: {0}")]
    InvalidToken(String),
    #[error("The token lacks the required scope '{0}'")]
    InsufficientScope(String),
}

impl GateError {
    pub fn status(&self) -> StatusCode {
        match self {
            GateError::MissingCredential | GateError::InvalidToken(_) => StatusCode::UNAUTHORIZED,
            GateError::InsufficientScope(_) => StatusCode::FORBIDDEN,
        }
    }

    /// Value of the `WWW-Authenticate` challenge sent with the denial
    pub fn challenge(&self) -> String {
        match self {
            GateError::MissingCredential => "Bearer".to_string(),
            GateError::InvalidToken(_) => "Bearer error=\"invalid_token\"".to_string(),
            GateError::InsufficientScope(scope) => {
                format!("Bearer error=\"insufficient_scope\", scope=\"{scope}\"")
            }
        }
    }
}

impl From<KeySourceError> for GateError {
    fn from(err: KeySourceError) -> Self {
        GateError::InvalidToken(err.to_string())
    }
}

impl From<jsonwebtoken::errors::Error> for GateError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        GateError::InvalidToken(err.to_string())
    }
}

/// Verified caller identity, stored in the request extensions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub subject: String,
    pub client_id: Option<String>,
    pub scopes: Vec<String>,
}

impl Principal {
    pub fn has_scope(&self, scope: &str) -> bool {
        self.scopes.iter().any(|s| s == scope)
    }
}

/// Outcome of the gate for a single request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow(Principal),
    Deny { status: StatusCode, reason: GateError },
}

impl From<GateError> for Decision {
    fn from(reason: GateError) -> Self {
        Decision::Deny {
            status: reason.status(),
            reason,
        }
    }
}

/// Maps request methods to the scope a token must carry
#[derive(Debug, Clone)]
pub struct ScopePolicy {
    read: String,
    write: String,
}

impl ScopePolicy {
    pub fn new(read: impl Into<String>, write: impl Into<String>) -> Self {
        Self {
            read: read.into(),
            write: write.into(),
        }
    }

    /// Safe methods need the read scope, everything else the write scope
    pub fn required_scope(&self, method: &Method) -> &str {
        if matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS) {
            &self.read
        } else {
            &self.write
        }
    }
}

pub struct AuthorizationGate {
    keys: Arc<dyn KeySource>,
    issuer: String,
    audience: String,
    leeway: u64,
    policy: ScopePolicy,
}

impl AuthorizationGate {
    pub fn new(config: &AuthConfig, keys: Arc<dyn KeySource>) -> Self {
        Self {
            keys,
            issuer: config.issuer().to_string(),
            audience: config.audience.clone(),
            leeway: config.clock_skew,
            policy: ScopePolicy::new(&config.read_scope, &config.write_scope),
        }
    }

    pub fn policy(&self) -> &ScopePolicy {
        &self.policy
    }

    /// Decides whether a request carrying `authorization` may proceed
    pub async fn decide(
        &self,
        authorization: Option<&HeaderValue>,
        required_scope: &str,
    ) -> Decision {
        let token = match bearer_token(authorization) {
            Some(token) => token,
            None => return GateError::MissingCredential.into(),
        };

        let claims = match self.verify(token).await {
            Ok(claims) => claims,
            Err(err) => return err.into(),
        };

        let principal = Principal {
            subject: claims.sub,
            client_id: claims.client_id,
            scopes: claims.scope.to_vec(),
        };
        if !principal.has_scope(required_scope) {
            debug!(
                "Token for '{}' lacks scope '{}'",
                principal.subject, required_scope
            );
            return GateError::InsufficientScope(required_scope.to_string()).into();
        }

        Decision::Allow(principal)
    }

    /// Checks signature, algorithm, issuer, audience and lifetime of a token
    pub async fn verify(&self, token: &str) -> Result<AccessTokenClaims, GateError> {
        let header = jsonwebtoken::decode_header(token)?;
        if header.alg != Algorithm::EdDSA {
            return Err(GateError::InvalidToken(format!(
                "unsupported algorithm {:?}",
                header.alg
            )));
        }
        let kid = header
            .kid
            .as_deref()
            .ok_or_else(|| GateError::InvalidToken("missing key id".to_string()))?;

        let decoding_key = self.keys.decoding_key(kid).await?;

        let mut validation = Validation::new(Algorithm::EdDSA);
        validation.set_issuer(&[self.issuer.as_str()]);
        validation.set_audience(&[self.audience.as_str()]);
        validation.set_required_spec_claims(&["exp", "iss", "aud"]);
        validation.validate_nbf = true;
        validation.leeway = self.leeway;

        let data = jsonwebtoken::decode::<AccessTokenClaims>(token, &decoding_key, &validation)?;
        Ok(data.claims)
    }

    /// Whether the signing keys of the authority can be resolved
    pub async fn check_keys(&self) -> Result<(), KeySourceError> {
        self.keys.check().await
    }
}

/// Token from an `Authorization: Bearer <token>` header
fn bearer_token(authorization: Option<&HeaderValue>) -> Option<&str> {
    let value = authorization?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}
