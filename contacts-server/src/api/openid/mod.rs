//! Endpoints of the embedded token issuer, mounted under `/openid`.
//!
//! ## Supported OAuth 2.0 Flows
//! - Client Credentials Grant (RFC 6749 Section 4.4)
//! - Token Introspection (RFC 7662)
//!
//! Discovery and the key set follow OpenID Connect Discovery 1.0, which is
//! how the authorization gate finds the signing keys.

pub mod handlers;
pub mod models;

use crate::issuer::{TokenIssuer, DISCOVERY_PATH, INTROSPECTION_PATH, JWKS_PATH, TOKEN_PATH};
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;

/// Creates the issuer routes, bound to `issuer`
pub(super) fn router<S>(issuer: Arc<TokenIssuer>) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new()
        .route(DISCOVERY_PATH, get(handlers::discovery))
        .route(JWKS_PATH, get(handlers::jwks))
        .route(TOKEN_PATH, post(handlers::token))
        .route(INTROSPECTION_PATH, post(handlers::introspect))
        .with_state(issuer)
}
