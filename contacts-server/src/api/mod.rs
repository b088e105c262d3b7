mod authn_middleware;
pub(crate) mod contacts;
pub(crate) mod health;
pub(crate) mod openid;

use crate::api::authn_middleware::authorization_middleware;
use crate::state::AppState;
use axum::{middleware, Router};

/// Path the issuer endpoints are nested under
pub(crate) const OPENID_PREFIX: &str = "/openid";

/// Combines all API routes into a single router
pub(super) fn router(state: &AppState) -> Router<AppState> {
    let mut root = Router::new().merge(health::router());

    if let Some(issuer) = &state.issuer {
        root = root.nest(OPENID_PREFIX, openid::router(issuer.clone()));
    }

    root.merge(protected_routes(state))
}

/// Creates a router for the contact routes, which require a bearer token
fn protected_routes(state: &AppState) -> Router<AppState> {
    // route_layer keeps unmatched paths at 404 instead of asking for a token
    contacts::router().route_layer(middleware::from_fn_with_state(
        state.clone(),
        authorization_middleware,
    ))
}
