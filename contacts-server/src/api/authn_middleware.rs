use crate::auth::Decision;
use crate::errors::ApiError;
use crate::state::AppState;
use axum::{
    body::Body,
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use log::{debug, warn};

/// Runs the authorization gate in front of the wrapped routes.
///
/// The handler only runs when the gate allows the request; the verified
/// [`crate::auth::Principal`] is then available as a request extension.
pub(super) async fn authorization_middleware(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let required_scope = state
        .gate
        .policy()
        .required_scope(request.method())
        .to_string();

    let decision = state
        .gate
        .decide(
            request.headers().get(http::header::AUTHORIZATION),
            &required_scope,
        )
        .await;

    match decision {
        Decision::Allow(principal) => {
            debug!(
                "Authorized '{}' for {} {}",
                principal.subject,
                request.method(),
                request.uri().path()
            );
            request.extensions_mut().insert(principal);
            next.run(request).await
        }
        Decision::Deny { status, reason } => {
            warn!(
                "Denied {} {} with {}: {}",
                request.method(),
                request.uri().path(),
                status,
                reason
            );
            ApiError::from(reason).into_response()
        }
    }
}
