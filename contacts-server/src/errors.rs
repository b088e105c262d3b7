use crate::auth::GateError;
use crate::models::ValidationError;
use crate::store::StoreError;
use axum::response::IntoResponse;
use axum::Json;
use http::header::WWW_AUTHENTICATE;
use http::{HeaderValue, StatusCode};
use log::warn;
use serde_json::json;

#[derive(Debug, Clone)]
pub struct ApiError {
    pub detail: String,
    pub status_code: StatusCode,
    challenge: Option<String>,
}

impl ApiError {
    /// Create a new ApiError with a detail message and status code
    pub fn new<S: ToString>(detail: S, status_code: StatusCode) -> Self {
        Self {
            detail: detail.to_string(),
            status_code,
            challenge: None,
        }
    }

    /// Create new Bad Request Error (400) with a detail message
    pub fn bad_request<S: ToString>(detail: S) -> Self {
        Self::new(detail, StatusCode::BAD_REQUEST)
    }

    /// Create new Not Found Error (404) with a detail message
    pub fn not_found<S: ToString>(detail: S) -> Self {
        Self::new(detail, StatusCode::NOT_FOUND)
    }

    /// Attach a `WWW-Authenticate` challenge to the response
    pub fn with_challenge<S: ToString>(mut self, challenge: S) -> Self {
        self.challenge = Some(challenge.to_string());
        self
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(_) => ApiError::not_found(err),
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::bad_request(err)
    }
}

impl From<GateError> for ApiError {
    fn from(err: GateError) -> Self {
        ApiError::new(&err, err.status()).with_challenge(err.challenge())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status_code = self.status_code;
        let body = json!({
            "detail": self.detail,
        });
        let mut response = (status_code, Json(body)).into_response();

        if let Some(challenge) = self.challenge {
            match HeaderValue::from_str(&challenge) {
                Ok(value) => {
                    response.headers_mut().insert(WWW_AUTHENTICATE, value);
                }
                Err(e) => warn!("failed to set WWW-Authenticate header: {e}"),
            }
        }
        response
    }
}
