//! OAuth 2.0 request and response bodies of the issuer endpoints

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// OAuth 2.0 Token Request (client credentials grant)
#[derive(Debug, Deserialize, ToSchema)]
pub struct TokenRequest {
    /// OAuth 2.0 grant type, only "client_credentials" is supported
    pub grant_type: String,
    /// Client identifier, when not sent with HTTP Basic
    pub client_id: Option<String>,
    /// Client secret, when not sent with HTTP Basic
    pub client_secret: Option<String>,
    /// Requested scopes (space-separated)
    pub scope: Option<String>,
}

/// OAuth 2.0 Token Response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TokenResponse {
    /// The signed access token
    pub access_token: String,
    /// Token type, always "Bearer"
    pub token_type: String,
    /// Token lifetime in seconds
    pub expires_in: u64,
    /// Granted scopes (space-separated)
    pub scope: String,
}

/// OAuth 2.0 Token Introspection Request
#[derive(Debug, Deserialize, ToSchema)]
pub struct IntrospectionRequest {
    /// The token to introspect
    pub token: String,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
}

/// OAuth 2.0 Token Introspection Response
#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct IntrospectionResponse {
    /// Whether the token is active
    pub active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    /// Token scopes (space-separated)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    /// Expiration timestamp (Unix time)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
    /// Issued at timestamp (Unix time)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
}

impl IntrospectionResponse {
    pub fn inactive() -> Self {
        Self::default()
    }
}

/// OAuth 2.0 Error Response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OAuthError {
    /// Error code
    pub error: String,
    /// Human-readable error description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_description: Option<String>,
}

impl OAuthError {
    fn with_description(error: &str, description: &str) -> Self {
        Self {
            error: error.to_string(),
            error_description: Some(description.to_string()),
        }
    }

    pub fn invalid_request(description: &str) -> Self {
        Self::with_description("invalid_request", description)
    }

    pub fn invalid_client(description: &str) -> Self {
        Self::with_description("invalid_client", description)
    }

    pub fn invalid_scope(description: &str) -> Self {
        Self::with_description("invalid_scope", description)
    }

    pub fn unsupported_grant_type() -> Self {
        Self::with_description(
            "unsupported_grant_type",
            "Supported grant types: client_credentials",
        )
    }

    pub fn server_error(description: &str) -> Self {
        Self::with_description("server_error", description)
    }
}

/// Helper function to create error responses
pub(super) fn error_response(status: StatusCode, error: OAuthError) -> Response {
    (status, Json(error)).into_response()
}
