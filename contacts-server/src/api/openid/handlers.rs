//! OpenID Connect discovery and OAuth 2.0 endpoint handlers

use crate::api::openid::models::{
    error_response, IntrospectionRequest, IntrospectionResponse, OAuthError, TokenRequest,
    TokenResponse,
};
use crate::headers::presets;
use crate::issuer::documents::{JsonWebKeySet, OpenIdConfiguration};
use crate::issuer::{IssuerError, TokenIssuer, CLIENT_CREDENTIALS_GRANT};
use crate::openapi::OPENID_TAG;
use axum::{
    extract::{rejection::FormRejection, Form, FromRequest, Request, State},
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE, WWW_AUTHENTICATE},
        HeaderMap, HeaderValue, StatusCode,
    },
    response::{IntoResponse, Response},
    Json,
};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use log::{debug, error, info, warn};
use std::sync::Arc;

/// How long clients may cache the discovery document and key set, in seconds
const DOCUMENT_MAX_AGE: u32 = 3600;

/// OpenID Connect discovery document
#[utoipa::path(
    get,
    path = "/openid/.well-known/openid-configuration",
    tag = OPENID_TAG,
    responses(
        (status = 200, description = "Issuer metadata", body = OpenIdConfiguration)
    )
)]
pub async fn discovery(State(issuer): State<Arc<TokenIssuer>>) -> Response {
    let mut response = Json(issuer.discovery()).into_response();
    presets::public_cache(DOCUMENT_MAX_AGE).apply(&mut response);
    response
}

/// Public signing keys of the issuer
#[utoipa::path(
    get,
    path = "/openid/.well-known/openid-configuration/jwks",
    tag = OPENID_TAG,
    responses(
        (status = 200, description = "JSON Web Key Set", body = JsonWebKeySet)
    )
)]
pub async fn jwks(State(issuer): State<Arc<TokenIssuer>>) -> Response {
    let mut response = Json(issuer.jwks()).into_response();
    presets::public_cache(DOCUMENT_MAX_AGE).apply(&mut response);
    response
}

/// OAuth 2.0 Token endpoint (RFC 6749 Section 4.4)
///
/// The client authenticates with HTTP Basic or with `client_id` and
/// `client_secret` form fields.
#[utoipa::path(
    post,
    path = "/openid/connect/token",
    tag = OPENID_TAG,
    request_body(content = TokenRequest, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Access token issued", body = TokenResponse),
        (status = 400, description = "Invalid request, grant type or scope", body = OAuthError),
        (status = 401, description = "Invalid client credentials", body = OAuthError),
        (status = 500, description = "Internal server error", body = OAuthError)
    )
)]
pub async fn token(
    State(issuer): State<Arc<TokenIssuer>>,
    headers: HeaderMap,
    request: Result<Form<TokenRequest>, FormRejection>,
) -> Response {
    let Form(request) = match request {
        Ok(request) => request,
        Err(rejection) => {
            warn!("Malformed token request: {}", rejection.body_text());
            return error_response(
                StatusCode::BAD_REQUEST,
                OAuthError::invalid_request(&rejection.body_text()),
            );
        }
    };

    let client_id = match authenticate(
        &issuer,
        &headers,
        request.client_id,
        request.client_secret,
    ) {
        Ok(client_id) => client_id,
        Err(response) => return response,
    };

    if request.grant_type != CLIENT_CREDENTIALS_GRANT {
        warn!(
            "Unsupported grant type '{}' from client '{}'",
            request.grant_type, client_id
        );
        return error_response(StatusCode::BAD_REQUEST, OAuthError::unsupported_grant_type());
    }

    let scopes = match issuer.grant_scopes(request.scope.as_deref()) {
        Ok(scopes) => scopes,
        Err(e @ IssuerError::InvalidScope(_)) => {
            warn!("Rejected token request from '{}': {}", client_id, e);
            return error_response(
                StatusCode::BAD_REQUEST,
                OAuthError::invalid_scope(&e.to_string()),
            );
        }
        Err(e) => {
            error!("Error resolving scopes: {}", e);
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                OAuthError::server_error("Failed to resolve scopes"),
            );
        }
    };

    let issued = match issuer.mint(&client_id, scopes) {
        Ok(issued) => issued,
        Err(e) => {
            error!("Error signing access token: {}", e);
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                OAuthError::server_error("Failed to issue access token"),
            );
        }
    };

    info!(
        "Issued access token to '{}' with scopes {:?}",
        client_id, issued.scopes
    );

    let mut response = Json(TokenResponse {
        access_token: issued.access_token,
        token_type: "Bearer".to_string(),
        expires_in: issued.expires_in,
        scope: issued.scopes.join(" "),
    })
    .into_response();
    presets::no_store().apply(&mut response);
    response
}

/// OAuth 2.0 Token Introspection endpoint (RFC 7662)
///
/// Accepts form-encoded and JSON bodies. Tokens that fail verification are
/// reported as inactive.
#[utoipa::path(
    post,
    path = "/openid/connect/introspect",
    tag = OPENID_TAG,
    request_body = IntrospectionRequest,
    responses(
        (status = 200, description = "Token introspection result", body = IntrospectionResponse),
        (status = 400, description = "Invalid request", body = OAuthError),
        (status = 401, description = "Invalid client credentials", body = OAuthError)
    )
)]
pub async fn introspect(
    State(issuer): State<Arc<TokenIssuer>>,
    headers: HeaderMap,
    IntrospectionRequestExtractor(request): IntrospectionRequestExtractor,
) -> Response {
    let client_id = match authenticate(
        &issuer,
        &headers,
        request.client_id,
        request.client_secret,
    ) {
        Ok(client_id) => client_id,
        Err(response) => return response,
    };

    if request.token.trim().is_empty() {
        return error_response(
            StatusCode::BAD_REQUEST,
            OAuthError::invalid_request("token parameter is required"),
        );
    }

    let claims = match issuer.verify(request.token.trim()) {
        Ok(claims) => claims,
        Err(e) => {
            debug!("Introspected token is inactive: {}", e);
            return Json(IntrospectionResponse::inactive()).into_response();
        }
    };

    debug!(
        "Introspection by '{}': sub={}, scopes={:?}",
        client_id,
        claims.sub,
        claims.scope.to_vec()
    );

    Json(IntrospectionResponse {
        active: true,
        client_id: claims.client_id,
        sub: Some(claims.sub),
        scope: Some(claims.scope.to_vec().join(" ")),
        exp: Some(claims.exp),
        iat: Some(claims.iat),
        iss: Some(claims.iss),
    })
    .into_response()
}

/// Extractor that handles both form-encoded and JSON introspection requests
pub struct IntrospectionRequestExtractor(pub IntrospectionRequest);

impl<S> FromRequest<S> for IntrospectionRequestExtractor
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_json = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|ct| ct.to_str().ok())
            .is_some_and(|ct| ct.starts_with("application/json"));

        if is_json {
            match Json::<IntrospectionRequest>::from_request(req, state).await {
                Ok(Json(request)) => Ok(Self(request)),
                Err(_) => Err(error_response(
                    StatusCode::BAD_REQUEST,
                    OAuthError::invalid_request("Invalid JSON in request body"),
                )),
            }
        } else {
            match Form::<IntrospectionRequest>::from_request(req, state).await {
                Ok(Form(request)) => Ok(Self(request)),
                Err(_) => Err(error_response(
                    StatusCode::BAD_REQUEST,
                    OAuthError::invalid_request("Invalid form data in request body"),
                )),
            }
        }
    }
}

/// Authenticates the calling client, returning its id or the error response to send
fn authenticate(
    issuer: &TokenIssuer,
    headers: &HeaderMap,
    body_client_id: Option<String>,
    body_client_secret: Option<String>,
) -> Result<String, Response> {
    let credentials = basic_credentials(headers).or(match (body_client_id, body_client_secret) {
        (Some(id), Some(secret)) => Some((id, secret)),
        _ => None,
    });

    let Some((client_id, client_secret)) = credentials else {
        warn!("Request to the issuer without client credentials");
        return Err(unauthorized_client("Client authentication is required"));
    };

    if !issuer.authenticate_client(&client_id, &client_secret) {
        warn!("Invalid client credentials for client_id: {}", client_id);
        return Err(unauthorized_client("Invalid client credentials"));
    }

    Ok(client_id)
}

/// Client id and secret from an `Authorization: Basic` header
fn basic_credentials(headers: &HeaderMap) -> Option<(String, String)> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, encoded) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }

    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (id, secret) = decoded.split_once(':')?;
    Some((id.to_string(), secret.to_string()))
}

fn unauthorized_client(description: &str) -> Response {
    let mut response = error_response(
        StatusCode::UNAUTHORIZED,
        OAuthError::invalid_client(description),
    );
    response
        .headers_mut()
        .insert(WWW_AUTHENTICATE, HeaderValue::from_static("Basic"));
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::TestFixture;
    use axum::body::Body;
    use http::Method;
    use serde_json::json;

    const TOKEN_URI: &str = "/openid/connect/token";
    const INTROSPECT_URI: &str = "/openid/connect/introspect";

    fn form_request(uri: &str, body: &str, basic: Option<(&str, &str)>) -> Request<Body> {
        let mut builder = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some((id, secret)) = basic {
            let encoded = STANDARD.encode(format!("{id}:{secret}"));
            builder = builder.header(AUTHORIZATION, format!("Basic {encoded}"));
        }
        builder
            .body(Body::from(body.to_string()))
            .expect("Failed to build request")
    }

    #[tokio::test]
    async fn test_discovery_document_is_cacheable() {
        let fixture = TestFixture::new().await;
        let response = fixture.get("/openid/.well-known/openid-configuration").await;
        response.assert_ok();

        let discovery = response.json_as::<OpenIdConfiguration>();
        assert_eq!(discovery.issuer, fixture.settings.issuer.issuer());
        assert_eq!(
            discovery.token_endpoint,
            format!("{}/connect/token", fixture.settings.issuer.issuer())
        );
        assert_eq!(
            response.header("cache-control"),
            Some("public, max-age=3600")
        );
    }

    #[tokio::test]
    async fn test_jwks_lists_signing_key() {
        let fixture = TestFixture::new().await;
        let response = fixture.get("/openid/.well-known/openid-configuration/jwks").await;
        response.assert_ok();

        let keys = response.json_as::<JsonWebKeySet>();
        assert_eq!(keys.keys.len(), 1);
        assert_eq!(keys.keys[0].kty, "OKP");
        assert_eq!(keys.keys[0].use_field, "sig");
    }

    #[tokio::test]
    async fn test_token_with_basic_auth_unlocks_contacts() {
        let fixture = TestFixture::new().await;
        let response = fixture
            .send(form_request(
                TOKEN_URI,
                "grant_type=client_credentials",
                Some(("client", "secret")),
            ))
            .await;
        response.assert_ok();
        assert_eq!(response.header("cache-control"), Some("no-store"));
        assert_eq!(response.header("pragma"), Some("no-cache"));

        let token = response.json_as::<TokenResponse>();
        assert_eq!(token.token_type, "Bearer");
        assert_eq!(token.expires_in, 300);
        assert_eq!(token.scope, "read write");

        let body = Body::from(json!({ "name": "Jane" }).to_string());
        fixture
            .send(fixture.request_with_token(Method::POST, "/contacts", &token.access_token, body))
            .await
            .assert_status(StatusCode::CREATED);
    }

    #[tokio::test]
    async fn test_token_with_form_credentials_and_narrow_scope() {
        let fixture = TestFixture::new().await;
        let response = fixture
            .send(form_request(
                TOKEN_URI,
                "grant_type=client_credentials&client_id=client&client_secret=secret&scope=read",
                None,
            ))
            .await;
        response.assert_ok();

        let token = response.json_as::<TokenResponse>();
        assert_eq!(token.scope, "read");

        let body = Body::from(json!({ "name": "Jane" }).to_string());
        fixture
            .send(fixture.request_with_token(Method::POST, "/contacts", &token.access_token, body))
            .await
            .assert_status(StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_token_rejects_bad_client() {
        let fixture = TestFixture::new().await;
        let response = fixture
            .send(form_request(
                TOKEN_URI,
                "grant_type=client_credentials",
                Some(("client", "wrong")),
            ))
            .await;
        response.assert_status(StatusCode::UNAUTHORIZED);
        assert_eq!(response.json["error"], "invalid_client");
        assert_eq!(response.header("www-authenticate"), Some("Basic"));

        fixture
            .send(form_request(TOKEN_URI, "grant_type=client_credentials", None))
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_token_rejects_unknown_scope() {
        let fixture = TestFixture::new().await;
        let response = fixture
            .send(form_request(
                TOKEN_URI,
                "grant_type=client_credentials&scope=read%20admin",
                Some(("client", "secret")),
            ))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(response.json["error"], "invalid_scope");
    }

    #[tokio::test]
    async fn test_token_rejects_unsupported_grant() {
        let fixture = TestFixture::new().await;
        let response = fixture
            .send(form_request(
                TOKEN_URI,
                "grant_type=password&username=u&password=p",
                Some(("client", "secret")),
            ))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(response.json["error"], "unsupported_grant_type");
    }

    #[tokio::test]
    async fn test_token_rejects_missing_grant_type() {
        let fixture = TestFixture::new().await;
        let response = fixture
            .send(form_request(TOKEN_URI, "scope=read", Some(("client", "secret"))))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(response.json["error"], "invalid_request");
    }

    #[tokio::test]
    async fn test_introspect_active_token() {
        let fixture = TestFixture::new().await;
        let token = fixture.token(&["read"]);

        let response = fixture
            .send(form_request(
                INTROSPECT_URI,
                &format!("token={token}"),
                Some(("client", "secret")),
            ))
            .await;
        response.assert_ok();
        assert_eq!(response.json["active"], true);
        assert_eq!(response.json["sub"], "client");
        assert_eq!(response.json["scope"], "read");
        assert_eq!(response.json["iss"], fixture.settings.issuer.issuer());
    }

    #[tokio::test]
    async fn test_introspect_json_body() {
        let fixture = TestFixture::new().await;
        let request = Request::builder()
            .method(Method::POST)
            .uri(INTROSPECT_URI)
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(
                json!({
                    "token": fixture.token(&["write"]),
                    "client_id": "client",
                    "client_secret": "secret",
                })
                .to_string(),
            ))
            .expect("Failed to build request");

        let response = fixture.send(request).await;
        response.assert_ok();
        assert_eq!(response.json["active"], true);
        assert_eq!(response.json["scope"], "write");
    }

    #[tokio::test]
    async fn test_introspect_unverifiable_token_is_inactive() {
        let fixture = TestFixture::new().await;
        let expired = fixture.expired_token(&["read"]);
        for token in ["garbage", expired.as_str()] {
            let response = fixture
                .send(form_request(
                    INTROSPECT_URI,
                    &format!("token={token}"),
                    Some(("client", "secret")),
                ))
                .await;
            response.assert_ok();
            assert_eq!(response.json, json!({ "active": false }));
        }
    }

    #[tokio::test]
    async fn test_introspect_requires_client_authentication() {
        let fixture = TestFixture::new().await;
        let token = fixture.token(&["read"]);
        let response = fixture
            .send(form_request(INTROSPECT_URI, &format!("token={token}"), None))
            .await;
        response.assert_status(StatusCode::UNAUTHORIZED);
        assert_eq!(response.json["error"], "invalid_client");
    }

    #[test]
    fn test_basic_credentials_parsing() {
        let mut headers = HeaderMap::new();
        assert_eq!(basic_credentials(&headers), None);

        let encoded = STANDARD.encode("client:se:cret");
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("basic {encoded}")).unwrap(),
        );
        assert_eq!(
            basic_credentials(&headers),
            Some(("client".to_string(), "se:cret".to_string()))
        );

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        assert_eq!(basic_credentials(&headers), None);
    }
}
