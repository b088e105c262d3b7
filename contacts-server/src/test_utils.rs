use crate::auth::claims::{AccessTokenClaims, Audience, ScopeClaim};
use crate::config::Settings;
use crate::create_app;
use crate::issuer::{TokenIssuer, DISCOVERY_PATH, JWKS_PATH};
use crate::state::AppState;
use axum::body::Body;
use axum::Router;
use chrono::Utc;
use http::{HeaderMap, Method, Request, StatusCode};
use http_body_util::BodyExt;
use log::LevelFilter;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tower::ServiceExt;
use wiremock::matchers;
use wiremock::Mock;
use wiremock::MockServer;
use wiremock::ResponseTemplate;

/// Path prefix of the mocked authority on the mock server
const AUTHORITY_PREFIX: &str = "/openid";

/// Test fixture for setting up a complete test environment.
///
/// The fixture owns a token issuer and a mock authority that publishes the
/// issuer's discovery document and key set, so tokens it mints are accepted by
/// the authorization gate exactly like tokens from a remote authority.
///
/// # Examples
///
/// ```rust
/// #[tokio::test]
/// async fn test_endpoint() {
///     let fixture = TestFixture::new().await;
///
///     // Requests carry a token with every allowed scope
///     let response = fixture.post("/contacts", &json!({ "name": "Jane" })).await;
///     response.assert_status(StatusCode::CREATED);
///
///     // Or mint a narrower one
///     let token = fixture.token(&["read"]);
///     let request = fixture.request_with_token(Method::DELETE, "/contacts/1", &token, Body::empty());
///     fixture.send(request).await.assert_status(StatusCode::FORBIDDEN);
/// }
/// ```
pub struct TestFixture {
    /// The application router
    pub app: Router,
    /// Configuration settings
    pub settings: Settings,
    /// Shared application state, including the issuer minting test tokens
    pub state: AppState,
    /// Mock server standing in for the token authority
    pub authority_mock: MockServer,
}

impl TestFixture {
    /// Creates a fixture whose authority is served by its own mock server
    pub async fn new() -> Self {
        let authority_mock = MockServer::start().await;
        let authority = format!("{}{}", authority_mock.uri(), AUTHORITY_PREFIX);
        Self::build(authority_mock, &authority).await
    }

    /// Creates a fixture validating tokens against `authority`.
    ///
    /// The fixture's own mock authority still publishes the issuer documents,
    /// but the gate never looks there.
    pub async fn with_authority(authority: &str) -> Self {
        let authority_mock = MockServer::start().await;
        Self::build(authority_mock, authority).await
    }

    async fn build(authority_mock: MockServer, authority: &str) -> Self {
        Self::setup_logger(LevelFilter::Debug);

        let settings = Settings::for_test(authority);
        let issuer =
            TokenIssuer::new(settings.issuer.clone()).expect("Failed to create token issuer");

        Mock::given(matchers::method("GET"))
            .and(matchers::path(format!("{AUTHORITY_PREFIX}{DISCOVERY_PATH}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(issuer.discovery()))
            .mount(&authority_mock)
            .await;
        Mock::given(matchers::method("GET"))
            .and(matchers::path(format!("{AUTHORITY_PREFIX}{JWKS_PATH}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(issuer.jwks()))
            .mount(&authority_mock)
            .await;

        let state = AppState::for_testing(&settings, issuer);
        let app = create_app(state.clone());

        Self {
            app,
            settings,
            state,
            authority_mock,
        }
    }

    /// Initializes the test logger, ignoring repeated initialization
    pub fn setup_logger(level: LevelFilter) {
        let _ = env_logger::builder()
            .filter_level(level)
            .is_test(true)
            .try_init();
    }

    fn issuer(&self) -> &TokenIssuer {
        self.state
            .issuer
            .as_deref()
            .expect("Test state always has an issuer")
    }

    /// Mints a valid token for the test client carrying `scopes`
    pub fn token(&self, scopes: &[&str]) -> String {
        let scopes = scopes.iter().map(|s| s.to_string()).collect();
        self.issuer()
            .mint(&self.settings.issuer.client_id, scopes)
            .expect("Failed to mint token")
            .access_token
    }

    /// Signs a token with a correct signature that expired ten minutes ago
    pub fn expired_token(&self, scopes: &[&str]) -> String {
        let now = Utc::now().timestamp();
        let claims = AccessTokenClaims {
            iss: self.issuer().issuer().to_string(),
            sub: self.settings.issuer.client_id.clone(),
            aud: Audience::Single(self.settings.issuer.audience.clone()),
            client_id: Some(self.settings.issuer.client_id.clone()),
            scope: ScopeClaim::List(scopes.iter().map(|s| s.to_string()).collect()),
            iat: now - 1200,
            nbf: Some(now - 1200),
            exp: now - 600,
            jti: None,
        };
        self.issuer()
            .sign(&claims)
            .expect("Failed to sign expired token")
    }

    /// Creates a request builder with a full-scope bearer token and a JSON content type
    pub fn request_builder(&self, method: Method, uri: impl AsRef<str>) -> http::request::Builder {
        let token = self.token(&["read", "write"]);
        Request::builder()
            .method(method)
            .uri(uri.as_ref())
            .header("Authorization", format!("Bearer {token}"))
            .header("Content-Type", "application/json")
    }

    /// Builds a request authorized with the given raw token
    pub fn request_with_token(
        &self,
        method: Method,
        uri: impl AsRef<str>,
        token: &str,
        body: Body,
    ) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri.as_ref())
            .header("Authorization", format!("Bearer {token}"))
            .header("Content-Type", "application/json")
            .body(body)
            .expect("Failed to build request")
    }

    pub async fn get(&self, uri: impl AsRef<str>) -> TestResponse {
        let request = self
            .request_builder(Method::GET, uri)
            .body(Body::empty())
            .expect("Failed to build request");

        self.send(request).await
    }

    pub async fn post<T: Serialize>(&self, uri: impl AsRef<str>, body: &T) -> TestResponse {
        self.send_json(Method::POST, uri, body).await
    }

    pub async fn put<T: Serialize>(&self, uri: impl AsRef<str>, body: &T) -> TestResponse {
        self.send_json(Method::PUT, uri, body).await
    }

    pub async fn delete(&self, uri: impl AsRef<str>) -> TestResponse {
        let request = self
            .request_builder(Method::DELETE, uri)
            .body(Body::empty())
            .expect("Failed to build request");

        self.send(request).await
    }

    async fn send_json<T: Serialize>(
        &self,
        method: Method,
        uri: impl AsRef<str>,
        body: &T,
    ) -> TestResponse {
        let json_body = serde_json::to_vec(body).expect("Failed to serialize body to JSON");
        let request = self
            .request_builder(method, uri)
            .body(Body::from(json_body))
            .expect("Failed to build request");

        self.send(request).await
    }

    /// Sends a request and returns a TestResponse.
    ///
    /// Use this when a request needs headers or a body the helpers don't set,
    /// for example a form-encoded token request.
    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .app
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .into_body()
            .collect()
            .await
            .expect("Failed to read response body")
            .to_bytes();

        // Empty or non-JSON bodies become an empty object
        let json = if !body.is_empty() {
            serde_json::from_slice(&body).unwrap_or_else(|_| serde_json::json!({}))
        } else {
            serde_json::json!({})
        };

        TestResponse {
            status,
            headers,
            json,
        }
    }
}

/// Response from a test request that provides convenient access to status, headers and JSON body.
pub struct TestResponse {
    /// HTTP status code
    pub status: StatusCode,
    /// Response headers
    pub headers: HeaderMap,
    /// Response body as JSON (if present and valid JSON)
    pub json: Value,
}

impl TestResponse {
    /// Asserts that the response has the expected status code.
    ///
    /// # Panics
    ///
    /// Panics if the status code doesn't match the expected value.
    pub fn assert_status(&self, expected: StatusCode) -> &Self {
        assert_eq!(
            self.status,
            expected,
            "Expected status {} but got {} with body: {}",
            expected,
            self.status,
            serde_json::to_string_pretty(&self.json).unwrap_or_default()
        );
        self
    }

    pub fn assert_ok(&self) -> &Self {
        self.assert_status(StatusCode::OK)
    }

    /// Header value as a string, when present and printable
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Converts the response body to the specified type.
    ///
    /// # Panics
    ///
    /// Panics if deserialization fails.
    pub fn json_as<T: DeserializeOwned>(&self) -> T {
        serde_json::from_value(self.json.clone()).expect("Failed to deserialize response JSON")
    }
}
