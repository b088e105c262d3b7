//! Documents published by the issuer for token consumers

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// OpenID Connect discovery document
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct OpenIdConfiguration {
    /// Authority written to the `iss` claim
    pub issuer: String,
    /// Location of the public signing keys
    pub jwks_uri: String,
    pub token_endpoint: String,
    pub introspection_endpoint: String,
    pub grant_types_supported: Vec<String>,
    pub scopes_supported: Vec<String>,
    pub token_endpoint_auth_methods_supported: Vec<String>,
    pub response_types_supported: Vec<String>,
    pub id_token_signing_alg_values_supported: Vec<String>,
}

/// A public signing key in JWK form
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct JsonWebKey {
    /// Key type, always `OKP`
    pub kty: String,
    /// Curve, always `Ed25519`
    pub crv: String,
    pub alg: String,
    #[serde(rename = "use")]
    pub use_field: String,
    pub kid: String,
    /// Base64url encoded public key
    pub x: String,
}

/// JSON Web Key Set
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct JsonWebKeySet {
    pub keys: Vec<JsonWebKey>,
}
