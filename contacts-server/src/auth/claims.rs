use serde::{Deserialize, Serialize};

/// Claims carried by access tokens.
///
/// The issuer writes `scope` as a JSON array; tokens from other authorities
/// commonly use a space-delimited string, which is accepted as well.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AccessTokenClaims {
    pub iss: String,
    pub sub: String,
    pub aud: Audience,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(default)]
    pub scope: ScopeClaim,
    pub iat: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nbf: Option<i64>,
    pub exp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Audience {
    Single(String),
    Many(Vec<String>),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ScopeClaim {
    List(Vec<String>),
    Spaced(String),
}

impl Default for ScopeClaim {
    fn default() -> Self {
        ScopeClaim::List(Vec::new())
    }
}

impl ScopeClaim {
    /// Individual scope values, empty entries dropped
    pub fn to_vec(&self) -> Vec<String> {
        match self {
            ScopeClaim::List(scopes) => scopes
                .iter()
                .map(|s| s.trim())
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
            ScopeClaim::Spaced(scopes) => scopes.split_whitespace().map(str::to_string).collect(),
        }
    }
}
