use crate::api::{contacts, health, openid};
use crate::issuer::documents::{JsonWebKey, JsonWebKeySet, OpenIdConfiguration};
use crate::models::{Contact, ContactPayload};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

pub(crate) const HEALTH_TAG: &str = "Health API";
pub(crate) const CONTACTS_TAG: &str = "Contacts API";
pub(crate) const OPENID_TAG: &str = "Token Issuer";

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        health::ready_check,
        contacts::list_contacts,
        contacts::get_contact,
        contacts::create_contact,
        contacts::update_contact,
        contacts::delete_contact,
        openid::handlers::discovery,
        openid::handlers::jwks,
        openid::handlers::token,
        openid::handlers::introspect,
    ),
    components(schemas(
        Contact,
        ContactPayload,
        health::Health,
        health::HealthStatusType,
        OpenIdConfiguration,
        JsonWebKey,
        JsonWebKeySet,
        openid::models::TokenRequest,
        openid::models::TokenResponse,
        openid::models::IntrospectionRequest,
        openid::models::IntrospectionResponse,
        openid::models::OAuthError,
    )),
    modifiers(&BearerSecurity),
    tags(
        (name = HEALTH_TAG, description = "Health check endpoints"),
        (name = CONTACTS_TAG, description = "Contact management, requires a bearer token"),
        (name = OPENID_TAG, description = "Embedded OAuth 2.0 client credentials issuer"),
    ),
    info(
        title = "Contacts API",
        description = "Contact management behind JWT bearer authorization",
        version = "1.0.0"
    )
)]
pub(crate) struct ApiDoc;

/// Registers the `bearer` scheme referenced by the contact routes
struct BearerSecurity;

impl Modify for BearerSecurity {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}
