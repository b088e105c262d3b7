use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Identifier assigned to a contact by the store
pub type ContactId = i32;

/// A contact as stored and returned by the API
#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, PartialEq, Eq)]
pub struct Contact {
    /// Unique identifier assigned on creation
    #[serde(alias = "contactId")]
    pub id: ContactId,
    /// Display name of the contact
    pub name: String,
    /// Street address
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    /// City
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    /// Email address
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Twitter handle
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub twitter: Option<String>,
}

impl Contact {
    pub fn from_draft(id: ContactId, draft: ContactDraft) -> Self {
        Self {
            id,
            name: draft.name,
            address: draft.address,
            city: draft.city,
            email: draft.email,
            twitter: draft.twitter,
        }
    }
}

/// Request body for creating or replacing a contact.
///
/// Every field is optional on the wire so that a missing name is reported as a
/// validation error instead of a deserialization failure. Any id in the body is
/// ignored.
#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, Default, PartialEq)]
pub struct ContactPayload {
    /// Ignored; the store or the request path decides the id
    #[serde(default, alias = "contactId", skip_serializing_if = "Option::is_none")]
    pub id: Option<ContactId>,
    /// Display name of the contact (required, non-empty)
    #[serde(default)]
    pub name: Option<String>,
    /// Street address
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    /// City
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    /// Email address
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Twitter handle
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub twitter: Option<String>,
}

/// A contact payload that passed validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactDraft {
    pub name: String,
    pub address: Option<String>,
    pub city: Option<String>,
    pub email: Option<String>,
    pub twitter: Option<String>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("The name field is required")]
    MissingName,
}

impl TryFrom<ContactPayload> for ContactDraft {
    type Error = ValidationError;

    fn try_from(payload: ContactPayload) -> Result<Self, Self::Error> {
        let name = match payload.name {
            Some(name) if !name.trim().is_empty() => name,
            _ => return Err(ValidationError::MissingName),
        };

        Ok(Self {
            name,
            address: payload.address,
            city: payload.city,
            email: payload.email,
            twitter: payload.twitter,
        })
    }
}
