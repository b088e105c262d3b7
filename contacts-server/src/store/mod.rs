use crate::models::{Contact, ContactDraft, ContactId};
use thiserror::Error;

pub mod memory;

/// Errors that can occur during contact store operations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("Contact {0} was not found")]
    NotFound(ContactId),
}

/// Repository of contacts.
///
/// Implementations must be safe to share across request handlers; concurrent
/// add, update and delete calls may not lose writes.
#[async_trait::async_trait]
pub trait ContactRepository: Send + Sync {
    /// All contacts ordered by id
    async fn list(&self) -> Vec<Contact>;

    /// The contact with the given id, if any
    async fn get(&self, id: ContactId) -> Option<Contact>;

    /// Stores a new contact under the next free id and returns it
    async fn add(&self, draft: ContactDraft) -> Contact;

    /// Replaces every field of an existing contact
    async fn update(&self, id: ContactId, draft: ContactDraft) -> Result<Contact, StoreError>;

    /// Removes an existing contact
    async fn delete(&self, id: ContactId) -> Result<(), StoreError>;
}

/// Contacts loaded when `seed_sample_contacts` is enabled
pub fn sample_contacts() -> Vec<ContactDraft> {
    vec![
        ContactDraft {
            name: "Barbara Jensen".to_string(),
            address: Some("1 Main Street".to_string()),
            city: Some("Springfield".to_string()),
            email: Some("barbara@example.com".to_string()),
            twitter: Some("@bjensen".to_string()),
        },
        ContactDraft {
            name: "Pat Smith".to_string(),
            address: None,
            city: Some("Portland".to_string()),
            email: Some("pat@example.com".to_string()),
            twitter: None,
        },
    ]
}
