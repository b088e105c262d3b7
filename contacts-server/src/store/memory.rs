use super::{ContactRepository, StoreError};
use crate::models::{Contact, ContactDraft, ContactId};
use async_trait::async_trait;
use log::debug;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

#[derive(Debug)]
struct Inner {
    next_id: ContactId,
    contacts: BTreeMap<ContactId, Contact>,
}

/// Process-local contact store.
///
/// A single lock guards both the map and the id counter, so an id handed out
/// by `add` is never handed out again, even after the contact is deleted.
#[derive(Debug)]
pub struct InMemoryContactRepository {
    inner: RwLock<Inner>,
}

impl Default for InMemoryContactRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryContactRepository {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner {
                next_id: 1,
                contacts: BTreeMap::new(),
            }),
        }
    }

    /// Creates a store pre-populated with the given contacts
    pub async fn with_contacts(drafts: impl IntoIterator<Item = ContactDraft>) -> Self {
        let repository = Self::new();
        for draft in drafts {
            repository.add(draft).await;
        }
        repository
    }
}

#[async_trait]
impl ContactRepository for InMemoryContactRepository {
    async fn list(&self) -> Vec<Contact> {
        self.inner.read().await.contacts.values().cloned().collect()
    }

    async fn get(&self, id: ContactId) -> Option<Contact> {
        self.inner.read().await.contacts.get(&id).cloned()
    }

    async fn add(&self, draft: ContactDraft) -> Contact {
        let mut inner = self.inner.write().await;
        let id = inner.next_id;
        inner.next_id += 1;

        let contact = Contact::from_draft(id, draft);
        inner.contacts.insert(id, contact.clone());
        debug!("Added contact {}", id);
        contact
    }

    async fn update(&self, id: ContactId, draft: ContactDraft) -> Result<Contact, StoreError> {
        let mut inner = self.inner.write().await;
        let slot = inner
            .contacts
            .get_mut(&id)
            .ok_or(StoreError::NotFound(id))?;

        *slot = Contact::from_draft(id, draft);
        debug!("Updated contact {}", id);
        Ok(slot.clone())
    }

    async fn delete(&self, id: ContactId) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        inner
            .contacts
            .remove(&id)
            .map(|_| debug!("Deleted contact {}", id))
            .ok_or(StoreError::NotFound(id))
    }
}
