use crate::auth::keys::{KeySourceError, RemoteJwks};
use crate::auth::AuthorizationGate;
use crate::config::Settings;
use crate::issuer::{IssuerError, TokenIssuer};
use crate::store::memory::InMemoryContactRepository;
use crate::store::{sample_contacts, ContactRepository};
use log::info;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StateError {
    #[error("Failed to set up the token issuer: {0}")]
    Issuer(#[from] IssuerError),
    #[error("Failed to set up key retrieval: {0}")]
    KeySource(#[from] KeySourceError),
}

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub contacts: Arc<dyn ContactRepository>,
    pub gate: Arc<AuthorizationGate>,
    /// Present when the embedded issuer is enabled
    pub issuer: Option<Arc<TokenIssuer>>,
}

impl AppState {
    pub async fn new(settings: Settings) -> Result<Self, StateError> {
        let contacts = if settings.seed_sample_contacts {
            info!("Seeding the contact store with sample contacts");
            InMemoryContactRepository::with_contacts(sample_contacts()).await
        } else {
            InMemoryContactRepository::new()
        };

        let issuer = if settings.issuer.enabled {
            let issuer = TokenIssuer::new(settings.issuer.clone())?;
            info!("Embedded token issuer enabled at {}", issuer.issuer());
            Some(Arc::new(issuer))
        } else {
            None
        };

        // The gate only reaches the issuer through its published metadata, even in-process
        let keys = RemoteJwks::new(&settings.auth)?;
        let gate = AuthorizationGate::new(&settings.auth, Arc::new(keys));

        Ok(Self {
            settings: Arc::new(settings),
            contacts: Arc::new(contacts),
            gate: Arc::new(gate),
            issuer,
        })
    }
}

#[cfg(test)]
impl AppState {
    /// State wired to a given issuer, with an empty store
    pub(crate) fn for_testing(settings: &Settings, issuer: TokenIssuer) -> Self {
        let keys = RemoteJwks::new(&settings.auth).expect("Failed to create key source");
        Self {
            settings: Arc::new(settings.clone()),
            contacts: Arc::new(InMemoryContactRepository::new()),
            gate: Arc::new(AuthorizationGate::new(&settings.auth, Arc::new(keys))),
            issuer: Some(Arc::new(issuer)),
        }
    }
}
