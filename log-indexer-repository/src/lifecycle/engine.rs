//! Policy registration.

use std::sync::Arc;

use tracing::{debug, info, instrument};

use crate::errors::{EntityKind, LifecycleError};
use crate::interfaces::DocumentStore;
use crate::lifecycle::Policy;

/// What [`PolicyEngine::register`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    /// The entity did not exist and was stored.
    Created,
    /// An identical entity was already stored; nothing was sent.
    Unchanged,
    /// A different entity was stored under the name and was replaced.
    Updated,
}

/// Registers lifecycle policies with the store.
///
/// The engine only describes the state machine; walking indices through it
/// is done by the store's background lifecycle manager.
pub struct PolicyEngine {
    store: Arc<dyn DocumentStore>,
}

impl PolicyEngine {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Register a policy, idempotently.
    ///
    /// Re-registering an identical policy under the same id succeeds
    /// without touching the store. A different policy under an existing id
    /// is a [`LifecycleError::Conflict`].
    #[instrument(skip(self, policy), fields(policy_id = %policy.id))]
    pub async fn register(&self, policy: &Policy) -> Result<Registration, LifecycleError> {
        policy.validate()?;

        let existing = self
            .store
            .get_policy(&policy.id)
            .await
            .map_err(|e| LifecycleError::from_store(e, EntityKind::Policy, &policy.id))?;

        if let Some(existing) = existing {
            if same_content(&existing, policy) {
                debug!("Identical policy already registered");
                return Ok(Registration::Unchanged);
            }
            return Err(LifecycleError::conflict(EntityKind::Policy, &policy.id));
        }

        self.store
            .put_policy(policy)
            .await
            .map_err(|e| LifecycleError::from_store(e, EntityKind::Policy, &policy.id))?;

        info!(states = policy.states.len(), "Registered lifecycle policy");
        Ok(Registration::Created)
    }

    /// Fetch a registered policy.
    pub async fn fetch(&self, id: &str) -> Result<Policy, LifecycleError> {
        self.store
            .get_policy(id)
            .await
            .map_err(|e| LifecycleError::from_store(e, EntityKind::Policy, id))?
            .ok_or_else(|| LifecycleError::PolicyNotFound(id.to_string()))
    }

    /// Whether a policy with this id is registered.
    pub async fn exists(&self, id: &str) -> Result<bool, LifecycleError> {
        let policy = self
            .store
            .get_policy(id)
            .await
            .map_err(|e| LifecycleError::from_store(e, EntityKind::Policy, id))?;
        Ok(policy.is_some())
    }
}

fn same_content(stored: &Policy, wanted: &Policy) -> bool {
    stored.description == wanted.description
        && stored.default_state == wanted.default_state
        && stored.states == wanted.states
        && stored.ism_template == wanted.ism_template
}
