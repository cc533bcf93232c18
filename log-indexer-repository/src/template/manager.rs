//! Index template registration and removal.

use std::sync::Arc;

use tracing::{debug, info, instrument};

use crate::errors::{EntityKind, LifecycleError};
use crate::interfaces::DocumentStore;
use crate::lifecycle::Registration;
use crate::template::IndexTemplate;

/// Registers, fetches and deletes index templates.
pub struct TemplateManager {
    store: Arc<dyn DocumentStore>,
}

impl TemplateManager {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Register a template after checking its policy exists.
    ///
    /// An unknown policy id fails with [`LifecycleError::PolicyNotFound`]
    /// before the template is sent. Registering an identical template again
    /// is a no-op; a changed template replaces the stored one.
    #[instrument(skip(self, template), fields(template = %template.name, policy_id = %template.policy_id()))]
    pub async fn register(&self, template: &IndexTemplate) -> Result<Registration, LifecycleError> {
        let policy_id = template.policy_id();
        let policy = self
            .store
            .get_policy(policy_id)
            .await
            .map_err(|e| LifecycleError::from_store(e, EntityKind::Policy, policy_id))?;
        if policy.is_none() {
            return Err(LifecycleError::PolicyNotFound(policy_id.to_string()));
        }

        let existing = self
            .store
            .get_template(&template.name)
            .await
            .map_err(|e| LifecycleError::from_store(e, EntityKind::Template, &template.name))?;

        let registration = match existing {
            Some(existing) if existing == *template => {
                debug!("Identical template already registered");
                return Ok(Registration::Unchanged);
            }
            Some(_) => Registration::Updated,
            None => Registration::Created,
        };

        self.store
            .put_template(template)
            .await
            .map_err(|e| LifecycleError::from_store(e, EntityKind::Template, &template.name))?;

        info!(
            patterns = ?template.index_patterns,
            fields = template.mapping.properties.len(),
            "Registered index template"
        );
        Ok(registration)
    }

    /// Fetch a registered template.
    pub async fn fetch(&self, name: &str) -> Result<IndexTemplate, LifecycleError> {
        self.store
            .get_template(name)
            .await
            .map_err(|e| LifecycleError::from_store(e, EntityKind::Template, name))?
            .ok_or_else(|| LifecycleError::not_found(EntityKind::Template, name))
    }

    /// Names of the streams created from template `name`.
    pub async fn dependents(&self, name: &str) -> Result<Vec<String>, LifecycleError> {
        let streams = self
            .store
            .list_streams()
            .await
            .map_err(|e| LifecycleError::from_store(e, EntityKind::Stream, name))?;

        Ok(streams
            .into_iter()
            .filter(|stream| stream.template == name)
            .map(|stream| stream.name)
            .collect())
    }

    /// Delete a template.
    ///
    /// Fails with [`LifecycleError::HasDependentStream`] while any stream
    /// still references the template.
    #[instrument(skip(self))]
    pub async fn delete(&self, name: &str) -> Result<(), LifecycleError> {
        self.fetch(name).await?;

        let streams = self.dependents(name).await?;
        if !streams.is_empty() {
            return Err(LifecycleError::HasDependentStream {
                template: name.to_string(),
                streams,
            });
        }

        self.store
            .delete_template(name)
            .await
            .map_err(|e| LifecycleError::from_store(e, EntityKind::Template, name))?;

        info!("Deleted index template");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::{Policy, PolicyEngine};
    use crate::memory::InMemoryStore;
    use crate::template::build_template;
    use log_indexer_shared::{FieldType, Mapping, TimeValue};

    fn mapping() -> Mapping {
        Mapping::strict()
            .with_field("name", FieldType::Text)
            .with_field("ip_address", FieldType::Keyword)
    }

    async fn store_with_policy(id: &str) -> Arc<InMemoryStore> {
        let store = Arc::new(InMemoryStore::new());
        let policy =
            Policy::rollover_then_delete(id, TimeValue::days(1), None, TimeValue::days(30)).unwrap();
        PolicyEngine::new(store.clone()).register(&policy).await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_register_requires_policy() {
        let store = Arc::new(InMemoryStore::new());
        let manager = TemplateManager::new(store.clone());

        let template = build_template("logs", "logs", "logs", mapping());
        let err = manager.register(&template).await.unwrap_err();

        assert_eq!(err, LifecycleError::PolicyNotFound("logs".to_string()));
        assert!(store.template("logs").is_none());
    }

    #[tokio::test]
    async fn test_register_fetch_and_reregister() {
        let store = store_with_policy("logs").await;
        let manager = TemplateManager::new(store);

        let template = build_template("logs", "logs", "logs", mapping());
        assert_eq!(manager.register(&template).await.unwrap(), Registration::Created);
        assert_eq!(manager.register(&template).await.unwrap(), Registration::Unchanged);

        let changed = template.clone().with_replicas(1);
        assert_eq!(manager.register(&changed).await.unwrap(), Registration::Updated);
        assert_eq!(manager.fetch("logs").await.unwrap(), changed);
    }

    #[tokio::test]
    async fn test_fetch_missing() {
        let manager = TemplateManager::new(Arc::new(InMemoryStore::new()));

        let err = manager.fetch("logs").await.unwrap_err();
        assert_eq!(err, LifecycleError::not_found(EntityKind::Template, "logs"));
    }

    #[tokio::test]
    async fn test_delete_blocked_by_dependent_stream() {
        let store = store_with_policy("logs").await;
        let manager = TemplateManager::new(store.clone());
        manager
            .register(&build_template("logs", "logs*", "logs", mapping()))
            .await
            .unwrap();
        store.create_stream("logs-eu").await.unwrap();

        let err = manager.delete("logs").await.unwrap_err();
        assert_eq!(
            err,
            LifecycleError::HasDependentStream {
                template: "logs".to_string(),
                streams: vec!["logs-eu".to_string()],
            }
        );

        store.delete_stream("logs-eu").await.unwrap();
        manager.delete("logs").await.unwrap();
        assert!(store.template("logs").is_none());
    }

    #[tokio::test]
    async fn test_delete_missing() {
        let manager = TemplateManager::new(Arc::new(InMemoryStore::new()));

        let err = manager.delete("logs").await.unwrap_err();
        assert!(matches!(err, LifecycleError::NotFound { .. }));
    }
}
