//! Entity registry
//!
//! Records every entity a test run creates, keyed by category, so all of
//! them can be deleted at teardown whichever test created them and whether
//! or not it passed. One registry is built per run and shared through an
//! `Arc`; it needs the transport only when resolving names and flushing.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::schema::Entity;
use crate::types::Category;

/// Deletes and looks up entities on the server under test.
///
/// Implementations are expected to act with elevated credentials.
#[async_trait]
pub trait EntityTransport: Send + Sync {
    /// Delete the entity addressed by `identity`
    async fn delete(&self, category: Category, identity: &str) -> Result<()>;

    /// Id of the first entity matching `name`, if any
    async fn find_id_by_name(&self, category: Category, name: &str) -> Result<Option<String>>;
}

/// Outcome of a flush
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushReport {
    pub attempted: usize,
    pub deleted: usize,
    pub failed: usize,
}

/// Run-scoped set of created entities
pub struct EntityRegistry {
    transport: Arc<dyn EntityTransport>,
    entities: Mutex<HashMap<Category, HashSet<String>>>,
}

impl EntityRegistry {
    pub fn new(transport: Arc<dyn EntityTransport>) -> Self {
        Self {
            transport,
            entities: Mutex::new(HashMap::new()),
        }
    }

    /// Record an identity. Returns whether it was not recorded before.
    ///
    /// Missing and empty identities are ignored.
    pub fn register(&self, category: Category, identity: Option<&str>) -> bool {
        let identity = match identity {
            Some(id) if !id.is_empty() => id,
            _ => return false,
        };

        let inserted = self
            .entities
            .lock()
            .entry(category)
            .or_default()
            .insert(identity.to_string());

        if inserted {
            debug!(%category, identity, "Registered entity for cleanup");
        }
        inserted
    }

    /// Record a model by its `id`, falling back to its `locator`
    pub fn register_model<T: Serialize>(&self, category: Category, model: &T) -> Result<()> {
        let identity = identity_of(category, model)?;
        self.register(category, Some(&identity));
        Ok(())
    }

    /// Record an entity under its own category
    pub fn register_entity<T: Entity>(&self, entity: &T) -> Result<()> {
        self.register_model(T::CATEGORY, entity)
    }

    /// Look an entity up by name and record the id of the first match.
    ///
    /// Returns the recorded id. Lookup failures count as "not found".
    pub async fn register_by_name(&self, category: Category, name: Option<&str>) -> Option<String> {
        let name = match name {
            Some(n) if !n.is_empty() => n,
            _ => return None,
        };

        match self.transport.find_id_by_name(category, name).await {
            Ok(Some(id)) => {
                self.register(category, Some(&id));
                Some(id)
            }
            Ok(None) => {
                debug!(%category, name, "No entity found by name");
                None
            }
            Err(e) => {
                warn!(%category, name, error = %e, "Lookup by name failed");
                None
            }
        }
    }

    /// Delete every recorded entity, best effort, and empty the registry.
    ///
    /// The registry is drained before any deletion is issued; entities
    /// registered while the deletions run stay for the next flush.
    pub async fn flush(&self) -> FlushReport {
        let mut snapshot = std::mem::take(&mut *self.entities.lock());
        let mut report = FlushReport::default();

        for category in Category::ALL {
            let Some(identities) = snapshot.remove(&category) else {
                continue;
            };
            let mut identities: Vec<String> = identities.into_iter().collect();
            identities.sort();

            for identity in identities {
                report.attempted += 1;
                match self.transport.delete(category, &identity).await {
                    Ok(()) => {
                        report.deleted += 1;
                        debug!(%category, identity = %identity, "Deleted entity");
                    }
                    Err(e) => {
                        report.failed += 1;
                        warn!(%category, identity = %identity, error = %e, "Cleanup delete failed");
                    }
                }
            }
        }

        info!(
            "Cleanup finished: {} deleted, {} failed",
            report.deleted, report.failed
        );
        report
    }

    /// Total number of recorded entities
    pub fn len(&self) -> usize {
        self.entities.lock().values().map(HashSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, category: Category, identity: &str) -> bool {
        self.entities
            .lock()
            .get(&category)
            .map(|ids| ids.contains(identity))
            .unwrap_or(false)
    }

    /// Recorded identities of one category, sorted
    pub fn identities(&self, category: Category) -> Vec<String> {
        let mut ids: Vec<String> = self
            .entities
            .lock()
            .get(&category)
            .map(|ids| ids.iter().cloned().collect())
            .unwrap_or_default();
        ids.sort();
        ids
    }
}

/// Identity of a model: a non-empty `id`, else a non-empty `locator`
pub fn identity_of<T: Serialize>(category: Category, model: &T) -> Result<String> {
    let value = serde_json::to_value(model)?;

    for key in ["id", "locator"] {
        match value.get(key) {
            Some(Value::String(s)) if !s.is_empty() => return Ok(s.clone()),
            Some(Value::Number(n)) => return Ok(n.to_string()),
            _ => {}
        }
    }

    Err(Error::MissingIdentity {
        category: category.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Project, User};
    use std::sync::{OnceLock, Weak};

    #[derive(Default)]
    struct RecordingTransport {
        deletes: Mutex<Vec<(Category, String)>>,
        failing: HashSet<String>,
        names: HashMap<String, String>,
    }

    impl RecordingTransport {
        fn failing(ids: &[&str]) -> Self {
            Self {
                failing: ids.iter().map(|s| s.to_string()).collect(),
                ..Default::default()
            }
        }

        fn deleted(&self) -> Vec<(Category, String)> {
            self.deletes.lock().clone()
        }
    }

    #[async_trait]
    impl EntityTransport for RecordingTransport {
        async fn delete(&self, category: Category, identity: &str) -> Result<()> {
            self.deletes.lock().push((category, identity.to_string()));
            if self.failing.contains(identity) {
                return Err(Error::Transport(format!("500 deleting {}", identity)));
            }
            Ok(())
        }

        async fn find_id_by_name(&self, category: Category, name: &str) -> Result<Option<String>> {
            if name == "unreachable" {
                return Err(Error::Transport("connection refused".to_string()));
            }
            Ok(self.names.get(&category.name_locator(name)).cloned())
        }
    }

    fn registry_with(transport: RecordingTransport) -> (Arc<RecordingTransport>, EntityRegistry) {
        let transport = Arc::new(transport);
        let registry = EntityRegistry::new(transport.clone());
        (transport, registry)
    }

    #[test]
    fn test_register_is_idempotent() {
        let (_, registry) = registry_with(RecordingTransport::default());

        assert!(registry.register(Category::Projects, Some("p1")));
        assert!(!registry.register(Category::Projects, Some("p1")));

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.identities(Category::Projects), vec!["p1"]);
    }

    #[test]
    fn test_same_identity_in_different_categories() {
        let (_, registry) = registry_with(RecordingTransport::default());
        registry.register(Category::Projects, Some("x"));
        registry.register(Category::BuildTypes, Some("x"));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_empty_identity_is_ignored() {
        let (_, registry) = registry_with(RecordingTransport::default());

        assert!(!registry.register(Category::Users, None));
        assert!(!registry.register(Category::Users, Some("")));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_register_model_prefers_id() {
        let (_, registry) = registry_with(RecordingTransport::default());
        let project = Project {
            id: Some("proj_1".to_string()),
            locator: Some("name:Other".to_string()),
            ..Default::default()
        };

        registry.register_entity(&project).unwrap();
        assert!(registry.contains(Category::Projects, "proj_1"));
        assert!(!registry.contains(Category::Projects, "name:Other"));
    }

    #[test]
    fn test_register_model_falls_back_to_locator() {
        let (_, registry) = registry_with(RecordingTransport::default());
        let project = Project {
            id: Some(String::new()),
            locator: Some("name:Other".to_string()),
            ..Default::default()
        };

        registry.register_model(Category::Projects, &project).unwrap();
        assert_eq!(registry.identities(Category::Projects), vec!["name:Other"]);
    }

    #[test]
    fn test_numeric_id_is_used() {
        let (_, registry) = registry_with(RecordingTransport::default());
        let user = User {
            id: Some(17),
            ..Default::default()
        };

        registry.register_entity(&user).unwrap();
        assert!(registry.contains(Category::Users, "17"));
    }

    #[test]
    fn test_model_without_identity_is_structural() {
        let (_, registry) = registry_with(RecordingTransport::default());

        let err = registry.register_entity(&Project::default()).unwrap_err();
        assert!(matches!(err, Error::MissingIdentity { .. }));
        assert!(err.is_structural());
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_flush_deletes_each_entity_once() {
        let (transport, registry) = registry_with(RecordingTransport::default());

        registry.register(Category::Projects, Some("p1"));
        registry.register(Category::Projects, Some("p1"));
        registry.register(Category::Projects, Some("p2"));

        let report = registry.flush().await;

        assert_eq!(
            transport.deleted(),
            vec![
                (Category::Projects, "p1".to_string()),
                (Category::Projects, "p2".to_string()),
            ]
        );
        assert_eq!(report, FlushReport { attempted: 2, deleted: 2, failed: 0 });
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_flush_continues_after_failures() {
        let (transport, registry) = registry_with(RecordingTransport::failing(&["bt1", "p1"]));

        registry.register(Category::BuildTypes, Some("bt1"));
        registry.register(Category::BuildTypes, Some("bt2"));
        registry.register(Category::Projects, Some("p1"));
        registry.register(Category::Users, Some("u1"));

        let report = registry.flush().await;

        assert_eq!(transport.deleted().len(), 4);
        assert_eq!(report.failed, 2);
        assert_eq!(report.deleted, 2);
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_flush_clears_even_when_everything_fails() {
        let (_, registry) = registry_with(RecordingTransport::failing(&["a", "b"]));
        registry.register(Category::Users, Some("a"));
        registry.register(Category::Projects, Some("b"));

        let report = registry.flush().await;

        assert_eq!(report.deleted, 0);
        assert!(registry.is_empty());
        assert!(registry.identities(Category::Users).is_empty());
    }

    #[tokio::test]
    async fn test_flush_deletes_build_types_before_projects() {
        let (transport, registry) = registry_with(RecordingTransport::default());
        registry.register(Category::Users, Some("u"));
        registry.register(Category::Projects, Some("p"));
        registry.register(Category::BuildTypes, Some("b"));

        registry.flush().await;

        let order: Vec<Category> = transport.deleted().into_iter().map(|(c, _)| c).collect();
        assert_eq!(order, Category::ALL.to_vec());
    }

    #[tokio::test]
    async fn test_register_by_name() {
        let mut transport = RecordingTransport::default();
        transport
            .names
            .insert("name:Demo".to_string(), "Demo_1".to_string());
        let (_, registry) = registry_with(transport);

        let id = registry.register_by_name(Category::Projects, Some("Demo")).await;
        assert_eq!(id.as_deref(), Some("Demo_1"));
        assert!(registry.contains(Category::Projects, "Demo_1"));

        assert_eq!(registry.register_by_name(Category::Projects, Some("Nope")).await, None);
        assert_eq!(registry.register_by_name(Category::Projects, None).await, None);
        assert_eq!(registry.register_by_name(Category::Projects, Some("unreachable")).await, None);
        assert_eq!(registry.len(), 1);
    }

    struct ReentrantTransport {
        registry: OnceLock<Weak<EntityRegistry>>,
    }

    #[async_trait]
    impl EntityTransport for ReentrantTransport {
        async fn delete(&self, _category: Category, identity: &str) -> Result<()> {
            if let Some(registry) = self.registry.get().and_then(Weak::upgrade) {
                registry.register(Category::Projects, Some(&format!("late_{}", identity)));
            }
            Ok(())
        }

        async fn find_id_by_name(&self, _category: Category, _name: &str) -> Result<Option<String>> {
            Ok(None)
        }
    }

    #[tokio::test]
    async fn test_registrations_during_flush_are_kept() {
        let transport = Arc::new(ReentrantTransport {
            registry: OnceLock::new(),
        });
        let registry = Arc::new(EntityRegistry::new(transport.clone()));
        let _ = transport.registry.set(Arc::downgrade(&registry));

        registry.register(Category::Projects, Some("p1"));
        registry.flush().await;

        assert_eq!(registry.identities(Category::Projects), vec!["late_p1"]);
    }

    #[test]
    fn test_concurrent_registration() {
        let (_, registry) = registry_with(RecordingTransport::default());
        let registry = Arc::new(registry);

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let registry = registry.clone();
                std::thread::spawn(move || {
                    for i in 0..100 {
                        registry.register(Category::Projects, Some(&format!("{}_{}", t, i)));
                        registry.register(Category::Projects, Some(&format!("shared_{}", i)));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(registry.len(), 900);
    }
}
