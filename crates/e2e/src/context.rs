//! Per-test context wiring the generator, the registry and the client

use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

use ciprobe_common::{
    generate, generate_bundle, Entity, EntityRegistry, FlushReport, KnownModels, Model, TestData,
    User,
};

use crate::client::ApiClient;
use crate::config::HarnessConfig;
use crate::error::E2eResult;

/// Everything a test needs to create data and clean it up afterwards
pub struct TestContext {
    config: HarnessConfig,
    superuser: ApiClient,
    registry: Arc<EntityRegistry>,
}

impl TestContext {
    /// Context with a fresh registry that deletes through the super user client
    pub fn new(config: HarnessConfig) -> E2eResult<Self> {
        let superuser = ApiClient::superuser(&config)?;
        let registry = Arc::new(EntityRegistry::new(Arc::new(superuser.clone())));
        Ok(Self {
            config,
            superuser,
            registry,
        })
    }

    /// Context sharing a registry built once for the whole run
    pub fn with_registry(config: HarnessConfig, registry: Arc<EntityRegistry>) -> E2eResult<Self> {
        let superuser = ApiClient::superuser(&config)?;
        Ok(Self {
            config,
            superuser,
            registry,
        })
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    pub fn superuser(&self) -> &ApiClient {
        &self.superuser
    }

    pub fn registry(&self) -> &Arc<EntityRegistry> {
        &self.registry
    }

    /// Generate a model with positional overrides
    pub fn generate<T: Model>(&self, overrides: &[Value]) -> E2eResult<T> {
        Ok(generate(&mut KnownModels::new(), overrides)?)
    }

    /// One linked project, build configuration and user
    pub fn test_data(&self) -> E2eResult<TestData> {
        Ok(generate_bundle()?)
    }

    /// Create an entity through `client` and record it for cleanup
    pub async fn create<T: Entity>(&self, client: &ApiClient, entity: &T) -> E2eResult<T> {
        let created = client.checked::<T>().create(entity).await?;
        if let Err(e) = self.registry.register_entity(&created) {
            let category = T::CATEGORY;
            warn!(%category, error = %e, "Response has no identity, recording the requested one");
            self.registry.register_entity(entity)?;
        }
        Ok(created)
    }

    pub async fn create_as_superuser<T: Entity>(&self, entity: &T) -> E2eResult<T> {
        self.create(&self.superuser, entity).await
    }

    /// Create `user` and return a client acting as that user
    pub async fn create_user_client(&self, user: &User) -> E2eResult<(User, ApiClient)> {
        let created = self.create_as_superuser(user).await?;
        // the server never echoes passwords back, authenticate with the request
        let client = ApiClient::for_user(&self.config, user)?;
        Ok((created, client))
    }

    /// Delete everything recorded so far
    pub async fn teardown(&self) -> FlushReport {
        let report = self.registry.flush().await;
        info!(
            "Teardown removed {} of {} entities",
            report.deleted, report.attempted
        );
        report
    }
}
