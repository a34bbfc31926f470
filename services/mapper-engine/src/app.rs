//! Engine wiring shared by the binary and the scenario tests.
use crate::config::EngineConfig;
use crate::model::NewMapper;
use crate::pipeline::{AssembledClaims, ClaimPipeline};
use crate::providers::UserSession;
use crate::providers::memory::InMemoryIdentityProvider;
use crate::registry::MapperRegistry;
use crate::seed::PreviewRequest;
use crate::store::memory::InMemoryMapperStore;
use crate::store::{MapperStore, StoreConfig};
use crate::validation::Validator;
use anyhow::Context;
use std::sync::Arc;

#[derive(Clone)]
pub struct MapperEngine {
    pub registry: Arc<MapperRegistry>,
    pub realm: Arc<InMemoryIdentityProvider>,
    pub store: Arc<dyn MapperStore>,
    pub pipeline: ClaimPipeline,
}

impl MapperEngine {
    /// Engine over the built-in mapper types, an in-memory store, and `realm`.
    pub fn in_memory(config: &EngineConfig, realm: InMemoryIdentityProvider) -> Self {
        let registry = Arc::new(MapperRegistry::with_builtins());
        let realm = Arc::new(realm);
        let store_config = StoreConfig {
            changes_limit: config.changes_limit,
            change_retention_max_rows: config.change_retention_max_rows,
        };
        let validator = Validator::new(registry.clone(), realm.clone());
        let store: Arc<dyn MapperStore> =
            Arc::new(InMemoryMapperStore::new(store_config, validator));
        let pipeline = ClaimPipeline::new(
            store.clone(),
            registry.clone(),
            realm.clone(),
            realm.clone(),
            config.transform_timeout,
        );
        Self {
            registry,
            realm,
            store,
            pipeline,
        }
    }

    /// Create `mappers` in order, stopping at the first rejection.
    pub async fn load_mappers(&self, mappers: Vec<NewMapper>) -> anyhow::Result<usize> {
        let count = mappers.len();
        for mapper in mappers {
            let label = format!("{}/{}", mapper.client_id, mapper.name);
            self.store
                .create(mapper)
                .await
                .with_context(|| format!("create seed mapper {label}"))?;
        }
        Ok(count)
    }

    /// Assemble claims for a user of the in-memory realm.
    ///
    /// Without a session id the user's first session is used, or an empty
    /// session when the user has none.
    pub async fn preview(&self, request: &PreviewRequest) -> anyhow::Result<AssembledClaims> {
        let user = self
            .realm
            .user_by_username(&request.username)
            .with_context(|| format!("unknown user {}", request.username))?;
        let session = match &request.session_id {
            Some(session_id) => self
                .realm
                .session_record(session_id)
                .with_context(|| format!("unknown session {session_id}"))?
                .session(),
            None => self
                .realm
                .sessions
                .iter()
                .find(|session| session.user_id == user.id)
                .map(|record| record.session())
                .unwrap_or_else(|| UserSession {
                    session_id: String::new(),
                    user_id: user.id.clone(),
                }),
        };
        let claims = self
            .pipeline
            .assemble(&request.client_id, &user.principal(), &session)
            .await?;
        Ok(claims)
    }
}
