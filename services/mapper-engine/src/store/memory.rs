//! In-memory implementation of the mapper store.
//!
//! # Purpose
//! Implements [`MapperStore`] with per-client mapper lists guarded by
//! `tokio::sync::RwLock`. It backs local runs and tests and is the default
//! backend of the service binary.
//!
//! # Durability and consistency
//! - **Not durable**: all state is lost on process restart.
//! - **Per-client exclusion**: every write takes the owning client's write
//!   lock for the whole validate-then-persist step, so two concurrent
//!   submissions with the same name cannot both pass the uniqueness check.
//!   Writes to different clients never contend.
//! - Readers of one client never wait on writers of another.
//!
//! # Change streams
//! Changes are appended to a bounded [`ChangeLog`]; when the window overflows
//! the oldest entries are evicted and slow consumers must re-list.
use super::{ChangeSet, MapperStore, StoreConfig, StoreError, StoreResult};
use crate::model::{
    MapperChange, MapperChangeOp, MapperId, MapperInstance, MapperPatch, NewMapper,
};
use crate::templates;
use crate::validation::Validator;
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Upper bound on the change log's up-front allocation; it grows to
/// `capacity` on demand.
const PREALLOCATED_CHANGES: usize = 1024;

/// Bounded, in-memory append-only log of mapper changes.
///
/// `record()` assigns the next sequence number, appends the change, and evicts
/// the oldest entries once `capacity` is exceeded.
#[derive(Debug)]
struct ChangeLog<T> {
    next_seq: u64,
    capacity: usize,
    items: VecDeque<T>,
}

impl<T> ChangeLog<T> {
    fn new(capacity: usize) -> Self {
        Self {
            next_seq: 0,
            capacity,
            items: VecDeque::with_capacity(capacity.min(PREALLOCATED_CHANGES)),
        }
    }

    fn record(&mut self, item: impl FnOnce(u64) -> T) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.items.push_back(item(seq));
        while self.items.len() > self.capacity {
            self.items.pop_front();
        }
        seq
    }
}

/// One client's mappers in creation order.
type ClientMappers = Arc<RwLock<Vec<MapperInstance>>>;

pub struct InMemoryMapperStore {
    config: StoreConfig,
    validator: Validator,
    /// Client id to that client's mapper list. Entries are never removed so a
    /// writer holding a list handle cannot write into a detached list.
    clients: Arc<RwLock<HashMap<String, ClientMappers>>>,
    /// Mapper id to owning client id.
    index: Arc<RwLock<HashMap<MapperId, String>>>,
    changes: Arc<RwLock<ChangeLog<MapperChange>>>,
}

impl InMemoryMapperStore {
    pub fn new(config: StoreConfig, validator: Validator) -> Self {
        let capacity = config.change_window();
        Self {
            config,
            validator,
            clients: Arc::new(RwLock::new(HashMap::new())),
            index: Arc::new(RwLock::new(HashMap::new())),
            changes: Arc::new(RwLock::new(ChangeLog::new(capacity))),
        }
    }

    fn limit(&self) -> usize {
        self.config.page_limit()
    }

    async fn existing_client(&self, client_id: &str) -> Option<ClientMappers> {
        self.clients.read().await.get(client_id).cloned()
    }

    async fn client(&self, client_id: &str) -> ClientMappers {
        if let Some(mappers) = self.existing_client(client_id).await {
            return mappers;
        }
        self.clients
            .write()
            .await
            .entry(client_id.to_string())
            .or_default()
            .clone()
    }

    async fn owner(&self, id: &MapperId) -> Option<String> {
        self.index.read().await.get(id).cloned()
    }

    async fn record(&self, op: MapperChangeOp, mapper: &MapperInstance, keep_payload: bool) {
        self.changes.write().await.record(|seq| MapperChange {
            seq,
            op,
            id: mapper.id.clone(),
            client_id: mapper.client_id.clone(),
            mapper: keep_payload.then(|| mapper.clone()),
        });
        metrics::counter!("mapper_store_changes_total", "op" => op.as_str()).increment(1);
    }

    async fn publish_total(&self) {
        let total = self.index.read().await.len();
        metrics::gauge!("mapper_instances_total").set(total as f64);
    }
}

#[async_trait]
impl MapperStore for InMemoryMapperStore {
    async fn create(&self, mapper: NewMapper) -> StoreResult<MapperId> {
        let client = self.client(&mapper.client_id).await;
        let mut mappers = client.write().await;
        let candidate = mapper.into_instance(MapperId::generate());
        let created = self.validator.validate(candidate, &mappers)?;
        mappers.push(created.clone());
        self.index
            .write()
            .await
            .insert(created.id.clone(), created.client_id.clone());

        self.record(MapperChangeOp::Created, &created, true).await;
        self.publish_total().await;
        tracing::info!(
            client_id = %created.client_id,
            mapper_id = %created.id,
            type_id = %created.type_id,
            name = %created.name,
            "mapper created"
        );
        Ok(created.id)
    }

    async fn update(&self, id: &MapperId, patch: MapperPatch) -> StoreResult<MapperInstance> {
        let client_id = self
            .owner(id)
            .await
            .ok_or_else(|| StoreError::NotFound(format!("mapper {id}")))?;
        let client = self.client(&client_id).await;
        let mut mappers = client.write().await;
        // A delete may have landed between the index read and the lock.
        let position = mappers
            .iter()
            .position(|mapper| &mapper.id == id)
            .ok_or_else(|| StoreError::NotFound(format!("mapper {id}")))?;
        let merged = patch.apply_to(&mappers[position]);
        let updated = self.validator.validate(merged, &mappers)?;
        mappers[position] = updated.clone();

        self.record(MapperChangeOp::Updated, &updated, true).await;
        tracing::info!(client_id = %client_id, mapper_id = %id, "mapper updated");
        Ok(updated)
    }

    async fn delete(&self, id: &MapperId) -> StoreResult<()> {
        let Some(client_id) = self.owner(id).await else {
            return Ok(());
        };
        let client = self.client(&client_id).await;
        let mut mappers = client.write().await;
        let Some(position) = mappers.iter().position(|mapper| &mapper.id == id) else {
            return Ok(());
        };
        let removed = mappers.remove(position);
        self.index.write().await.remove(id);

        self.record(MapperChangeOp::Deleted, &removed, false).await;
        self.publish_total().await;
        tracing::info!(client_id = %client_id, mapper_id = %id, "mapper deleted");
        Ok(())
    }

    async fn get(&self, id: &MapperId) -> StoreResult<MapperInstance> {
        let not_found = || StoreError::NotFound(format!("mapper {id}"));
        let client_id = self.owner(id).await.ok_or_else(not_found)?;
        let client = self.existing_client(&client_id).await.ok_or_else(not_found)?;
        let mappers = client.read().await;
        mappers
            .iter()
            .find(|mapper| &mapper.id == id)
            .cloned()
            .ok_or_else(not_found)
    }

    async fn list_by_client(&self, client_id: &str) -> StoreResult<Vec<MapperInstance>> {
        match self.existing_client(client_id).await {
            Some(client) => Ok(client.read().await.clone()),
            None => Ok(Vec::new()),
        }
    }

    async fn find_by_name(
        &self,
        client_id: &str,
        name: &str,
    ) -> StoreResult<Option<MapperInstance>> {
        let Some(client) = self.existing_client(client_id).await else {
            return Ok(None);
        };
        let mappers = client.read().await;
        Ok(mappers.iter().rev().find(|mapper| mapper.name == name).cloned())
    }

    async fn delete_client(&self, client_id: &str) -> StoreResult<usize> {
        let Some(client) = self.existing_client(client_id).await else {
            return Ok(0);
        };
        let mut mappers = client.write().await;
        let removed: Vec<MapperInstance> = mappers.drain(..).collect();
        {
            let mut index = self.index.write().await;
            for mapper in &removed {
                index.remove(&mapper.id);
            }
        }

        for mapper in &removed {
            self.record(MapperChangeOp::Deleted, mapper, false).await;
        }
        self.publish_total().await;
        tracing::info!(client_id = %client_id, removed = removed.len(), "client mappers deleted");
        Ok(removed.len())
    }

    async fn add_builtins(&self, client_id: &str, names: &[&str]) -> StoreResult<Vec<MapperId>> {
        let submissions = names
            .iter()
            .map(|name| {
                templates::instantiate(name, client_id)
                    .ok_or_else(|| StoreError::NotFound(format!("builtin mapper {name}")))
            })
            .collect::<StoreResult<Vec<NewMapper>>>()?;

        let client = self.client(client_id).await;
        let mut mappers = client.write().await;
        let mut staged = mappers.clone();
        let mut added = Vec::with_capacity(submissions.len());
        for submission in submissions {
            let candidate = submission.into_instance(MapperId::generate());
            let valid = self.validator.validate(candidate, &staged)?;
            staged.push(valid.clone());
            added.push(valid);
        }
        *mappers = staged;
        {
            let mut index = self.index.write().await;
            for mapper in &added {
                index.insert(mapper.id.clone(), mapper.client_id.clone());
            }
        }

        for mapper in &added {
            self.record(MapperChangeOp::Created, mapper, true).await;
        }
        self.publish_total().await;
        tracing::info!(client_id = %client_id, added = added.len(), "builtin mappers added");
        Ok(added.into_iter().map(|mapper| mapper.id).collect())
    }

    async fn changes(&self, since: u64) -> StoreResult<ChangeSet<MapperChange>> {
        // Inclusive of `since`; callers older than the window get a partial page.
        let guard = self.changes.read().await;
        let items = guard
            .items
            .iter()
            .filter(|item| item.seq >= since)
            .take(self.limit())
            .cloned()
            .collect();
        Ok(ChangeSet {
            items,
            next_seq: guard.next_seq,
        })
    }

    async fn health_check(&self) -> StoreResult<()> {
        Ok(())
    }

    fn is_durable(&self) -> bool {
        false
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
