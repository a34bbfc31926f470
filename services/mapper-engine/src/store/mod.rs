//! Mapper instance store contract.
//!
//! # Purpose
//! The store owns every client's protocol mapper instances. All writes run
//! validation first and are serialized per client so name uniqueness holds
//! under concurrent submissions. Reads are immediately consistent with
//! completed writes.
//!
//! # Change streams
//! Every create/update/delete is appended to a bounded change log. Consumers
//! poll `changes(since)` and fall back to `list_by_client` when they have
//! fallen behind the retention window.
use crate::model::{MapperChange, MapperId, MapperInstance, MapperPatch, NewMapper};
use crate::validation::ValidationError;
use async_trait::async_trait;
use thiserror::Error;

pub mod memory;

#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub changes_limit: u64,
    pub change_retention_max_rows: Option<i64>,
}

impl StoreConfig {
    /// Change-log retention: at least one page, more if configured.
    /// Negative retention counts as zero; oversized values saturate.
    pub fn change_window(&self) -> usize {
        let retention = self
            .change_retention_max_rows
            .map_or(self.changes_limit, |rows| u64::try_from(rows).unwrap_or(0));
        usize::try_from(retention.max(self.changes_limit)).unwrap_or(usize::MAX)
    }

    /// Largest page `changes()` returns.
    pub fn page_limit(&self) -> usize {
        usize::try_from(self.changes_limit).unwrap_or(usize::MAX)
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            changes_limit: crate::config::DEFAULT_CHANGES_LIMIT,
            change_retention_max_rows: Some(crate::config::DEFAULT_CHANGE_RETENTION_MAX_ROWS),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChangeSet<T> {
    pub items: Vec<T>,
    pub next_seq: u64,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait MapperStore: Send + Sync {
    /// Validate and persist a new mapper, returning its assigned id.
    async fn create(&self, mapper: NewMapper) -> StoreResult<MapperId>;
    /// Apply `patch` and re-validate the merged result.
    async fn update(&self, id: &MapperId, patch: MapperPatch) -> StoreResult<MapperInstance>;
    /// Remove a mapper. Unknown ids are not an error.
    async fn delete(&self, id: &MapperId) -> StoreResult<()>;
    async fn get(&self, id: &MapperId) -> StoreResult<MapperInstance>;
    /// A client's mappers in creation order.
    async fn list_by_client(&self, client_id: &str) -> StoreResult<Vec<MapperInstance>>;
    async fn find_by_name(&self, client_id: &str, name: &str)
    -> StoreResult<Option<MapperInstance>>;
    /// Remove every mapper of a client, returning how many were removed.
    async fn delete_client(&self, client_id: &str) -> StoreResult<usize>;
    /// Add the named templates to a client, all or none.
    async fn add_builtins(&self, client_id: &str, names: &[&str]) -> StoreResult<Vec<MapperId>>;
    async fn changes(&self, since: u64) -> StoreResult<ChangeSet<MapperChange>>;

    async fn health_check(&self) -> StoreResult<()>;
    fn is_durable(&self) -> bool;
    fn backend_name(&self) -> &'static str;
}
