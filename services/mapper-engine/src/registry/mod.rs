//! Mapper type registry.
//!
//! # Purpose
//! Maps type ids to their descriptor and transform. The store consults it to
//! validate submissions; the pipeline consults it to resolve each stored
//! instance into something it can run.
//!
//! # Key invariants
//! - Type ids are unique; registering an existing id fails.
//! - Listing preserves registration order.
//! - Deregistering a type leaves existing instances of it in the store. The
//!   pipeline skips them with an `UnknownType` warning.
use crate::model::{MapperTypeDescriptor, Protocol};
use crate::transform::{BuiltinMapper, MapperTransform};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("mapper type already registered: {0}")]
    DuplicateType(String),
    #[error("unknown mapper type: {0}")]
    UnknownType(String),
}

/// A registered type: schema plus behavior.
#[derive(Clone)]
pub struct RegisteredType {
    pub descriptor: Arc<MapperTypeDescriptor>,
    pub transform: Arc<dyn MapperTransform>,
}

impl std::fmt::Debug for RegisteredType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredType")
            .field("type_id", &self.descriptor.type_id)
            .finish_non_exhaustive()
    }
}

#[derive(Default)]
struct RegistryState {
    order: Vec<String>,
    types: HashMap<String, RegisteredType>,
}

#[derive(Default)]
pub struct MapperRegistry {
    state: RwLock<RegistryState>,
}

impl MapperRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with every built-in OIDC mapper type.
    pub fn with_builtins() -> Self {
        let registry = Self::new();
        for mapper in BuiltinMapper::ALL {
            let registered = registry.register(mapper.descriptor(), Arc::new(mapper));
            debug_assert!(
                registered.is_ok(),
                "built-in mapper type registered twice: {}",
                mapper.type_id()
            );
            if let Err(err) = registered {
                tracing::error!(error = %err, "built-in mapper type skipped");
            }
        }
        registry
    }

    pub fn register(
        &self,
        descriptor: MapperTypeDescriptor,
        transform: Arc<dyn MapperTransform>,
    ) -> Result<(), RegistryError> {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        if state.types.contains_key(&descriptor.type_id) {
            return Err(RegistryError::DuplicateType(descriptor.type_id));
        }
        let type_id = descriptor.type_id.clone();
        state.order.push(type_id.clone());
        state.types.insert(
            type_id.clone(),
            RegisteredType {
                descriptor: Arc::new(descriptor),
                transform,
            },
        );
        tracing::debug!(type_id = %type_id, "mapper type registered");
        Ok(())
    }

    /// Retire a type. Returns whether it was registered.
    pub fn deregister(&self, type_id: &str) -> bool {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        if state.types.remove(type_id).is_none() {
            return false;
        }
        state.order.retain(|id| id != type_id);
        tracing::info!(type_id = %type_id, "mapper type deregistered");
        true
    }

    pub fn lookup(&self, type_id: &str) -> Result<RegisteredType, RegistryError> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        state
            .types
            .get(type_id)
            .cloned()
            .ok_or_else(|| RegistryError::UnknownType(type_id.to_string()))
    }

    pub fn descriptor(&self, type_id: &str) -> Option<Arc<MapperTypeDescriptor>> {
        self.lookup(type_id).ok().map(|registered| registered.descriptor)
    }

    pub fn contains(&self, type_id: &str) -> bool {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        state.types.contains_key(type_id)
    }

    pub fn list_by_protocol(&self, protocol: Protocol) -> Vec<Arc<MapperTypeDescriptor>> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        state
            .order
            .iter()
            .filter_map(|type_id| state.types.get(type_id))
            .filter(|registered| registered.descriptor.protocol == protocol)
            .map(|registered| registered.descriptor.clone())
            .collect()
    }
}
