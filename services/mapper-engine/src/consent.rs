//! Consent collection for interactive flows.
//!
//! The aggregator lists a client's consent-requiring mappers in store order;
//! a [`ConsentPrompt`] collaborator shows them to the end user and reports the
//! decision back.
use crate::store::{MapperStore, StoreResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsentItem {
    pub name: String,
    pub consent_text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConsentDecision {
    Granted,
    Declined,
}

#[async_trait]
pub trait ConsentPrompt: Send + Sync {
    /// Ask the end user to approve `items` for `client_id`.
    async fn request(&self, client_id: &str, items: &[ConsentItem])
    -> anyhow::Result<ConsentDecision>;
}

#[derive(Clone)]
pub struct ConsentAggregator {
    store: Arc<dyn MapperStore>,
}

impl ConsentAggregator {
    pub fn new(store: Arc<dyn MapperStore>) -> Self {
        Self { store }
    }

    pub async fn collect_consent(&self, client_id: &str) -> StoreResult<Vec<ConsentItem>> {
        let items = self
            .store
            .list_by_client(client_id)
            .await?
            .into_iter()
            .filter(|mapper| mapper.consent_required)
            .map(|mapper| ConsentItem {
                consent_text: mapper.consent_text.unwrap_or_default(),
                name: mapper.name,
            })
            .collect();
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NewMapper;
    use crate::providers::memory::InMemoryIdentityProvider;
    use crate::registry::MapperRegistry;
    use crate::store::StoreConfig;
    use crate::store::memory::InMemoryMapperStore;
    use crate::transform::builtin;
    use crate::validation::Validator;

    #[tokio::test]
    async fn collects_consent_items_in_store_order() {
        let realm = InMemoryIdentityProvider::new().with_realm_role("offline_access");
        let validator = Validator::new(Arc::new(MapperRegistry::with_builtins()), Arc::new(realm));
        let store = Arc::new(InMemoryMapperStore::new(StoreConfig::default(), validator));
        for (name, consent) in [("b", Some("B text")), ("plain", None), ("a", Some("A text"))] {
            let mut mapper = NewMapper::new("app", name, builtin::HARDCODED_ROLE)
                .with_config("role", "offline_access");
            if let Some(text) = consent {
                mapper = mapper.with_consent(text);
            }
            store.create(mapper).await.expect("create");
        }

        let aggregator = ConsentAggregator::new(store);
        let items = aggregator.collect_consent("app").await.expect("consent");
        assert_eq!(
            items,
            vec![
                ConsentItem {
                    name: "b".to_string(),
                    consent_text: "B text".to_string(),
                },
                ConsentItem {
                    name: "a".to_string(),
                    consent_text: "A text".to_string(),
                },
            ]
        );
        assert!(aggregator.collect_consent("none").await.expect("empty").is_empty());
    }
}
