//! Claim assembly for token issuance.
//!
//! # Purpose
//! Turns a client's stored mapper instances into the claim sets of one
//! token-issuance request. A run walks the stages
//! `collect_instances -> resolve_types -> evaluate_each -> merge -> done`.
//!
//! # Key invariants
//! - Mapper failures are isolated: an unresolvable type, a coercion failure, a
//!   provider error, or a transform exceeding its time budget drops only that
//!   mapper's contributions and is reported as a [`MapperWarning`].
//! - Transforms run concurrently but contributions merge in store listing
//!   order, so a later mapper overwrites an earlier one at the same path.
//! - Cancellation and declined consent discard the whole result; no partial
//!   claim set is ever returned.
use crate::consent::{ConsentAggregator, ConsentDecision, ConsentPrompt};
use crate::model::{MapperId, MapperInstance};
use crate::providers::{IdentityProvider, Principal, RoleCatalog, UserSession};
use crate::registry::{MapperRegistry, RegisteredType};
use crate::store::{MapperStore, StoreError};
use crate::transform::{MapperConfig, TransformContext, TransformError};
use mapper_claims::{ClaimError, ClaimSet, ClaimTarget};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    CollectInstances,
    ResolveTypes,
    EvaluateEach,
    Merge,
    Done,
}

impl PipelineStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStage::CollectInstances => "collect_instances",
            PipelineStage::ResolveTypes => "resolve_types",
            PipelineStage::EvaluateEach => "evaluate_each",
            PipelineStage::Merge => "merge",
            PipelineStage::Done => "done",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    UnknownType,
    Coercion,
    Timeout,
    TransformFailed,
}

impl WarningKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            WarningKind::UnknownType => "unknown_type",
            WarningKind::Coercion => "coercion",
            WarningKind::Timeout => "timeout",
            WarningKind::TransformFailed => "transform_failed",
        }
    }
}

/// Non-fatal problem with one mapper during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MapperWarning {
    pub mapper_id: MapperId,
    pub mapper_name: String,
    pub type_id: String,
    pub kind: WarningKind,
    pub message: String,
}

impl MapperWarning {
    fn new(mapper: &MapperInstance, kind: WarningKind, message: String) -> Self {
        Self {
            mapper_id: mapper.id.clone(),
            mapper_name: mapper.name.clone(),
            type_id: mapper.type_id.clone(),
            kind,
            message,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct AssembledClaims {
    pub id_token: ClaimSet,
    pub access_token: ClaimSet,
    pub userinfo: ClaimSet,
    pub warnings: Vec<MapperWarning>,
}

impl AssembledClaims {
    pub fn claims(&self, target: ClaimTarget) -> &ClaimSet {
        match target {
            ClaimTarget::IdToken => &self.id_token,
            ClaimTarget::AccessToken => &self.access_token,
            ClaimTarget::Userinfo => &self.userinfo,
        }
    }

    fn claims_mut(&mut self, target: ClaimTarget) -> &mut ClaimSet {
        match target {
            ClaimTarget::IdToken => &mut self.id_token,
            ClaimTarget::AccessToken => &mut self.access_token,
            ClaimTarget::Userinfo => &mut self.userinfo,
        }
    }
}

#[derive(Debug, Error)]
pub enum IssuanceError {
    #[error("failed to load mappers: {0}")]
    Store(#[from] StoreError),
    #[error("consent declined for client {client_id}")]
    ConsentDeclined { client_id: String },
    #[error("consent prompt failed: {0}")]
    ConsentPrompt(anyhow::Error),
    #[error("issuance cancelled")]
    Cancelled,
}

impl IssuanceError {
    fn outcome(&self) -> &'static str {
        match self {
            IssuanceError::Store(_) | IssuanceError::ConsentPrompt(_) => "error",
            IssuanceError::ConsentDeclined { .. } => "declined",
            IssuanceError::Cancelled => "cancelled",
        }
    }
}

pub type IssuanceResult<T> = Result<T, IssuanceError>;

#[derive(Clone)]
pub struct ClaimPipeline {
    store: Arc<dyn MapperStore>,
    registry: Arc<MapperRegistry>,
    identity: Arc<dyn IdentityProvider>,
    roles: Arc<dyn RoleCatalog>,
    consent: ConsentAggregator,
    transform_timeout: Duration,
}

impl ClaimPipeline {
    pub fn new(
        store: Arc<dyn MapperStore>,
        registry: Arc<MapperRegistry>,
        identity: Arc<dyn IdentityProvider>,
        roles: Arc<dyn RoleCatalog>,
        transform_timeout: Duration,
    ) -> Self {
        Self {
            consent: ConsentAggregator::new(store.clone()),
            store,
            registry,
            identity,
            roles,
            transform_timeout,
        }
    }

    pub fn consent(&self) -> &ConsentAggregator {
        &self.consent
    }

    /// Assemble the claims of every token target for one issuance.
    pub async fn assemble(
        &self,
        client_id: &str,
        principal: &Principal,
        session: &UserSession,
    ) -> IssuanceResult<AssembledClaims> {
        record_outcome(self.run(client_id, principal, session).await)
    }

    /// Like [`ClaimPipeline::assemble`], abandoned as soon as `cancel` fires.
    pub async fn assemble_with_cancellation(
        &self,
        client_id: &str,
        principal: &Principal,
        session: &UserSession,
        cancel: &CancellationToken,
    ) -> IssuanceResult<AssembledClaims> {
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(IssuanceError::Cancelled),
            result = self.run(client_id, principal, session) => result,
        };
        if matches!(result, Err(IssuanceError::Cancelled)) {
            tracing::info!(client_id = %client_id, "claim assembly cancelled");
        }
        record_outcome(result)
    }

    /// Run the consent prompt for the client's consent-requiring mappers,
    /// then assemble. A declined prompt aborts issuance.
    pub async fn assemble_with_consent(
        &self,
        client_id: &str,
        principal: &Principal,
        session: &UserSession,
        prompt: &dyn ConsentPrompt,
    ) -> IssuanceResult<AssembledClaims> {
        let items = match self.consent.collect_consent(client_id).await {
            Ok(items) => items,
            Err(err) => return record_outcome(Err(err.into())),
        };
        if !items.is_empty() {
            let decision = match prompt.request(client_id, &items).await {
                Ok(decision) => decision,
                Err(err) => return record_outcome(Err(IssuanceError::ConsentPrompt(err))),
            };
            if decision == ConsentDecision::Declined {
                tracing::info!(client_id = %client_id, items = items.len(), "consent declined");
                return record_outcome(Err(IssuanceError::ConsentDeclined {
                    client_id: client_id.to_string(),
                }));
            }
        }
        self.assemble(client_id, principal, session).await
    }

    async fn run(
        &self,
        client_id: &str,
        principal: &Principal,
        session: &UserSession,
    ) -> IssuanceResult<AssembledClaims> {
        let mut assembled = AssembledClaims::default();

        enter(client_id, PipelineStage::CollectInstances);
        let instances = self.store.list_by_client(client_id).await?;

        enter(client_id, PipelineStage::ResolveTypes);
        let mut resolved: Vec<(&MapperInstance, RegisteredType)> =
            Vec::with_capacity(instances.len());
        for instance in &instances {
            match self.registry.lookup(&instance.type_id) {
                Ok(registered) => resolved.push((instance, registered)),
                Err(err) => warn(
                    &mut assembled,
                    MapperWarning::new(instance, WarningKind::UnknownType, err.to_string()),
                ),
            }
        }

        enter(client_id, PipelineStage::EvaluateEach);
        let ctx = TransformContext {
            client_id,
            principal,
            session,
            identity: self.identity.as_ref(),
            roles: self.roles.as_ref(),
        };
        let budget = self.transform_timeout;
        let outcomes = futures::future::join_all(resolved.iter().map(|(instance, registered)| {
            async move {
                let config = MapperConfig::new(&registered.descriptor, &instance.config);
                tokio::time::timeout(budget, registered.transform.transform(&config, &ctx)).await
            }
        }))
        .await;

        enter(client_id, PipelineStage::Merge);
        for ((instance, _), outcome) in resolved.iter().zip(outcomes) {
            match outcome {
                Ok(Ok(contributions)) => {
                    for contribution in &contributions {
                        assembled
                            .claims_mut(contribution.target)
                            .apply_contribution(contribution);
                    }
                }
                Ok(Err(err)) => {
                    let kind = match &err {
                        TransformError::Claim(
                            ClaimError::Coercion { .. } | ClaimError::UnsupportedJsonType(_),
                        ) => WarningKind::Coercion,
                        _ => WarningKind::TransformFailed,
                    };
                    warn(&mut assembled, MapperWarning::new(instance, kind, err.to_string()));
                }
                Err(_) => warn(
                    &mut assembled,
                    MapperWarning::new(
                        instance,
                        WarningKind::Timeout,
                        format!("transform exceeded {}ms", budget.as_millis()),
                    ),
                ),
            }
        }

        enter(client_id, PipelineStage::Done);
        Ok(assembled)
    }
}

fn enter(client_id: &str, stage: PipelineStage) {
    tracing::debug!(client_id = %client_id, stage = stage.as_str(), "claim pipeline stage");
}

fn warn(assembled: &mut AssembledClaims, warning: MapperWarning) {
    metrics::counter!("mapper_pipeline_warnings_total", "kind" => warning.kind.as_str())
        .increment(1);
    tracing::warn!(
        mapper_id = %warning.mapper_id,
        type_id = %warning.type_id,
        kind = warning.kind.as_str(),
        message = %warning.message,
        "mapper skipped"
    );
    assembled.warnings.push(warning);
}

fn record_outcome(result: IssuanceResult<AssembledClaims>) -> IssuanceResult<AssembledClaims> {
    let outcome = match &result {
        Ok(_) => "ok",
        Err(err) => err.outcome(),
    };
    metrics::counter!("mapper_pipeline_runs_total", "outcome" => outcome).increment(1);
    result
}
