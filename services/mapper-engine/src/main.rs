//! Protocol mapper engine service entry point.
//!
//! # Purpose
//! Loads configuration, installs observability, builds the engine over the
//! seeded in-memory realm, runs the seed's issuance previews, and serves
//! `/metrics` and `/healthz` until shutdown.
use anyhow::Context;
use mapper_engine::app::MapperEngine;
use mapper_engine::config::EngineConfig;
use mapper_engine::observability;
use mapper_engine::seed::SeedDocument;
use std::future::Future;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = EngineConfig::from_env_or_yaml().context("mapper engine config")?;
    run_with_shutdown(config, async {
        let _ = tokio::signal::ctrl_c().await;
    })
    .await
}

async fn run_with_shutdown<F>(config: EngineConfig, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let metrics_handle = observability::init_observability("mapper-engine");
    let seed = match &config.seed_path {
        Some(path) => SeedDocument::load(path)?,
        None => SeedDocument::default(),
    };
    let engine = build_engine(&config, seed).await?;
    tracing::info!(
        backend = engine.store.backend_name(),
        durable = engine.store.is_durable(),
        "mapper engine ready"
    );

    observability::serve_ops_with_shutdown(
        metrics_handle,
        engine.store.clone(),
        config.metrics_bind,
        shutdown,
    )
    .await
    .context("serve ops endpoints")?;
    tracing::info!("mapper engine stopped");
    Ok(())
}

async fn build_engine(config: &EngineConfig, seed: SeedDocument) -> anyhow::Result<MapperEngine> {
    let engine = MapperEngine::in_memory(config, seed.realm);
    let loaded = engine.load_mappers(seed.mappers).await?;
    tracing::info!(mappers = loaded, "seed mappers loaded");

    for preview in &seed.previews {
        let claims = engine
            .preview(preview)
            .await
            .with_context(|| format!("preview {} for {}", preview.client_id, preview.username))?;
        tracing::info!(
            client_id = %preview.client_id,
            username = %preview.username,
            id_token = %serde_json::to_string(&claims.id_token)?,
            access_token = %serde_json::to_string(&claims.access_token)?,
            userinfo = %serde_json::to_string(&claims.userinfo)?,
            warnings = claims.warnings.len(),
            "claims preview"
        );
        for warning in &claims.warnings {
            tracing::warn!(
                mapper = %warning.mapper_name,
                kind = warning.kind.as_str(),
                message = %warning.message,
                "preview warning"
            );
        }
    }
    Ok(engine)
}
