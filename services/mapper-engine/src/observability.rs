//! Observability wiring for the mapper engine service.
//!
//! # Purpose
//! Installs the tracing subscriber and the Prometheus recorder, describes the
//! engine's metric series, and serves the operator endpoints:
//! - `GET /metrics` renders the Prometheus exposition.
//! - `GET /healthz` probes the mapper store.
//!
//! # Notes
//! Initialization is guarded by `OnceLock` so repeated calls in tests are
//! harmless. Log filtering follows `RUST_LOG`, defaulting to `info`.
use crate::store::MapperStore;
use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use serde::Serialize;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::{Arc, OnceLock};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();
static OBS_INIT: OnceLock<()> = OnceLock::new();

pub fn init_observability(service_name: &str) -> PrometheusHandle {
    OBS_INIT.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        let _ = tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_target(false))
            .try_init();
    });
    let handle = install_metrics_recorder();
    tracing::debug!(service = service_name, "observability initialized");
    handle
}

fn describe_metrics() {
    metrics::describe_counter!(
        "mapper_pipeline_runs_total",
        "Claim assembly runs by outcome."
    );
    metrics::describe_counter!(
        "mapper_pipeline_warnings_total",
        "Mappers skipped during claim assembly by warning kind."
    );
    metrics::describe_counter!(
        "mapper_validation_rejections_total",
        "Mapper submissions rejected by validation category."
    );
    metrics::describe_counter!(
        "mapper_store_changes_total",
        "Mapper store mutations by operation."
    );
    metrics::describe_gauge!("mapper_instances_total", "Stored mapper instances.");
}

#[derive(Clone)]
struct OpsState {
    metrics: PrometheusHandle,
    store: Arc<dyn MapperStore>,
}

#[derive(Debug, Serialize)]
struct Health {
    status: &'static str,
    backend: &'static str,
    durable: bool,
}

async fn metrics_handler(State(state): State<OpsState>) -> String {
    state.metrics.render()
}

async fn health_handler(State(state): State<OpsState>) -> (StatusCode, Json<Health>) {
    let (code, status) = match state.store.health_check().await {
        Ok(()) => (StatusCode::OK, "ok"),
        Err(err) => {
            tracing::warn!(error = %err, "mapper store health check failed");
            (StatusCode::SERVICE_UNAVAILABLE, "unavailable")
        }
    };
    let body = Health {
        status,
        backend: state.store.backend_name(),
        durable: state.store.is_durable(),
    };
    (code, Json(body))
}

fn ops_router(metrics: PrometheusHandle, store: Arc<dyn MapperStore>) -> axum::Router {
    axum::Router::new()
        .route("/metrics", get(metrics_handler))
        .route("/healthz", get(health_handler))
        .with_state(OpsState { metrics, store })
}

/// Serve `/metrics` and `/healthz` on `addr` until `shutdown` resolves.
pub async fn serve_ops_with_shutdown<F>(
    metrics: PrometheusHandle,
    store: Arc<dyn MapperStore>,
    addr: SocketAddr,
    shutdown: F,
) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(addr = %listener.local_addr()?, "ops endpoints listening");
    serve_ops_with_listener(metrics, store, listener, shutdown).await
}

async fn serve_ops_with_listener<F>(
    metrics: PrometheusHandle,
    store: Arc<dyn MapperStore>,
    listener: tokio::net::TcpListener,
    shutdown: F,
) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, ops_router(metrics, store).into_make_service())
        .with_graceful_shutdown(shutdown)
        .await
}

fn install_metrics_recorder() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            let handle = PrometheusBuilder::new()
                .install_recorder()
                .expect("install metrics recorder");
            describe_metrics();
            handle
        })
        .clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::MapperRegistry;
    use crate::providers::memory::InMemoryIdentityProvider;
    use crate::store::StoreConfig;
    use crate::store::memory::InMemoryMapperStore;
    use crate::validation::Validator;
    use serial_test::serial;
    use std::time::{Duration, Instant};
    use tokio::sync::oneshot;

    fn build_test_client() -> reqwest::Client {
        reqwest::Client::builder()
            .timeout(Duration::from_secs(1))
            .no_proxy()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .expect("build test client")
    }

    async fn wait_for_listen(addr: SocketAddr) -> Result<(), String> {
        let deadline = Instant::now() + Duration::from_secs(1);
        loop {
            if tokio::net::TcpStream::connect(addr).await.is_ok() {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(format!("server never became ready at {addr}"));
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    fn store() -> Arc<dyn MapperStore> {
        let validator = Validator::new(
            Arc::new(MapperRegistry::with_builtins()),
            Arc::new(InMemoryIdentityProvider::new()),
        );
        Arc::new(InMemoryMapperStore::new(StoreConfig::default(), validator))
    }

    #[test]
    #[serial]
    fn install_metrics_recorder_is_cached() {
        let handle1 = install_metrics_recorder();
        let handle2 = install_metrics_recorder();
        let _ = (handle1.render(), handle2.render());
    }

    #[tokio::test(flavor = "multi_thread")]
    #[serial]
    async fn init_observability_is_idempotent() {
        let handle1 = init_observability("mapper-engine-test");
        let handle2 = init_observability("mapper-engine-test");
        let _ = (handle1.render(), handle2.render());
    }

    #[tokio::test(flavor = "multi_thread")]
    #[serial]
    async fn ops_endpoints_serve_metrics_and_health() {
        let handle = init_observability("mapper-engine-ops-test");
        metrics::counter!("mapper_pipeline_runs_total", "outcome" => "ok").increment(1);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind listener");
        let addr = listener.local_addr().expect("local addr");
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let server = tokio::spawn(serve_ops_with_listener(handle, store(), listener, async move {
            let _ = shutdown_rx.await;
        }));
        wait_for_listen(addr).await.expect("server ready");

        let client = build_test_client();
        let body = client
            .get(format!("http://{addr}/metrics"))
            .send()
            .await
            .expect("GET /metrics")
            .error_for_status()
            .expect("metrics status")
            .text()
            .await
            .expect("metrics body");
        assert!(body.contains("mapper_pipeline_runs_total"));

        let health: serde_json::Value = client
            .get(format!("http://{addr}/healthz"))
            .send()
            .await
            .expect("GET /healthz")
            .error_for_status()
            .expect("health status")
            .json()
            .await
            .expect("health body");
        assert_eq!(health["status"], "ok");
        assert_eq!(health["backend"], "memory");
        assert_eq!(health["durable"], false);

        let _ = shutdown_tx.send(());
        let _ = tokio::time::timeout(Duration::from_secs(1), server)
            .await
            .expect("server shutdown");
    }
}
