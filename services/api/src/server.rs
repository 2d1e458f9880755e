use crate::cli::ServeArgs;
use crate::infra::{in_memory_service, AppState};
use crate::routes::with_loyalty_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use loyalty_ledger::access::AccessPolicy;
use loyalty_ledger::config::AppConfig;
use loyalty_ledger::error::AppError;
use loyalty_ledger::telemetry;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let policy: Arc<dyn AccessPolicy> = Arc::from(config.access_mode.policy());
    let service = Arc::new(in_memory_service(policy, config.points.clone()));

    let app = with_loyalty_routes(service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        ?config.access_mode,
        grams_per_point = %config.points.grams_per_point,
        %addr,
        "loyalty ledger ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
