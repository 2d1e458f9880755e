use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Extension, Json, Router};
use loyalty_ledger::ledger::SalesLedger;
use loyalty_ledger::points::PointsRepository;
use loyalty_ledger::router::loyalty_router;
use loyalty_ledger::service::LoyaltyService;
use serde_json::json;
use std::sync::atomic::Ordering;
use std::sync::Arc;

pub(crate) fn with_loyalty_routes<S>(service: Arc<LoyaltyService<S>>) -> Router
where
    S: SalesLedger + PointsRepository + 'static,
{
    loyalty_router(service)
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    if state.readiness.load(Ordering::Relaxed) {
        (StatusCode::OK, Json(json!({ "status": "ready" })))
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "initializing" })),
        )
    }
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::in_memory_service;
    use axum::body::Body;
    use axum::http::{Method, Request};
    use loyalty_ledger::access::{AllowAll, ReadOnly};
    use loyalty_ledger::config::PointsConfig;
    use metrics_exporter_prometheus::PrometheusBuilder;
    use std::sync::atomic::AtomicBool;
    use tower::ServiceExt;

    fn app_state(ready: bool) -> AppState {
        AppState {
            readiness: Arc::new(AtomicBool::new(ready)),
            metrics: Arc::new(PrometheusBuilder::new().build_recorder().handle()),
        }
    }

    fn open_app(ready: bool) -> Router {
        let service = Arc::new(in_memory_service(
            Arc::new(AllowAll),
            PointsConfig::default(),
        ));
        with_loyalty_routes(service).layer(Extension(app_state(ready)))
    }

    async fn status_of(app: Router, method: Method, uri: &str, body: &str) -> StatusCode {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("request");
        app.oneshot(request).await.expect("response").status()
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let Json(body) = healthcheck().await;
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn readiness_follows_flag() {
        assert_eq!(
            status_of(open_app(false), Method::GET, "/ready", "").await,
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            status_of(open_app(true), Method::GET, "/ready", "").await,
            StatusCode::OK
        );
    }

    #[tokio::test]
    async fn metrics_render_as_prometheus_text() {
        let response = open_app(true)
            .oneshot(
                Request::builder()
                    .uri("/metrics")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/plain; version=0.0.4"
        );
    }

    #[tokio::test]
    async fn ledger_routes_are_mounted_alongside_health_checks() {
        let app = open_app(true);
        assert_eq!(
            status_of(
                app.clone(),
                Method::PUT,
                "/api/v1/customers/C-1",
                r#"{"net_weight": "80"}"#
            )
            .await,
            StatusCode::CREATED
        );
        assert_eq!(
            status_of(app.clone(), Method::POST, "/api/v1/batch/recompute", "").await,
            StatusCode::OK
        );
        assert_eq!(
            status_of(
                app,
                Method::POST,
                "/api/v1/customers/C-1/claims",
                r#"{"amount": "8"}"#
            )
            .await,
            StatusCode::OK
        );
    }

    #[tokio::test]
    async fn read_only_mode_forbids_claims() {
        let service = Arc::new(in_memory_service(
            Arc::new(ReadOnly),
            PointsConfig::default(),
        ));
        let app = with_loyalty_routes(service).layer(Extension(app_state(true)));
        assert_eq!(
            status_of(
                app,
                Method::POST,
                "/api/v1/customers/C-1/claims",
                r#"{"amount": "1"}"#
            )
            .await,
            StatusCode::FORBIDDEN
        );
    }
}
