use axum::extract::State;
use axum::http::StatusCode;
use metrics_exporter_prometheus::PrometheusHandle;

pub async fn health_check() -> (StatusCode, &'static str) {
    (StatusCode::OK, "OK")
}

pub async fn metrics_endpoint(State(handle): State<PrometheusHandle>) -> String {
    handle.render()
}
