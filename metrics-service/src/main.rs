mod consumer;
mod handlers;
mod metrics;

use axum::{routing::get, Router};
use saga_common::bus::{Consumer, Publisher};
use saga_common::config::{self, KafkaConfig};
use saga_common::{topics, RetryConfig};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    config::load_dotenv();
    saga_common::telemetry::init("metrics_service=debug,tower_http=debug");

    let kafka_config = KafkaConfig::from_env("KAFKA_SUBSCRIBER_GROUP_ID", "metrics-service");
    let retry_config = RetryConfig::from_env();
    let server_port = config::app_port("8080");

    tracing::info!("Starting Metrics Service");
    tracing::info!(brokers = %kafka_config.brokers, "Kafka configuration");

    let prometheus_handle = metrics::install_recorder()?;

    // No DLQ: metrics-service is read-only, so `publish_topics` is empty
    // and `handle_message` never returns an error that would need one.
    let publisher = Arc::new(Publisher::new(&kafka_config.brokers, &[], retry_config)?);

    let subscriber_topics = vec![
        topics::PAYMENTS_CREATED.to_string(),
        topics::PAYMENTS_CHECKED.to_string(),
        topics::WALLET_RESPONSE.to_string(),
        topics::WALLET_DEBIT_REQUESTED.to_string(),
    ];
    let bus_consumer = Consumer::new(
        &kafka_config.brokers,
        &kafka_config.group_id,
        &subscriber_topics,
        publisher,
        retry_config,
        "metrics.unused-dlq",
    )?;

    let cancel = CancellationToken::new();

    let mut tasks = bus_consumer.listen(cancel.clone(), move |topic, payload| {
        consumer::handle_message(topic, payload)
    });

    let app = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/metrics", get(handlers::metrics_endpoint))
        .with_state(prometheus_handle)
        .layer(TraceLayer::new_for_http());

    let addr = format!("0.0.0.0:{server_port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(addr = %addr, "Metrics Service listening");

    let shutdown_cancel = cancel.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            wait_for_shutdown_signal().await;
            tracing::info!("shutdown signal received, cancelling consumer workers");
            shutdown_cancel.cancel();
        })
        .await?;

    while tasks.join_next().await.is_some() {}

    tracing::info!("Metrics service stopped");
    Ok(())
}

async fn wait_for_shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
