mod consumer;
mod errors;
mod handlers;
mod lock_registry;
mod models;
mod repository;
mod saga;

use crate::handlers::{AppSaga, AppState};
use crate::repository::PaymentStore;
use axum::{
    routing::{get, post},
    Router,
};
use saga_common::bus::{Consumer, Publisher};
use saga_common::config::{self, DbConfig, KafkaConfig};
use saga_common::{topics, RetryConfig};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    config::load_dotenv();
    saga_common::telemetry::init("payment_orchestrator=debug,tower_http=debug");

    let db_config = DbConfig::from_env();
    let kafka_config = KafkaConfig::from_env("KAFKA_GROUP_ID", "payment-orchestrator-group");
    let retry_config = RetryConfig::from_env();
    let server_port = config::app_port("3000");

    tracing::info!("Starting Payment Orchestrator");
    tracing::info!(host = %db_config.host, name = %db_config.name, "Database configuration");
    tracing::info!(brokers = %kafka_config.brokers, "Kafka configuration");

    tracing::info!("Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&db_config.url())
        .await?;

    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("Migrations completed successfully");

    let publish_topics = vec![
        topics::PAYMENTS_CREATED.to_string(),
        topics::WALLET_DEBIT_REQUESTED.to_string(),
        topics::PAYMENTS_DLQ.to_string(),
    ];
    let publisher = Arc::new(Publisher::new(
        &kafka_config.brokers,
        &publish_topics,
        retry_config,
    )?);

    let repo = Arc::new(PaymentStore::new(pool));
    let saga: Arc<AppSaga> = Arc::new(saga::SagaService::new(repo, publisher.clone()));

    let subscriber_topics = vec![
        topics::PAYMENTS_CHECKED.to_string(),
        topics::WALLET_FUNDS_VERIFIED.to_string(),
    ];
    let bus_consumer = Consumer::new(
        &kafka_config.brokers,
        &kafka_config.group_id,
        &subscriber_topics,
        publisher,
        retry_config,
        topics::PAYMENTS_DLQ,
    )?;

    let cancel = CancellationToken::new();

    let consumer_saga = saga.clone();
    let mut consumer_tasks = bus_consumer.listen(cancel.clone(), move |topic, payload| {
        let saga = consumer_saga.clone();
        async move { consumer::handle_message(saga, topic, payload).await }
    });

    let state = AppState { saga };

    let app = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/payments", post(handlers::create_payment))
        .route("/payments/:id", get(handlers::get_payment))
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    let addr = format!("0.0.0.0:{server_port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(addr = %addr, "Payment Orchestrator listening");

    let shutdown_cancel = cancel.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            wait_for_shutdown_signal().await;
            tracing::info!("shutdown signal received, cancelling consumer workers");
            shutdown_cancel.cancel();
        })
        .await?;

    while consumer_tasks.join_next().await.is_some() {}

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
