use axum::{routing::get, Router};
use saga_common::bus::{Consumer, Publisher};
use saga_common::config::{self, DbConfig, KafkaConfig};
use saga_common::{topics, RetryConfig};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use wallet_service::repository::WalletStore;
use wallet_service::service::WalletService;
use wallet_service::{consumer, handlers, seed};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    config::load_dotenv();
    saga_common::telemetry::init("wallet_service=debug,tower_http=debug");

    let db_config = DbConfig::from_env();
    let kafka_config = KafkaConfig::from_env("KAFKA_WALLET_GROUP_ID", "wallet-service");
    let retry_config = RetryConfig::from_env();
    let server_port = config::app_port("3002");

    tracing::info!("Starting Wallet Service");
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

    let store = WalletStore::new(pool);

    if config::is_local_env() {
        if let Err(e) = seed::seed_wallets(&store).await {
            tracing::warn!(error = %e, "failed to seed wallets");
        }
    }

    let wallet_service = Arc::new(WalletService::new(store));

    let publish_topics = vec![
        topics::WALLET_FUNDS_VERIFIED.to_string(),
        topics::WALLET_RESPONSE.to_string(),
        topics::WALLET_DLQ.to_string(),
    ];
    let publisher = Arc::new(Publisher::new(
        &kafka_config.brokers,
        &publish_topics,
        retry_config,
    )?);

    let subscriber_topics = vec![
        topics::PAYMENTS_CREATED.to_string(),
        topics::WALLET_DEBIT_REQUESTED.to_string(),
    ];
    let bus_consumer = Consumer::new(
        &kafka_config.brokers,
        &kafka_config.group_id,
        &subscriber_topics,
        publisher.clone(),
        retry_config,
        topics::WALLET_DLQ,
    )?;

    let cancel = CancellationToken::new();

    let mut tasks = bus_consumer.listen(cancel.clone(), move |topic, payload| {
        let service = wallet_service.clone();
        let publisher = publisher.clone();
        async move { consumer::handle_message(service, publisher, topic, payload).await }
    });

    let app = Router::new()
        .route("/health", get(handlers::health_check))
        .layer(TraceLayer::new_for_http());

    let addr = format!("0.0.0.0:{server_port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(addr = %addr, "Wallet Service listening");

    let shutdown_cancel = cancel.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            wait_for_shutdown_signal().await;
            tracing::info!("shutdown signal received, cancelling consumer workers");
            shutdown_cancel.cancel();
        })
        .await?;

    while tasks.join_next().await.is_some() {}

    tracing::info!("Wallet service stopped");
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
