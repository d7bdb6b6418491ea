mod service;

use saga_common::bus::{Consumer, Publisher};
use saga_common::config::{self, KafkaConfig};
use saga_common::error::HandlerError;
use saga_common::events::PaymentCreatedEvent;
use saga_common::{topics, RetryConfig};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

fn evaluation_delay_ms() -> u64 {
    std::env::var("FRAUD_EVALUATION_DELAY_MS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(0)
}

async fn handle_payment_created(
    publisher: Arc<Publisher>,
    delay_ms: u64,
    topic: String,
    payload: Vec<u8>,
) -> Result<(), HandlerError> {
    if topic != topics::PAYMENTS_CREATED {
        return Err(HandlerError::Protocol(format!("unexpected topic: {topic}")));
    }

    let event: PaymentCreatedEvent =
        serde_json::from_slice(&payload).map_err(|e| HandlerError::Protocol(e.to_string()))?;

    if delay_ms > 0 {
        tokio::time::sleep(std::time::Duration::from_millis(delay_ms)).await;
    }

    let checked = service::evaluate_payment(&event);

    publisher
        .publish(topics::PAYMENTS_CHECKED, &checked.id, &checked)
        .await
        .map_err(|e| HandlerError::Transient(e.to_string()))?;

    tracing::info!(payment_id = %checked.id, "Fraud evaluation completed");
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    config::load_dotenv();
    saga_common::telemetry::init("fraud_service=debug");

    let kafka_config = KafkaConfig::from_env("KAFKA_FRAUD_GROUP_ID", "fraud-service");
    let retry_config = RetryConfig::from_env();
    let delay_ms = evaluation_delay_ms();

    tracing::info!("Starting Fraud Service");
    tracing::info!(brokers = %kafka_config.brokers, "Kafka configuration");

    let publish_topics = vec![
        topics::PAYMENTS_CHECKED.to_string(),
        topics::PAYMENTS_DLQ.to_string(),
    ];
    let publisher = Arc::new(Publisher::new(
        &kafka_config.brokers,
        &publish_topics,
        retry_config,
    )?);

    let subscriber_topics = vec![topics::PAYMENTS_CREATED.to_string()];
    let consumer = Consumer::new(
        &kafka_config.brokers,
        &kafka_config.group_id,
        &subscriber_topics,
        publisher.clone(),
        retry_config,
        topics::PAYMENTS_DLQ,
    )?;

    let cancel = CancellationToken::new();

    let mut tasks = consumer.listen(cancel.clone(), move |topic, payload| {
        let publisher = publisher.clone();
        async move { handle_payment_created(publisher, delay_ms, topic, payload).await }
    });

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("ctrl-c received, shutting down");
        }
        _ = wait_for_sigterm() => {
            tracing::info!("SIGTERM received, shutting down");
        }
    }

    cancel.cancel();
    while tasks.join_next().await.is_some() {}

    tracing::info!("Fraud service stopped");
    Ok(())
}

#[cfg(unix)]
async fn wait_for_sigterm() {
    tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
        .expect("failed to install SIGTERM handler")
        .recv()
        .await;
}

#[cfg(not(unix))]
async fn wait_for_sigterm() {
    std::future::pending::<()>().await;
}
