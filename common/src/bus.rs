//! The message bus: a retrying, fixed-topic-set `Publisher` and a
//! one-worker-per-topic `Consumer` with per-message retry and DLQ.

use crate::error::{BusError, BusResult, HandlerError};
use crate::events::DlqMessage;
use crate::retry::{backoff_delay, RetryConfig};
use chrono::Utc;
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{Consumer as _, StreamConsumer};
use rdkafka::message::Message;
use rdkafka::producer::{FutureProducer, FutureRecord};
use serde::Serialize;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// A producer bound at construction to a fixed set of topics, one
/// `FutureProducer` per topic.
pub struct Publisher {
    producers: HashMap<String, FutureProducer>,
    retry: RetryConfig,
}

impl Publisher {
    pub fn new(brokers: &str, topics: &[String], retry: RetryConfig) -> BusResult<Self> {
        let mut producers = HashMap::new();
        for topic in topics {
            let producer: FutureProducer = ClientConfig::new()
                .set("bootstrap.servers", brokers)
                .set("message.timeout.ms", "5000")
                .set("acks", "all")
                .set("enable.idempotence", "true")
                .set("compression.type", "snappy")
                .set("batch.size", "16384")
                .set("linger.ms", "10")
                .create()
                .map_err(|e| {
                    BusError::Marshal(format!("failed to create producer for '{topic}': {e}"))
                })?;
            producers.insert(topic.clone(), producer);
        }
        Ok(Self { producers, retry })
    }

    /// Publish a message, retrying with exponential backoff + jitter.
    /// `message` is serialized exactly once, before the first attempt.
    pub async fn publish<T: Serialize>(&self, topic: &str, key: &str, message: &T) -> BusResult<()> {
        self.publish_cancellable(topic, key, message, None).await
    }

    /// Same as [`publish`], but wakes immediately on `cancel` during the
    /// inter-attempt backoff sleep, returning `BusError::ContextCancelled`.
    pub async fn publish_cancellable<T: Serialize>(
        &self,
        topic: &str,
        key: &str,
        message: &T,
        cancel: Option<&CancellationToken>,
    ) -> BusResult<()> {
        let producer = self
            .producers
            .get(topic)
            .ok_or_else(|| BusError::UnknownTopic(topic.to_string()))?;

        let payload = serde_json::to_vec(message).map_err(|e| BusError::Marshal(e.to_string()))?;

        self.publish_with_retry(producer, topic, key, &payload, cancel)
            .await
    }

    async fn publish_with_retry(
        &self,
        producer: &FutureProducer,
        topic: &str,
        key: &str,
        payload: &[u8],
        cancel: Option<&CancellationToken>,
    ) -> BusResult<()> {
        let mut last_err = String::new();

        for attempt in 0..self.retry.max_attempts {
            let record = FutureRecord::to(topic).key(key).payload(payload);

            match producer.send(record, Duration::from_secs(5)).await {
                Ok((partition, offset)) => {
                    if attempt > 0 {
                        tracing::info!(topic, attempt, "published after retry");
                    }
                    tracing::debug!(topic, partition, offset, "published");
                    return Ok(());
                }
                Err((e, _)) => {
                    last_err = e.to_string();

                    if attempt + 1 == self.retry.max_attempts {
                        break;
                    }

                    let delay = backoff_delay(attempt, &self.retry);
                    tracing::warn!(topic, attempt, delay_ms = delay.as_millis() as u64, error = %last_err, "publish failed, retrying");

                    match cancel {
                        Some(token) => {
                            tokio::select! {
                                _ = tokio::time::sleep(delay) => {}
                                _ = token.cancelled() => return Err(BusError::ContextCancelled),
                            }
                        }
                        None => tokio::time::sleep(delay).await,
                    }
                }
            }
        }

        Err(BusError::Exhausted {
            topic: topic.to_string(),
            attempts: self.retry.max_attempts,
            source: last_err,
        })
    }
}

/// Narrow seam `process_message` publishes DLQ records through, so the
/// retry-exhaustion path can be exercised with a recording test double
/// instead of a live Kafka producer.
trait DlqPublish: Send + Sync {
    fn publish_dlq(&self, dlq_topic: &str, record: DlqMessage) -> impl Future<Output = ()> + Send;
}

impl DlqPublish for Publisher {
    async fn publish_dlq(&self, dlq_topic: &str, record: DlqMessage) {
        let key = record.key.clone();
        if let Err(e) = self.publish(dlq_topic, &key, &record).await {
            tracing::error!(error = %e, dlq_topic, "failed to publish DLQ record");
        }
    }
}

/// One worker per subscribed topic, each with its own `StreamConsumer`.
/// Holds a reference to the shared [`Publisher`] so it can emit DLQ records.
pub struct Consumer {
    readers: Vec<(String, StreamConsumer)>,
    publisher: Arc<Publisher>,
    retry: RetryConfig,
    dlq_topic: String,
}

impl Consumer {
    pub fn new(
        brokers: &str,
        group_id: &str,
        topics: &[String],
        publisher: Arc<Publisher>,
        retry: RetryConfig,
        dlq_topic: impl Into<String>,
    ) -> BusResult<Self> {
        let mut readers = Vec::with_capacity(topics.len());
        for topic in topics {
            let consumer: StreamConsumer = ClientConfig::new()
                .set("bootstrap.servers", brokers)
                .set("group.id", group_id)
                .set("auto.offset.reset", "earliest")
                .set("enable.auto.commit", "true")
                .set("auto.commit.interval.ms", "5000")
                .set("session.timeout.ms", "30000")
                .set("enable.partition.eof", "false")
                .create()
                .map_err(|e| {
                    BusError::Marshal(format!("failed to create consumer for '{topic}': {e}"))
                })?;

            consumer
                .subscribe(&[topic.as_str()])
                .map_err(|e| BusError::Marshal(e.to_string()))?;

            readers.push((topic.clone(), consumer));
        }

        Ok(Self {
            readers,
            publisher,
            retry,
            dlq_topic: dlq_topic.into(),
        })
    }

    /// Spawns one task per subscribed topic. Does not block; the caller
    /// waits on its own cancellation signal and then joins the returned set.
    pub fn listen<H, Fut>(self, cancel: CancellationToken, handler: H) -> tokio::task::JoinSet<()>
    where
        H: Fn(String, Vec<u8>) -> Fut + Clone + Send + Sync + 'static,
        Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
    {
        let mut set = tokio::task::JoinSet::new();

        for (topic, consumer) in self.readers {
            let publisher = self.publisher.clone();
            let retry = self.retry;
            let dlq_topic = self.dlq_topic.clone();
            let cancel = cancel.clone();
            let handler = handler.clone();

            set.spawn(async move {
                worker_loop(topic, consumer, publisher, retry, dlq_topic, cancel, handler).await;
            });
        }

        set
    }
}

async fn worker_loop<P, H, Fut>(
    topic: String,
    consumer: StreamConsumer,
    publisher: Arc<P>,
    retry: RetryConfig,
    dlq_topic: String,
    cancel: CancellationToken,
    handler: H,
) where
    P: DlqPublish,
    H: Fn(String, Vec<u8>) -> Fut + Sync,
    Fut: Future<Output = Result<(), HandlerError>>,
{
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::debug!(topic, "cancellation received, closing reader");
                break;
            }
            msg = consumer.recv() => {
                match msg {
                    Ok(borrowed) => {
                        let key = borrowed
                            .key()
                            .map(|k| String::from_utf8_lossy(k).to_string())
                            .unwrap_or_default();
                        let payload = borrowed.payload().map(|p| p.to_vec()).unwrap_or_default();
                        process_message(&topic, &key, payload, &publisher, &retry, &dlq_topic, &cancel, &handler).await;
                    }
                    Err(e) => {
                        tracing::error!(topic, error = %e, "kafka read error");
                        tokio::time::sleep(Duration::from_secs(1)).await;
                    }
                }
            }
        }
    }
}

async fn process_message<P, H, Fut>(
    topic: &str,
    key: &str,
    payload: Vec<u8>,
    publisher: &Arc<P>,
    retry: &RetryConfig,
    dlq_topic: &str,
    cancel: &CancellationToken,
    handler: &H,
) where
    P: DlqPublish,
    H: Fn(String, Vec<u8>) -> Fut + Sync,
    Fut: Future<Output = Result<(), HandlerError>>,
{
    for attempt in 0..retry.max_attempts {
        match handler(topic.to_string(), payload.clone()).await {
            Ok(()) => return,
            Err(e) => {
                if attempt + 1 == retry.max_attempts {
                    tracing::error!(topic, attempts = retry.max_attempts, error = %e, "handler exhausted retries, sending to DLQ");
                    let record = DlqMessage {
                        original_topic: topic.to_string(),
                        key: key.to_string(),
                        value: String::from_utf8_lossy(&payload).to_string(),
                        timestamp: Utc::now(),
                        attempts: retry.max_attempts,
                    };
                    publisher.publish_dlq(dlq_topic, record).await;
                    return;
                }

                let delay = backoff_delay(attempt, retry);
                tracing::warn!(topic, attempt, error = %e, "handler failed, retrying");

                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = cancel.cancelled() => return,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingPublisher {
        records: Mutex<Vec<DlqMessage>>,
    }

    impl DlqPublish for RecordingPublisher {
        async fn publish_dlq(&self, _dlq_topic: &str, record: DlqMessage) {
            self.records.lock().unwrap().push(record);
        }
    }

    fn test_retry(max_attempts: u32) -> RetryConfig {
        RetryConfig {
            max_attempts,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
            jitter: false,
        }
    }

    #[tokio::test]
    async fn exhausted_retries_land_exactly_one_dlq_record_with_max_attempts() {
        let publisher = Arc::new(RecordingPublisher::default());
        let retry = test_retry(3);
        let cancel = CancellationToken::new();

        process_message(
            "payments.created",
            "payment-1",
            b"not valid json".to_vec(),
            &publisher,
            &retry,
            "payments.dlq",
            &cancel,
            &|_topic, _payload| async { Err(HandlerError::Protocol("always fails".to_string())) },
        )
        .await;

        let records = publisher.records.lock().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].attempts, retry.max_attempts);
        assert_eq!(records[0].original_topic, "payments.created");
        assert_eq!(records[0].key, "payment-1");
    }

    #[tokio::test]
    async fn handler_that_eventually_succeeds_sends_nothing_to_the_dlq() {
        let publisher = Arc::new(RecordingPublisher::default());
        let retry = test_retry(5);
        let cancel = CancellationToken::new();
        let calls = Arc::new(std::sync::atomic::AtomicU32::new(0));

        process_message(
            "payments.created",
            "payment-2",
            b"{}".to_vec(),
            &publisher,
            &retry,
            "payments.dlq",
            &cancel,
            &|_topic, _payload| {
                let calls = calls.clone();
                async move {
                    if calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst) < 2 {
                        Err(HandlerError::Transient("not yet".to_string()))
                    } else {
                        Ok(())
                    }
                }
            },
        )
        .await;

        assert!(publisher.records.lock().unwrap().is_empty());
    }
}
