//! Demuxes the four read-only topics metrics-service observes.
//!
//! Unlike the other services, a malformed or unrecognized event is logged
//! and swallowed rather than retried/DLQ'd — metrics-service has no DLQ,
//! since dropping an observation is harmless.

use crate::metrics;
use saga_common::error::HandlerError;
use saga_common::events::{
    FraudCheckEvent, PaymentCreatedEvent, VerificationStatus, WalletDebitRequestedEvent, WalletResponseEvent,
};
use saga_common::topics;

fn status_label(status: VerificationStatus) -> &'static str {
    match status {
        VerificationStatus::Approved => "APPROVED",
        VerificationStatus::Declined => "DECLINED",
    }
}

pub async fn handle_message(topic: String, payload: Vec<u8>) -> Result<(), HandlerError> {
    match topic.as_str() {
        topics::PAYMENTS_CREATED => {
            match serde_json::from_slice::<PaymentCreatedEvent>(&payload) {
                Ok(event) => metrics::record_payment_created(&event.currency, event.amount),
                Err(e) => tracing::warn!(error = %e, topic, "failed to decode payments.created"),
            }
        }
        topics::PAYMENTS_CHECKED => {
            match serde_json::from_slice::<FraudCheckEvent>(&payload) {
                Ok(event) => metrics::record_fraud_check(status_label(event.status)),
                Err(e) => tracing::warn!(error = %e, topic, "failed to decode payments.checked"),
            }
        }
        topics::WALLET_RESPONSE => {
            match serde_json::from_slice::<WalletResponseEvent>(&payload) {
                Ok(event) => metrics::record_wallet_response(
                    status_label(event.status),
                    &event.user_id,
                    event.amount,
                ),
                Err(e) => tracing::warn!(error = %e, topic, "failed to decode wallet.response"),
            }
        }
        topics::WALLET_DEBIT_REQUESTED => {
            match serde_json::from_slice::<WalletDebitRequestedEvent>(&payload) {
                Ok(event) => metrics::record_wallet_debit(&event.user_id, event.amount),
                Err(e) => tracing::warn!(error = %e, topic, "failed to decode wallet.debit.requested"),
            }
        }
        other => tracing::warn!(topic = other, "unrecognized topic, ignoring"),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn malformed_payload_is_logged_and_swallowed_not_errored() {
        let result = handle_message(topics::PAYMENTS_CREATED.to_string(), b"not json".to_vec()).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn unrecognized_topic_is_ignored() {
        let result = handle_message("some.other.topic".to_string(), b"{}".to_vec()).await;
        assert!(result.is_ok());
    }
}
