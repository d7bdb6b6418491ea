//! Demuxes `payments.checked` and `wallet.funds.verified` into the saga's
//! `VerificationOutcome` and applies them through `SagaService`.

use crate::handlers::AppSaga;
use crate::models::VerificationOutcome;
use saga_common::error::HandlerError;
use saga_common::events::{FraudCheckEvent, WalletResponseEvent};
use saga_common::topics;
use std::sync::Arc;

pub async fn handle_message(
    saga: Arc<AppSaga>,
    topic: String,
    payload: Vec<u8>,
) -> Result<(), HandlerError> {
    match topic.as_str() {
        topics::PAYMENTS_CHECKED => {
            let event: FraudCheckEvent = serde_json::from_slice(&payload)
                .map_err(|e| HandlerError::Protocol(e.to_string()))?;

            tracing::info!(payment_id = %event.id, status = ?event.status, "Applying fraud check result");

            saga.update_payment_flags(
                &event.id,
                VerificationOutcome::Fraud {
                    clean: event.status.is_approved(),
                    reason: event.reason,
                },
            )
            .await
            .map_err(|e| HandlerError::Transient(e.to_string()))
        }
        topics::WALLET_FUNDS_VERIFIED => {
            let event: WalletResponseEvent = serde_json::from_slice(&payload)
                .map_err(|e| HandlerError::Protocol(e.to_string()))?;

            tracing::info!(payment_id = %event.payment_id, status = ?event.status, "Applying wallet verification result");

            saga.update_payment_flags(
                &event.payment_id,
                VerificationOutcome::Wallet {
                    approved: event.status.is_approved(),
                    reason: if event.reason.is_empty() {
                        None
                    } else {
                        Some(event.reason)
                    },
                },
            )
            .await
            .map_err(|e| HandlerError::Transient(e.to_string()))
        }
        other => Err(HandlerError::Protocol(format!("unexpected topic: {other}"))),
    }
}
