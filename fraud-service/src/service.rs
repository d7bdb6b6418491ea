//! Stateless fraud evaluation.

use chrono::Utc;
use saga_common::events::{FraudCheckEvent, PaymentCreatedEvent, VerificationStatus};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

const HIGH_VALUE_THRESHOLD: Decimal = dec!(10000);

/// Declines any payment over `HIGH_VALUE_THRESHOLD`, approves everything
/// else. Pure and synchronous; the caller applies the configurable
/// evaluation delay before invoking this.
pub fn evaluate_payment(event: &PaymentCreatedEvent) -> FraudCheckEvent {
    tracing::info!(payment_id = %event.id, amount = %event.amount, "Evaluating fraud for payment");

    let (status, reason) = if event.amount > HIGH_VALUE_THRESHOLD {
        tracing::warn!(payment_id = %event.id, amount = %event.amount, "High value payment detected - potential fraud");
        (
            VerificationStatus::Declined,
            Some("High-value transaction suspicious".to_string()),
        )
    } else {
        (VerificationStatus::Approved, None)
    };

    FraudCheckEvent {
        id: event.id.clone(),
        trace_id: event.trace_id.clone(),
        status,
        reason,
        checked_at: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(amount: Decimal) -> PaymentCreatedEvent {
        PaymentCreatedEvent {
            id: "payment-1".to_string(),
            amount,
            currency: "USD".to_string(),
            status: "PENDING".to_string(),
            method: "CREDIT_CARD".to_string(),
            customer_id: "cust-1".to_string(),
            trace_id: "trace-1".to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn approves_payments_at_or_below_the_threshold() {
        let result = evaluate_payment(&event(dec!(10000)));
        assert_eq!(result.status, VerificationStatus::Approved);
        assert!(result.reason.is_none());
    }

    #[test]
    fn declines_payments_above_the_threshold() {
        let result = evaluate_payment(&event(dec!(10000.01)));
        assert_eq!(result.status, VerificationStatus::Declined);
        assert_eq!(
            result.reason.as_deref(),
            Some("High-value transaction suspicious")
        );
    }

    #[test]
    fn preserves_the_payment_and_trace_ids() {
        let result = evaluate_payment(&event(dec!(5)));
        assert_eq!(result.id, "payment-1");
        assert_eq!(result.trace_id, "trace-1");
    }
}
