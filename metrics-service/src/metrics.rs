//! Counter/histogram definitions and Prometheus recorder setup.

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use rust_decimal::Decimal;

/// Installs the global Prometheus recorder and returns a handle whose
/// `render()` backs the `/metrics` endpoint.
pub fn install_recorder() -> anyhow::Result<PrometheusHandle> {
    PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("failed to install Prometheus recorder: {e}"))
}

fn to_f64(amount: Decimal) -> f64 {
    amount.try_into().unwrap_or(0.0)
}

pub fn record_payment_created(currency: &str, amount: Decimal) {
    counter!("payments_total", "status" => "created").increment(1);
    histogram!("payment_amounts", "currency" => currency.to_string()).record(to_f64(amount));
}

pub fn record_fraud_check(status: &str) {
    let status = if status.is_empty() { "unknown" } else { status };
    counter!("fraud_checks_total", "status" => status.to_string()).increment(1);
}

pub fn record_wallet_response(status: &str, user_id: &str, amount: Decimal) {
    counter!("wallet_responses_total", "status" => status.to_string()).increment(1);
    histogram!("wallet_amounts", "user_id" => user_id.to_string()).record(to_f64(amount));
}

pub fn record_wallet_debit(user_id: &str, amount: Decimal) {
    histogram!("wallet_debits", "user_id" => user_id.to_string()).record(to_f64(amount));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decimal_to_f64_conversion_is_lossless_for_typical_amounts() {
        assert_eq!(to_f64(Decimal::new(1050, 2)), 10.50);
        assert_eq!(to_f64(Decimal::ZERO), 0.0);
    }
}
