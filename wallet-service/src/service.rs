//! Business logic for fund verification and debiting.

use crate::errors::WalletResult;
use crate::repository::WalletStore;
use rust_decimal::Decimal;
use saga_common::events::{PaymentCreatedEvent, VerificationStatus, WalletResponseEvent};

pub struct WalletService {
    store: WalletStore,
}

impl WalletService {
    pub fn new(store: WalletStore) -> Self {
        Self { store }
    }

    /// No mutation: only reports whether `event.customer_id`'s wallet can
    /// cover `event.amount`.
    pub async fn validate_funds(&self, event: &PaymentCreatedEvent) -> WalletResult<WalletResponseEvent> {
        let wallet = self.store.find_by_user_id(&event.customer_id).await?;

        let (status, reason) = if wallet.balance < event.amount {
            (VerificationStatus::Declined, "Insufficient funds".to_string())
        } else {
            (VerificationStatus::Approved, String::new())
        };

        Ok(WalletResponseEvent {
            payment_id: event.id.clone(),
            user_id: event.customer_id.clone(),
            status,
            amount: event.amount,
            reason,
        })
    }

    /// No sufficiency re-check — the caller already validated funds before
    /// requesting the debit.
    pub async fn debit_balance(&self, user_id: &str, amount: Decimal) -> WalletResult<()> {
        self.store.debit(user_id, amount).await?;
        Ok(())
    }
}
