//! Local-environment seed data for development and integration tests.

use crate::repository::WalletStore;
use rust_decimal_macros::dec;

pub async fn seed_wallets(store: &WalletStore) -> anyhow::Result<()> {
    let seeds = [
        ("user_1", "alice@example.com", dec!(10000)),
        ("user_2", "bob@example.com", dec!(5000)),
        ("user_3", "carol@example.com", dec!(2000)),
    ];

    for (user_id, email, balance) in seeds {
        store.create(user_id, email, balance).await?;
    }

    tracing::info!("Wallets seeded successfully");
    Ok(())
}
