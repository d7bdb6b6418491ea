use thiserror::Error;

#[derive(Debug, Error)]
pub enum WalletError {
    #[error("Wallet not found for user: {0}")]
    WalletNotFound(String),

    #[error("Concurrent update detected, retry")]
    OptimisticLockError,

    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Bus error: {0}")]
    BusError(#[from] saga_common::BusError),
}

pub type WalletResult<T> = Result<T, WalletError>;
