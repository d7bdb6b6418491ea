pub mod config;
pub mod error;
pub mod events;
pub mod retry;
pub mod telemetry;
pub mod topics;

pub mod bus;

pub use error::{BusError, BusResult};
pub use retry::RetryConfig;
