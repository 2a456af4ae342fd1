pub mod config;
pub mod error;
pub mod metrics;
pub mod period;
pub mod types;

#[cfg(feature = "liquidity")]
pub mod liquidity;

#[cfg(feature = "receivables")]
pub mod receivables;

#[cfg(feature = "stress")]
pub mod stress;

pub use config::EngineConfig;
pub use error::CashFlowError;
pub use period::FinancialPeriod;
pub use types::*;

/// Standard result type for all cash flow metric operations
pub type CashFlowResult<T> = Result<T, CashFlowError>;
