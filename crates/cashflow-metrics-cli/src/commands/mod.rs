pub mod liquidity;
pub mod metrics;
pub mod receivables;
pub mod stress;
