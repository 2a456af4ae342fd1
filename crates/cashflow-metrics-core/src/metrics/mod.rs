pub mod calculator;
pub mod trend;
