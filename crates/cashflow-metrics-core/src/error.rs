use thiserror::Error;

#[derive(Debug, Error)]
pub enum CashFlowError {
    #[error("Invalid input: {field} — {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Missing period data: '{field}' is required in period '{period}'")]
    MissingPeriodData { period: String, field: String },

    #[error("Division by zero in {context}")]
    DivisionByZero { context: String },

    #[error("Invalid scenario parameters for '{scenario}': {reason}")]
    InvalidScenarioParameters { scenario: String, reason: String },

    #[error("Empty period series: at least one financial period is required")]
    EmptyPeriodSeries,

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Date error: {0}")]
    DateError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<serde_json::Error> for CashFlowError {
    fn from(e: serde_json::Error) -> Self {
        CashFlowError::SerializationError(e.to_string())
    }
}
