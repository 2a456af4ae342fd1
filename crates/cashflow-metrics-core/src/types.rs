use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::CashFlowError;
use crate::CashFlowResult;

/// All monetary values. Wraps Decimal to prevent accidental f64 usage.
pub type Money = Decimal;

/// Rates expressed as decimals (0.05 = 5%).
pub type Rate = Decimal;

/// Day counts (DSO, DIO, DPO, cash conversion cycle).
pub type Days = Decimal;

/// Why a derived figure could not be computed for a period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UndefinedReason {
    /// The named denominator was zero.
    DivisionByZero { denominator: String },
    /// An optional line item the formula depends on was not reported.
    MissingData { field: String },
    /// The result does not fit in a 96-bit decimal.
    Overflow { operation: String },
}

impl fmt::Display for UndefinedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UndefinedReason::DivisionByZero { denominator } => {
                write!(f, "{denominator} is zero")
            }
            UndefinedReason::MissingData { field } => write!(f, "{field} not reported"),
            UndefinedReason::Overflow { operation } => write!(f, "{operation} overflowed"),
        }
    }
}

/// A derived figure that is either a number or explicitly undefined.
///
/// Undefined metrics are never zero-filled and never carry `Infinity`;
/// anything computed from an undefined metric inherits its reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Metric {
    Defined { value: Decimal },
    Undefined { reason: UndefinedReason },
}

impl Metric {
    pub fn defined(value: Decimal) -> Self {
        Metric::Defined { value }
    }

    pub fn missing(field: &str) -> Self {
        Metric::Undefined {
            reason: UndefinedReason::MissingData {
                field: field.to_string(),
            },
        }
    }

    pub fn zero_denominator(denominator: &str) -> Self {
        Metric::Undefined {
            reason: UndefinedReason::DivisionByZero {
                denominator: denominator.to_string(),
            },
        }
    }

    pub fn overflow(operation: &str) -> Self {
        Metric::Undefined {
            reason: UndefinedReason::Overflow {
                operation: operation.to_string(),
            },
        }
    }

    /// `numerator / denominator`, undefined when the denominator is zero or
    /// the quotient overflows.
    pub fn ratio(numerator: Decimal, denominator: Decimal, denominator_name: &str) -> Self {
        if denominator.is_zero() {
            return Metric::zero_denominator(denominator_name);
        }
        match numerator.checked_div(denominator) {
            Some(value) => Metric::defined(value),
            None => Metric::overflow(&format!("division by {denominator_name}")),
        }
    }

    /// Ratio of two metrics, propagating whichever side is undefined first.
    pub fn ratio_of(numerator: &Metric, denominator: &Metric, denominator_name: &str) -> Self {
        match (numerator, denominator) {
            (Metric::Defined { value: n }, Metric::Defined { value: d }) => {
                Metric::ratio(*n, *d, denominator_name)
            }
            (Metric::Undefined { .. }, _) => numerator.clone(),
            (_, Metric::Undefined { .. }) => denominator.clone(),
        }
    }

    pub fn value(&self) -> Option<Decimal> {
        match self {
            Metric::Defined { value } => Some(*value),
            Metric::Undefined { .. } => None,
        }
    }

    pub fn is_defined(&self) -> bool {
        matches!(self, Metric::Defined { .. })
    }

    pub fn reason(&self) -> Option<&UndefinedReason> {
        match self {
            Metric::Defined { .. } => None,
            Metric::Undefined { reason } => Some(reason),
        }
    }

    pub fn map(self, f: impl FnOnce(Decimal) -> Decimal) -> Self {
        match self {
            Metric::Defined { value } => Metric::defined(f(value)),
            undefined => undefined,
        }
    }

    pub fn and_then(self, f: impl FnOnce(Decimal) -> Metric) -> Self {
        match self {
            Metric::Defined { value } => f(value),
            undefined => undefined,
        }
    }

    /// Multiply by `factor`, undefined on overflow.
    pub fn checked_scale(self, factor: Decimal, operation: &str) -> Self {
        self.and_then(|value| match value.checked_mul(factor) {
            Some(scaled) => Metric::defined(scaled),
            None => Metric::overflow(operation),
        })
    }

    /// Like `zip_with` for checked operators; `None` from `f` is an overflow.
    pub fn try_zip_with(
        &self,
        other: &Metric,
        f: impl FnOnce(Decimal, Decimal) -> Option<Decimal>,
        operation: &str,
    ) -> Self {
        match (self, other) {
            (Metric::Defined { value: a }, Metric::Defined { value: b }) => match f(*a, *b) {
                Some(value) => Metric::defined(value),
                None => Metric::overflow(operation),
            },
            (Metric::Undefined { .. }, _) => self.clone(),
            (_, Metric::Undefined { .. }) => other.clone(),
        }
    }

    /// Combine two metrics with `f`; the first undefined operand wins.
    pub fn zip_with(&self, other: &Metric, f: impl FnOnce(Decimal, Decimal) -> Decimal) -> Self {
        match (self, other) {
            (Metric::Defined { value: a }, Metric::Defined { value: b }) => {
                Metric::defined(f(*a, *b))
            }
            (Metric::Undefined { .. }, _) => self.clone(),
            (_, Metric::Undefined { .. }) => other.clone(),
        }
    }

    /// Unwrap the value or convert the sentinel into an error naming the metric.
    pub fn require(&self, metric: &str) -> CashFlowResult<Decimal> {
        match self {
            Metric::Defined { value } => Ok(*value),
            Metric::Undefined {
                reason: UndefinedReason::DivisionByZero { denominator },
            } => Err(CashFlowError::DivisionByZero {
                context: format!("{metric} ({denominator} is zero)"),
            }),
            Metric::Undefined {
                reason: UndefinedReason::MissingData { field },
            } => Err(CashFlowError::InsufficientData(format!(
                "{metric} is undefined because '{field}' was not reported"
            ))),
            Metric::Undefined {
                reason: UndefinedReason::Overflow { operation },
            } => Err(CashFlowError::InvalidInput {
                field: metric.to_string(),
                reason: format!("{operation} overflowed the decimal range"),
            }),
        }
    }

    /// Like `require`, but a missing line item is reported against `period`.
    pub fn require_in_period(&self, period: &str, metric: &str) -> CashFlowResult<Decimal> {
        match self {
            Metric::Undefined {
                reason: UndefinedReason::MissingData { field },
            } => Err(CashFlowError::MissingPeriodData {
                period: period.to_string(),
                field: field.clone(),
            }),
            _ => self.require(metric),
        }
    }
}

impl From<Decimal> for Metric {
    fn from(value: Decimal) -> Self {
        Metric::defined(value)
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Metric::Defined { value } => write!(f, "{value}"),
            Metric::Undefined { .. } => write!(f, "N/A"),
        }
    }
}

/// Standard computation output envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationOutput<T: Serialize> {
    pub result: T,
    pub methodology: String,
    pub assumptions: serde_json::Value,
    pub warnings: Vec<String>,
    pub metadata: ComputationMetadata,
}

/// Metadata for every computation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationMetadata {
    pub version: String,
    pub computation_time_us: u64,
    pub precision: String,
}

/// Helper to wrap computation results with metadata
pub fn with_metadata<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    elapsed_us: u64,
    result: T,
) -> ComputationOutput<T> {
    ComputationOutput {
        result,
        methodology: methodology.to_string(),
        assumptions: serde_json::to_value(assumptions).unwrap_or_default(),
        warnings,
        metadata: ComputationMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            computation_time_us: elapsed_us,
            precision: "rust_decimal_128bit".to_string(),
        },
    }
}
