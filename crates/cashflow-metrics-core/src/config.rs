use serde::{Deserialize, Serialize};

use crate::metrics::trend::MetricsConfig;
use crate::CashFlowResult;

#[cfg(feature = "liquidity")]
use crate::liquidity::projection::LiquidityConfig;
#[cfg(feature = "receivables")]
use crate::receivables::aging::ReceivablesConfig;
#[cfg(feature = "stress")]
use crate::stress::scenario::StressConfig;

/// Every tunable threshold of the engine. Sections absent from a config
/// file fall back to their defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub metrics: MetricsConfig,
    #[cfg(feature = "liquidity")]
    pub liquidity: LiquidityConfig,
    #[cfg(feature = "receivables")]
    pub receivables: ReceivablesConfig,
    #[cfg(feature = "stress")]
    pub stress: StressConfig,
}

impl EngineConfig {
    pub fn validate(&self) -> CashFlowResult<()> {
        self.metrics.validate()?;
        #[cfg(feature = "liquidity")]
        self.liquidity.validate()?;
        #[cfg(feature = "receivables")]
        self.receivables.validate()?;
        #[cfg(feature = "stress")]
        self.stress.validate()?;
        Ok(())
    }

    /// Parse and validate a JSON document.
    pub fn from_json_str(json: &str) -> CashFlowResult<Self> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_default_config_is_valid() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_document_keeps_defaults() {
        let config = EngineConfig::from_json_str(r#"{"metrics": {"trend_threshold_days": "10"}}"#)
            .unwrap();
        assert_eq!(config.metrics.trend_threshold_days, dec!(10));
        assert_eq!(config.metrics.dso_alert_days, dec!(45));
        #[cfg(feature = "stress")]
        assert_eq!(config.stress.scenarios.len(), 5);
    }

    #[test]
    fn test_empty_document_is_default() {
        assert_eq!(EngineConfig::from_json_str("{}").unwrap(), EngineConfig::default());
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(
            EngineConfig::from_json_str(r#"{"metrics": {"trend_threshold_days": "-1"}}"#).is_err()
        );
    }
}
