//! Selector factory — static registry mapping rule-class names to
//! constructors.
//!
//! Strategy configuration declares a rule class by name plus a numeric
//! parameter bag; the factory resolves the name against a closed set of
//! identifiers. Unknown names fail here, at configuration-load time,
//! never mid-scan.

use std::collections::BTreeMap;

use super::{Breakout, MaCrossover, RsiReversal, Selector, VolumeSpike};

/// Numeric parameter bag from a strategy declaration.
pub type Params = BTreeMap<String, f64>;

/// Errors from selector construction.
#[derive(Debug, Clone, thiserror::Error)]
pub enum FactoryError {
    #[error("unknown rule class '{class}' (known: {known})", class = .0, known = known_rule_classes().join(", "))]
    UnknownRuleClass(String),

    #[error("invalid parameter for rule class '{class}': {reason}")]
    InvalidParam { class: String, reason: String },
}

/// The closed set of registered rule-class identifiers.
pub fn known_rule_classes() -> Vec<&'static str> {
    vec!["ma_crossover", "volume_spike", "breakout", "rsi_reversal"]
}

fn param(params: &Params, name: &str, default: f64) -> f64 {
    params.get(name).copied().unwrap_or(default)
}

fn param_usize(params: &Params, class: &str, name: &str, default: usize) -> Result<usize, FactoryError> {
    match params.get(name) {
        None => Ok(default),
        Some(&v) if v >= 1.0 && v.fract() == 0.0 => Ok(v as usize),
        Some(&v) => Err(FactoryError::InvalidParam {
            class: class.to_string(),
            reason: format!("'{name}' must be a positive integer, got {v}"),
        }),
    }
}

/// Create a selector from a rule-class name and a parameter bag.
pub fn create_selector(class: &str, params: &Params) -> Result<Box<dyn Selector>, FactoryError> {
    match class {
        "ma_crossover" => {
            let fast = param_usize(params, class, "fast", 5)?;
            let slow = param_usize(params, class, "slow", 20)?;
            let confirm = param_usize(params, class, "confirm_days", 3)?;
            if fast >= slow {
                return Err(FactoryError::InvalidParam {
                    class: class.to_string(),
                    reason: format!("'fast' ({fast}) must be smaller than 'slow' ({slow})"),
                });
            }
            Ok(Box::new(MaCrossover::new(fast, slow, confirm)))
        }
        "volume_spike" => {
            let period = param_usize(params, class, "period", 20)?;
            let multiplier = param(params, "multiplier", 2.0);
            let min_gain = param(params, "min_gain_pct", 1.0);
            if multiplier <= 0.0 {
                return Err(FactoryError::InvalidParam {
                    class: class.to_string(),
                    reason: format!("'multiplier' must be positive, got {multiplier}"),
                });
            }
            Ok(Box::new(VolumeSpike::new(period, multiplier, min_gain)))
        }
        "breakout" => {
            let lookback = param_usize(params, class, "lookback", 60)?;
            let threshold = param(params, "threshold_pct", 0.0);
            Ok(Box::new(Breakout::new(lookback, threshold)))
        }
        "rsi_reversal" => {
            let period = param_usize(params, class, "period", 14)?;
            let oversold = param(params, "oversold", 30.0);
            let confirm = param_usize(params, class, "confirm_days", 3)?;
            Ok(Box::new(RsiReversal::new(period, oversold, confirm)))
        }
        other => Err(FactoryError::UnknownRuleClass(other.to_string())),
    }
}
