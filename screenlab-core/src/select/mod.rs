//! Selector abstraction — named, parameterized match/no-match rules.
//!
//! A selector answers one question: does this instrument qualify under
//! this rule as of the end of the given history window? The window is
//! already truncated to the evaluation date and capped by the caller.
//! Selectors are side-effect-free and must answer `false` — never panic —
//! when an indicator value they need is undefined.

pub mod breakout;
pub mod factory;
pub mod ma_crossover;
pub mod rsi_reversal;
pub mod volume_spike;

pub use breakout::Breakout;
pub use factory::{create_selector, known_rule_classes, FactoryError, Params};
pub use ma_crossover::MaCrossover;
pub use rsi_reversal::RsiReversal;
pub use volume_spike::VolumeSpike;

use crate::domain::EnrichedSeries;
use crate::indicators::Indicator;

/// Trait for screening rules.
///
/// # Contract
/// - `matches` reads only the window it is given; the last position is
///   the evaluation date.
/// - Undefined indicator values (insufficient history for the rule) mean
///   "no match", never an error.
pub trait Selector: Send + Sync + std::fmt::Debug {
    /// Rule-class identifier (e.g. "ma_crossover").
    fn name(&self) -> &str;

    /// Indicators this rule reads; the scheduler precomputes their union
    /// once per instrument series.
    fn required_indicators(&self) -> Vec<Box<dyn Indicator>>;

    /// Match decision against a truncated, capped window.
    fn matches(&self, window: &EnrichedSeries) -> bool;
}
