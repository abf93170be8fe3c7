//! Screenlab Core — domain types, indicator precomputation, selector
//! rule set, strategy configuration.
//!
//! This crate contains the per-instrument half of the screening engine:
//! - Domain types (bars, enriched series with indicator overlays)
//! - Causal indicator catalog with explicit undefined (NaN → `None`)
//! - Selector trait and the closed rule-class registry
//! - Strategy configuration loading with front-loaded validation
//!
//! The cross-sectional half (scheduler, backtest, aggregation) lives in
//! `screenlab-runner`.

pub mod config;
pub mod domain;
pub mod indicators;
pub mod select;
