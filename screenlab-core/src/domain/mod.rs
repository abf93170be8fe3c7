//! Domain types: bars and enriched (indicator-overlaid) series.

pub mod bar;
pub mod enriched;

pub use bar::{dates_strictly_ascending, Bar};
pub use enriched::{EnrichedSeries, IndicatorValues};
