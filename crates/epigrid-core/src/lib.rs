//! Core layout engine for epidemic compartment grids.
//!
//! A run's aggregate compartment fractions are drawn onto a fixed square grid
//! as if they had spatial structure. A seeded metric orders the cells once per
//! run; every frame then claims prefix slices of that order for each
//! compartment, so the picture is reproducible, conserves cell counts exactly
//! and keeps cell identity stable from frame to frame.

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod bands;
pub mod engine;
pub mod grid;
pub mod metric;
pub mod noise;
pub mod paint;
pub mod ranking;
pub mod rng;
pub mod series;

pub use bands::{Accumulator, BandAccountant, BandRange, BandSizes, LADDER, LadderRounding};
pub use engine::{
    EngineEvent, EngineObserver, EngineState, EventLog, LayoutEngine, NullObserver, ParamsSeed,
    PointerUpdate,
};
pub use grid::{Grid, MIN_GRID_SIZE};
pub use metric::{HybridConfig, LayoutMode, build_metric};
pub use noise::{blur, value_noise};
pub use paint::{BandPainter, Palette, Rgba, Surface};
pub use ranking::Ranking;
pub use rng::{SeededRng, hash_seed};
pub use series::{Compartment, Fractions, ModelShape, SeriesFrame};

/// Errors raised at the engine boundary.
#[derive(Debug, Error, PartialEq)]
pub enum EngineError {
    /// Indicates an invalid configuration value.
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),
    /// A series payload that cannot be stored.
    #[error("invalid series: {0}")]
    InvalidSeries(String),
}

/// Static configuration for one engine instance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LayoutConfig {
    /// Side length of the square grid, in cells.
    pub grid_size: u32,
    /// Layout used when a parameter event does not name one.
    pub mode: LayoutMode,
    /// Hybrid tuning used when a parameter event does not supply any.
    pub hybrid: HybridConfig,
    /// Compartment colours.
    pub palette: Palette,
    /// How nested ladder widths are rounded.
    pub ladder_rounding: LadderRounding,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            grid_size: 40,
            mode: LayoutMode::Cluster,
            hybrid: HybridConfig::default(),
            palette: Palette::default(),
            ladder_rounding: LadderRounding::Cumulative,
        }
    }
}

impl LayoutConfig {
    /// Validates the configuration, returning the grid it describes.
    pub fn validate(&self) -> Result<Grid, EngineError> {
        let grid = Grid::new(self.grid_size)?;
        if !(0.0..=1.0).contains(&self.hybrid.d0) {
            return Err(EngineError::InvalidConfig("hybrid.d0 must lie in [0, 1]"));
        }
        if !self.hybrid.p.is_finite() || self.hybrid.p < 1.0 {
            return Err(EngineError::InvalidConfig("hybrid.p must be at least 1"));
        }
        Ok(grid)
    }
}
