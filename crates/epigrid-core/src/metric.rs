//! Per-cell narrative metric: who is reached first, visually.

use std::fmt;
use std::str::FromStr;

use rand::RngCore;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::grid::Grid;
use crate::noise::{blur, value_noise};
use crate::rng::unit_draw;

const CLUSTER_RADIAL_WEIGHT: f64 = 0.65;
const CLUSTER_NOISE_WEIGHT: f64 = 0.35;
const CLUSTER_BLUR_ROUNDS: [u32; 2] = [2, 2];

/// Spatial story used to order cells.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum LayoutMode {
    /// Pure radial distance from the centre.
    Wave,
    /// Seeded random permutation with no spatial structure.
    Proportional,
    /// Fixed blend of radial distance and smoothed noise.
    #[default]
    Cluster,
    /// Radial core dissolving into noise past a distance gate.
    Hybrid,
}

impl LayoutMode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Wave => "wave",
            Self::Proportional => "proportional",
            Self::Cluster => "cluster",
            Self::Hybrid => "hybrid",
        }
    }

    /// Parse a host-supplied mode name; unknown names fall back to cluster.
    #[must_use]
    pub fn parse_lenient(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "wave" => Self::Wave,
            "proportional" | "random" => Self::Proportional,
            "cluster" => Self::Cluster,
            "hybrid" => Self::Hybrid,
            other => {
                warn!(mode = other, "unrecognized layout mode; using cluster");
                Self::Cluster
            }
        }
    }
}

impl fmt::Display for LayoutMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LayoutMode {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse_lenient(s))
    }
}

impl From<String> for LayoutMode {
    fn from(value: String) -> Self {
        Self::parse_lenient(&value)
    }
}

/// Tuning for [`LayoutMode::Hybrid`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct HybridConfig {
    /// Normalized distance below which the layout stays purely radial.
    pub d0: f64,
    /// Exponent shaping how quickly noise takes over past `d0`.
    pub p: f64,
    /// Smoothing passes applied to the noise field.
    pub blur_passes: u32,
}

impl Default for HybridConfig {
    fn default() -> Self {
        Self {
            d0: 0.35,
            p: 2.0,
            blur_passes: 3,
        }
    }
}

impl HybridConfig {
    /// Clamp out-of-range tuning into its documented domain.
    #[must_use]
    pub fn sanitized(self) -> Self {
        let d0 = if self.d0.is_finite() { self.d0.clamp(0.0, 1.0) } else { 1.0 };
        let p = if self.p.is_finite() { self.p.max(1.0) } else { 1.0 };
        Self {
            d0,
            p,
            blur_passes: self.blur_passes,
        }
    }

    /// Noise weight `λ` for a cell at normalized distance `d`.
    ///
    /// `λ = max((d - d0) / (1 - d0), 0)^p`, and zero once `d0 >= 1`. Note that
    /// `d0 = 0, p = 1` does not yield the raw noise field: it gives `λ = d`,
    /// so the centre stays radial and only the corners are pure noise.
    #[must_use]
    pub fn noise_weight(&self, d: f64) -> f64 {
        if self.d0 >= 1.0 {
            return 0.0;
        }
        let t = ((d - self.d0) / (1.0 - self.d0)).max(0.0);
        t.powf(self.p)
    }
}

/// Build the metric for `grid` in `mode`, drawing randomness from `rng`.
pub fn build_metric(
    grid: &Grid,
    mode: LayoutMode,
    hybrid: &HybridConfig,
    rng: &mut dyn RngCore,
) -> Vec<f64> {
    let size = grid.size() as usize;
    let distance = grid.radial_distances();
    match mode {
        LayoutMode::Wave => distance,
        LayoutMode::Proportional => (0..grid.cell_count()).map(|_| unit_draw(rng)).collect(),
        LayoutMode::Cluster => {
            let mut noise = value_noise(size, size, rng);
            for passes in CLUSTER_BLUR_ROUNDS {
                blur(&mut noise, size, passes);
            }
            distance
                .iter()
                .zip(&noise)
                .map(|(d, n)| CLUSTER_RADIAL_WEIGHT * d + CLUSTER_NOISE_WEIGHT * n)
                .collect()
        }
        LayoutMode::Hybrid => {
            let hybrid = hybrid.sanitized();
            let mut noise = value_noise(size, size, rng);
            blur(&mut noise, size, hybrid.blur_passes);
            distance
                .iter()
                .zip(&noise)
                .map(|(&d, &n)| {
                    let lambda = hybrid.noise_weight(d);
                    ((1.0 - lambda) * d + lambda * n).clamp(0.0, 1.0)
                })
                .collect()
        }
    }
}
