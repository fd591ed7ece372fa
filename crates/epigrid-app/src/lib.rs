//! Batch driver for the layout engine: loads series files and layout
//! configuration, replays frames and writes PNGs plus a JSON frame log.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, ensure};
use epigrid_core::{
    EngineEvent, EventLog, LayoutConfig, LayoutEngine, LayoutMode, ParamsSeed, PointerUpdate,
    SeriesFrame,
};
use epigrid_render::RgbaCanvas;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Name of the frame log written next to rendered PNGs.
pub const FRAME_LOG: &str = "frames.json";

/// Seed used when neither the command line nor the series file names one.
pub const DEFAULT_SEED: &str = "epigrid";

/// Contents of a series file: either a bare series or one bundled with the
/// parameters of the run that produced it.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum SeriesFile {
    Bundle {
        params: ParamsSeed,
        series: SeriesFrame,
    },
    Bare(SeriesFrame),
}

impl SeriesFile {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read series file {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("failed to parse series file {}", path.display()))
    }

    #[must_use]
    pub fn params(&self) -> Option<&ParamsSeed> {
        match self {
            Self::Bundle { params, .. } => Some(params),
            Self::Bare(_) => None,
        }
    }

    #[must_use]
    pub fn into_series(self) -> SeriesFrame {
        match self {
            Self::Bundle { series, .. } | Self::Bare(series) => series,
        }
    }
}

/// Read a JSON [`LayoutConfig`], falling back to defaults when `path` is `None`.
pub fn load_config(path: Option<&Path>) -> Result<LayoutConfig> {
    let Some(path) = path else {
        return Ok(LayoutConfig::default());
    };
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    let config: LayoutConfig = serde_json::from_str(&text)
        .with_context(|| format!("failed to parse config {}", path.display()))?;
    config
        .validate()
        .with_context(|| format!("invalid config {}", path.display()))?;
    Ok(config)
}

/// Command-line overrides layered over file-provided parameters.
#[derive(Debug, Clone, Default)]
pub struct ParamOverrides {
    pub seed: Option<String>,
    pub mode: Option<LayoutMode>,
    pub d0: Option<f64>,
    pub p: Option<f64>,
    pub blur_passes: Option<u32>,
}

impl ParamOverrides {
    /// Merge onto `base`; explicit flags win.
    #[must_use]
    pub fn apply(&self, base: Option<&ParamsSeed>, config: &LayoutConfig) -> ParamsSeed {
        let mut params = base
            .cloned()
            .unwrap_or_else(|| ParamsSeed::new(DEFAULT_SEED));
        if let Some(seed) = &self.seed {
            params.seed.clone_from(seed);
        }
        if let Some(mode) = self.mode {
            params.mode = Some(mode);
        }
        if self.d0.is_some() || self.p.is_some() || self.blur_passes.is_some() {
            let mut hybrid = params.hybrid.unwrap_or(config.hybrid);
            if let Some(d0) = self.d0 {
                hybrid.d0 = d0;
            }
            if let Some(p) = self.p {
                hybrid.p = p;
            }
            if let Some(passes) = self.blur_passes {
                hybrid.blur_passes = passes;
            }
            params.hybrid = Some(hybrid);
        }
        params
    }
}

/// Which series indices to replay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameRange {
    pub start: usize,
    /// Exclusive; `None` runs to the end of the series.
    pub end: Option<usize>,
    pub every: usize,
}

impl Default for FrameRange {
    fn default() -> Self {
        Self {
            start: 0,
            end: None,
            every: 1,
        }
    }
}

impl FrameRange {
    /// Indices selected within a series of `len` samples.
    #[must_use]
    pub fn indices(&self, len: usize) -> Vec<usize> {
        let end = self.end.map_or(len, |end| end.min(len));
        (self.start..end).step_by(self.every.max(1)).collect()
    }
}

/// Serialized run record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameLog {
    pub seed: String,
    pub mode: LayoutMode,
    pub grid_size: u32,
    pub shape: String,
    pub events: Vec<EngineEvent>,
}

/// Outcome of a replay.
#[derive(Debug, Clone)]
pub struct ReplaySummary {
    pub frames: usize,
    pub pngs: Vec<PathBuf>,
    pub log: FrameLog,
}

/// Replay `series` under `params`, optionally writing one PNG per frame into
/// `out_dir` together with [`FRAME_LOG`].
pub fn replay(
    config: LayoutConfig,
    params: ParamsSeed,
    series: SeriesFrame,
    range: FrameRange,
    canvas: (u32, u32),
    out_dir: Option<&Path>,
) -> Result<ReplaySummary> {
    let shape = series.shape();
    let canvas = RgbaCanvas::new(canvas.0, canvas.1).context("invalid canvas size")?;
    let mut engine = LayoutEngine::with_observer(config, canvas, EventLog::default())
        .context("invalid layout configuration")?;
    engine.on_params(params);
    engine.on_sim_data(series).context("series rejected")?;

    let len = engine.series().map_or(0, SeriesFrame::len);
    let indices = range.indices(len);
    ensure!(
        !indices.is_empty(),
        "frame range {}..{} selects nothing from a series of {len} samples",
        range.start,
        range.end.map_or_else(|| len.to_string(), |end| end.to_string()),
    );
    if let Some(dir) = out_dir {
        fs::create_dir_all(dir)
            .with_context(|| format!("failed to create output directory {}", dir.display()))?;
    }

    let mut pngs = Vec::new();
    for &idx in &indices {
        let pointer = PointerUpdate::index(i64::try_from(idx).context("frame index overflow")?);
        let Some(sizes) = engine.on_update(&pointer) else {
            continue;
        };
        debug!(
            index = idx,
            recovered = sizes.recovered,
            infectious = sizes.infectious,
            "replayed frame"
        );
        if let Some(dir) = out_dir {
            let path = dir.join(format!("frame_{idx:05}.png"));
            engine
                .surface()
                .save_png(&path)
                .with_context(|| format!("failed to write {}", path.display()))?;
            pngs.push(path);
        }
    }

    let log = FrameLog {
        seed: engine.seed().unwrap_or_default().to_owned(),
        mode: engine.mode().unwrap_or_default(),
        grid_size: engine.grid().size(),
        shape: shape.to_string(),
        events: engine.observer().events().to_vec(),
    };
    if let Some(dir) = out_dir {
        let path = dir.join(FRAME_LOG);
        let json = serde_json::to_string_pretty(&log).context("failed to encode frame log")?;
        fs::write(&path, json).with_context(|| format!("failed to write {}", path.display()))?;
    }
    info!(
        frames = indices.len(),
        seed = %log.seed,
        mode = %log.mode,
        shape = %log.shape,
        "replay finished"
    );
    Ok(ReplaySummary {
        frames: indices.len(),
        pngs,
        log,
    })
}
