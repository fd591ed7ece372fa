//! The engine a host drives: parameters, series, frame updates.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::bands::{BandAccountant, BandSizes};
use crate::grid::Grid;
use crate::metric::{HybridConfig, LayoutMode, build_metric};
use crate::paint::{BandPainter, Surface};
use crate::ranking::Ranking;
use crate::rng::SeededRng;
use crate::series::{Compartment, Fractions, SeriesFrame};
use crate::{EngineError, LayoutConfig};

/// Parameter event starting a new run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ParamsSeed {
    /// Stable fingerprint of the simulation parameters.
    pub seed: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<LayoutMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hybrid: Option<HybridConfig>,
}

impl ParamsSeed {
    #[must_use]
    pub fn new(seed: impl Into<String>) -> Self {
        Self {
            seed: seed.into(),
            mode: None,
            hybrid: None,
        }
    }

    #[must_use]
    pub fn with_mode(mut self, mode: LayoutMode) -> Self {
        self.mode = Some(mode);
        self
    }

    #[must_use]
    pub fn with_hybrid(mut self, hybrid: HybridConfig) -> Self {
        self.hybrid = Some(hybrid);
        self
    }
}

/// Which frame to draw.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum PointerUpdate {
    /// Index into the stored series; clamped into range.
    Index { idx: i64 },
    /// Fractions supplied directly, bypassing the series.
    Inline { proportions: Fractions },
}

impl PointerUpdate {
    #[must_use]
    pub const fn index(idx: i64) -> Self {
        Self::Index { idx }
    }

    #[must_use]
    pub const fn inline(proportions: Fractions) -> Self {
        Self::Inline { proportions }
    }
}

/// Best-effort notifications for the surrounding UI.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum EngineEvent {
    /// A new layout is installed.
    Ready {
        seed: String,
        mode: LayoutMode,
        grid_size: u32,
    },
    /// A frame was painted.
    Frame {
        index: Option<usize>,
        time: Option<f64>,
        sizes: BandSizes,
    },
}

/// Receives engine notifications.
pub trait EngineObserver {
    fn on_event(&mut self, event: &EngineEvent);
}

/// Observer that drops every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullObserver;

impl EngineObserver for NullObserver {
    fn on_event(&mut self, _event: &EngineEvent) {}
}

/// Observer that keeps every event in arrival order.
#[derive(Debug, Default, Clone)]
pub struct EventLog {
    events: Vec<EngineEvent>,
}

impl EventLog {
    #[must_use]
    pub fn events(&self) -> &[EngineEvent] {
        &self.events
    }

    /// Band sizes of every frame event so far.
    pub fn frames(&self) -> impl Iterator<Item = &BandSizes> {
        self.events.iter().filter_map(|event| match event {
            EngineEvent::Frame { sizes, .. } => Some(sizes),
            EngineEvent::Ready { .. } => None,
        })
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

impl EngineObserver for EventLog {
    fn on_event(&mut self, event: &EngineEvent) {
        self.events.push(event.clone());
    }
}

/// Whether a layout has been installed yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Unseeded,
    Seeded,
}

#[derive(Debug, Clone)]
struct SeededLayout {
    seed: String,
    mode: LayoutMode,
    metric: Vec<f64>,
    ranking: Ranking,
}

#[derive(Debug, Clone, PartialEq)]
enum FrameKey {
    Index(usize),
    /// Normalized proportions; NaN is already scrubbed.
    Inline(Fractions),
}

#[derive(Debug, Clone)]
struct PaintedFrame {
    key: FrameKey,
    sizes: BandSizes,
}

/// Layout engine bound to one drawing surface.
pub struct LayoutEngine<S, O = NullObserver> {
    config: LayoutConfig,
    grid: Grid,
    surface: S,
    observer: O,
    layout: Option<SeededLayout>,
    series: Option<SeriesFrame>,
    accountant: BandAccountant,
    last_frame: Option<PaintedFrame>,
}

impl<S: Surface> LayoutEngine<S> {
    /// Build an unseeded engine that discards notifications.
    pub fn new(config: LayoutConfig, surface: S) -> Result<Self, EngineError> {
        Self::with_observer(config, surface, NullObserver)
    }
}

impl<S: Surface, O: EngineObserver> LayoutEngine<S, O> {
    /// Build an unseeded engine reporting to `observer`.
    pub fn with_observer(config: LayoutConfig, surface: S, observer: O) -> Result<Self, EngineError> {
        let grid = config.validate()?;
        let accountant = BandAccountant::new(grid.cell_count(), config.ladder_rounding);
        Ok(Self {
            config,
            grid,
            surface,
            observer,
            layout: None,
            series: None,
            accountant,
            last_frame: None,
        })
    }

    #[must_use]
    pub fn state(&self) -> EngineState {
        if self.layout.is_some() {
            EngineState::Seeded
        } else {
            EngineState::Unseeded
        }
    }

    #[must_use]
    pub const fn config(&self) -> &LayoutConfig {
        &self.config
    }

    #[must_use]
    pub const fn grid(&self) -> &Grid {
        &self.grid
    }

    #[must_use]
    pub const fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    #[must_use]
    pub const fn observer(&self) -> &O {
        &self.observer
    }

    pub fn observer_mut(&mut self) -> &mut O {
        &mut self.observer
    }

    /// Release the surface and observer.
    pub fn into_parts(self) -> (S, O) {
        (self.surface, self.observer)
    }

    #[must_use]
    pub fn seed(&self) -> Option<&str> {
        self.layout.as_ref().map(|layout| layout.seed.as_str())
    }

    #[must_use]
    pub fn mode(&self) -> Option<LayoutMode> {
        self.layout.as_ref().map(|layout| layout.mode)
    }

    #[must_use]
    pub fn metric(&self) -> Option<&[f64]> {
        self.layout.as_ref().map(|layout| layout.metric.as_slice())
    }

    #[must_use]
    pub fn ranking(&self) -> Option<&Ranking> {
        self.layout.as_ref().map(|layout| &layout.ranking)
    }

    #[must_use]
    pub const fn series(&self) -> Option<&SeriesFrame> {
        self.series.as_ref()
    }

    #[must_use]
    pub const fn accountant(&self) -> &BandAccountant {
        &self.accountant
    }

    /// Band sizes of the most recent painted frame.
    #[must_use]
    pub fn last_sizes(&self) -> Option<BandSizes> {
        self.last_frame.as_ref().map(|frame| frame.sizes)
    }

    /// Compartment shown at grid cell `cell` in the most recent frame.
    #[must_use]
    pub fn compartment_of(&self, cell: usize) -> Option<Compartment> {
        let position = self.ranking()?.position_of(cell)?;
        self.last_frame.as_ref()?.sizes.compartment_at(position)
    }

    /// Install a new layout for `params` and restart band accounting.
    pub fn on_params(&mut self, params: ParamsSeed) {
        let mode = params.mode.unwrap_or(self.config.mode);
        let hybrid = params.hybrid.unwrap_or(self.config.hybrid);
        let mut rng = SeededRng::from_seed_str(&params.seed);
        let metric = build_metric(&self.grid, mode, &hybrid, &mut rng);
        let ranking = Ranking::from_metric(&metric);

        self.accountant.reset();
        self.last_frame = None;
        debug!(
            seed = %params.seed,
            mode = %mode,
            grid_size = self.grid.size(),
            reseed = self.layout.is_some(),
            "installed layout"
        );
        self.layout = Some(SeededLayout {
            seed: params.seed.clone(),
            mode,
            metric,
            ranking,
        });
        self.observer.on_event(&EngineEvent::Ready {
            seed: params.seed,
            mode,
            grid_size: self.grid.size(),
        });
    }

    /// Replace the stored series, normalizing each step.
    pub fn on_sim_data(&mut self, mut series: SeriesFrame) -> Result<(), EngineError> {
        series.validate()?;
        series.normalize();
        debug!(
            model = %series.shape(),
            steps = series.len(),
            "stored series"
        );
        self.series = Some(series);
        self.last_frame = None;
        Ok(())
    }

    /// Account and paint one frame. Returns `None` (after clearing to the
    /// background) when there is nothing to draw yet.
    pub fn on_update(&mut self, pointer: &PointerUpdate) -> Option<BandSizes> {
        let Some((key, fractions, time)) = self.resolve(pointer) else {
            self.clear();
            return None;
        };
        let Some(layout) = self.layout.as_ref() else {
            debug!("update before parameters; clearing");
            self.clear();
            return None;
        };

        let sizes = match &self.last_frame {
            Some(frame) if frame.key == key => frame.sizes,
            _ => self.accountant.step(&fractions),
        };

        let painter = BandPainter::new(&self.grid, &self.config.palette);
        painter.paint(&mut self.surface, &layout.ranking, &sizes);
        debug!(
            recovered = sizes.recovered,
            deceased = sizes.deceased,
            infectious = sizes.infectious,
            exposed = sizes.exposed,
            vaccinated = sizes.vaccinated,
            susceptible = sizes.susceptible,
            "painted frame"
        );

        let index = match key {
            FrameKey::Index(index) => Some(index),
            FrameKey::Inline(_) => None,
        };
        self.last_frame = Some(PaintedFrame { key, sizes });
        self.observer.on_event(&EngineEvent::Frame { index, time, sizes });
        Some(sizes)
    }

    /// Paint the background only.
    pub fn clear(&mut self) {
        BandPainter::new(&self.grid, &self.config.palette).clear(&mut self.surface);
    }

    fn resolve(&self, pointer: &PointerUpdate) -> Option<(FrameKey, Fractions, Option<f64>)> {
        match pointer {
            PointerUpdate::Inline { proportions } => {
                let fractions = proportions.normalized();
                if fractions.is_degenerate() {
                    warn!("inline proportions are degenerate; drawing background");
                }
                Some((FrameKey::Inline(fractions), fractions, None))
            }
            PointerUpdate::Index { idx } => {
                let series = self.series.as_ref().filter(|series| !series.is_empty())?;
                let last = series.len() - 1;
                let index = usize::try_from(*idx).unwrap_or(0).min(last);
                if i64::try_from(index).ok() != Some(*idx) {
                    warn!(requested = *idx, clamped = index, "series index out of range");
                }
                let fractions = series.fractions_at(index)?;
                let time = series.t.get(index).copied();
                Some((FrameKey::Index(index), fractions, time))
            }
        }
    }
}
