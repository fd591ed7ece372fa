//! Band accounting: fractions in, integer cell counts out.
//!
//! Each tracked quantity owns an [`Accumulator`] that carries its rounding
//! residual into the next frame, so counts never drift from their targets
//! even though every frame rounds independently.
//!
//! Ladder compartments occupy consecutive ranking slices starting at
//! position 0, innermost first: recovered, deceased, infectious, exposed.
//! Vaccinated is a side band taken from the far end of the ranking and capped
//! to whatever the ladder left free. Susceptible is the remainder.

use serde::{Deserialize, Serialize};

use crate::series::{Compartment, Fractions};

/// Ladder order, innermost (earliest reached) first.
pub const LADDER: [Compartment; 4] = [
    Compartment::Recovered,
    Compartment::Deceased,
    Compartment::Infectious,
    Compartment::Exposed,
];

/// Fractional rounding remainder carried between frames.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Accumulator {
    residual: f64,
}

impl Accumulator {
    /// Add `fraction · cells`, emit the rounded count clamped to
    /// `[0, cells]`, keep the remainder.
    pub fn step(&mut self, fraction: f64, cells: usize) -> usize {
        let fraction = if fraction.is_finite() {
            fraction.clamp(0.0, 1.0)
        } else {
            0.0
        };
        let cells_f = cells as f64;
        self.residual += fraction * cells_f;
        let count = self.residual.round().clamp(0.0, cells_f);
        self.residual -= count;
        count as usize
    }

    #[must_use]
    pub const fn residual(&self) -> f64 {
        self.residual
    }

    pub fn reset(&mut self) {
        self.residual = 0.0;
    }
}

/// How ladder widths are rounded.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum LadderRounding {
    /// One accumulator per band width; boundaries are prefix sums. Each band
    /// stays within a cell of its target but the claimed region may not.
    PerBand,
    /// One accumulator per cumulative boundary; widths are differences of
    /// consecutive boundaries. The claimed region stays within a cell of its
    /// cumulative target.
    #[default]
    Cumulative,
}

/// Cell counts per compartment for one frame.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BandSizes {
    pub recovered: usize,
    pub deceased: usize,
    pub infectious: usize,
    pub exposed: usize,
    pub vaccinated: usize,
    pub susceptible: usize,
}

impl BandSizes {
    /// Whole grid in the background compartment.
    #[must_use]
    pub const fn background(cells: usize) -> Self {
        Self {
            recovered: 0,
            deceased: 0,
            infectious: 0,
            exposed: 0,
            vaccinated: 0,
            susceptible: cells,
        }
    }

    #[must_use]
    pub const fn get(&self, compartment: Compartment) -> usize {
        match compartment {
            Compartment::Susceptible => self.susceptible,
            Compartment::Exposed => self.exposed,
            Compartment::Infectious => self.infectious,
            Compartment::Recovered => self.recovered,
            Compartment::Deceased => self.deceased,
            Compartment::Vaccinated => self.vaccinated,
        }
    }

    /// Cells claimed by the ladder.
    #[must_use]
    pub const fn ladder_total(&self) -> usize {
        self.recovered + self.deceased + self.infectious + self.exposed
    }

    /// Cells painted in a non-background colour.
    #[must_use]
    pub const fn drawn_total(&self) -> usize {
        self.ladder_total() + self.vaccinated
    }

    #[must_use]
    pub const fn cell_count(&self) -> usize {
        self.drawn_total() + self.susceptible
    }

    /// Ranking ranges for every non-empty drawn band, ladder first.
    #[must_use]
    pub fn ranges(&self) -> Vec<BandRange> {
        let mut ranges = Vec::with_capacity(LADDER.len() + 1);
        let mut start = 0;
        for compartment in LADDER {
            let end = start + self.get(compartment);
            if end > start {
                ranges.push(BandRange {
                    compartment,
                    start,
                    end,
                });
            }
            start = end;
        }
        if self.vaccinated > 0 {
            let end = self.cell_count();
            ranges.push(BandRange {
                compartment: Compartment::Vaccinated,
                start: end - self.vaccinated,
                end,
            });
        }
        ranges
    }

    /// Compartment owning ranking `position`.
    #[must_use]
    pub fn compartment_at(&self, position: usize) -> Option<Compartment> {
        if position >= self.cell_count() {
            return None;
        }
        Some(
            self.ranges()
                .into_iter()
                .find(|range| range.contains(position))
                .map_or(Compartment::Susceptible, |range| range.compartment),
        )
    }
}

/// Half-open slice `[start, end)` of the ranking painted in one compartment.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct BandRange {
    pub compartment: Compartment,
    pub start: usize,
    pub end: usize,
}

impl BandRange {
    #[must_use]
    pub const fn len(&self) -> usize {
        self.end - self.start
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    #[must_use]
    pub const fn contains(&self, position: usize) -> bool {
        position >= self.start && position < self.end
    }
}

/// Frame-by-frame conversion of fractions into band sizes.
#[derive(Debug, Clone, PartialEq)]
pub struct BandAccountant {
    cells: usize,
    rounding: LadderRounding,
    ladder: [Accumulator; 4],
    vaccinated: Accumulator,
}

impl BandAccountant {
    #[must_use]
    pub fn new(cells: usize, rounding: LadderRounding) -> Self {
        Self {
            cells,
            rounding,
            ladder: [Accumulator::default(); 4],
            vaccinated: Accumulator::default(),
        }
    }

    #[must_use]
    pub const fn cells(&self) -> usize {
        self.cells
    }

    #[must_use]
    pub const fn rounding(&self) -> LadderRounding {
        self.rounding
    }

    /// Forget all carried residuals (new run).
    pub fn reset(&mut self) {
        for acc in &mut self.ladder {
            acc.reset();
        }
        self.vaccinated.reset();
    }

    /// Residuals in ladder order followed by the vaccinated side band.
    #[must_use]
    pub fn residuals(&self) -> [f64; 5] {
        [
            self.ladder[0].residual(),
            self.ladder[1].residual(),
            self.ladder[2].residual(),
            self.ladder[3].residual(),
            self.vaccinated.residual(),
        ]
    }

    /// Advance one frame.
    pub fn step(&mut self, fractions: &Fractions) -> BandSizes {
        let fractions = fractions.normalized();
        if fractions.is_degenerate() {
            return BandSizes::background(self.cells);
        }
        let targets = LADDER.map(|c| fractions.get(c));
        let raw = match self.rounding {
            LadderRounding::PerBand => self.per_band_widths(&targets),
            LadderRounding::Cumulative => self.cumulative_widths(&targets),
        };

        let mut widths = [0_usize; 4];
        let mut used = 0;
        for (width, want) in widths.iter_mut().zip(raw) {
            *width = want.min(self.cells - used);
            used += *width;
        }

        let vaccinated = match fractions.vaccinated {
            Some(v) => self.vaccinated.step(v, self.cells).min(self.cells - used),
            None => 0,
        };

        BandSizes {
            recovered: widths[0],
            deceased: widths[1],
            infectious: widths[2],
            exposed: widths[3],
            vaccinated,
            susceptible: self.cells - used - vaccinated,
        }
    }

    fn per_band_widths(&mut self, targets: &[f64; 4]) -> [usize; 4] {
        let mut widths = [0; 4];
        for ((width, acc), &target) in widths.iter_mut().zip(&mut self.ladder).zip(targets) {
            *width = acc.step(target, self.cells);
        }
        widths
    }

    fn cumulative_widths(&mut self, targets: &[f64; 4]) -> [usize; 4] {
        let mut cumulative = [0.0; 4];
        let mut running = 0.0;
        for (slot, &target) in cumulative.iter_mut().zip(targets) {
            running += target;
            *slot = running;
        }
        // Outer boundary first, then inward.
        let mut bounds = [0_usize; 4];
        for k in (0..LADDER.len()).rev() {
            bounds[k] = self.ladder[k].step(cumulative[k], self.cells);
        }
        let mut widths = [0; 4];
        let mut previous = 0;
        for (width, &bound) in widths.iter_mut().zip(&bounds) {
            *width = bound.saturating_sub(previous);
            previous = previous.max(bound);
        }
        widths
    }
}
