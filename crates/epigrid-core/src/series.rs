//! Compartment fractions and the per-run time series supplied by the host.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::EngineError;

/// Sums at or below this are treated as "no population".
pub const DEGENERATE_TOTAL: f64 = 1e-12;
const NORMALIZED_TOLERANCE: f64 = 1e-9;

/// Named epidemic state.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Compartment {
    Susceptible,
    Exposed,
    Infectious,
    Recovered,
    Deceased,
    Vaccinated,
}

impl Compartment {
    pub const ALL: [Self; 6] = [
        Self::Susceptible,
        Self::Exposed,
        Self::Infectious,
        Self::Recovered,
        Self::Deceased,
        Self::Vaccinated,
    ];

    /// Single-letter key used by hosts (`S`, `E`, `I`, `R`, `D`, `V`).
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Susceptible => "S",
            Self::Exposed => "E",
            Self::Infectious => "I",
            Self::Recovered => "R",
            Self::Deceased => "D",
            Self::Vaccinated => "V",
        }
    }
}

impl fmt::Display for Compartment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

fn clean(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

/// Population fractions at one instant. Optional compartments are `None`
/// when the model does not carry them.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Fractions {
    #[serde(rename = "S", default)]
    pub susceptible: f64,
    #[serde(rename = "E", default, skip_serializing_if = "Option::is_none")]
    pub exposed: Option<f64>,
    #[serde(rename = "I", default)]
    pub infectious: f64,
    #[serde(rename = "R", default, skip_serializing_if = "Option::is_none")]
    pub recovered: Option<f64>,
    #[serde(rename = "D", default, skip_serializing_if = "Option::is_none")]
    pub deceased: Option<f64>,
    #[serde(rename = "V", default, skip_serializing_if = "Option::is_none")]
    pub vaccinated: Option<f64>,
}

impl Fractions {
    #[must_use]
    pub const fn sir(susceptible: f64, infectious: f64, recovered: f64) -> Self {
        Self {
            susceptible,
            exposed: None,
            infectious,
            recovered: Some(recovered),
            deceased: None,
            vaccinated: None,
        }
    }

    #[must_use]
    pub const fn with_exposed(mut self, exposed: f64) -> Self {
        self.exposed = Some(exposed);
        self
    }

    #[must_use]
    pub const fn with_deceased(mut self, deceased: f64) -> Self {
        self.deceased = Some(deceased);
        self
    }

    #[must_use]
    pub const fn with_vaccinated(mut self, vaccinated: f64) -> Self {
        self.vaccinated = Some(vaccinated);
        self
    }

    /// Fraction for `compartment`, zero when absent.
    #[must_use]
    pub fn get(&self, compartment: Compartment) -> f64 {
        match compartment {
            Compartment::Susceptible => self.susceptible,
            Compartment::Exposed => self.exposed.unwrap_or(0.0),
            Compartment::Infectious => self.infectious,
            Compartment::Recovered => self.recovered.unwrap_or(0.0),
            Compartment::Deceased => self.deceased.unwrap_or(0.0),
            Compartment::Vaccinated => self.vaccinated.unwrap_or(0.0),
        }
    }

    fn map(self, f: impl Fn(f64) -> f64) -> Self {
        Self {
            susceptible: f(self.susceptible),
            exposed: self.exposed.map(&f),
            infectious: f(self.infectious),
            recovered: self.recovered.map(&f),
            deceased: self.deceased.map(&f),
            vaccinated: self.vaccinated.map(&f),
        }
    }

    /// Sum over all carried compartments after scrubbing malformed values.
    #[must_use]
    pub fn total(&self) -> f64 {
        Compartment::ALL.iter().map(|&c| clean(self.get(c))).sum()
    }

    #[must_use]
    pub fn is_degenerate(&self) -> bool {
        self.total() <= DEGENERATE_TOTAL
    }

    /// Scrub NaN, infinite and negative entries to zero and rescale so the
    /// carried compartments sum to one. Degenerate inputs come back all zero.
    #[must_use]
    pub fn normalized(&self) -> Self {
        let scrubbed = self.map(clean);
        let total = scrubbed.total();
        if total <= DEGENERATE_TOTAL {
            return scrubbed.map(|_| 0.0);
        }
        if (total - 1.0).abs() <= NORMALIZED_TOLERANCE {
            return scrubbed;
        }
        scrubbed.map(|v| v / total)
    }
}

/// Which optional compartments a run carries.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ModelShape {
    pub exposed: bool,
    pub recovered: bool,
    pub deceased: bool,
    pub vaccinated: bool,
}

impl fmt::Display for ModelShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !(self.exposed || self.recovered || self.deceased || self.vaccinated) {
            return f.write_str("SIS");
        }
        f.write_str("S")?;
        if self.exposed {
            f.write_str("E")?;
        }
        f.write_str("I")?;
        for (present, letter) in [
            (self.recovered, "R"),
            (self.deceased, "D"),
            (self.vaccinated, "V"),
        ] {
            if present {
                f.write_str(letter)?;
            }
        }
        Ok(())
    }
}

/// One full simulation run: time stamps plus one sequence per compartment.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SeriesFrame {
    pub t: Vec<f64>,
    #[serde(rename = "S")]
    pub susceptible: Vec<f64>,
    #[serde(rename = "E", default, skip_serializing_if = "Option::is_none")]
    pub exposed: Option<Vec<f64>>,
    #[serde(rename = "I")]
    pub infectious: Vec<f64>,
    #[serde(rename = "R", default, skip_serializing_if = "Option::is_none")]
    pub recovered: Option<Vec<f64>>,
    #[serde(rename = "D", default, skip_serializing_if = "Option::is_none")]
    pub deceased: Option<Vec<f64>>,
    #[serde(rename = "V", default, skip_serializing_if = "Option::is_none")]
    pub vaccinated: Option<Vec<f64>>,
}

impl SeriesFrame {
    /// Build a series from per-step fractions; optional compartments are kept
    /// when the first sample carries them.
    #[must_use]
    pub fn from_samples(t: Vec<f64>, samples: &[Fractions]) -> Self {
        let first = samples.first().copied().unwrap_or_default();
        let column = |present: bool, c: Compartment| {
            present.then(|| samples.iter().map(|s| s.get(c)).collect::<Vec<_>>())
        };
        Self {
            t,
            susceptible: samples.iter().map(|s| s.susceptible).collect(),
            exposed: column(first.exposed.is_some(), Compartment::Exposed),
            infectious: samples.iter().map(|s| s.infectious).collect(),
            recovered: column(first.recovered.is_some(), Compartment::Recovered),
            deceased: column(first.deceased.is_some(), Compartment::Deceased),
            vaccinated: column(first.vaccinated.is_some(), Compartment::Vaccinated),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.t.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.t.is_empty()
    }

    #[must_use]
    pub fn shape(&self) -> ModelShape {
        ModelShape {
            exposed: self.exposed.is_some(),
            recovered: self.recovered.is_some(),
            deceased: self.deceased.is_some(),
            vaccinated: self.vaccinated.is_some(),
        }
    }

    /// Reject series whose sequences disagree in length.
    pub fn validate(&self) -> Result<(), EngineError> {
        let expected = self.t.len();
        if expected == 0 {
            return Err(EngineError::InvalidSeries("time axis `t` is empty".to_string()));
        }
        let columns = [
            ("S", Some(&self.susceptible)),
            ("E", self.exposed.as_ref()),
            ("I", Some(&self.infectious)),
            ("R", self.recovered.as_ref()),
            ("D", self.deceased.as_ref()),
            ("V", self.vaccinated.as_ref()),
        ];
        for (name, column) in columns {
            if let Some(values) = column {
                if values.len() != expected {
                    return Err(EngineError::InvalidSeries(format!(
                        "sequence `{name}` has {} entries, expected {expected}",
                        values.len()
                    )));
                }
            }
        }
        Ok(())
    }

    /// Fractions at `index`, or `None` past the end.
    #[must_use]
    pub fn fractions_at(&self, index: usize) -> Option<Fractions> {
        let pick = |column: &Option<Vec<f64>>| -> Option<f64> {
            column.as_ref().map(|values| values.get(index).copied().unwrap_or(0.0))
        };
        Some(Fractions {
            susceptible: *self.susceptible.get(index)?,
            exposed: pick(&self.exposed),
            infectious: *self.infectious.get(index)?,
            recovered: pick(&self.recovered),
            deceased: pick(&self.deceased),
            vaccinated: pick(&self.vaccinated),
        })
    }

    /// Rescale every time step in place so its compartments sum to one.
    pub fn normalize(&mut self) {
        for index in 0..self.len() {
            let Some(normalized) = self.fractions_at(index).map(|f| f.normalized()) else {
                continue;
            };
            self.write_at(index, &normalized);
        }
    }

    fn write_at(&mut self, index: usize, fractions: &Fractions) {
        fn put(column: &mut [f64], index: usize, value: f64) {
            if let Some(slot) = column.get_mut(index) {
                *slot = value;
            }
        }
        put(&mut self.susceptible, index, fractions.susceptible);
        put(&mut self.infectious, index, fractions.infectious);
        for (column, value) in [
            (&mut self.exposed, fractions.exposed),
            (&mut self.recovered, fractions.recovered),
            (&mut self.deceased, fractions.deceased),
            (&mut self.vaccinated, fractions.vaccinated),
        ] {
            if let (Some(column), Some(value)) = (column.as_mut(), value) {
                put(column, index, value);
            }
        }
    }
}
