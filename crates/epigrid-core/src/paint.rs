//! Band painting through an injected drawing surface.

use serde::{Deserialize, Serialize};

use crate::bands::BandSizes;
use crate::grid::Grid;
use crate::ranking::Ranking;
use crate::series::Compartment;

/// 8-bit RGBA colour.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct Rgba(pub [u8; 4]);

impl Rgba {
    #[must_use]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self([r, g, b, 255])
    }

    /// Parse `#rrggbb` or `#rrggbbaa`.
    #[must_use]
    pub fn from_hex(hex: &str) -> Option<Self> {
        let digits = hex.strip_prefix('#').unwrap_or(hex);
        if !matches!(digits.len(), 6 | 8) || !digits.is_ascii() {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(&digits[i..i + 2], 16).ok();
        let alpha = if digits.len() == 8 { channel(6)? } else { 255 };
        Some(Self([channel(0)?, channel(2)?, channel(4)?, alpha]))
    }
}

/// Colour per compartment.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Palette {
    pub susceptible: Rgba,
    pub exposed: Rgba,
    pub infectious: Rgba,
    pub recovered: Rgba,
    pub deceased: Rgba,
    pub vaccinated: Rgba,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            susceptible: Rgba::rgb(0xdb, 0xe4, 0xee),
            exposed: Rgba::rgb(0xf5, 0x9e, 0x0b),
            infectious: Rgba::rgb(0xdc, 0x26, 0x26),
            recovered: Rgba::rgb(0x16, 0xa3, 0x4a),
            deceased: Rgba::rgb(0x37, 0x41, 0x51),
            vaccinated: Rgba::rgb(0x7c, 0x3a, 0xed),
        }
    }
}

impl Palette {
    #[must_use]
    pub const fn color(&self, compartment: Compartment) -> Rgba {
        match compartment {
            Compartment::Susceptible => self.susceptible,
            Compartment::Exposed => self.exposed,
            Compartment::Infectious => self.infectious,
            Compartment::Recovered => self.recovered,
            Compartment::Deceased => self.deceased,
            Compartment::Vaccinated => self.vaccinated,
        }
    }
}

/// Minimal drawing capability the engine paints through.
pub trait Surface {
    /// Pixel dimensions `(width, height)`.
    fn size(&self) -> (u32, u32);

    fn fill(&mut self, color: Rgba);

    /// Fill the rectangle at `(x, y)` of `width × height` pixels.
    fn set_pixel_block(&mut self, x: u32, y: u32, width: u32, height: u32, color: Rgba);
}

impl<S: Surface + ?Sized> Surface for &mut S {
    fn size(&self) -> (u32, u32) {
        (**self).size()
    }

    fn fill(&mut self, color: Rgba) {
        (**self).fill(color);
    }

    fn set_pixel_block(&mut self, x: u32, y: u32, width: u32, height: u32, color: Rgba) {
        (**self).set_pixel_block(x, y, width, height, color);
    }
}

/// Paints band slices of a ranking onto a surface.
#[derive(Debug, Clone, Copy)]
pub struct BandPainter<'a> {
    grid: &'a Grid,
    palette: &'a Palette,
}

impl<'a> BandPainter<'a> {
    #[must_use]
    pub const fn new(grid: &'a Grid, palette: &'a Palette) -> Self {
        Self { grid, palette }
    }

    /// Background only.
    pub fn clear(&self, surface: &mut dyn Surface) {
        surface.fill(self.palette.susceptible);
    }

    /// Background, then every drawn band in ladder order, then vaccinated.
    pub fn paint(&self, surface: &mut dyn Surface, ranking: &Ranking, sizes: &BandSizes) {
        self.clear(surface);
        let (width, height) = surface.size();
        if width == 0 || height == 0 {
            return;
        }
        for range in sizes.ranges() {
            let color = self.palette.color(range.compartment);
            for &cell in ranking.slice(range.start, range.end) {
                if let Some((x, y, w, h)) = self.grid.pixel_block(cell, width, height) {
                    surface.set_pixel_block(x, y, w, h, color);
                }
            }
        }
    }
}
