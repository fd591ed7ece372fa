//! Square cell grid with a fixed row-major index mapping.

use serde::{Deserialize, Serialize};

use crate::EngineError;

/// Smallest accepted grid side.
pub const MIN_GRID_SIZE: u32 = 8;

/// `size × size` cells addressed by `index = y * size + x`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid {
    size: u32,
}

impl Grid {
    pub fn new(size: u32) -> Result<Self, EngineError> {
        if size < MIN_GRID_SIZE {
            return Err(EngineError::InvalidConfig("grid_size must be at least 8"));
        }
        Ok(Self { size })
    }

    #[must_use]
    pub const fn size(&self) -> u32 {
        self.size
    }

    /// Total number of cells, `N = size²`.
    #[must_use]
    pub const fn cell_count(&self) -> usize {
        (self.size as usize) * (self.size as usize)
    }

    #[inline]
    #[must_use]
    pub const fn index(&self, x: u32, y: u32) -> usize {
        (y as usize) * (self.size as usize) + (x as usize)
    }

    /// Inverse of [`Grid::index`]; `None` outside the grid.
    #[must_use]
    pub fn coords(&self, index: usize) -> Option<(u32, u32)> {
        if index >= self.cell_count() {
            return None;
        }
        let size = self.size as usize;
        Some(((index % size) as u32, (index / size) as u32))
    }

    /// Distance of every cell from the geometric centre, scaled into `[0, 1]`.
    #[must_use]
    pub fn radial_distances(&self) -> Vec<f64> {
        let size = self.size as usize;
        let centre = (f64::from(self.size) - 1.0) * 0.5;
        let mut field = Vec::with_capacity(self.cell_count());
        let mut max = 0.0_f64;
        for y in 0..size {
            let dy = y as f64 - centre;
            for x in 0..size {
                let dx = x as f64 - centre;
                let d = dx.hypot(dy);
                max = max.max(d);
                field.push(d);
            }
        }
        if max > 0.0 {
            for d in &mut field {
                *d /= max;
            }
        }
        field
    }

    /// Pixel rectangle `(x, y, w, h)` covered by `cell` on a `width × height`
    /// surface. Cells tile the surface edge to edge.
    #[must_use]
    pub fn pixel_block(&self, cell: usize, width: u32, height: u32) -> Option<(u32, u32, u32, u32)> {
        let (cx, cy) = self.coords(cell)?;
        let (x0, x1) = span(cx, self.size, width);
        let (y0, y1) = span(cy, self.size, height);
        Some((x0, y0, x1 - x0, y1 - y0))
    }
}

fn span(cell: u32, cells: u32, pixels: u32) -> (u32, u32) {
    let start = (u64::from(cell) * u64::from(pixels) / u64::from(cells)) as u32;
    let end = (u64::from(cell + 1) * u64::from(pixels) / u64::from(cells)) as u32;
    // Surfaces narrower than the grid still give each cell one pixel.
    let end = end.max(start + 1).min(pixels.max(1));
    (start.min(end.saturating_sub(1)), end)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_small_grids() {
        assert!(Grid::new(0).is_err());
        assert!(Grid::new(7).is_err());
        assert!(Grid::new(8).is_ok());
    }

    #[test]
    fn index_and_coords_round_trip() {
        let grid = Grid::new(10).expect("grid");
        assert_eq!(grid.cell_count(), 100);
        assert_eq!(grid.index(3, 4), 43);
        assert_eq!(grid.coords(43), Some((3, 4)));
        assert_eq!(grid.coords(100), None);
    }

    #[test]
    fn radial_distances_span_unit_interval() {
        let grid = Grid::new(9).expect("grid");
        let d = grid.radial_distances();
        assert_eq!(d[grid.index(4, 4)], 0.0);
        assert!((d[grid.index(0, 0)] - 1.0).abs() < 1e-12);
        assert!((d[grid.index(8, 8)] - 1.0).abs() < 1e-12);
        assert!(d.iter().all(|v| (0.0..=1.0).contains(v)));
    }

    #[test]
    fn even_grid_has_four_central_minima() {
        let grid = Grid::new(8).expect("grid");
        let d = grid.radial_distances();
        let min = d.iter().copied().fold(f64::INFINITY, f64::min);
        let minima = d.iter().filter(|&&v| v == min).count();
        assert_eq!(minima, 4);
    }

    #[test]
    fn pixel_blocks_tile_the_surface() {
        let grid = Grid::new(8).expect("grid");
        let (w, h) = (37, 29);
        let mut covered = vec![0_u32; (w * h) as usize];
        for cell in 0..grid.cell_count() {
            let (x, y, bw, bh) = grid.pixel_block(cell, w, h).expect("block");
            for py in y..y + bh {
                for px in x..x + bw {
                    covered[(py * w + px) as usize] += 1;
                }
            }
        }
        assert!(covered.iter().all(|&c| c == 1));
    }

    #[test]
    fn tiny_surfaces_still_get_blocks_in_bounds() {
        let grid = Grid::new(8).expect("grid");
        for cell in 0..grid.cell_count() {
            let (x, y, bw, bh) = grid.pixel_block(cell, 3, 3).expect("block");
            assert!(bw >= 1 && bh >= 1);
            assert!(x + bw <= 3 && y + bh <= 3);
        }
    }
}
