//! Stable ascending order of cells by metric.

use ordered_float::OrderedFloat;

/// Permutation of cell indices, earliest-reached first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ranking {
    order: Vec<usize>,
    positions: Vec<usize>,
}

impl Ranking {
    /// Sort cell indices by ascending metric, ties broken by index.
    #[must_use]
    pub fn from_metric(metric: &[f64]) -> Self {
        let mut order: Vec<usize> = (0..metric.len()).collect();
        order.sort_by_key(|&cell| (OrderedFloat(metric[cell]), cell));
        let mut positions = vec![0; order.len()];
        for (position, &cell) in order.iter().enumerate() {
            positions[cell] = position;
        }
        Self { order, positions }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Cells in narrative order.
    #[must_use]
    pub fn order(&self) -> &[usize] {
        &self.order
    }

    /// Cell at ranking `position`.
    #[must_use]
    pub fn cell_at(&self, position: usize) -> Option<usize> {
        self.order.get(position).copied()
    }

    /// Ranking position of `cell`.
    #[must_use]
    pub fn position_of(&self, cell: usize) -> Option<usize> {
        self.positions.get(cell).copied()
    }

    /// Cells occupying ranking positions `start..end`, clipped to the ranking.
    #[must_use]
    pub fn slice(&self, start: usize, end: usize) -> &[usize] {
        let end = end.min(self.order.len());
        let start = start.min(end);
        &self.order[start..end]
    }
}
