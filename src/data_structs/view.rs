use std::sync::Arc;

use itertools::Itertools;

/// Ordered positions of retained cells on the backing cell axis.
///
/// Views are immutable and shared; every relational verb derives a new view
/// from an old one instead of touching the backing matrices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexView {
    positions: Arc<[usize]>,
}

impl IndexView {
    /// View over every backing cell in storage order.
    pub fn identity(n: usize) -> Self {
        Self {
            positions: (0..n).collect_vec().into(),
        }
    }

    pub fn from_positions(positions: Vec<usize>) -> Self {
        Self {
            positions: positions.into(),
        }
    }

    pub fn positions(&self) -> &[usize] {
        &self.positions
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn is_identity(&self) -> bool {
        self.positions.iter().enumerate().all(|(i, p)| i == *p)
    }

    /// Derives a view from positions relative to this one.
    pub fn select(
        &self,
        relative: &[usize],
    ) -> Self {
        Self::from_positions(relative.iter().map(|r| self.positions[*r]).collect_vec())
    }

    /// Appends views over the same backing axis.
    pub fn concat<'a>(views: impl IntoIterator<Item = &'a IndexView>) -> Self {
        Self::from_positions(
            views
                .into_iter()
                .flat_map(|v| v.positions.iter().copied())
                .collect_vec(),
        )
    }
}
