//! Orthogonal (full Cartesian product) sweep over a [`ParameterSpace`].
//!
//! The sweep is a mixed-radix counter: dimension `i` has radix equal to its
//! domain size, and every integer in `0..size` decodes to exactly one
//! combination. Decoding uses row-major strides, so the **last-declared
//! dimension varies fastest** and the first-declared varies slowest:
//!
//! ```text
//! fuel = [a, b], wind = [0, 10]
//! 0 -> (a, 0)   1 -> (a, 10)   2 -> (b, 0)   3 -> (b, 10)
//! ```
//!
//! Nothing is materialized: the sweep holds the strides only, and any index
//! can be decoded on its own, which makes the sequence trivially restartable
//! and easy to partition.

use std::ops::Range;

use crate::error::RunError;
use crate::model::Assignment;
use crate::space::ParameterSpace;

/// Lazy, restartable enumeration of every combination in a space.
#[derive(Debug, Clone)]
pub struct OrthogonalSweep<'a> {
    space: &'a ParameterSpace,
    strides: Vec<u64>,
    size: u64,
}

impl<'a> OrthogonalSweep<'a> {
    /// Prepare a sweep, refusing it up front if it would exceed `ceiling` runs.
    ///
    /// A sweep whose size does not even fit in a `u64` is always refused.
    pub fn new(space: &'a ParameterSpace, ceiling: u64) -> Result<Self, RunError> {
        let size = match space.checked_size() {
            Some(size) if size <= ceiling => size,
            Some(size) => {
                return Err(RunError::RunLimitExceeded {
                    requested: size,
                    ceiling,
                });
            }
            None => {
                return Err(RunError::RunLimitExceeded {
                    requested: u64::MAX,
                    ceiling,
                });
            }
        };

        Ok(Self {
            space,
            strides: compute_strides(&space.shape()),
            size,
        })
    }

    #[must_use]
    pub fn space(&self) -> &'a ParameterSpace {
        self.space
    }

    /// Number of assignments the sweep produces
    #[must_use]
    pub fn len(&self) -> u64 {
        self.size
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Per-dimension domain positions for a flat sweep index
    #[must_use]
    pub fn indices(&self, index: u64) -> Option<Vec<usize>> {
        if index >= self.size {
            return None;
        }
        let mut positions = Vec::with_capacity(self.strides.len());
        let mut remaining = index;
        for &stride in &self.strides {
            positions.push((remaining / stride) as usize);
            remaining %= stride;
        }
        Some(positions)
    }

    /// Decode a flat sweep index into its assignment
    #[must_use]
    pub fn decode(&self, index: u64) -> Option<Assignment> {
        if index >= self.size {
            return None;
        }
        let mut assignment = Assignment::with_capacity(self.strides.len());
        let mut remaining = index;
        for (dim, &stride) in self.space.dimensions().iter().zip(&self.strides) {
            let position = (remaining / stride) as usize;
            remaining %= stride;
            assignment.push(dim.shared_key().clone(), dim.domain()[position].clone());
        }
        Some(assignment)
    }

    /// Iterate the whole sweep from the start
    #[must_use]
    pub fn iter(&self) -> SweepIter<'_> {
        self.iter_range(0..self.size)
    }

    /// Iterate a sub-range of flat indices (clamped to the sweep size)
    #[must_use]
    pub fn iter_range(&self, range: Range<u64>) -> SweepIter<'_> {
        let end = range.end.min(self.size);
        SweepIter {
            sweep: self,
            next: range.start.min(end),
            end,
        }
    }
}

impl<'s> IntoIterator for &'s OrthogonalSweep<'_> {
    type Item = Assignment;
    type IntoIter = SweepIter<'s>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Row-major strides: the last dimension has stride 1
fn compute_strides(shape: &[usize]) -> Vec<u64> {
    if shape.is_empty() {
        return Vec::new();
    }
    let mut strides = vec![1u64; shape.len()];
    for i in (0..shape.len() - 1).rev() {
        strides[i] = strides[i + 1] * shape[i + 1] as u64;
    }
    strides
}

/// Iterator over a range of sweep indices
#[derive(Debug, Clone)]
pub struct SweepIter<'a> {
    sweep: &'a OrthogonalSweep<'a>,
    next: u64,
    end: u64,
}

impl SweepIter<'_> {
    /// Assignments left in this iterator
    #[must_use]
    pub fn remaining(&self) -> u64 {
        self.end - self.next
    }
}

impl Iterator for SweepIter<'_> {
    type Item = Assignment;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.end {
            return None;
        }
        let assignment = self.sweep.decode(self.next);
        self.next += 1;
        assignment
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match usize::try_from(self.remaining()) {
            Ok(n) => (n, Some(n)),
            Err(_) => (usize::MAX, None),
        }
    }

    fn nth(&mut self, n: usize) -> Option<Self::Item> {
        self.next = self.next.saturating_add(n as u64).min(self.end);
        self.next()
    }
}
