//! Declared input dimensions and their finite value domains.

use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::error::SpaceError;
use crate::model::Value;

/// A named input with a finite, ordered list of candidate values.
#[derive(Debug, Clone, PartialEq)]
pub struct Dimension {
    key: Arc<str>,
    domain: Vec<Value>,
}

impl Dimension {
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    pub(crate) fn shared_key(&self) -> &Arc<str> {
        &self.key
    }

    /// Candidate values in declaration order (never empty)
    #[must_use]
    pub fn domain(&self) -> &[Value] {
        &self.domain
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.domain.len()
    }

    /// Always false; kept for API symmetry with `len`
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.domain.is_empty()
    }
}

/// Ordered collection of dimensions defining a sweep.
///
/// Declaration order is significant: it fixes the iteration order of the
/// orthogonal sweep, with the last-declared dimension varying fastest.
#[derive(Debug, Clone, Default)]
pub struct ParameterSpace {
    dimensions: Vec<Dimension>,
    positions: FxHashMap<Arc<str>, usize>,
}

impl ParameterSpace {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a dimension.
    ///
    /// Fails with `DuplicateDimension` if `key` is already declared, or with
    /// `EmptyDomain` if `values` yields nothing.
    pub fn add<V>(
        &mut self,
        key: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Result<(), SpaceError>
    where
        V: Into<Value>,
    {
        let key = key.into();
        if self.positions.contains_key(key.as_str()) {
            return Err(SpaceError::DuplicateDimension { key });
        }
        let domain: Vec<Value> = values.into_iter().map(Into::into).collect();
        if domain.is_empty() {
            return Err(SpaceError::EmptyDomain { key });
        }

        let key: Arc<str> = key.into();
        self.positions.insert(key.clone(), self.dimensions.len());
        self.dimensions.push(Dimension { key, domain });
        Ok(())
    }

    /// Builder form of [`ParameterSpace::add`]
    pub fn with<V>(
        mut self,
        key: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Result<Self, SpaceError>
    where
        V: Into<Value>,
    {
        self.add(key, values)?;
        Ok(self)
    }

    /// Total number of combinations, saturating at `u64::MAX`.
    ///
    /// An empty space has exactly one (empty) combination.
    #[must_use]
    pub fn size(&self) -> u64 {
        self.checked_size().unwrap_or(u64::MAX)
    }

    /// Total number of combinations, or `None` if it does not fit in a `u64`
    #[must_use]
    pub fn checked_size(&self) -> Option<u64> {
        self.dimensions
            .iter()
            .try_fold(1u64, |acc, d| acc.checked_mul(d.domain.len() as u64))
    }

    /// Domain sizes in declaration order
    #[must_use]
    pub fn shape(&self) -> Vec<usize> {
        self.dimensions.iter().map(Dimension::len).collect()
    }

    #[must_use]
    pub fn dimension(&self, key: &str) -> Option<&Dimension> {
        self.positions.get(key).map(|&i| &self.dimensions[i])
    }

    #[must_use]
    pub fn dimensions(&self) -> &[Dimension] {
        &self.dimensions
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.dimensions.iter().map(Dimension::key)
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.positions.contains_key(key)
    }

    /// Number of dimensions
    #[must_use]
    pub fn len(&self) -> usize {
        self.dimensions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.dimensions.is_empty()
    }
}
