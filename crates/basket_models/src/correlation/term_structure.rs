//! Resolved factor term structure.

use super::model::CorrelationModel;
use crate::error::ModelError;

/// The resolved (tenor × name) factor loading matrix consumed by
/// distribution kernels.
///
/// Resolution is the only place a [`CorrelationModel`] is evaluated on a
/// tenor grid; the engine caches the result and re-resolves only when
/// the model's version counter has moved.
#[derive(Debug, Clone, PartialEq)]
pub struct FactorTermStructure {
    tenors: Vec<f64>,
    /// loadings[tenor_index][name_index]
    loadings: Vec<Vec<f64>>,
    model_version: u64,
}

impl FactorTermStructure {
    /// Resolve a correlation model on a tenor grid for `n_names`.
    ///
    /// # Arguments
    ///
    /// * `model` - The correlation model
    /// * `tenors` - Non-decreasing tenor grid (years), typically the
    ///   engine's surface times
    /// * `n_names` - Active basket size
    pub fn resolve(
        model: &CorrelationModel,
        tenors: &[f64],
        n_names: usize,
    ) -> Result<Self, ModelError> {
        if tenors.is_empty() {
            return Err(ModelError::Validation(
                "tenor grid must not be empty".to_string(),
            ));
        }
        let loadings = tenors
            .iter()
            .map(|&t| model.loadings_at(t, n_names))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            tenors: tenors.to_vec(),
            loadings,
            model_version: model.version(),
        })
    }

    /// The tenor grid.
    #[inline]
    pub fn tenors(&self) -> &[f64] {
        &self.tenors
    }

    /// Per-name loadings at tenor index `i`.
    #[inline]
    pub fn loadings(&self, i: usize) -> &[f64] {
        &self.loadings[i]
    }

    /// Number of names.
    #[inline]
    pub fn n_names(&self) -> usize {
        self.loadings.first().map_or(0, |row| row.len())
    }

    /// The model version this term structure was resolved from.
    #[inline]
    pub fn model_version(&self) -> u64 {
        self.model_version
    }
}
