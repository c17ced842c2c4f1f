//! Engine configuration.
//!
//! The original engine family read a process-wide settings singleton;
//! here every policy flag is an explicit field on [`EngineSettings`],
//! passed into the engine at construction.

use serde::{Deserialize, Serialize};

/// Policy flags and numeric knobs consumed by the basket engine.
///
/// Constructed with [`Default`] and adjusted via the `with_*` builder
/// methods.
///
/// # Example
///
/// ```
/// use basket_core::settings::EngineSettings;
///
/// let settings = EngineSettings::default()
///     .with_exact_jump_to_default(true)
///     .with_grid_size(0.005);
/// assert!(settings.exact_jump_to_default);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineSettings {
    /// Use the natural (trade) settlement date instead of the as-of date
    /// as the start of the distribution grid.
    pub use_natural_settlement_date: bool,

    /// Fold short (negative) principals into the total principal instead
    /// of tracking them as a separate shorted fraction.
    pub subtract_shorted_from_principal: bool,

    /// For base-correlation sub-baskets, read recovery from each name's
    /// curve rather than a fixed override.
    pub use_curve_recovery_for_base_correlation: bool,

    /// Treat names in the provisional `WillDefault` state as already
    /// defaulted (exact jump-to-default handling).
    pub exact_jump_to_default: bool,

    /// Deep-clone engines per worker on the parallel sensitivity path.
    /// Disabling this forces the sequential path.
    pub deep_cloning_in_parallel_sensitivity: bool,

    /// Significant decimal digits used to round loss levels before
    /// surface lookups (guards against float round-trip artifacts such
    /// as 2.0 arriving as 1.999999999999954).
    pub significant_digits: u32,

    /// Basket size above which the sensitivity loop may run in parallel.
    pub parallel_threshold: usize,

    /// Loss bucket width for the distribution grid, as a fraction of
    /// remaining principal. Must lie in [0, 0.5]; 0 lets the kernel pick.
    pub grid_size: f64,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            use_natural_settlement_date: true,
            subtract_shorted_from_principal: false,
            use_curve_recovery_for_base_correlation: true,
            exact_jump_to_default: false,
            deep_cloning_in_parallel_sensitivity: true,
            significant_digits: 12,
            parallel_threshold: 4,
            grid_size: 0.0,
        }
    }
}

impl EngineSettings {
    /// Set the natural-settlement-date flag.
    pub fn with_use_natural_settlement_date(mut self, value: bool) -> Self {
        self.use_natural_settlement_date = value;
        self
    }

    /// Set the short-principal folding policy.
    pub fn with_subtract_shorted_from_principal(mut self, value: bool) -> Self {
        self.subtract_shorted_from_principal = value;
        self
    }

    /// Set the base-correlation recovery source policy.
    pub fn with_use_curve_recovery_for_base_correlation(mut self, value: bool) -> Self {
        self.use_curve_recovery_for_base_correlation = value;
        self
    }

    /// Set exact jump-to-default handling.
    pub fn with_exact_jump_to_default(mut self, value: bool) -> Self {
        self.exact_jump_to_default = value;
        self
    }

    /// Set deep cloning on the parallel sensitivity path.
    pub fn with_deep_cloning_in_parallel_sensitivity(mut self, value: bool) -> Self {
        self.deep_cloning_in_parallel_sensitivity = value;
        self
    }

    /// Set the level-rounding precision.
    pub fn with_significant_digits(mut self, digits: u32) -> Self {
        self.significant_digits = digits;
        self
    }

    /// Set the parallel sensitivity threshold.
    pub fn with_parallel_threshold(mut self, threshold: usize) -> Self {
        self.parallel_threshold = threshold;
        self
    }

    /// Set the loss bucket width.
    pub fn with_grid_size(mut self, grid_size: f64) -> Self {
        self.grid_size = grid_size;
        self
    }

    /// Round a loss level to `significant_digits` decimal digits.
    ///
    /// Applied before every surface lookup so that levels reconstructed
    /// through floating arithmetic land back on their grid value.
    pub fn round_level(&self, level: f64) -> f64 {
        let scale = 10f64.powi(self.significant_digits as i32);
        (level * scale).round() / scale
    }
}
