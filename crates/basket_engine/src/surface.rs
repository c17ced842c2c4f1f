//! The distribution surface: a dense grid over time × loss level
//! [× scenario group].

use crate::error::EngineError;

/// What the values stored in a [`DistributionSurface`] mean.
///
/// # Variants
///
/// - `Probability`: cumulative probability P(L ≤ level), in [0, 1]
/// - `ExpectedLoss`: E[min(L, level)] as a fraction of remaining
///   principal
/// - `ExpectedRecovery`: E[min(A, level)] where A is the recovered
///   (amortized) principal fraction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceMeasure {
    /// Cumulative probability P(L ≤ level).
    Probability,
    /// Expected base loss E[min(L, level)].
    ExpectedLoss,
    /// Expected base recovery E[min(A, level)].
    ExpectedRecovery,
}

/// Dense value grid over (time × loss level [× scenario group]).
///
/// Axes:
/// - times: year fractions from the calculation start, first entry 0
/// - levels: fractions of remaining principal, strictly increasing,
///   always containing 0
/// - groups: scenario axis; group 0 is the base case, group i > 0 the
///   portfolio with name i-1 substituted
///
/// Values must be bilinearly interpolable and numerically monotone in
/// the level axis within floating tolerance; see
/// [`DistributionSurface::enforce_level_monotonicity`].
#[derive(Debug, Clone, PartialEq)]
pub struct DistributionSurface {
    measure: SurfaceMeasure,
    times: Vec<f64>,
    levels: Vec<f64>,
    n_groups: usize,
    values: Vec<f64>,
}

impl DistributionSurface {
    /// Construct a zero-filled surface.
    ///
    /// # Arguments
    ///
    /// * `measure` - Meaning of the stored values
    /// * `times` - Strictly increasing year fractions starting at 0
    /// * `levels` - Strictly increasing loss levels containing 0
    /// * `n_groups` - Scenario group count (>= 1)
    ///
    /// # Returns
    ///
    /// * `Err(EngineError::Validation)` - Malformed axes
    pub fn new(
        measure: SurfaceMeasure,
        times: Vec<f64>,
        levels: Vec<f64>,
        n_groups: usize,
    ) -> Result<Self, EngineError> {
        if times.len() < 2 || times[0] != 0.0 {
            return Err(EngineError::Validation(
                "surface needs at least two times starting at 0".to_string(),
            ));
        }
        for w in times.windows(2) {
            if w[1] <= w[0] {
                return Err(EngineError::Validation(
                    "surface times must be strictly increasing".to_string(),
                ));
            }
        }
        if levels.len() < 2 || levels[0] != 0.0 {
            return Err(EngineError::Validation(
                "surface needs at least two levels starting at 0".to_string(),
            ));
        }
        for w in levels.windows(2) {
            if w[1] <= w[0] {
                return Err(EngineError::Validation(
                    "surface levels must be strictly increasing".to_string(),
                ));
            }
        }
        if n_groups == 0 {
            return Err(EngineError::Validation(
                "surface needs at least one scenario group".to_string(),
            ));
        }
        let values = vec![0.0; n_groups * times.len() * levels.len()];
        Ok(Self {
            measure,
            times,
            levels,
            n_groups,
            values,
        })
    }

    /// The value measure.
    #[inline]
    pub fn measure(&self) -> SurfaceMeasure {
        self.measure
    }

    /// The time axis.
    #[inline]
    pub fn times(&self) -> &[f64] {
        &self.times
    }

    /// The level axis.
    #[inline]
    pub fn levels(&self) -> &[f64] {
        &self.levels
    }

    /// Scenario group count.
    #[inline]
    pub fn n_groups(&self) -> usize {
        self.n_groups
    }

    #[inline]
    fn index(&self, group: usize, time_idx: usize, level_idx: usize) -> usize {
        (group * self.times.len() + time_idx) * self.levels.len() + level_idx
    }

    /// Read the value at grid coordinates.
    #[inline]
    pub fn value(&self, group: usize, time_idx: usize, level_idx: usize) -> f64 {
        self.values[self.index(group, time_idx, level_idx)]
    }

    /// Write the value at grid coordinates.
    #[inline]
    pub fn set(&mut self, group: usize, time_idx: usize, level_idx: usize, value: f64) {
        let idx = self.index(group, time_idx, level_idx);
        self.values[idx] = value;
    }

    /// Bilinear interpolation at `(t, level)` for a scenario group.
    ///
    /// The time axis extrapolates flat on both ends (queries before the
    /// start return the start column, queries beyond maturity the final
    /// column); the level axis clamps into its domain.
    pub fn interpolate(&self, group: usize, t: f64, level: f64) -> Result<f64, EngineError> {
        if group >= self.n_groups {
            return Err(EngineError::Validation(format!(
                "scenario group {} out of range ({} groups)",
                group, self.n_groups
            )));
        }
        if !t.is_finite() || !level.is_finite() {
            return Err(EngineError::Validation(format!(
                "non-finite surface query: t = {}, level = {}",
                t, level
            )));
        }

        let t = t.clamp(self.times[0], self.times[self.times.len() - 1]);
        let level = level.clamp(self.levels[0], self.levels[self.levels.len() - 1]);

        let i = Self::cell(&self.times, t);
        let j = Self::cell(&self.levels, level);

        let (t0, t1) = (self.times[i], self.times[i + 1]);
        let (l0, l1) = (self.levels[j], self.levels[j + 1]);

        let u = ((t - t0) / (t1 - t0)).clamp(0.0, 1.0);
        let v = ((level - l0) / (l1 - l0)).clamp(0.0, 1.0);

        let z00 = self.value(group, i, j);
        let z10 = self.value(group, i + 1, j);
        let z01 = self.value(group, i, j + 1);
        let z11 = self.value(group, i + 1, j + 1);

        Ok((1.0 - u) * (1.0 - v) * z00 + u * (1.0 - v) * z10 + (1.0 - u) * v * z01 + u * v * z11)
    }

    /// Clamp small monotonicity violations along the level axis.
    ///
    /// Kernels fill the surface with values that are monotone in exact
    /// arithmetic; floating error can leave inversions of a few ulps.
    /// Violations up to `tolerance` are clamped to the running maximum;
    /// anything larger is a kernel defect and errors.
    pub fn enforce_level_monotonicity(&mut self, tolerance: f64) -> Result<(), EngineError> {
        for group in 0..self.n_groups {
            for i in 0..self.times.len() {
                let mut running = f64::NEG_INFINITY;
                for j in 0..self.levels.len() {
                    let idx = self.index(group, i, j);
                    let v = self.values[idx];
                    if v < running {
                        if running - v > tolerance {
                            return Err(EngineError::Numerical(format!(
                                "surface not monotone in level: drop of {} at t index {}, level index {}",
                                running - v, i, j
                            )));
                        }
                        self.values[idx] = running;
                    } else {
                        running = v;
                    }
                }
            }
        }
        Ok(())
    }
}

impl DistributionSurface {
    #[inline]
    fn cell(axis: &[f64], v: f64) -> usize {
        let pos = axis.partition_point(|&a| a <= v);
        if pos == 0 {
            0
        } else if pos >= axis.len() {
            axis.len() - 2
        } else {
            pos - 1
        }
    }
}
