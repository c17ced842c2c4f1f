//! Distribution kernels: numerical back-ends that fill a
//! [`DistributionSurface`] from pool, correlation, and copula inputs.
//!
//! The engine owns grids, caching, and level bookkeeping; kernels own
//! the probability model. Two back-ends are provided:
//!
//! - [`RecursiveGaussianKernel`]: exact conditional-independence bucket
//!   recursion under a Gaussian one-factor copula
//! - [`LargePoolKernel`]: Vasicek large-homogeneous-pool approximation

mod large_pool;
mod recursive;

pub use large_pool::LargePoolKernel;
pub use recursive::RecursiveGaussianKernel;

use std::fmt::Debug;

use basket_models::copula::CopulaSpec;
use basket_models::correlation::FactorTermStructure;
use basket_models::pool::CreditPool;

use crate::error::EngineError;
use crate::surface::{DistributionSurface, SurfaceMeasure};

/// Everything a kernel needs to fill one batch of surface columns.
///
/// `pool` is the active (post default adjustment) pool; `principals`
/// are the matching scaled absolute principal weights. `times` holds
/// the year fractions for the surface time axis, with `times[0] == 0`.
#[derive(Debug)]
pub struct KernelRequest<'a> {
    /// Measure the target surface stores.
    pub measure: SurfaceMeasure,
    /// First time index to fill (inclusive).
    pub start_index: usize,
    /// Last time index to fill (exclusive).
    pub stop_index: usize,
    /// Dependence model for the latent factor.
    pub copula: CopulaSpec,
    /// Resolved factor loadings per surface tenor.
    pub factors: &'a FactorTermStructure,
    /// Active names.
    pub pool: &'a CreditPool,
    /// Scaled absolute principals aligned with `pool`.
    pub principals: &'a [f64],
    /// Year fractions backing the surface time axis.
    pub times: &'a [f64],
    /// Requested loss bucket width, 0 meaning kernel default.
    pub grid_size: f64,
}

impl KernelRequest<'_> {
    /// Validate index ranges and array alignment before dispatch.
    pub fn validate(&self, surface: &DistributionSurface) -> Result<(), EngineError> {
        if self.stop_index > surface.times().len() || self.start_index >= self.stop_index {
            return Err(EngineError::Validation(format!(
                "kernel time range [{}, {}) outside surface with {} times",
                self.start_index,
                self.stop_index,
                surface.times().len()
            )));
        }
        if self.principals.len() != self.pool.len() {
            return Err(EngineError::Validation(format!(
                "kernel principals length {} does not match pool size {}",
                self.principals.len(),
                self.pool.len()
            )));
        }
        if self.times.len() != surface.times().len() {
            return Err(EngineError::Validation(
                "kernel times do not match surface time axis".to_string(),
            ));
        }
        if self.factors.n_names() != self.pool.len()
            || self.factors.tenors().len() != self.times.len()
        {
            return Err(EngineError::Validation(
                "factor term structure does not match pool and time axis".to_string(),
            ));
        }
        if self.measure != surface.measure() {
            return Err(EngineError::Validation(
                "kernel measure does not match surface measure".to_string(),
            ));
        }
        Ok(())
    }
}

/// Numerical back-end filling loss distribution surfaces.
///
/// Implementations must be deterministic: identical requests must
/// produce identical surfaces, byte for byte, so that cached and
/// recomputed results interchange freely.
pub trait DistributionKernel: Send + Sync + Debug {
    /// Fill columns `[start_index, stop_index)` of group 0 of `surface`.
    fn compute(
        &self,
        request: &KernelRequest<'_>,
        surface: &mut DistributionSurface,
    ) -> Result<(), EngineError>;
}
