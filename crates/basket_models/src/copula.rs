//! Copula specification.

use serde::{Deserialize, Serialize};

/// The joint-dependence model linking individual default times through
/// common and idiosyncratic factors.
///
/// Kernels receive the specification opaquely; a kernel that does not
/// support a family rejects it with an unsupported-operation error
/// rather than silently approximating.
///
/// # Variants
///
/// - `Gaussian`: one-factor Gaussian copula
/// - `StudentT`: Student-t copula with the given degrees of freedom
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum CopulaSpec {
    /// One-factor Gaussian copula.
    Gaussian,
    /// Student-t copula.
    StudentT {
        /// Degrees of freedom, > 2
        dof: f64,
    },
}

impl CopulaSpec {
    /// Whether the specification parameters are well formed.
    pub fn is_valid(&self) -> bool {
        match self {
            CopulaSpec::Gaussian => true,
            CopulaSpec::StudentT { dof } => dof.is_finite() && *dof > 2.0,
        }
    }
}
