//! Factor-correlation models.
//!
//! This module provides:
//! - [`CorrelationStructure`]: tagged enum over the supported model kinds
//! - [`CorrelationModel`]: versioned wrapper with mutation operations
//! - [`FactorTermStructure`]: resolved per-tenor loading matrix consumed
//!   by distribution kernels

mod model;
mod term_structure;

pub use model::{CorrelationModel, CorrelationStructure};
pub use term_structure::FactorTermStructure;
