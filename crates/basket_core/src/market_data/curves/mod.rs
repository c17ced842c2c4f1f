//! Survival and recovery curve implementations.
//!
//! This module provides:
//! - [`SurvivalCurve`]: contract for survival probability term structures
//! - [`FlatHazardCurve`] / [`PiecewiseHazardCurve`]: concrete hazard models
//! - [`SurvivalCurveEnum`]: static dispatch wrapper shared via `Arc`
//! - [`RecoveryCurve`]: recovery rate term structure with dispersion

mod recovery;
mod survival;

pub use recovery::RecoveryCurve;
pub use survival::{FlatHazardCurve, PiecewiseHazardCurve, SurvivalCurve, SurvivalCurveEnum};
