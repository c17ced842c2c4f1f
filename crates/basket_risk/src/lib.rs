//! # basket_risk (L4: Sensitivities)
//!
//! Bump-and-reprice sensitivity tables over the basket engines.
//!
//! This crate provides:
//! - [`evaluator::TrancheEvaluator`]: the pricing-measure contract the
//!   sensitivity loop is generic over, with the canonical
//!   [`evaluator::ExpectedLossEvaluator`]
//! - [`bumped_pvs`]: the (M+1) × N table of evaluator values under
//!   per-name survival/recovery curve bumps, plus jump-to-default
//!   scenario rows for announced-but-unsettled defaults
//! - [`SensitivityConfig`]: per-call overrides on top of the pricer's
//!   engine settings, which carry the parallelism knobs
//!
//! ## Design Principles
//!
//! - **Fork-join only**: rayon parallelism is confined to the row loop,
//!   each worker pricing on its own deep copy; no shared mutation
//! - **Bit-identical paths**: the parallel table equals the sequential
//!   table exactly, because each row is a pure function of the base
//!   engine and its bump
//! - **Reference-identity short-circuit**: a bump whose curve is the
//!   same `Arc` as the live one copies the base row instead of
//!   repricing

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]

pub mod bumped_pvs;
pub mod error;
pub mod evaluator;

pub use bumped_pvs::{bumped_pvs, SensitivityConfig};
pub use error::RiskError;
pub use evaluator::{ExpectedLossEvaluator, TrancheEvaluator};
