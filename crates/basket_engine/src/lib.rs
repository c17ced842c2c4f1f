//! # basket_engine (L3: Loss Engine)
//!
//! The basket loss-distribution and tranche extraction engine.
//!
//! This crate provides:
//! - [`surface::DistributionSurface`]: the (time × loss-level [× group])
//!   value grid with bilinear interpolation
//! - [`kernel::DistributionKernel`]: the pluggable convolution kernel
//!   contract, with two reference kernels (recursive Gaussian and
//!   large-homogeneous-pool semi-analytic)
//! - [`engine::LossEngine`] / [`engine::HeterogeneousBasket`]: the core
//!   engine orchestrating defaulted-name removal, loss-level
//!   bookkeeping, surface caching, and tranche extraction
//! - [`composer::BaseCorrelationBasket`]: the base-correlation composed
//!   engine pricing a tranche as the difference of two [0, K] baskets
//!
//! ## Design Principles
//!
//! - **One engine contract, enum dispatch**: concrete models implement
//!   [`engine::LossEngine`] and are wrapped in [`engine::BasketPricer`]
//!   for static dispatch and cheap deep copies
//! - **Caches keyed by version counters**, never by mutation flags
//! - **Arithmetic degeneracies handled locally**: near-zero remaining
//!   baskets clamp to realized values instead of propagating NaN

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]

pub mod composer;
pub mod engine;
pub mod error;
pub mod kernel;
pub mod surface;

pub use error::EngineError;

#[cfg(test)]
mod integration_tests;
