//! # basket_models (L2: Data Model)
//!
//! Credit pool, correlation, and copula abstractions for the basket
//! loss engine.
//!
//! This crate provides:
//! - Credit pool snapshot: [`pool::CreditName`], [`pool::CreditPool`]
//! - Correlation models as a tagged enum with an explicit version
//!   counter: [`correlation::CorrelationModel`]
//! - Copula specification: [`copula::CopulaSpec`]
//! - Base-correlation surface contract: [`basecorr::BaseCorrelationSurface`]
//!
//! ## Design Principles
//!
//! - **Enum-based models** for static dispatch and exhaustive matching
//! - **Immutable pool snapshots**; defaulted names are filtered into a
//!   picks mask, never mutated in place
//! - **Version counters instead of modified flags** so derived term
//!   structures can be cached and invalidated structurally

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]

pub mod basecorr;
pub mod copula;
pub mod correlation;
pub mod error;
pub mod pool;

pub use error::ModelError;
