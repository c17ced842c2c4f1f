//! # basket_core: Foundation for the Correlated Credit Basket Engine
//!
//! ## Layer 1 (Foundation) Role
//!
//! basket_core is the bottom layer of the 4-layer architecture, providing:
//! - Time types: `Date`, `DayCountConvention`, `TimeStep` (`types::time`)
//! - Error types: `DateError`, `InterpolationError` (`types::error`)
//! - Interpolators: linear and bilinear (`math::interpolators`)
//! - Credit market data: survival and recovery curves (`market_data`)
//! - Engine configuration: `EngineSettings` (`settings`)
//!
//! ## Zero Dependency Principle
//!
//! Layer 1 has no dependencies on other basket_* crates, with minimal
//! external dependencies:
//! - num-traits: Traits for generic numerical computation
//! - chrono: Date arithmetic
//! - thiserror: Structured error derivation
//! - serde: Serialisation of plain-data types
//!
//! ## Usage Example
//!
//! ```rust
//! use basket_core::market_data::curves::{FlatHazardCurve, SurvivalCurve};
//! use basket_core::types::{Date, DayCountConvention};
//!
//! let start = Date::from_ymd(2026, 1, 1).unwrap();
//! let end = Date::from_ymd(2027, 1, 1).unwrap();
//! let t = DayCountConvention::Act365Fixed.year_fraction(start, end);
//!
//! let curve = FlatHazardCurve::new(0.02).unwrap();
//! let surv = curve.survival(t).unwrap();
//! assert!(surv > 0.97 && surv < 0.99);
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]

pub mod market_data;
pub mod math;
pub mod settings;
pub mod types;
