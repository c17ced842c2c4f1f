//! Numerical building blocks shared across the basket crates.

pub mod interpolators;
