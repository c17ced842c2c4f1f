//! Core types: dates, day counts, and structured errors.

pub mod error;
pub mod time;

pub use error::{DateError, InterpolationError};
pub use time::{Date, DayCountConvention, TimeStep, TimeUnit};
