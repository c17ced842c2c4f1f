//! Credit market data: survival and recovery term structures.

pub mod curves;
pub mod error;

pub use error::MarketDataError;
