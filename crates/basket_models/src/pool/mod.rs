//! Credit pool snapshot: names, principals, curves, default bookkeeping.

mod name;
#[allow(clippy::module_inception)]
mod pool;

pub use name::{CreditName, DefaultStatus};
pub use pool::{CreditPool, DefaultAdjustment};
