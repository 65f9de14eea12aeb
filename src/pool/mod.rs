//! Pool module - bounded scenario evaluation.

mod scenario;

pub use scenario::*;
