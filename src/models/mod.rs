//! Core data models for qerra.
//!
//! Epistemic mapping:
//! - K_i (Knowledge): Validated value types with construction-time invariants
//! - B_i (Beliefs): Wrapped in Result/Option
//! - I^R (Resolvable): Config parameters
//! - I^B (Bounded): Error variants the caller can recover from

mod allocation;
mod config;
mod decision;
mod error;

pub use allocation::*;
pub use config::*;
pub use decision::*;
pub use error::*;
