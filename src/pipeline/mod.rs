//! Pipeline module - single-run engine and batch scenario pipeline.

mod batch;
mod engine;

pub use batch::*;
pub use engine::*;
