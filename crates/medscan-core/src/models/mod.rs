//! Domain models for the medscan pipeline.

mod medicine;
mod terminology;

pub use medicine::*;
pub use terminology::*;
