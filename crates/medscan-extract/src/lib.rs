//! Extraction model adapter.
//!
//! Prompts for the prescription-reading model and parsing of its JSON answer into
//! medicine entries ready for normalization.

pub mod extraction;
pub mod prompts;

pub use extraction::*;
pub use prompts::*;
