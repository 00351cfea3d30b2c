// src/processing/mod.rs
//! Output conditioning: filter chains and quantization

pub mod filters;
pub mod quantizer;

pub use filters::{FilterChain, FilterError, FilterPreset};
pub use quantizer::OutputRange;
