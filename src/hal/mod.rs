// src/hal/mod.rs
//! Hardware abstraction for the output timer and the analog output

pub mod simulator;
pub mod traits;
pub mod types;


pub use simulator::{ManualTimer, ManualTimerHandle, SimulatedDac, ThreadTimer};
pub use traits::*;
pub use types::*;
