// src/engine/mod.rs
//! Real-time output engine
//!
//! A producer fills the sample ring a block at a time from the active model;
//! the timer-driven [`OutputDriver`] drains it one sample per tick.

pub mod consumer;
mod generator;
mod monitor;
pub mod producer;
pub mod signal_engine;
pub mod state;
pub mod stats;
mod task;

pub use consumer::OutputDriver;
pub use producer::ProducerStep;
pub use signal_engine::{SignalEngine, SignalSnapshot};
pub use state::SignalState;
pub use stats::{PerformanceCounters, PerformanceStats};
