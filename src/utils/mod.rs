//! Clock utilities shared by the engine and its tests

pub mod time;

pub use time::{
    current_timestamp_micros,
    current_timestamp_nanos,
    MockTimeProvider,
    MonotonicTimeProvider,
    TimeProvider,
};
