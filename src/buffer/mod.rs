// src/buffer/mod.rs
//! Sample buffering between the producer task and the output interrupt

pub mod ring_buffer;

pub use ring_buffer::{RingBufferError, RingConsumer, RingProducer, SampleRing};
