// tests/consumer_alloc.rs
//! The output tick and a steady-state producer pass must not allocate

use std::alloc::{GlobalAlloc, Layout, System};
use std::cell::Cell;
use std::sync::Arc;

use biosim_core::hal::{ManualTimer, SimulatedDac};
use biosim_core::{ProducerStep, SignalEngine, SignalKind, SystemConfig};

thread_local! {
    static ALLOC_COUNT: Cell<usize> = const { Cell::new(0) };
}

struct CountingAllocator;

unsafe impl GlobalAlloc for CountingAllocator {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        ALLOC_COUNT.with(|c| c.set(c.get() + 1));
        unsafe { System.alloc(layout) }
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        unsafe { System.dealloc(ptr, layout) }
    }
}

#[global_allocator]
static A: CountingAllocator = CountingAllocator;

fn allocations() -> usize {
    ALLOC_COUNT.with(|c| c.get())
}

#[test]
fn tick_and_produce_do_not_allocate() {
    let mut config = SystemConfig::default();
    config.engine.seed = Some(1);
    config.producer.background = false;

    let (timer, handle) = ManualTimer::new();
    let engine = SignalEngine::new(config, Box::new(timer), Arc::new(SimulatedDac::new())).unwrap();

    for kind in SignalKind::ACTIVE {
        engine.start(kind).unwrap();
        // let the first parameter application happen outside the window
        handle.fire(128);
        assert!(matches!(engine.produce_once(), ProducerStep::Generated(_)));

        let before = allocations();
        for _ in 0..200 {
            assert_eq!(handle.fire(128), 128);
            engine.produce_once();
        }
        assert_eq!(allocations(), before, "{:?} steady state allocated", kind);

        // underrun ticks take the same path
        let before = allocations();
        handle.fire(10_000);
        assert_eq!(allocations(), before, "{:?} underrun ticks allocated", kind);
        assert!(engine.performance_stats().underruns > 0);

        engine.stop().unwrap();
    }
}
