use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::sync::Arc;

use biosim_core::buffer::SampleRing;
use biosim_core::config::{FilterSettings, SystemConfig};
use biosim_core::engine::OutputDriver;
use biosim_core::engine::PerformanceCounters;
use biosim_core::hal::{ManualTimer, SimulatedDac};
use biosim_core::models::{
    EcgCondition, EcgModel, EcgParameters, EmgCondition, EmgModel, EmgParameters, PpgCondition,
    PpgModel, PpgParameters,
};
use biosim_core::processing::FilterChain;
use biosim_core::utils::MockTimeProvider;
use biosim_core::{ParameterSet, SignalEngine, SignalKind, WaveformModel};

const BUFFER_SIZES: &[usize] = &[256, 1024, 4096];
const BLOCK_SIZES: &[usize] = &[32, 128, 512];
const SAMPLES_PER_ITER: u64 = 1000;
const DT: f32 = 0.001;

fn benchmark_ring_buffer_operations(c: &mut Criterion) {
    let mut group = c.benchmark_group("ring_buffer");
    group.throughput(Throughput::Elements(SAMPLES_PER_ITER));

    for &capacity in BUFFER_SIZES {
        group.bench_with_input(BenchmarkId::new("push_pop", capacity), &capacity, |b, &size| {
            let (mut producer, mut consumer) = SampleRing::split(size).unwrap();
            b.iter(|| {
                for i in 0..SAMPLES_PER_ITER {
                    let _ = producer.push(black_box(i as u8));
                    black_box(consumer.pop());
                }
            });
        });

        group.bench_with_input(BenchmarkId::new("push_slice", capacity), &capacity, |b, &size| {
            let (mut producer, mut consumer) = SampleRing::split(size).unwrap();
            let block = vec![128u8; SAMPLES_PER_ITER as usize];
            b.iter(|| {
                let written = producer.push_slice(black_box(&block));
                for _ in 0..written {
                    black_box(consumer.pop());
                }
            });
        });
    }

    group.finish();
}

fn run_model<M: WaveformModel>(model: &mut M) {
    for _ in 0..SAMPLES_PER_ITER {
        black_box(model.next_value(black_box(DT)));
    }
}

fn benchmark_waveform_models(c: &mut Criterion) {
    let mut group = c.benchmark_group("models");
    group.throughput(Throughput::Elements(SAMPLES_PER_ITER));

    for condition in [EcgCondition::Normal, EcgCondition::PrematureVentricular, EcgCondition::VentricularFibrillation] {
        group.bench_with_input(BenchmarkId::new("ecg", format!("{:?}", condition)), &condition, |b, &c| {
            let mut model = EcgModel::new(7);
            model.set_parameters(&EcgParameters::for_condition(c));
            model.reset();
            b.iter(|| run_model(&mut model));
        });
    }

    for condition in [EmgCondition::LowContraction, EmgCondition::HighContraction, EmgCondition::Neuropathy] {
        group.bench_with_input(BenchmarkId::new("emg", format!("{:?}", condition)), &condition, |b, &c| {
            let mut model = EmgModel::new(7);
            model.set_parameters(&EmgParameters::for_condition(c));
            model.reset();
            b.iter(|| run_model(&mut model));
        });
    }

    for condition in [PpgCondition::Normal, PpgCondition::Arrhythmia] {
        group.bench_with_input(BenchmarkId::new("ppg", format!("{:?}", condition)), &condition, |b, &c| {
            let mut model = PpgModel::new(7);
            model.set_parameters(&PpgParameters::for_condition(c));
            model.reset();
            b.iter(|| run_model(&mut model));
        });
    }

    group.finish();
}

fn benchmark_filter_chains(c: &mut Criterion) {
    let mut group = c.benchmark_group("filter_chain");
    group.throughput(Throughput::Elements(SAMPLES_PER_ITER));
    let settings = FilterSettings::default();

    for kind in SignalKind::ACTIVE {
        group.bench_with_input(BenchmarkId::from_parameter(format!("{:?}", kind)), &kind, |b, &kind| {
            let mut chain = FilterChain::for_kind(kind, &settings, 1000.0).unwrap();
            let mut x = 0.0f32;
            b.iter(|| {
                for _ in 0..SAMPLES_PER_ITER {
                    x = (x + 0.37) % 1.0;
                    black_box(chain.process_sample(black_box(x)));
                }
            });
        });
    }

    group.finish();
}

fn benchmark_output_tick(c: &mut Criterion) {
    let mut group = c.benchmark_group("output_tick");
    group.throughput(Throughput::Elements(SAMPLES_PER_ITER));

    group.bench_function("drain_and_underrun", |b| {
        let (mut producer, consumer) = SampleRing::split(2048).unwrap();
        let counters = Arc::new(PerformanceCounters::new());
        let dac = Arc::new(SimulatedDac::new());
        let mut driver = OutputDriver::with_clock(consumer, counters, dac, MockTimeProvider::with_auto_step(0, 100));
        let block = vec![200u8; SAMPLES_PER_ITER as usize / 2];
        b.iter(|| {
            producer.push_slice(&block);
            for _ in 0..SAMPLES_PER_ITER {
                driver.tick();
            }
        });
    });

    group.finish();
}

fn benchmark_producer_blocks(c: &mut Criterion) {
    let mut group = c.benchmark_group("producer");

    for &block in BLOCK_SIZES {
        group.throughput(Throughput::Elements(block as u64));
        for kind in SignalKind::ACTIVE {
            group.bench_with_input(
                BenchmarkId::new(format!("{:?}", kind), block),
                &(kind, block),
                |b, &(kind, block)| {
                    let mut config = SystemConfig::default();
                    config.engine.block_size = block;
                    config.engine.seed = Some(42);
                    config.producer.background = false;

                    let (timer, handle) = ManualTimer::new();
                    let engine =
                        SignalEngine::new(config, Box::new(timer), Arc::new(SimulatedDac::new())).unwrap();
                    engine
                        .start_with(ParameterSet::defaults_for(kind).unwrap())
                        .unwrap();

                    b.iter(|| {
                        handle.fire(block);
                        black_box(engine.produce_once());
                    });
                },
            );
        }
    }

    group.finish();
}

criterion_group!(
    benches,
    benchmark_ring_buffer_operations,
    benchmark_waveform_models,
    benchmark_filter_chains,
    benchmark_output_tick,
    benchmark_producer_blocks
);
criterion_main!(benches);
