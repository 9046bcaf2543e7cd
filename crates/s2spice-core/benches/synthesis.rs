//! Benchmarks for subcircuit synthesis and in-memory round trips

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ndarray::Array3;
use num_complex::Complex64;
use s2spice_core::frequency::{Frequency, FrequencyUnit, SweepType};
use s2spice_core::spice::{synthesize, SynthesisOptions};
use s2spice_core::verify::{MnaBackend, RoundTrip};
use s2spice_core::ReferenceImpedance;
use std::f64::consts::PI;

/// Frequency grid and S-parameters with realistic magnitudes
fn create_test_data(nfreq: usize, nports: usize) -> (Frequency, Array3<Complex64>) {
    let freq = Frequency::new(1.0, 10.0, nfreq, FrequencyUnit::GHz, SweepType::Linear);

    let s = Array3::from_shape_fn((nfreq, nports, nports), |(f, i, j)| {
        let phase = 2.0 * PI * f as f64 / nfreq as f64;
        let mag = if i == j { 0.1 } else { 0.9 };
        Complex64::from_polar(mag, phase * (i + j + 1) as f64)
    });

    (freq, s)
}

fn bench_synthesize(c: &mut Criterion) {
    let mut group = c.benchmark_group("synthesize");
    let z0 = ReferenceImpedance::ohms(50.0);
    let options = SynthesisOptions::default();

    for nfreq in [10, 100, 1000].iter() {
        for nports in [1, 4, 16].iter() {
            let (freq, s) = create_test_data(*nfreq, *nports);
            let id = BenchmarkId::new(format!("{}ports", nports), nfreq);

            group.bench_with_input(id, nfreq, |b, _| {
                b.iter(|| {
                    let sub = synthesize("bench", freq.f(), s.view(), &z0, None, &options).unwrap();
                    black_box(sub.to_string())
                })
            });
        }
    }

    group.finish();
}

fn bench_mna_round_trip(c: &mut Criterion) {
    let mut group = c.benchmark_group("mna_round_trip");
    let z0 = ReferenceImpedance::ohms(50.0);
    let backend = MnaBackend::new();

    for nports in [1, 2, 4].iter() {
        let (freq, s) = create_test_data(16, *nports);
        let text = synthesize("bench", freq.f(), s.view(), &z0, None, &SynthesisOptions::default())
            .unwrap()
            .to_string();
        let id = BenchmarkId::from_parameter(nports);

        group.bench_with_input(id, nports, |b, _| {
            b.iter(|| {
                black_box(
                    RoundTrip::new(&backend)
                        .measure(&text, "bench", freq.f(), &z0)
                        .unwrap(),
                )
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_synthesize, bench_mna_round_trip);
criterion_main!(benches);
