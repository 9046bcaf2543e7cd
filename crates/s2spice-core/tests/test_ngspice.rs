//! End-to-end round trips through an installed ngspice
//!
//! Run with `--features ngspice`; the executable can be overridden with
//! `S2SPICE_NGSPICE`.

#![cfg(feature = "ngspice")]

use ndarray::Array3;
use num_complex::Complex64;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use s2spice_core::spice::{synthesize, SynthesisOptions};
use s2spice_core::verify::{NgspiceBatch, RoundTrip, SweepMode, VerifyOptions};
use s2spice_core::ReferenceImpedance;

fn simulator() -> NgspiceBatch {
    let sim = NgspiceBatch::from_env();
    let version = sim.version().expect("ngspice must be installed for these tests");
    eprintln!("using {}", version);
    sim
}

#[test]
fn test_random_matrix_through_ngspice() {
    let sim = simulator();
    let mut rng = StdRng::seed_from_u64(99);
    let nports = rng.gen_range(1..10);
    let f: Vec<f64> = (0..4).map(|k| 1e6 + 33e6 * k as f64).collect();
    let s = Array3::from_shape_fn((4, nports, nports), |_| {
        Complex64::new(10.0 * rng.gen::<f64>(), 10.0 * rng.gen::<f64>())
    });
    let r: Vec<f64> = (0..nports).map(|_| 100.0 * rng.gen::<f64>() + 1.0).collect();
    let z0 = ReferenceImpedance::per_port_ohms(&r);

    let text = synthesize("rand", &f, s.view(), &z0, None, &SynthesisOptions::default())
        .unwrap()
        .to_string();
    let report = RoundTrip::new(&sim)
        .verify(&text, "rand", &f, s.view(), &z0)
        .unwrap();

    assert!(report.passed(), "{}", report);
}

#[test]
fn test_per_point_through_ngspice() {
    let sim = simulator();
    let f = vec![1e6, 34e6, 67e6, 100e6];
    let s11 = Complex64::new(0.1, 0.05);
    let s21 = Complex64::new(0.9, -0.02);
    let s = Array3::from_shape_fn((4, 2, 2), |(_, i, j)| if i == j { s11 } else { s21 });
    let z0 = ReferenceImpedance::ohms(50.0);

    let text = synthesize("matched", &f, s.view(), &z0, None, &SynthesisOptions::default())
        .unwrap()
        .to_string();
    let report = RoundTrip::new(&sim)
        .with_options(VerifyOptions::default().with_sweep(SweepMode::PerPoint))
        .verify(&text, "matched", &f, s.view(), &z0)
        .unwrap();

    assert!(report.passed(), "{}", report);
}
