//! Integration tests for subcircuit synthesis

use ndarray::{Array1, Array3};
use num_complex::Complex64;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use s2spice_core::error::SynthesisError;
use s2spice_core::frequency::Frequency;
use s2spice_core::spice::{synthesize, SynthesisOptions};
use s2spice_core::verify::{scan_subcircuits, Deck};
use s2spice_core::{Network, ReferenceImpedance};

const TEST_DATA_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/../../tests/data");

fn random_s(rng: &mut StdRng, nfreq: usize, nports: usize) -> Array3<Complex64> {
    Array3::from_shape_fn((nfreq, nports, nports), |_| {
        Complex64::new(10.0 * rng.gen::<f64>(), 10.0 * rng.gen::<f64>())
    })
}

fn linspace(start: f64, stop: f64, n: usize) -> Vec<f64> {
    (0..n)
        .map(|k| start + (stop - start) * k as f64 / (n - 1) as f64)
        .collect()
}

#[test]
fn test_synthesis_is_deterministic() {
    let mut rng = StdRng::seed_from_u64(7);
    let f = linspace(1e6, 100e6, 4);
    let s = random_s(&mut rng, 4, 3);
    let z0 = ReferenceImpedance::per_port_ohms(&[50.0, 75.0, 12.5]);
    let options = SynthesisOptions::default();

    let first = synthesize("dut", &f, s.view(), &z0, None, &options)
        .unwrap()
        .to_string();
    let second = synthesize("dut", &f, s.view(), &z0, None, &options)
        .unwrap()
        .to_string();

    assert_eq!(first, second);
}

#[test]
fn test_capacity_boundary() {
    let f = vec![1e6];
    let options = SynthesisOptions::default();
    assert_eq!(options.max_ports(), 98);

    let s = Array3::<Complex64>::zeros((1, 98, 98));
    let sub = synthesize("wide", &f, s.view(), &ReferenceImpedance::ohms(50.0), None, &options)
        .expect("98 ports fit a node base of 100");
    assert_eq!(sub.model_count(), 98 * 98);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("too_wide.inc");
    let s = Array3::<Complex64>::zeros((1, 99, 99));
    let z0 = Array1::from_elem(99, Complex64::new(50.0, 0.0));
    let ntwk = Network::new(Frequency::from_hz(f.clone()), s, z0)
        .unwrap()
        .with_name("too_wide");

    let err = ntwk.write_spice(&path, None, &options, false).unwrap_err();
    assert!(matches!(
        err,
        SynthesisError::TooManyPorts {
            nports: 99,
            max: 98,
            base: 100
        }
    ));
    assert!(!path.exists());
}

#[test]
fn test_larger_node_base_lifts_capacity() {
    let f = vec![1e6];
    let s = Array3::<Complex64>::zeros((1, 99, 99));
    let options = SynthesisOptions::default().with_node_base(1000);

    let sub = synthesize("wide", &f, s.view(), &ReferenceImpedance::ohms(50.0), None, &options)
        .unwrap();
    let text = sub.to_string();
    assert!(text.contains("R99N 99 99000 -50.0\n"));
    assert!(text.contains("A99099 %vd(99000 100) %vd(99099, 100) xfer9801\n"));
}

#[test]
fn test_scalar_reference_matches_per_port() {
    let mut rng = StdRng::seed_from_u64(11);
    let f = linspace(1e6, 100e6, 4);
    let s = random_s(&mut rng, 4, 4);
    let options = SynthesisOptions::default();

    let scalar = synthesize("dut", &f, s.view(), &ReferenceImpedance::ohms(42.0), None, &options)
        .unwrap()
        .to_string();
    let per_port = synthesize(
        "dut",
        &f,
        s.view(),
        &ReferenceImpedance::per_port_ohms(&[42.0; 4]),
        None,
        &options,
    )
    .unwrap()
    .to_string();

    assert_eq!(scalar, per_port);
}

#[test]
fn test_structure_depends_on_port_count() {
    let f = linspace(1e6, 100e6, 4);
    let mut previous = None;

    for n in 1..=5 {
        let s = Array3::<Complex64>::zeros((4, n, n));
        let sub = synthesize(
            "dut",
            &f,
            s.view(),
            &ReferenceImpedance::ohms(50.0),
            None,
            &SynthesisOptions::default(),
        )
        .unwrap();

        assert_eq!(sub.pins().len(), n + 1);
        assert_eq!(sub.model_count(), n * n);
        assert_eq!(sub.terminations().len(), 2 * n);
        // pins, reference, and one incident plus N chain nodes per port
        assert_eq!(sub.node_ids().len(), n + 1 + n * (n + 1));

        let ids = sub.node_ids();
        assert_ne!(previous.as_ref(), Some(&ids));
        previous = Some(ids);
    }
}

#[test]
fn test_tables_keep_every_value() {
    let f = vec![1.5e6, 2.0e6, 1e16];
    let values = [
        Complex64::new(-0.123456789012345, 1e-17),
        Complex64::new(0.0, -0.0),
        Complex64::new(1e300, -7.25),
    ];
    let s = Array3::from_shape_fn((3, 1, 1), |(k, _, _)| values[k]);

    let text = synthesize(
        "precise",
        &f,
        s.view(),
        &ReferenceImpedance::ohms(50.0),
        None,
        &SynthesisOptions::default(),
    )
    .unwrap()
    .to_string();

    let deck = Deck::parse(&text).unwrap();
    let table = deck.subckt("precise").unwrap().model("xfer1").unwrap();
    assert_eq!(table.points().len(), 3);
    for (k, &(freq, value)) in table.points().iter().enumerate() {
        assert_eq!(freq, f[k]);
        assert_eq!(value, values[k]);
    }
    assert!(text.contains("+ 1e16 1e300 -7.25\n"));
}

#[test]
fn test_output_scans_as_subcircuit() {
    let f = linspace(1e6, 100e6, 4);
    let s = Array3::<Complex64>::zeros((4, 3, 3));
    let text = synthesize(
        "three",
        &f,
        s.view(),
        &ReferenceImpedance::ohms(50.0),
        None,
        &SynthesisOptions::default(),
    )
    .unwrap()
    .to_string();

    assert_eq!(scan_subcircuits(&text), vec![("three".to_string(), 4)]);
    assert!(text.ends_with(".ENDS\n"));
    assert!(text.contains("**  X<inst> three Port1 Port2 Port3 GND\n"));
}

#[test]
fn test_touchstone_to_include_file() {
    let input = format!("{}/matched_line.s2p", TEST_DATA_DIR);
    let ntwk = Network::from_touchstone(&input).unwrap();
    assert_eq!(ntwk.name.as_deref(), Some("matched_line"));
    let comments = ntwk.header_comments();

    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("matched_line.inc");
    ntwk.write_spice(&output, Some(comments.as_slice()), &SynthesisOptions::default(), false)
        .unwrap();

    let text = std::fs::read_to_string(&output).unwrap();
    assert!(text.starts_with(
        "*  Near-ideal matched two-port\n*  Measured on bench 3, port 1 to port 2\n*\n"
    ));
    assert!(text.contains(".SUBCKT matched_line 1 2 gnd_node\n"));
    assert!(text.contains("+ 34000000.0 0.9 -0.02\n"));

    // a second write without overwrite is refused and leaves the file alone
    let err = ntwk
        .write_spice(&output, Some(comments.as_slice()), &SynthesisOptions::default(), false)
        .unwrap_err();
    assert!(matches!(err, SynthesisError::OutputExists(_)));
    assert_eq!(std::fs::read_to_string(&output).unwrap(), text);
}
