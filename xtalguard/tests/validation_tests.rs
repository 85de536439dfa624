//! Tests for the calculation formulas and classification thresholds

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use xtalguard::classify::{classify_drive_level, classify_gain_margin};
use xtalguard::prelude::*;
use xtalguard::{calculate, Thresholds};

fn reference() -> ParameterSet {
    ParameterSet {
        freq: 25e6,
        c0: 5e-12,
        esr_max: 60.0,
        dl_max: 100e-6,
        gm_mcu: 9.7e-3,
        cl_sel: 22e-12,
        rext_sel: 0.0,
        cs_pin: 4.2e-12,
        cs_pcb: 3.6e-12,
        vpp_measured: 0.125,
        c_probe: 0.9e-12,
    }
}

/// A random but physically plausible design.
fn random_design(rng: &mut StdRng) -> ParameterSet {
    ParameterSet {
        freq: rng.random_range(1e6..60e6),
        c0: rng.random_range(0.5e-12..10e-12),
        esr_max: rng.random_range(10.0..200.0),
        dl_max: rng.random_range(10e-6..1e-3),
        gm_mcu: rng.random_range(1e-3..30e-3),
        cl_sel: rng.random_range(1e-12..40e-12),
        rext_sel: rng.random_range(0.0..2000.0),
        cs_pin: rng.random_range(0.0..8e-12),
        cs_pcb: rng.random_range(0.0..8e-12),
        vpp_measured: rng.random_range(0.01..3.0),
        c_probe: rng.random_range(0.0..15e-12),
    }
}

#[test]
fn test_cl_eff_is_half_of_leg_capacitance() {
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..200 {
        let p = random_design(&mut rng);
        let r = calculate(&p).unwrap();
        let expected = (p.cl_sel + p.cs_pin + p.cs_pcb) / 2.0;
        assert!((r.cl_eff - expected).abs() <= 1e-15 * expected);
    }
}

#[test]
fn test_gm_crit_monotonic_in_every_input() {
    let mut rng = StdRng::seed_from_u64(42);
    let bumps: [(&str, fn(&mut ParameterSet, f64)); 7] = [
        ("ESR_MAX", |p, k| p.esr_max *= k),
        ("REXT_SEL", |p, k| p.rext_sel = p.rext_sel * k + 1.0),
        ("C0", |p, k| p.c0 *= k),
        ("CL_SEL", |p, k| p.cl_sel *= k),
        ("CS_PIN", |p, k| p.cs_pin = p.cs_pin * k + 1e-13),
        ("CS_PCB", |p, k| p.cs_pcb = p.cs_pcb * k + 1e-13),
        ("FREQ", |p, k| p.freq *= k),
    ];

    for _ in 0..200 {
        let base = random_design(&mut rng);
        let before = calculate(&base).unwrap().gm_crit;
        for (name, bump) in &bumps {
            let mut bumped = base;
            bump(&mut bumped, rng.random_range(1.0..3.0));
            let after = calculate(&bumped).unwrap().gm_crit;
            assert!(
                after >= before,
                "gm_crit decreased when {name} increased: {before:e} -> {after:e}"
            );
        }
    }
}

#[test]
fn test_gm_crit_grows_quadratically_with_frequency() {
    let p = reference();
    let mut doubled = p;
    doubled.freq *= 2.0;
    let ratio = calculate(&doubled).unwrap().gm_crit / calculate(&p).unwrap().gm_crit;
    assert!((ratio - 4.0).abs() < 1e-12);
}

#[test]
fn test_drive_level_scaling() {
    let p = reference();
    let base = calculate(&p).unwrap();

    let mut vpp = p;
    vpp.vpp_measured *= 3.0;
    let ratio = calculate(&vpp).unwrap().drive_level / base.drive_level;
    assert!((ratio - 9.0).abs() < 1e-12);

    let mut esr = p;
    esr.esr_max *= 2.0;
    let ratio = calculate(&esr).unwrap().drive_level / base.drive_level;
    assert!((ratio - 2.0).abs() < 1e-12);

    assert_eq!(base.dl_ratio, base.drive_level / p.dl_max);
}

#[test]
fn test_gain_margin_definition() {
    let mut rng = StdRng::seed_from_u64(3);
    for _ in 0..100 {
        let p = random_design(&mut rng);
        let r = calculate(&p).unwrap();
        assert_eq!(r.gain_margin, p.gm_mcu / r.gm_crit);
    }
}

#[test]
fn test_drive_level_ratio_exactly_one_is_not_critical() {
    let mut p = reference();
    p.dl_max = calculate(&p).unwrap().drive_level;

    let result = XtalGuardCore::validate(&p, ValidationOptions::default()).unwrap();
    assert_eq!(result.results.dl_ratio, 1.0);
    assert_eq!(result.classification.drive_level, Status::Warning);
    assert_eq!(
        classify_drive_level(1.0, &Thresholds::default()),
        Status::Warning
    );
}

#[test]
fn test_drive_level_just_above_one_is_critical() {
    let mut p = reference();
    p.dl_max = calculate(&p).unwrap().drive_level * 0.999;
    let result = XtalGuardCore::validate(&p, ValidationOptions::default()).unwrap();
    assert_eq!(result.classification.drive_level, Status::Critical);
    assert_eq!(result.verdict(), Verdict::Fail);
}

#[test]
fn test_gain_margin_exactly_three_is_warning() {
    let t = Thresholds::default();
    assert_eq!(classify_gain_margin(3.0, &t), Status::Warning);
    assert_eq!(classify_gain_margin(3.0 - f64::EPSILON * 4.0, &t), Status::Critical);
}

#[test]
fn test_zero_gm_crit_passes_margin_checks() {
    let mut p = reference();
    p.c0 = 0.0;
    p.cl_sel = 0.0;
    p.cs_pin = 0.0;
    p.cs_pcb = 0.0;
    let result = XtalGuardCore::validate(&p, ValidationOptions::default()).unwrap();
    assert_eq!(result.results.gain_margin, f64::INFINITY);
    assert_eq!(result.classification.startup, Status::Ok);
    assert_eq!(result.classification.gain_margin, Status::Ok);
}

#[test]
fn test_overflow_surfaces_as_calculation_error() {
    let mut store = ParameterStore::new();
    store.set(Parameter::Freq, 1e200).unwrap();
    store.set(Parameter::EsrMax, 60.0).unwrap();
    store.set(Parameter::DlMax, 1e-4).unwrap();
    store.set(Parameter::C0, 5e-12).unwrap();

    let err = XtalGuardCore::validate_store(&store, ValidationOptions::default()).unwrap_err();
    assert!(matches!(err, XtalGuardError::Calculation(_)));
}

#[test]
fn test_issue_structure() {
    let result = XtalGuardCore::validate(&reference(), ValidationOptions::default()).unwrap();
    let rule_ids: Vec<_> = result.issues.iter().map(|i| i.rule_id.as_str()).collect();
    assert_eq!(rule_ids, ["startup_margin", "gain_margin", "drive_level"]);

    for issue in &result.issues {
        assert!(!issue.message.is_empty(), "Issue should have message");
        if issue.status == Status::Ok {
            assert!(issue.suggestion.is_none());
        } else {
            assert!(!issue.suggestion.as_deref().unwrap_or("").is_empty());
        }
    }
}

#[test]
fn test_validation_rejects_empty_warning_band() {
    let options = ValidationOptions {
        thresholds: Thresholds {
            gain_margin_target: 2.0,
            ..Thresholds::default()
        },
        strict_mode: false,
    };
    let err = XtalGuardCore::validate(&reference(), options).unwrap_err();
    assert!(matches!(err, XtalGuardError::Thresholds(_)), "{}", err);
}
