// tests/validation.rs
//
// Physics-level checks of the full pipeline (source -> cap -> propagate -> analyze).
// Run with: cargo test
// Or only these tests: cargo test --test validation
// The 512×512 scenario is slow in debug builds; prefer `cargo test --release`.

use approx::assert_relative_eq;

use concave_fiber_sim::analysis::{analyze, LEVEL_1E2};
use concave_fiber_sim::error::{ConfigurationError, SamplingWarning};
use concave_fiber_sim::params::{
    FiberParams, GridParams, PropagationMethod, SagModel, SimConfig, SourceProfile, SweepSpec,
};
use concave_fiber_sim::phase_screen::{apply_concave_cap, ApertureSpec};
use concave_fiber_sim::propagation::propagate;
use concave_fiber_sim::source::init_fiber_mode;
use concave_fiber_sim::sweep::{run_sweep, Trend};

fn medium_grid() -> GridParams {
    GridParams {
        n: 256,
        window: 100e-6,
    }
}

fn radii_um(values: &[f64]) -> Vec<f64> {
    values.iter().map(|v| v * 1e-6).collect()
}

#[test]
fn flat_face_cap_is_aperture_only() {
    let fiber = FiberParams::default();
    let grid = medium_grid();
    let u = init_fiber_mode(&fiber, &grid, SourceProfile::Gaussian).unwrap();
    let ap = ApertureSpec::from_core(fiber.core_radius, 2.0);

    let flat = apply_concave_cap(&u, f64::INFINITY, &ap, SagModel::Paraxial).unwrap();
    assert!(flat.warnings.is_empty());

    // Same as masking by hand.
    let g = u.grid;
    let a2 = ap.radius * ap.radius;
    for j in 0..g.n {
        for i in 0..g.n {
            let expected = if g.r2(i, j) <= a2 {
                u.at(i, j)
            } else {
                Default::default()
            };
            assert_eq!(flat.field.at(i, j), expected);
        }
    }
}

#[test]
fn flat_face_propagates_like_unmodified_mode() {
    // Aperture wide enough (≈5 w0) that the hard stop removes no measurable power.
    let fiber = FiberParams::default();
    let grid = medium_grid();
    let u = init_fiber_mode(&fiber, &grid, SourceProfile::Gaussian).unwrap();
    let ap = ApertureSpec::from_core(fiber.core_radius, 6.0);
    let z = 1e-3;

    let reference = propagate(&u, z, PropagationMethod::Auto).unwrap();
    let capped = apply_concave_cap(&u, f64::INFINITY, &ap, SagModel::Paraxial).unwrap();
    let through = propagate(&capped.field, z, PropagationMethod::Auto).unwrap();

    let w_ref = analyze(&reference.field).width.unwrap();
    let w_flat = analyze(&through.field).width.unwrap();
    assert_relative_eq!(w_flat, w_ref, max_relative = 1e-4);

    // Also against the analytic Gaussian beam.
    let w0 = 0.5 * fiber.mode_field_diameter();
    let zr = std::f64::consts::PI * w0 * w0 / fiber.wavelength;
    let w_exact = 2.0 * w0 * (1.0 + (z / zr).powi(2)).sqrt();
    assert_relative_eq!(w_ref, w_exact, max_relative = 0.01);
}

#[test]
fn divergence_grows_monotonically_with_inverse_radius() {
    let cfg = SimConfig {
        grid: medium_grid(),
        sweep: SweepSpec::List {
            values: radii_um(&[30.0, 40.0, 50.0, 75.0, 100.0, 150.0, 200.0]),
        },
        ..SimConfig::default()
    };
    let report = run_sweep(&cfg).unwrap();
    assert_eq!(report.failed().count(), 0);

    let flat_w = report.flat.metrics.width.unwrap();
    let widths: Vec<f64> = report.completed().map(|r| r.width().unwrap()).collect();
    assert_eq!(widths.len(), 7);

    // Ascending Rc: widths must not increase, and all exceed the flat face.
    for pair in widths.windows(2) {
        assert!(pair[1] <= pair[0], "widths not monotone: {:?}", widths);
    }
    assert!(
        *widths.last().unwrap() >= flat_w,
        "largest radius narrower than flat face: {:e} < {:e}",
        widths.last().unwrap(),
        flat_w
    );

    let excess: Vec<f64> = report
        .completed()
        .map(|r| r.excess_divergence.unwrap())
        .collect();
    for pair in excess.windows(2) {
        assert!(pair[1] <= pair[0], "excess divergence not monotone: {:?}", excess);
    }
    assert!(excess.iter().all(|&e| e >= 0.0));
    assert_eq!(report.trend(), Trend::MonotonicNonDecreasing);
}

#[test]
fn field_outside_aperture_is_exactly_zero() {
    let fiber = FiberParams::default();
    let grid = medium_grid();
    let u = init_fiber_mode(&fiber, &grid, SourceProfile::Gaussian).unwrap();
    let ap = ApertureSpec::from_core(fiber.core_radius, 2.0);
    let g = u.grid;
    let a2 = ap.radius * ap.radius;

    for rc in radii_um(&[30.0, 50.0, 100.0, 200.0])
        .into_iter()
        .chain([f64::INFINITY])
    {
        for sag in [SagModel::Paraxial, SagModel::Spherical] {
            let out = apply_concave_cap(&u, rc, &ap, sag).unwrap();
            for j in 0..g.n {
                for i in 0..g.n {
                    if g.r2(i, j) > a2 {
                        let v = out.field.at(i, j);
                        assert!(
                            v.re == 0.0 && v.im == 0.0,
                            "non-zero sample outside aperture at ({}, {}) for Rc={:e}",
                            i,
                            j,
                            rc
                        );
                    }
                }
            }
        }
    }
}

#[test]
fn propagation_never_creates_energy() {
    let fiber = FiberParams::default();
    let grid = medium_grid();
    let u = init_fiber_mode(&fiber, &grid, SourceProfile::Gaussian).unwrap();
    let ap = ApertureSpec::from_core(fiber.core_radius, 2.0);
    let tol = 1e-9;

    for rc in radii_um(&[30.0, 50.0, 100.0, 200.0]) {
        let capped = apply_concave_cap(&u, rc, &ap, SagModel::Paraxial).unwrap();
        let p_in = capped.field.total_power();
        assert!(p_in > 0.99 && p_in <= 1.0 + tol);

        let z_short = 0.5 * capped.field.grid.critical_distance();
        for (z, method) in [
            (1e-3, PropagationMethod::Fresnel),
            (z_short, PropagationMethod::AngularSpectrum),
        ] {
            let out = propagate(&capped.field, z, method).unwrap();
            let p_out = out.field.total_power();
            assert!(
                p_out <= p_in * (1.0 + tol),
                "energy created: in={} out={} (Rc={:e}, {})",
                p_in,
                p_out,
                rc,
                method.as_str()
            );
        }
    }
}

#[test]
fn degenerate_inputs_are_rejected() {
    let fiber = FiberParams::default();
    let grid = medium_grid();
    let u = init_fiber_mode(&fiber, &grid, SourceProfile::Gaussian).unwrap();
    let ap = ApertureSpec::from_core(fiber.core_radius, 2.0);

    assert_eq!(
        apply_concave_cap(&u, 0.0, &ap, SagModel::Paraxial).unwrap_err(),
        ConfigurationError::ZeroCurvatureRadius
    );

    let wide_core = FiberParams {
        core_radius: 0.6 * grid.window,
        ..FiberParams::default()
    };
    for profile in [SourceProfile::Gaussian, SourceProfile::TopHat] {
        assert!(matches!(
            init_fiber_mode(&wide_core, &grid, profile),
            Err(ConfigurationError::ModeExceedsWindow { .. })
        ));
    }
}

#[test]
fn top_hat_source_shows_the_same_trend() {
    let cfg = SimConfig {
        grid: medium_grid(),
        profile: SourceProfile::TopHat,
        sweep: SweepSpec::List {
            values: radii_um(&[30.0, 100.0]),
        },
        ..SimConfig::default()
    };
    let report = run_sweep(&cfg).unwrap();
    let w: Vec<f64> = report.completed().map(|r| r.width().unwrap()).collect();
    assert_eq!(w.len(), 2);
    assert!(w[0] > w[1], "widths: {:?}", w);
}

#[test]
fn window_too_small_is_flagged_not_hidden() {
    // Angular spectrum forced at 1 mm: the beam wraps around the 100 μm window.
    let cfg = SimConfig {
        grid: GridParams {
            n: 128,
            window: 100e-6,
        },
        method: PropagationMethod::AngularSpectrum,
        sweep: SweepSpec::List {
            values: radii_um(&[30.0]),
        },
        ..SimConfig::default()
    };
    let report = run_sweep(&cfg).unwrap();
    let r = report.completed().next().unwrap();
    assert!(r
        .warnings
        .iter()
        .any(|w| matches!(w, SamplingWarning::EnergyTruncation { .. })));
    assert!(r
        .warnings
        .iter()
        .any(|w| matches!(w, SamplingWarning::PropagatorUndersampled { .. })));
}

#[test]
fn smf28_sweep_at_1550nm() {
    // λ = 1550 nm, core radius 4.5 μm, 100 μm window, 512×512, z = 1 mm,
    // Rc = {30, 50, 100, 200} μm.
    let cfg = SimConfig::default();
    assert_eq!(cfg.grid.n, 512);
    assert_eq!(cfg.distance, 1e-3);

    let report = run_sweep(&cfg).unwrap();
    let results: Vec<_> = report.completed().collect();
    assert_eq!(results.len(), 4);
    for r in &results {
        assert!(!r.is_saturated(), "Rc={:e} saturated", r.curvature_radius);
        assert!(r.metrics.width.is_some());
    }

    let widths: Vec<f64> = results.iter().map(|r| r.width().unwrap()).collect();
    for pair in widths.windows(2) {
        assert!(pair[1] < pair[0], "widths not strictly decreasing: {:?}", widths);
    }

    let div: Vec<f64> = results.iter().map(|r| r.divergence_angle.unwrap()).collect();
    let max_idx = div
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.total_cmp(b.1))
        .map(|(i, _)| i)
        .unwrap();
    assert_eq!(results[max_idx].curvature_radius, 30e-6);

    // Peak intensity drops as the beam spreads.
    assert!(results[0].metrics.peak_intensity < results[3].metrics.peak_intensity);

    // The 1/e² level is the width definition used throughout.
    assert_relative_eq!(LEVEL_1E2, (-2.0f64).exp(), epsilon = 1e-15);
}
