// src/bin/gaussian_spreading.rs
//
// Propagator check against the analytic Gaussian beam:
//   w(z) = w0 sqrt(1 + (z/zR)²),  zR = π w0² / λ
//
// The SMF-28 mode (w0 = MFD/2) is propagated to a set of distances spanning the
// angular-spectrum and Fresnel regimes, with each operator forced in turn, and
// the measured 1/e² radius is compared with w(z).
//
// Run:
//   cargo run --release --bin gaussian_spreading
//
// Output:
//   out/gaussian_spreading.csv

use std::fs::{create_dir_all, File};
use std::io::{BufWriter, Write};

use tracing_subscriber::EnvFilter;

use concave_fiber_sim::analysis::analyze;
use concave_fiber_sim::params::{FiberParams, GridParams, PropagationMethod, SourceProfile};
use concave_fiber_sim::propagation::propagate;
use concave_fiber_sim::source::init_fiber_mode;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    // --- keep in sync with the default sweep ---
    let fiber = FiberParams::default();
    let grid = GridParams {
        n: 512,
        window: 100e-6,
    };
    let distances = [2e-6, 5e-6, 10e-6, 50e-6, 200e-6, 1e-3, 2e-3];
    // -------------------------------------------

    let source = init_fiber_mode(&fiber, &grid, SourceProfile::Gaussian)?;
    let w0 = 0.5 * fiber.mode_field_diameter();
    let zr = std::f64::consts::PI * w0 * w0 / fiber.wavelength;
    let z_c = source.grid.critical_distance();

    create_dir_all("out")?;
    let file = File::create("out/gaussian_spreading.csv")?;
    let mut w = BufWriter::new(file);
    writeln!(w, "z_m,method,w_analytic_m,w_measured_m,rel_err,power,warnings")?;

    for &z in &distances {
        let w_exact = w0 * (1.0 + (z / zr).powi(2)).sqrt();
        for method in [PropagationMethod::AngularSpectrum, PropagationMethod::Fresnel] {
            let p = propagate(&source, z, method)?;
            let m = analyze(&p.field);
            let w_meas = m.width.map(|v| 0.5 * v);
            let rel = w_meas.map(|v| (v - w_exact) / w_exact);
            let tags: Vec<&str> = p.warnings.iter().map(|x| x.tag()).collect();
            writeln!(
                w,
                "{:.6e},{},{:.6e},{},{},{:.9e},{}",
                z,
                p.method.as_str(),
                w_exact,
                w_meas.map(|v| format!("{:.6e}", v)).unwrap_or_default(),
                rel.map(|v| format!("{:.4e}", v)).unwrap_or_default(),
                m.power,
                tags.join(";"),
            )?;
            println!(
                "z = {:>9.3e} m  {:<16}  w = {:>8} μm  (analytic {:.2} μm)",
                z,
                p.method.as_str(),
                w_meas
                    .map(|v| format!("{:.2}", v * 1e6))
                    .unwrap_or_else(|| "n/a".into()),
                w_exact * 1e6
            );
        }
    }

    println!("Rayleigh range zR = {:.2} μm, critical distance = {:.2} μm", zr * 1e6, z_c * 1e6);
    println!("Wrote out/gaussian_spreading.csv");
    Ok(())
}
