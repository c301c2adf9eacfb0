// src/report.rs
//
// Human-readable summary and CSV tables of a finished sweep.

use std::fs::{create_dir_all, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::analysis::center_row_profile;
use crate::params::FiberParams;
use crate::sweep::{SimulationResult, SweepReport, Trend};

fn um(v: Option<f64>) -> String {
    match v {
        Some(v) => format!("{:.2}", v * 1e6),
        None => "n/a".to_string(),
    }
}

fn mrad(v: Option<f64>) -> String {
    match v {
        Some(v) => format!("{:.2}", v * 1e3),
        None => "n/a".to_string(),
    }
}

fn ensure_parent_dir(path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        create_dir_all(parent)?;
    }
    Ok(())
}

/// Fibre description block.
pub fn fiber_summary(fiber: &FiberParams) -> Vec<String> {
    let v = fiber.v_number();
    let mode = if fiber.is_single_mode() {
        "single-mode"
    } else {
        "multi-mode"
    };
    vec![
        format!("Fibre @ {:.0} nm:", fiber.wavelength * 1e9),
        format!("  core diameter: {:.1} μm", 2.0 * fiber.core_radius * 1e6),
        format!("  V-number:      {:.3} ({})", v, mode),
        format!("  MFD:           {:.1} μm", fiber.mode_field_diameter() * 1e6),
    ]
}

/// One line per sample, e.g. `Rc =  30.0 μm  width = 401.23 μm  ...`.
pub fn sample_line(r: &SimulationResult) -> String {
    let mut line = format!(
        "Rc = {:>7.1} μm  width = {:>8} μm  fwhm = {:>8} μm  div = {:>7} mrad  excess = {:>7} mrad  peak = {:.4e}",
        r.curvature_radius * 1e6,
        um(r.width()),
        um(r.metrics.fwhm),
        mrad(r.divergence_angle),
        mrad(r.excess_divergence),
        r.metrics.peak_intensity,
    );
    if !r.warnings.is_empty() {
        let tags: Vec<&str> = r.warnings.iter().map(|w| w.tag()).collect();
        line.push_str(&format!("  [{}]", tags.join(",")));
    }
    line
}

pub fn trend_statement(trend: Trend) -> &'static str {
    match trend {
        Trend::MonotonicNonDecreasing => {
            "Divergence increases monotonically with 1/Rc: smaller curvature radius, stronger divergence."
        }
        Trend::NotMonotonic => {
            "Divergence is NOT monotonic in 1/Rc over this sweep; check sampling warnings."
        }
        Trend::Insufficient => "Too few valid samples to judge the divergence trend.",
    }
}

/// Full console report of a sweep.
pub fn summary_lines(report: &SweepReport) -> Vec<String> {
    let cfg = &report.config;
    let mut lines = Vec::new();

    lines.push(format!(
        "Results (propagation distance {:.2} mm, aperture radius {:.1} μm):",
        cfg.distance * 1e3,
        cfg.aperture_radius() * 1e6
    ));
    lines.push(format!("  input width:      {} μm", um(report.input_width)));
    lines.push(format!(
        "  bare fibre width: {} μm  (no aperture stop)",
        um(report.flat.bare_width)
    ));
    lines.push(format!(
        "  flat face width:  {} μm  (div = {} mrad)",
        um(report.flat.metrics.width),
        mrad(report.flat.divergence_angle)
    ));

    for s in &report.samples {
        match &s.outcome {
            Ok(r) => lines.push(format!("  {}", sample_line(r))),
            Err(e) => lines.push(format!(
                "  Rc = {:>7.1} μm  skipped: {}",
                s.curvature_radius * 1e6,
                e
            )),
        }
    }

    if let Some(flat_w) = report.flat.metrics.width {
        for r in report.completed() {
            if let Some(w) = r.width() {
                lines.push(format!(
                    "  divergence increase at Rc = {:.0} μm: {:+.1}%",
                    r.curvature_radius * 1e6,
                    (w / flat_w - 1.0) * 100.0
                ));
            }
        }
    }

    let saturated: Vec<String> = report
        .completed()
        .filter(|r| r.is_saturated())
        .map(|r| format!("{:.0}", r.curvature_radius * 1e6))
        .collect();
    if !saturated.is_empty() {
        lines.push(format!(
            "  WARNING: beam exceeds the simulated window for Rc = {} μm",
            saturated.join(", ")
        ));
    }

    lines.push(trend_statement(report.trend()).to_string());
    lines.push(String::new());
    lines.push("Interpretation:".to_string());
    lines.push("  - a concave end face acts as a diverging element at the fibre exit".to_string());
    lines.push("  - the smaller the curvature radius, the stronger the divergence".to_string());
    lines
}

/// Per-radius table: one row per sample, failed samples included.
pub fn write_sweep_csv(report: &SweepReport, path: &Path) -> std::io::Result<()> {
    ensure_parent_dir(path)?;
    let file = File::create(path)?;
    let mut w = BufWriter::new(file);

    writeln!(
        w,
        "rc_um,width_um,fwhm_um,divergence_mrad,excess_divergence_mrad,peak_intensity,power,method,output_pitch_um,warnings,status"
    )?;

    let opt = |v: Option<f64>, scale: f64| match v {
        Some(v) => format!("{:.9e}", v * scale),
        None => String::new(),
    };

    writeln!(
        w,
        "inf,{},{},{},0,{:.9e},{:.9e},,,{},ok",
        opt(report.flat.metrics.width, 1e6),
        opt(report.flat.metrics.fwhm, 1e6),
        opt(report.flat.divergence_angle, 1e3),
        report.flat.metrics.peak_intensity,
        report.flat.metrics.power,
        report
            .flat
            .warnings
            .iter()
            .map(|w| w.tag())
            .collect::<Vec<_>>()
            .join(";"),
    )?;

    for s in &report.samples {
        match &s.outcome {
            Ok(r) => {
                let tags: Vec<&str> = r.warnings.iter().map(|w| w.tag()).collect();
                writeln!(
                    w,
                    "{:.6},{},{},{},{},{:.9e},{:.9e},{},{:.6},{},ok",
                    r.curvature_radius * 1e6,
                    opt(r.width(), 1e6),
                    opt(r.metrics.fwhm, 1e6),
                    opt(r.divergence_angle, 1e3),
                    opt(r.excess_divergence, 1e3),
                    r.metrics.peak_intensity,
                    r.metrics.power,
                    r.method.as_str(),
                    r.output_pitch * 1e6,
                    tags.join(";"),
                )?;
            }
            Err(e) => {
                writeln!(
                    w,
                    "{:.6},,,,,,,,,,\"error: {}\"",
                    s.curvature_radius * 1e6,
                    e
                )?;
            }
        }
    }

    w.flush()?;
    Ok(())
}

/// Centre-row intensity profiles, each normalised to its own peak:
/// flat face, and the inspected radius if one was kept.
pub fn write_profiles_csv(report: &SweepReport, path: &Path) -> std::io::Result<()> {
    ensure_parent_dir(path)?;
    let file = File::create(path)?;
    let mut w = BufWriter::new(file);

    let flat = &report.flat.field;
    let flat_profile = normalised(&center_row_profile(flat));
    let concave = report.inspected().and_then(|r| r.field.as_ref());
    let concave_profile = concave.map(|f| normalised(&center_row_profile(f)));

    match report.inspected() {
        Some(r) => writeln!(w, "x_um,flat,concave_rc{:.0}um", r.curvature_radius * 1e6)?,
        None => writeln!(w, "x_um,flat")?,
    }

    for (i, fv) in flat_profile.iter().enumerate() {
        let x = flat.grid.coord(i) * 1e6;
        match &concave_profile {
            Some(cp) => writeln!(w, "{:.6},{:.9e},{:.9e}", x, fv, cp[i])?,
            None => writeln!(w, "{:.6},{:.9e}", x, fv)?,
        }
    }

    w.flush()?;
    Ok(())
}

/// Scale a profile so its maximum is 1. All-zero profiles are returned as-is.
pub fn normalised(profile: &[f64]) -> Vec<f64> {
    let max = profile.iter().cloned().fold(0.0, f64::max);
    if max > 0.0 {
        profile.iter().map(|v| v / max).collect()
    } else {
        profile.to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{GridParams, SimConfig, SweepSpec};
    use crate::sweep::run_sweep;

    fn small_report() -> SweepReport {
        let cfg = SimConfig {
            grid: GridParams {
                n: 128,
                window: 100e-6,
            },
            sweep: SweepSpec::List {
                values: vec![0.0, 50e-6, 200e-6],
            },
            ..SimConfig::default()
        };
        run_sweep(&cfg).unwrap()
    }

    #[test]
    fn summary_has_a_line_per_sample_and_a_trend() {
        let report = small_report();
        let lines = summary_lines(&report);
        assert!(lines.iter().any(|l| l.contains("skipped")));
        assert_eq!(lines.iter().filter(|l| l.starts_with("  Rc = ")).count(), 3);
        assert!(lines.iter().any(|l| l.contains("monotonic")));
    }

    #[test]
    fn csv_files_have_expected_rows() {
        let report = small_report();
        let dir = std::env::temp_dir().join(format!("cfs_report_test_{}", std::process::id()));
        let sweep_path = dir.join("sweep.csv");
        let prof_path = dir.join("profiles.csv");
        write_sweep_csv(&report, &sweep_path).unwrap();
        write_profiles_csv(&report, &prof_path).unwrap();

        let sweep = std::fs::read_to_string(&sweep_path).unwrap();
        // header + flat + 3 samples
        assert_eq!(sweep.lines().count(), 5);
        assert!(sweep.lines().nth(1).unwrap().starts_with("inf,"));
        assert!(sweep.contains("error:"));

        let prof = std::fs::read_to_string(&prof_path).unwrap();
        assert!(prof.lines().next().unwrap().contains("concave_rc50um"));
        assert_eq!(prof.lines().count(), 1 + 128);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn fiber_summary_reports_single_mode() {
        let lines = fiber_summary(&FiberParams::default());
        assert!(lines.iter().any(|l| l.contains("single-mode")));
    }

    #[test]
    fn normalised_profile_peaks_at_one() {
        let p = normalised(&[0.0, 2.0, 4.0, 1.0]);
        assert_eq!(p, vec![0.0, 0.5, 1.0, 0.25]);
        assert_eq!(normalised(&[0.0, 0.0]), vec![0.0, 0.0]);
    }
}
