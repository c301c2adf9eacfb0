// src/main.rs
//
// Curvature sweep driver: builds the fibre mode, applies the concave-cap phase
// screen for each curvature radius, propagates to the output plane and reports
// beam width / divergence versus radius.
//
// Outputs are written to `runs/<run_id>/` (or the directory given via `out=`)
// and are not committed to version control.
//
// Examples:
//
//   cargo run --release
//       -> default SMF-28 @ 1550 nm study, Rc = {30, 50, 100, 200} μm, z = 1 mm
//
//   cargo run --release -- rmin=30 rmax=200 count=12 z=2 noplot
//       -> 12 evenly spaced radii, 2 mm propagation, tables only
//
//   cargo run --release -- tophat sag=spherical aperture=1.5 radii=20,40,80
//       -> uniform-disk source, exact spherical sag, smaller cap
//
// Typical outputs (per run directory):
//   runs/<run_id>/
//     ├── config.json
//     ├── sweep.csv
//     ├── profiles.csv
//     ├── width_vs_radius.png
//     ├── divergence_vs_curvature.png
//     ├── profile_compare.png
//     ├── intensity_flat.png
//     └── intensity_concave.png

use std::env;
use std::fs::create_dir_all;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use concave_fiber_sim::config::{load_sim_config, DerivedConfig, RunConfig, RunInfo};
use concave_fiber_sim::params::{
    PropagationMethod, SagModel, SimConfig, SourceProfile, SweepSpec,
};
use concave_fiber_sim::report::{
    fiber_summary, summary_lines, write_profiles_csv, write_sweep_csv,
};
use concave_fiber_sim::sweep::run_sweep;
use concave_fiber_sim::visualisation::{
    save_divergence_plot, save_intensity_map, save_profile_plot, save_width_vs_radius_plot,
};

fn print_usage() {
    eprintln!(
        r#"Usage:
  cargo run -- [gauss|tophat] [profile=gauss|tophat] [noplot]
             [wavelength=NM] [core=UM] [clad=UM] [na=VAL]
             [n=N] [window=UM] [z=MM]
             [radii=UM,UM,...] | [rmin=UM rmax=UM count=N|step=UM]
             [aperture=FACTOR] [inspect=UM|none]
             [method=auto|asm|fresnel] [sag=paraxial|spherical]
             [config=FILE.json] [out=DIR] [run=RUN_ID]

Notes:
  - Lengths use the unit in the flag name: nm for wavelength, mm for z, μm otherwise.
  - config=FILE.json loads a full configuration; later flags still override it.
  - Set RUST_LOG (e.g. RUST_LOG=debug) to control diagnostic output.
"#
    );
}

fn sanitize_run_id(s: &str) -> String {
    s.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

fn now_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0)
}

fn default_run_id(cfg: &SimConfig) -> String {
    format!(
        "{}_{}_{}",
        now_millis(),
        cfg.profile.as_str(),
        cfg.sag.as_str()
    )
}

fn unique_run_dir(out_root: &str, run_id: &str) -> PathBuf {
    let base = PathBuf::from(out_root);
    let mut dir = base.join(run_id);
    if !dir.exists() {
        return dir;
    }
    for k in 1..1000 {
        let cand = base.join(format!("{}_{}", run_id, k));
        if !cand.exists() {
            dir = cand;
            break;
        }
    }
    dir
}

fn parse_f64(key: &str, v: &str) -> Option<f64> {
    match v.trim().parse::<f64>() {
        Ok(x) => Some(x),
        Err(_) => {
            warn!("could not parse {key} value '{v}', ignoring");
            None
        }
    }
}

fn parse_list_um(v: &str) -> Option<Vec<f64>> {
    let mut out = Vec::new();
    for part in v.split(',').filter(|s| !s.trim().is_empty()) {
        match part.trim().parse::<f64>() {
            Ok(x) => out.push(x * 1e-6),
            Err(_) => {
                warn!("could not parse radius '{part}', ignoring radii list");
                return None;
            }
        }
    }
    Some(out)
}

fn write_outputs(
    report: &concave_fiber_sim::sweep::SweepReport,
    run_dir: &Path,
    plots: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    write_sweep_csv(report, &run_dir.join("sweep.csv"))?;
    write_profiles_csv(report, &run_dir.join("profiles.csv"))?;
    if !plots {
        return Ok(());
    }

    let path = |name: &str| run_dir.join(name).to_string_lossy().into_owned();

    save_width_vs_radius_plot(report, &path("width_vs_radius.png"))?;
    save_divergence_plot(report, &path("divergence_vs_curvature.png"))?;

    // View window: 1.5× the widest kept beam, so both maps share a scale.
    let flat = &report.flat;
    let inspected = report.inspected();
    let widest = inspected
        .and_then(|r| r.width())
        .into_iter()
        .chain(flat.metrics.width)
        .fold(0.0, f64::max);
    let half_extent = if widest > 0.0 {
        1.5 * widest
    } else {
        0.25 * flat.field.grid.window()
    };

    save_profile_plot(report, half_extent, &path("profile_compare.png"))?;
    save_intensity_map(
        &flat.field,
        half_extent,
        &format!("Flat face, width {:.1} μm", flat.metrics.width.unwrap_or(0.0) * 1e6),
        &path("intensity_flat.png"),
    )?;
    if let Some(r) = inspected {
        if let Some(f) = &r.field {
            save_intensity_map(
                f,
                half_extent,
                &format!(
                    "Concave face (Rc = {:.0} μm), width {:.1} μm",
                    r.curvature_radius * 1e6,
                    r.width().unwrap_or(0.0) * 1e6
                ),
                &path("intensity_concave.png"),
            )?;
        }
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let argv: Vec<String> = env::args().collect();

    // A config file is applied first so individual flags can override it.
    let mut cfg = SimConfig::default();
    if let Some(path) = argv.iter().skip(1).find_map(|a| a.strip_prefix("config=")) {
        cfg = load_sim_config(Path::new(path))?;
        info!("loaded configuration from {path}");
    }

    let mut plots = true;
    let mut out_root = "runs".to_string();
    let mut run_id_override: Option<String> = None;
    let mut rmin: Option<f64> = None;
    let mut rmax: Option<f64> = None;
    let mut count: Option<usize> = None;
    let mut step: Option<f64> = None;

    for arg in argv.iter().skip(1) {
        if arg == "-h" || arg == "--help" || arg == "help" {
            print_usage();
            return Ok(());
        }
        if arg.starts_with("config=") {
            continue;
        }
        if let Some(p) = SourceProfile::from_arg(arg) {
            cfg.profile = p;
            continue;
        }
        if arg == "noplot" {
            plots = false;
            continue;
        }

        let Some((key, v)) = arg.split_once('=') else {
            warn!("ignoring unknown argument '{arg}'");
            continue;
        };
        match key {
            "wavelength" => {
                if let Some(x) = parse_f64(key, v) {
                    cfg.fiber.wavelength = x * 1e-9;
                }
            }
            "core" => {
                if let Some(x) = parse_f64(key, v) {
                    cfg.fiber.core_radius = x * 1e-6;
                }
            }
            "clad" => {
                if let Some(x) = parse_f64(key, v) {
                    cfg.fiber.cladding_radius = x * 1e-6;
                }
            }
            "na" => {
                if let Some(x) = parse_f64(key, v) {
                    cfg.fiber.na = x;
                }
            }
            "n" => match v.trim().parse::<usize>() {
                Ok(n) => cfg.grid.n = n,
                Err(_) => warn!("could not parse n value '{v}', ignoring"),
            },
            "window" => {
                if let Some(x) = parse_f64(key, v) {
                    cfg.grid.window = x * 1e-6;
                }
            }
            "z" => {
                if let Some(x) = parse_f64(key, v) {
                    cfg.distance = x * 1e-3;
                }
            }
            "radii" => {
                if let Some(values) = parse_list_um(v) {
                    cfg.sweep = SweepSpec::List { values };
                }
            }
            "rmin" => rmin = parse_f64(key, v).map(|x| x * 1e-6),
            "rmax" => rmax = parse_f64(key, v).map(|x| x * 1e-6),
            "count" => match v.trim().parse::<usize>() {
                Ok(c) => count = Some(c),
                Err(_) => warn!("could not parse count value '{v}', ignoring"),
            },
            "step" => step = parse_f64(key, v).map(|x| x * 1e-6),
            "aperture" => {
                if let Some(x) = parse_f64(key, v) {
                    cfg.aperture_factor = x;
                }
            }
            "inspect" => {
                if v.eq_ignore_ascii_case("none") || v.eq_ignore_ascii_case("off") {
                    cfg.inspect_radius = None;
                } else if let Some(x) = parse_f64(key, v) {
                    cfg.inspect_radius = Some(x * 1e-6);
                }
            }
            "profile" => match SourceProfile::from_arg(v) {
                Some(p) => cfg.profile = p,
                None => warn!("unknown profile '{v}', keeping {}", cfg.profile.as_str()),
            },
            "method" => match PropagationMethod::from_arg(v) {
                Some(m) => cfg.method = m,
                None => warn!("unknown method '{v}', keeping {}", cfg.method.as_str()),
            },
            "sag" => match SagModel::from_arg(v) {
                Some(s) => cfg.sag = s,
                None => warn!("unknown sag model '{v}', keeping {}", cfg.sag.as_str()),
            },
            "out" => out_root = v.to_string(),
            "run" => run_id_override = Some(v.to_string()),
            _ => warn!("ignoring unknown argument '{arg}'"),
        }
    }

    if rmin.is_some() || rmax.is_some() || count.is_some() || step.is_some() {
        let (min, max) = match &cfg.sweep {
            SweepSpec::Range { min, max, .. } | SweepSpec::Step { min, max, .. } => (*min, *max),
            SweepSpec::List { .. } => (30e-6, 200e-6),
        };
        let (min, max) = (rmin.unwrap_or(min), rmax.unwrap_or(max));
        cfg.sweep = match (step, count) {
            (Some(step), None) => SweepSpec::Step { min, max, step },
            (_, count) => SweepSpec::Range {
                min,
                max,
                count: count.unwrap_or(6),
            },
        };
    }

    println!("=== Concave fibre end-face divergence study ===");
    for line in fiber_summary(&cfg.fiber) {
        println!("{line}");
    }
    println!();

    let report = run_sweep(&cfg)?;

    for line in summary_lines(&report) {
        println!("{line}");
    }

    let run_id = sanitize_run_id(&run_id_override.unwrap_or_else(|| default_run_id(&cfg)));
    let run_dir = unique_run_dir(&out_root, &run_id);
    create_dir_all(&run_dir)?;

    let run_config = RunConfig {
        simulation: cfg.clone(),
        derived: DerivedConfig::from_sim(&cfg),
        run: RunInfo {
            binary: "concave-fiber-sim".to_string(),
            run_id: run_id.clone(),
            git_commit: None,
            timestamp_unix_ms: Some(now_millis()),
        },
    };
    run_config.write_to_dir(&run_dir)?;
    write_outputs(&report, &run_dir, plots)?;

    println!();
    println!("Wrote outputs to {}", run_dir.display());
    Ok(())
}
