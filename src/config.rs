use serde::Serialize;
use serde_json;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::params::SimConfig;
use crate::propagation::resolve_method;

/// Everything needed to reproduce a run, written next to its outputs.
#[derive(Serialize)]
pub struct RunConfig {
    pub simulation: SimConfig,
    pub derived: DerivedConfig,
    pub run: RunInfo,
}

/// Quantities computed from the configuration, recorded for convenience.
#[derive(Serialize)]
pub struct DerivedConfig {
    pub v_number: f64,
    pub single_mode: bool,
    pub mode_field_diameter: f64,
    pub pitch: f64,
    pub aperture_radius: f64,
    /// Distance separating the angular-spectrum and Fresnel regimes (m).
    pub critical_distance: f64,
    pub propagation_method: String,
}

impl DerivedConfig {
    pub fn from_sim(cfg: &SimConfig) -> Self {
        let grid = cfg.simulation_grid();
        Self {
            v_number: cfg.fiber.v_number(),
            single_mode: cfg.fiber.is_single_mode(),
            mode_field_diameter: cfg.fiber.mode_field_diameter(),
            pitch: grid.dx,
            aperture_radius: cfg.aperture_radius(),
            critical_distance: grid.critical_distance(),
            propagation_method: resolve_method(&grid, cfg.distance, cfg.method)
                .as_str()
                .to_string(),
        }
    }
}

#[derive(Serialize)]
pub struct RunInfo {
    pub binary: String,
    pub run_id: String,

    // Optional provenance
    pub git_commit: Option<String>,
    pub timestamp_unix_ms: Option<u128>,
}

impl RunConfig {
    pub fn write_to_dir(&self, out_dir: &Path) -> std::io::Result<()> {
        let path = out_dir.join("config.json");
        let file = File::create(path)?;
        serde_json::to_writer_pretty(file, self)?;
        Ok(())
    }
}

/// Read a `SimConfig` from a JSON file (same layout as the `simulation`
/// section of a written `config.json`).
pub fn load_sim_config(path: &Path) -> std::io::Result<SimConfig> {
    let file = File::open(path)?;
    let cfg: SimConfig = serde_json::from_reader(BufReader::new(file))?;
    Ok(cfg)
}
