// src/params.rs
//
// Immutable run configuration. Every stage receives what it needs from here;
// nothing is held in ambient state.
//
// Default values reproduce the SMF-28 @ 1550 nm study: 9 μm core, 100 μm
// window sampled 512×512, 1 mm propagation, curvature sweep {30,50,100,200} μm.

use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;
use crate::grid::SimulationGrid;

/// Single-mode cutoff of the step-index fibre V-number.
pub const SINGLE_MODE_CUTOFF: f64 = 2.405;

/// Upper bound on curvature samples in one sweep.
pub const MAX_SWEEP_SAMPLES: usize = 10_000;

/// Step-index fibre description.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FiberParams {
    /// Vacuum wavelength (m).
    pub wavelength: f64,
    /// Core radius (m).
    pub core_radius: f64,
    /// Cladding radius (m). Informational only.
    pub cladding_radius: f64,
    /// Numerical aperture.
    pub na: f64,
}

impl Default for FiberParams {
    fn default() -> Self {
        Self {
            wavelength: 1550e-9,
            core_radius: 4.5e-6,
            cladding_radius: 62.5e-6,
            na: 0.12,
        }
    }
}

impl FiberParams {
    /// Normalised frequency V = 2π a NA / λ.
    pub fn v_number(&self) -> f64 {
        2.0 * std::f64::consts::PI * self.core_radius * self.na / self.wavelength
    }

    pub fn is_single_mode(&self) -> bool {
        self.v_number() < SINGLE_MODE_CUTOFF
    }

    /// Mode-field diameter (m), Marcuse approximation for the LP01 mode.
    ///
    /// Above cutoff the mode is taken to fill the core.
    pub fn mode_field_diameter(&self) -> f64 {
        let v = self.v_number();
        if v < SINGLE_MODE_CUTOFF && v > 0.0 {
            let w_over_a = 0.65 + 1.619 / v.powf(1.5) + 2.879 / v.powi(6);
            2.0 * w_over_a * self.core_radius
        } else {
            2.0 * self.core_radius
        }
    }
}

/// Transverse profile of the field leaving the fibre core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceProfile {
    /// Gaussian with waist equal to half the mode-field diameter.
    Gaussian,
    /// Uniform disk filling the core.
    TopHat,
}

impl SourceProfile {
    pub fn from_arg(s: &str) -> Option<Self> {
        match s {
            "gauss" | "gaussian" => Some(Self::Gaussian),
            "tophat" | "top-hat" | "disk" => Some(Self::TopHat),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gaussian => "gaussian",
            Self::TopHat => "tophat",
        }
    }
}

/// Diffraction operator used for the output plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropagationMethod {
    /// Angular spectrum below the critical distance, Fresnel transform above.
    Auto,
    /// Angular-spectrum transfer function; output keeps the input grid.
    AngularSpectrum,
    /// Single-FFT Fresnel transform; output pitch is λz/(N·dx).
    Fresnel,
}

impl PropagationMethod {
    pub fn from_arg(s: &str) -> Option<Self> {
        match s {
            "auto" => Some(Self::Auto),
            "asm" | "angular" | "angular-spectrum" => Some(Self::AngularSpectrum),
            "fresnel" | "fr" => Some(Self::Fresnel),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::AngularSpectrum => "angular-spectrum",
            Self::Fresnel => "fresnel",
        }
    }
}

/// Phase model of the concave cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SagModel {
    /// δ = k r² / (2 Rc)
    Paraxial,
    /// δ = k (Rc - sqrt(Rc² - r²))
    Spherical,
}

impl SagModel {
    pub fn from_arg(s: &str) -> Option<Self> {
        match s {
            "paraxial" | "parabolic" => Some(Self::Paraxial),
            "spherical" | "exact" => Some(Self::Spherical),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Paraxial => "paraxial",
            Self::Spherical => "spherical",
        }
    }
}

/// Sampling of the simulated window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridParams {
    /// Samples per side.
    pub n: usize,
    /// Window side length (m).
    pub window: f64,
}

impl Default for GridParams {
    fn default() -> Self {
        Self {
            n: 512,
            window: 100e-6,
        }
    }
}

/// Curvature radii to scan: an evenly spaced range (by count or by step) or an
/// explicit list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SweepSpec {
    Range { min: f64, max: f64, count: usize },
    Step { min: f64, max: f64, step: f64 },
    List { values: Vec<f64> },
}

impl Default for SweepSpec {
    fn default() -> Self {
        Self::List {
            values: vec![30e-6, 50e-6, 100e-6, 200e-6],
        }
    }
}

impl SweepSpec {
    /// Curvature radii in ascending order. Empty for a sweep that exceeds
    /// `MAX_SWEEP_SAMPLES`; `SimConfig::validate` reports that case.
    pub fn radii(&self) -> Vec<f64> {
        let mut radii = match self {
            Self::Range { min, max, count } => match *count {
                0 => Vec::new(),
                c if c > MAX_SWEEP_SAMPLES => Vec::new(),
                1 => vec![*min],
                c => (0..c)
                    .map(|i| min + (max - min) * i as f64 / (c - 1) as f64)
                    .collect(),
            },
            Self::Step { min, max, step } => {
                let count = match step_count(*min, *max, *step) {
                    Some(c) if c <= MAX_SWEEP_SAMPLES => c,
                    _ => 0,
                };
                (0..count).map(|i| min + step * i as f64).collect()
            }
            Self::List { values } => values.clone(),
        };
        radii.sort_by(|a, b| a.total_cmp(b));
        radii
    }

    fn validate(&self) -> Result<(), ConfigurationError> {
        match self {
            Self::Range { min, max, count } => {
                if *count == 0 {
                    return Err(ConfigurationError::EmptySweep);
                }
                if *count > MAX_SWEEP_SAMPLES {
                    return Err(ConfigurationError::TooManySweepSamples {
                        count: *count as f64,
                        max: MAX_SWEEP_SAMPLES,
                    });
                }
                if !(min.is_finite() && max.is_finite()) || *min <= 0.0 || max < min {
                    return Err(ConfigurationError::InvalidSweepRange {
                        min: *min,
                        max: *max,
                    });
                }
                Ok(())
            }
            Self::Step { min, max, step } => {
                if !(min.is_finite() && max.is_finite()) || *min <= 0.0 || max < min {
                    return Err(ConfigurationError::InvalidSweepRange {
                        min: *min,
                        max: *max,
                    });
                }
                if !(step.is_finite() && *step > 0.0) {
                    return Err(ConfigurationError::NonPositiveSweepStep(*step));
                }
                match step_count(*min, *max, *step) {
                    Some(c) if c <= MAX_SWEEP_SAMPLES => Ok(()),
                    _ => Err(ConfigurationError::TooManySweepSamples {
                        count: (max - min) / step + 1.0,
                        max: MAX_SWEEP_SAMPLES,
                    }),
                }
            }
            // Individual bad entries are rejected per sample, not here.
            Self::List { values } if values.is_empty() => Err(ConfigurationError::EmptySweep),
            Self::List { values } if values.len() > MAX_SWEEP_SAMPLES => {
                Err(ConfigurationError::TooManySweepSamples {
                    count: values.len() as f64,
                    max: MAX_SWEEP_SAMPLES,
                })
            }
            Self::List { .. } => Ok(()),
        }
    }
}

/// Number of radii from `min` to `max` inclusive at spacing `step`, or `None`
/// when it does not fit in a `usize`. Rounding is tolerated so that `max`
/// itself is included.
fn step_count(min: f64, max: f64, step: f64) -> Option<usize> {
    let intervals = ((max - min) / step + 1e-9).floor();
    if !(intervals.is_finite() && intervals >= 0.0) || intervals >= usize::MAX as f64 {
        return None;
    }
    (intervals as usize).checked_add(1)
}

/// Full configuration of one sweep run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimConfig {
    pub fiber: FiberParams,
    pub grid: GridParams,
    pub profile: SourceProfile,
    /// Axial propagation distance (m).
    pub distance: f64,
    pub sweep: SweepSpec,
    /// Aperture radius as a multiple of the core radius.
    pub aperture_factor: f64,
    pub method: PropagationMethod,
    pub sag: SagModel,
    /// Curvature radius (m) whose intensity map and profile are kept for plotting.
    pub inspect_radius: Option<f64>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            fiber: FiberParams::default(),
            grid: GridParams::default(),
            profile: SourceProfile::Gaussian,
            distance: 1e-3,
            sweep: SweepSpec::default(),
            aperture_factor: 2.0,
            method: PropagationMethod::Auto,
            sag: SagModel::Paraxial,
            inspect_radius: Some(50e-6),
        }
    }
}

impl SimConfig {
    pub fn simulation_grid(&self) -> SimulationGrid {
        SimulationGrid::new(self.grid.n, self.grid.window, self.fiber.wavelength)
    }

    pub fn aperture_radius(&self) -> f64 {
        self.aperture_factor * self.fiber.core_radius
    }

    /// Check every sweep-invariant parameter before any sample runs.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        validate_grid(self.grid.n, self.grid.window, self.fiber.wavelength)?;
        validate_core(self.fiber.core_radius, self.grid.window)?;

        let a = self.aperture_radius();
        if !(a.is_finite() && a > 0.0) {
            return Err(ConfigurationError::NonPositiveAperture(a));
        }
        if !(self.distance.is_finite() && self.distance > 0.0) {
            return Err(ConfigurationError::NonPositiveDistance(self.distance));
        }
        self.sweep.validate()
    }
}

pub(crate) fn validate_grid(n: usize, window: f64, wavelength: f64) -> Result<(), ConfigurationError> {
    if n == 0 {
        return Err(ConfigurationError::NonPositiveResolution(n));
    }
    if !(window.is_finite() && window > 0.0) {
        return Err(ConfigurationError::NonPositiveWindow(window));
    }
    if !(wavelength.is_finite() && wavelength > 0.0) {
        return Err(ConfigurationError::NonPositiveWavelength(wavelength));
    }
    Ok(())
}

pub(crate) fn validate_core(core_radius: f64, window: f64) -> Result<(), ConfigurationError> {
    if !(core_radius.is_finite() && core_radius > 0.0) {
        return Err(ConfigurationError::NonPositiveCoreRadius(core_radius));
    }
    let half_window = 0.5 * window;
    if core_radius > half_window {
        return Err(ConfigurationError::ModeExceedsWindow {
            core: core_radius,
            half_window,
        });
    }
    Ok(())
}
