// src/error.rs
//
// Fatal configuration errors and non-fatal sampling warnings.

use std::fmt;

use thiserror::Error;

/// Invalid static parameters. Aborts the run, or the single sweep sample they
/// belong to.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigurationError {
    #[error("grid resolution must be positive (got {0})")]
    NonPositiveResolution(usize),

    #[error("window size must be positive and finite (got {0:e} m)")]
    NonPositiveWindow(f64),

    #[error("wavelength must be positive and finite (got {0:e} m)")]
    NonPositiveWavelength(f64),

    #[error("core radius must be positive and finite (got {0:e} m)")]
    NonPositiveCoreRadius(f64),

    #[error("core radius {core:e} m does not fit in half the window ({half_window:e} m)")]
    ModeExceedsWindow { core: f64, half_window: f64 },

    #[error("curvature radius must be non-zero (a zero radius is a degenerate point cap)")]
    ZeroCurvatureRadius,

    #[error("curvature radius must be a positive magnitude (got {0:e} m)")]
    InvalidCurvatureRadius(f64),

    #[error("aperture radius must be positive and finite (got {0:e} m)")]
    NonPositiveAperture(f64),

    #[error("aperture radius {aperture:e} m exceeds curvature radius {rc:e} m; spherical sag is undefined")]
    ApertureExceedsCurvature { aperture: f64, rc: f64 },

    #[error("propagation distance must be positive and finite (got {0:e} m)")]
    NonPositiveDistance(f64),

    #[error("curvature sweep is empty")]
    EmptySweep,

    #[error("curvature sweep step must be positive and finite (got {0:e} m)")]
    NonPositiveSweepStep(f64),

    #[error("curvature sweep would have {count:.3e} samples (at most {max} allowed)")]
    TooManySweepSamples { count: f64, max: usize },

    #[error("invalid curvature sweep range [{min:e}, {max:e}] m")]
    InvalidSweepRange { min: f64, max: f64 },
}

/// Non-fatal conditions attached to a result so the sweep can continue.
#[derive(Debug, Clone, PartialEq)]
pub enum SamplingWarning {
    /// Phase step between neighbouring samples at the aperture edge exceeds π.
    PhaseAliasing { max_phase_step: f64 },
    /// Paraxial phase deviates from the spherical sag by more than a quarter wave.
    ParaxialLimit { phase_error: f64 },
    /// The chosen propagator is outside its well-sampled distance regime.
    PropagatorUndersampled { distance: f64, critical_distance: f64 },
    /// Part of the propagated power lies in the outer band of the window.
    EnergyTruncation { edge_fraction: f64 },
    /// The beam never drops below the width threshold inside the window.
    BeamExceedsWindow,
}

impl fmt::Display for SamplingWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PhaseAliasing { max_phase_step } => write!(
                f,
                "phase aliasing: {:.2} rad per sample at aperture edge (> π)",
                max_phase_step
            ),
            Self::ParaxialLimit { phase_error } => write!(
                f,
                "paraxial sag error {:.2} rad at aperture edge (> π/2)",
                phase_error
            ),
            Self::PropagatorUndersampled {
                distance,
                critical_distance,
            } => write!(
                f,
                "propagator undersampled at z={:.3e} m (critical distance {:.3e} m)",
                distance, critical_distance
            ),
            Self::EnergyTruncation { edge_fraction } => write!(
                f,
                "energy truncation: {:.2}% of power at window edge",
                edge_fraction * 100.0
            ),
            Self::BeamExceedsWindow => write!(f, "beam exceeds the simulated window"),
        }
    }
}

impl SamplingWarning {
    /// Short tag used in CSV output.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::PhaseAliasing { .. } => "aliasing",
            Self::ParaxialLimit { .. } => "paraxial",
            Self::PropagatorUndersampled { .. } => "undersampled",
            Self::EnergyTruncation { .. } => "truncation",
            Self::BeamExceedsWindow => "saturated",
        }
    }
}
