// src/phase_screen.rs
//
// Thin phase screen for a concave fibre end face.
//
// Inside the cap aperture (r <= a) each sample is multiplied by exp(+i δ(r)):
//   paraxial:  δ = k r² / (2 Rc)
//   spherical: δ = k (Rc - sqrt(Rc² - r²))  (evaluated as k r² / (Rc + sqrt(Rc² - r²)))
// Outside the aperture the field is exactly zero.
//
// Sign convention: propagation uses exp(+i k z), so a positive δ growing with r
// is a diverging wavefront, i.e. a concave cap. The same sign is used for all Rc.
// Rc = +∞ is the flat face and gives δ = 0 everywhere.

use std::f64::consts::{FRAC_PI_2, PI};

use rayon::prelude::*;
use rustfft::num_complex::Complex;
use tracing::debug;

use crate::aperture_mask::{mask_count, mask_disk};
use crate::complex_field::ComplexField;
use crate::error::{ConfigurationError, SamplingWarning};
use crate::params::SagModel;

/// Circular cap aperture, fixed for a whole sweep.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ApertureSpec {
    /// Aperture radius (m).
    pub radius: f64,
}

impl ApertureSpec {
    pub fn from_core(core_radius: f64, factor: f64) -> Self {
        Self {
            radius: core_radius * factor,
        }
    }
}

/// Reject zero, negative and NaN curvature radii. +∞ (flat face) is accepted.
pub fn validate_curvature(rc: f64) -> Result<(), ConfigurationError> {
    if rc == 0.0 {
        return Err(ConfigurationError::ZeroCurvatureRadius);
    }
    if rc.is_nan() || rc < 0.0 {
        return Err(ConfigurationError::InvalidCurvatureRadius(rc));
    }
    Ok(())
}

/// Phase delay δ(r²) of the cap.
#[inline]
pub fn sag_phase(k: f64, r2: f64, rc: f64, sag: SagModel) -> f64 {
    if rc.is_infinite() {
        return 0.0;
    }
    match sag {
        SagModel::Paraxial => k * r2 / (2.0 * rc),
        SagModel::Spherical => k * r2 / (rc + (rc * rc - r2).max(0.0).sqrt()),
    }
}

/// Sampling diagnostics of the cap phase on the current grid.
pub fn phase_warnings(
    k: f64,
    dx: f64,
    rc: f64,
    aperture: &ApertureSpec,
    sag: SagModel,
) -> Vec<SamplingWarning> {
    let mut warnings = Vec::new();
    if rc.is_infinite() {
        return warnings;
    }
    let a = aperture.radius;

    // Local phase gradient at the aperture edge times the pitch.
    let slope = match sag {
        SagModel::Paraxial => k * a / rc,
        SagModel::Spherical => {
            let s = rc * rc - a * a;
            if s > 0.0 {
                k * a / s.sqrt()
            } else {
                f64::INFINITY
            }
        }
    };
    let max_phase_step = slope * dx;
    if max_phase_step > PI {
        warnings.push(SamplingWarning::PhaseAliasing { max_phase_step });
    }

    if sag == SagModel::Paraxial {
        let phase_error = if a < rc {
            let a2 = a * a;
            (sag_phase(k, a2, rc, SagModel::Paraxial) - sag_phase(k, a2, rc, SagModel::Spherical))
                .abs()
        } else {
            f64::INFINITY
        };
        if phase_error > FRAC_PI_2 {
            warnings.push(SamplingWarning::ParaxialLimit { phase_error });
        }
    }

    warnings
}

/// Output of the phase operator: the masked field and its sampling warnings.
#[derive(Debug, Clone)]
pub struct PhaseScreenOutput {
    pub field: ComplexField,
    pub warnings: Vec<SamplingWarning>,
}

/// Apply the concave-cap phase and the hard aperture stop.
///
/// The input field is left untouched.
pub fn apply_concave_cap(
    field: &ComplexField,
    rc: f64,
    aperture: &ApertureSpec,
    sag: SagModel,
) -> Result<PhaseScreenOutput, ConfigurationError> {
    validate_curvature(rc)?;
    let a = aperture.radius;
    if !(a.is_finite() && a > 0.0) {
        return Err(ConfigurationError::NonPositiveAperture(a));
    }
    if sag == SagModel::Spherical && a > rc {
        return Err(ConfigurationError::ApertureExceedsCurvature { aperture: a, rc });
    }

    let grid = field.grid;
    let n = grid.n;
    let k = grid.wavenumber();
    let open = mask_disk(&grid, a);

    let mut out = field.clone();
    out.data
        .par_chunks_mut(n)
        .zip(open.par_chunks(n))
        .enumerate()
        .for_each(|(j, (row, open_row))| {
            for (i, (v, &inside)) in row.iter_mut().zip(open_row).enumerate() {
                if inside {
                    let delta = sag_phase(k, grid.r2(i, j), rc, sag);
                    *v *= Complex::from_polar(1.0, delta);
                } else {
                    *v = Complex::new(0.0, 0.0);
                }
            }
        });

    let warnings = phase_warnings(k, grid.dx, rc, aperture, sag);
    debug!(
        rc_um = rc * 1e6,
        aperture_um = a * 1e6,
        open_samples = mask_count(&open),
        warnings = warnings.len(),
        "applied concave cap"
    );

    Ok(PhaseScreenOutput {
        field: out,
        warnings,
    })
}
