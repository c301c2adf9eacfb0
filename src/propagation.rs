// src/propagation.rs
//
// Scalar diffraction from the end-face plane to an output plane at distance z.
//
// Two operators, both with the exp(+i k z) convention:
//
// - Angular spectrum: U2 = IFFT[ FFT[U1] · H ],
//     H = exp(i 2π z sqrt(1/λ² - fx² - fy²))      (propagating)
//     H = exp(-2π z sqrt(fx² + fy² - 1/λ²))       (evanescent, decays)
//   The output keeps the input grid. The FFT is circular, so energy reaching
//   the window edge wraps around; that is reported as truncation, not hidden.
//
// - Single-FFT Fresnel transform:
//     U2(x2) = exp(ikz)/(iλz) · exp(ik x2²/2z) · Σ U1(x1) exp(ik x1²/2z) exp(-i2π x1·x2/λz) dx²
//   The output pitch becomes λz/(N·dx), so the window grows with z.
//
// The angular spectrum is well sampled for z <= N·dx²/λ and the Fresnel transform
// above it; `PropagationMethod::Auto` chooses accordingly.

use rayon::prelude::*;
use rustfft::num_complex::Complex;
use tracing::{debug, warn};

use crate::aperture_mask::mask_edge_band;
use crate::complex_field::ComplexField;
use crate::error::{ConfigurationError, SamplingWarning};
use crate::fft2::{fftshift2, freq_index, ifftshift2, Fft2};
use crate::grid::SimulationGrid;
use crate::params::PropagationMethod;

/// Fraction of output power allowed in the edge band before warning.
pub const EDGE_POWER_TOLERANCE: f64 = 1e-3;

/// Propagated field plus the operator actually used and its warnings.
#[derive(Debug, Clone)]
pub struct Propagated {
    pub field: ComplexField,
    pub method: PropagationMethod,
    pub warnings: Vec<SamplingWarning>,
}

/// Concrete operator for a requested method and distance.
pub fn resolve_method(grid: &SimulationGrid, z: f64, method: PropagationMethod) -> PropagationMethod {
    match method {
        PropagationMethod::Auto => {
            if z <= grid.critical_distance() {
                PropagationMethod::AngularSpectrum
            } else {
                PropagationMethod::Fresnel
            }
        }
        m => m,
    }
}

/// Propagate `field` by `z` metres. The input is left untouched.
pub fn propagate(
    field: &ComplexField,
    z: f64,
    method: PropagationMethod,
) -> Result<Propagated, ConfigurationError> {
    if !(z.is_finite() && z > 0.0) {
        return Err(ConfigurationError::NonPositiveDistance(z));
    }

    let grid = field.grid;
    let z_c = grid.critical_distance();
    let method = resolve_method(&grid, z, method);

    let mut warnings = Vec::new();
    let out = match method {
        PropagationMethod::Fresnel => {
            if z < z_c {
                warnings.push(SamplingWarning::PropagatorUndersampled {
                    distance: z,
                    critical_distance: z_c,
                });
            }
            fresnel_transform(field, z)
        }
        _ => {
            if z > z_c {
                warnings.push(SamplingWarning::PropagatorUndersampled {
                    distance: z,
                    critical_distance: z_c,
                });
            }
            angular_spectrum(field, z)
        }
    };

    let edge_fraction = edge_power_fraction(&out);
    if edge_fraction > EDGE_POWER_TOLERANCE {
        warn!(
            edge_fraction,
            "propagated beam reaches the window edge; power is truncated"
        );
        warnings.push(SamplingWarning::EnergyTruncation { edge_fraction });
    }

    debug!(
        method = method.as_str(),
        z,
        out_pitch = out.grid.dx,
        "propagated field"
    );

    Ok(Propagated {
        field: out,
        method,
        warnings,
    })
}

/// Angular-spectrum propagation on the input grid.
pub fn angular_spectrum(field: &ComplexField, z: f64) -> ComplexField {
    let grid = field.grid;
    let n = grid.n;
    let inv_l = 1.0 / (n as f64 * grid.dx);
    let inv_lambda2 = 1.0 / (grid.wavelength * grid.wavelength);
    let two_pi_z = 2.0 * std::f64::consts::PI * z;

    let mut fft = Fft2::new(n);
    let mut data = field.data.clone();
    fft.forward(&mut data);

    data.par_chunks_mut(n).enumerate().for_each(|(q, row)| {
        let fy = freq_index(q, n) * inv_l;
        for (p, v) in row.iter_mut().enumerate() {
            let fx = freq_index(p, n) * inv_l;
            let arg = inv_lambda2 - fx * fx - fy * fy;
            let h = if arg >= 0.0 {
                Complex::from_polar(1.0, two_pi_z * arg.sqrt())
            } else {
                Complex::new((-two_pi_z * (-arg).sqrt()).exp(), 0.0)
            };
            *v *= h;
        }
    });

    fft.inverse(&mut data);
    ComplexField { grid, data }
}

/// Single-FFT Fresnel transform onto a rescaled output grid.
pub fn fresnel_transform(field: &ComplexField, z: f64) -> ComplexField {
    let grid = field.grid;
    let n = grid.n;
    let lambda = grid.wavelength;
    let k = grid.wavenumber();
    let dx2 = lambda * z / (n as f64 * grid.dx);
    let out_grid = SimulationGrid::with_pitch(n, dx2, lambda);

    // Input chirp
    let mut g = field.data.clone();
    g.par_chunks_mut(n).enumerate().for_each(|(j, row)| {
        for (i, v) in row.iter_mut().enumerate() {
            let r2 = grid.r2(i, j);
            *v *= Complex::from_polar(1.0, k * r2 / (2.0 * z));
        }
    });

    let mut spectrum = ifftshift2(&g, n);
    let mut fft = Fft2::new(n);
    fft.forward(&mut spectrum);
    let mut data = fftshift2(&spectrum, n);

    // exp(ikz)/(iλz) · dx² · output chirp
    let prefactor = Complex::from_polar(1.0, k * z) / Complex::new(0.0, lambda * z)
        * grid.cell_area();
    data.par_chunks_mut(n).enumerate().for_each(|(j, row)| {
        for (i, v) in row.iter_mut().enumerate() {
            let r2 = out_grid.r2(i, j);
            *v *= prefactor * Complex::from_polar(1.0, k * r2 / (2.0 * z));
        }
    });

    ComplexField {
        grid: out_grid,
        data,
    }
}

/// Fraction of the field's power lying within n/16 samples of any window edge.
pub fn edge_power_fraction(field: &ComplexField) -> f64 {
    let total: f64 = field.data.iter().map(|v| v.norm_sqr()).sum();
    if total <= 0.0 {
        return 0.0;
    }
    let band = (field.grid.n / 16).max(1);
    let mask = mask_edge_band(&field.grid, band);
    let edge: f64 = field
        .data
        .iter()
        .zip(mask.iter())
        .filter(|&(_, &m)| m)
        .map(|(v, _)| v.norm_sqr())
        .sum();
    edge / total
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::gaussian_field;

    #[test]
    fn auto_picks_operator_by_critical_distance() {
        let g = SimulationGrid::new(512, 100e-6, 1550e-9);
        let zc = g.critical_distance();
        assert_eq!(
            resolve_method(&g, 0.5 * zc, PropagationMethod::Auto),
            PropagationMethod::AngularSpectrum
        );
        assert_eq!(
            resolve_method(&g, 1e-3, PropagationMethod::Auto),
            PropagationMethod::Fresnel
        );
        assert_eq!(
            resolve_method(&g, 1e-3, PropagationMethod::AngularSpectrum),
            PropagationMethod::AngularSpectrum
        );
    }

    #[test]
    fn non_positive_distance_is_rejected() {
        let g = SimulationGrid::new(16, 20e-6, 1550e-9);
        let u = gaussian_field(g, 3e-6);
        assert!(matches!(
            propagate(&u, 0.0, PropagationMethod::Auto),
            Err(ConfigurationError::NonPositiveDistance(_))
        ));
        assert!(propagate(&u, f64::NAN, PropagationMethod::Auto).is_err());
    }

    #[test]
    fn fresnel_transform_conserves_power_and_rescales_pitch() {
        let g = SimulationGrid::new(128, 60e-6, 1550e-9);
        let u = gaussian_field(g, 5e-6).normalized();
        let z = 500e-6;
        let out = fresnel_transform(&u, z);
        assert!((out.total_power() - 1.0).abs() < 1e-9);
        let expected_dx = 1550e-9 * z / 60e-6;
        assert!((out.grid.dx - expected_dx).abs() < 1e-15);
    }

    #[test]
    fn angular_spectrum_short_hop_keeps_power_and_centre() {
        let g = SimulationGrid::new(128, 60e-6, 1550e-9);
        let u = gaussian_field(g, 5e-6).normalized();
        let z = 0.5 * g.critical_distance();
        let p = propagate(&u, z, PropagationMethod::Auto).unwrap();
        assert_eq!(p.method, PropagationMethod::AngularSpectrum);
        assert!(p.warnings.is_empty(), "warnings: {:?}", p.warnings);
        assert!(p.field.total_power() <= 1.0 + 1e-9);
        assert!(p.field.total_power() > 0.999);
        let c = g.center();
        assert_eq!(p.field.peak_intensity(), p.field.at(c, c).norm_sqr());
    }

    #[test]
    fn gaussian_waist_matches_analytic_spreading() {
        // w(z) = w0 sqrt(1 + (z/zR)²), zR = π w0² / λ
        let lambda = 1550e-9;
        let w0 = 5e-6;
        let g = SimulationGrid::new(256, 80e-6, lambda);
        let u = gaussian_field(g, w0).normalized();
        let z = 1e-3;
        let out = propagate(&u, z, PropagationMethod::Fresnel).unwrap().field;

        let zr = std::f64::consts::PI * w0 * w0 / lambda;
        let w_expected = w0 * (1.0 + (z / zr).powi(2)).sqrt();
        // Second moment of the centre row: w = 2σ
        let c = out.grid.center();
        let mut s0 = 0.0;
        let mut s2 = 0.0;
        for i in 0..out.grid.n {
            let x = out.grid.coord(i);
            let v = out.at(i, c).norm_sqr();
            s0 += v;
            s2 += v * x * x;
        }
        let w = 2.0 * (s2 / s0).sqrt();
        assert!(
            ((w - w_expected) / w_expected).abs() < 0.02,
            "w={:e} expected={:e}",
            w,
            w_expected
        );
    }

    #[test]
    fn wide_beam_in_small_window_reports_truncation() {
        let g = SimulationGrid::new(64, 20e-6, 1550e-9);
        let u = gaussian_field(g, 1e-6).normalized();
        let p = propagate(&u, 100e-6, PropagationMethod::AngularSpectrum).unwrap();
        assert!(p
            .warnings
            .iter()
            .any(|w| matches!(w, SamplingWarning::EnergyTruncation { .. })));
        assert!(p
            .warnings
            .iter()
            .any(|w| matches!(w, SamplingWarning::PropagatorUndersampled { .. })));
    }
}
