// src/analysis.rs
//
// Beam metrics from a sampled intensity distribution.
//
// Width is measured on the profiles through the on-axis sample (centre row and
// centre column, averaged): the outermost samples whose intensity exceeds
// `level * peak` are found, and each crossing is interpolated to sub-sample
// precision in log-intensity (a Gaussian tail is then nearly linear). If the profile never
// drops below the level inside the window, the width is `None`.

use crate::complex_field::ComplexField;

/// 1/e² intensity level.
pub const LEVEL_1E2: f64 = 0.135_335_283_236_612_7;
/// Half-maximum level.
pub const LEVEL_HALF: f64 = 0.5;

/// Scalar summary of one intensity distribution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BeamMetrics {
    /// 1/e² full width (m), `None` when the beam fills the window.
    pub width: Option<f64>,
    /// Full width at half maximum (m).
    pub fwhm: Option<f64>,
    /// Peak |u|².
    pub peak_intensity: f64,
    /// Σ|u|²·dA.
    pub power: f64,
}

/// Intensity along the row through the on-axis sample.
pub fn center_row_profile(field: &ComplexField) -> Vec<f64> {
    let c = field.grid.center();
    (0..field.grid.n).map(|i| field.at(i, c).norm_sqr()).collect()
}

/// Intensity along the column through the on-axis sample.
pub fn center_column_profile(field: &ComplexField) -> Vec<f64> {
    let c = field.grid.center();
    (0..field.grid.n).map(|j| field.at(c, j).norm_sqr()).collect()
}

/// Fractional position of the `threshold` crossing between samples with
/// intensities `inside` (above) and `outside` (below).
fn crossing_fraction(inside: f64, outside: f64, threshold: f64) -> f64 {
    let t = if outside > 0.0 {
        (inside.ln() - threshold.ln()) / (inside.ln() - outside.ln())
    } else {
        (inside - threshold) / (inside - outside)
    };
    t.clamp(0.0, 1.0)
}

/// Full width (in samples) of `profile` above `threshold`.
///
/// Returns `None` if nothing exceeds the threshold, or if the outermost sample
/// above it touches either end of the profile.
pub fn threshold_width_samples(profile: &[f64], threshold: f64) -> Option<f64> {
    let first = profile.iter().position(|&v| v > threshold)?;
    let last = profile.iter().rposition(|&v| v > threshold)?;
    if first == 0 || last + 1 >= profile.len() {
        return None;
    }
    let left = first as f64 - crossing_fraction(profile[first], profile[first - 1], threshold);
    let right = last as f64 + crossing_fraction(profile[last], profile[last + 1], threshold);
    Some(right - left)
}

/// Full width (m) at `level × peak`, averaged over centre row and column.
pub fn beam_width(field: &ComplexField, level: f64) -> Option<f64> {
    let peak = field.peak_intensity();
    if !(peak > 0.0) {
        return None;
    }
    let threshold = level * peak;
    let wx = threshold_width_samples(&center_row_profile(field), threshold)?;
    let wy = threshold_width_samples(&center_column_profile(field), threshold)?;
    Some(0.5 * (wx + wy) * field.grid.dx)
}

pub fn analyze(field: &ComplexField) -> BeamMetrics {
    BeamMetrics {
        width: beam_width(field, LEVEL_1E2),
        fwhm: beam_width(field, LEVEL_HALF),
        peak_intensity: field.peak_intensity(),
        power: field.total_power(),
    }
}

/// Half-angle divergence (rad) from full widths at the input and output planes.
pub fn divergence_angle(width_in: f64, width_out: f64, z: f64) -> f64 {
    (0.5 * (width_out - width_in) / z).atan()
}
