// src/source.rs
//
// Field leaving the fibre core, sampled on the simulation grid.
//
// Conventions:
// - Centered coordinates (see grid.rs); the mode is centered on axis.
// - Output is normalised to unit optical power, Σ|u|²·dA = 1.
// - The field is real and flat-phased: the end face is the mode's waist plane.

use rustfft::num_complex::Complex;
use tracing::debug;

use crate::complex_field::ComplexField;
use crate::error::ConfigurationError;
use crate::grid::SimulationGrid;
use crate::params::{validate_core, validate_grid, FiberParams, GridParams, SourceProfile};

/// Gaussian amplitude exp(-r²/w0²) with 1/e² intensity radius `w0`.
pub fn gaussian_field(grid: SimulationGrid, w0: f64) -> ComplexField {
    let inv_w2 = 1.0 / (w0 * w0);
    ComplexField::from_fn(grid, |x, y| Complex::new((-(x * x + y * y) * inv_w2).exp(), 0.0))
}

/// Uniform disk of the given radius.
pub fn top_hat_field(grid: SimulationGrid, radius: f64) -> ComplexField {
    let r2 = radius * radius;
    ComplexField::from_fn(grid, |x, y| {
        if x * x + y * y <= r2 {
            Complex::new(1.0, 0.0)
        } else {
            Complex::new(0.0, 0.0)
        }
    })
}

/// Build the normalised modal field at the fibre exit.
///
/// Fails if the grid is degenerate or the core does not fit in the window.
pub fn init_fiber_mode(
    fiber: &FiberParams,
    grid: &GridParams,
    profile: SourceProfile,
) -> Result<ComplexField, ConfigurationError> {
    validate_grid(grid.n, grid.window, fiber.wavelength)?;
    validate_core(fiber.core_radius, grid.window)?;

    let sim_grid = SimulationGrid::new(grid.n, grid.window, fiber.wavelength);
    let field = match profile {
        SourceProfile::Gaussian => {
            let w0 = 0.5 * fiber.mode_field_diameter();
            debug!(w0_um = w0 * 1e6, "gaussian source");
            gaussian_field(sim_grid, w0)
        }
        SourceProfile::TopHat => {
            debug!(radius_um = fiber.core_radius * 1e6, "top-hat source");
            top_hat_field(sim_grid, fiber.core_radius)
        }
    };

    Ok(field.normalized())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_grid() -> GridParams {
        GridParams {
            n: 64,
            window: 40e-6,
        }
    }

    #[test]
    fn gaussian_mode_has_unit_power_and_peaks_on_axis() {
        let fiber = FiberParams::default();
        let u = init_fiber_mode(&fiber, &small_grid(), SourceProfile::Gaussian).unwrap();
        assert!((u.total_power() - 1.0).abs() < 1e-12);
        let c = u.grid.center();
        let peak = u.peak_intensity();
        assert_eq!(u.at(c, c).norm_sqr(), peak);
    }

    #[test]
    fn top_hat_is_zero_outside_core() {
        let fiber = FiberParams::default();
        let u = init_fiber_mode(&fiber, &small_grid(), SourceProfile::TopHat).unwrap();
        assert!((u.total_power() - 1.0).abs() < 1e-12);
        let g = u.grid;
        let r2_core = fiber.core_radius * fiber.core_radius;
        for j in 0..g.n {
            for i in 0..g.n {
                if g.r2(i, j) > r2_core {
                    assert_eq!(u.at(i, j).norm_sqr(), 0.0);
                }
            }
        }
    }

    #[test]
    fn core_larger_than_half_window_is_rejected() {
        let fiber = FiberParams {
            core_radius: 25e-6,
            ..FiberParams::default()
        };
        let err = init_fiber_mode(&fiber, &small_grid(), SourceProfile::Gaussian).unwrap_err();
        assert!(matches!(err, ConfigurationError::ModeExceedsWindow { .. }));
    }

    #[test]
    fn degenerate_grid_is_rejected() {
        let fiber = FiberParams::default();
        let g = GridParams { n: 0, window: 40e-6 };
        assert_eq!(
            init_fiber_mode(&fiber, &g, SourceProfile::Gaussian).unwrap_err(),
            ConfigurationError::NonPositiveResolution(0)
        );
        let g = GridParams { n: 64, window: 0.0 };
        assert!(matches!(
            init_fiber_mode(&fiber, &g, SourceProfile::TopHat),
            Err(ConfigurationError::NonPositiveWindow(_))
        ));
    }
}
