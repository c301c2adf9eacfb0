// src/complex_field.rs

use rustfft::num_complex::Complex;

use crate::grid::SimulationGrid;

/// Scalar complex amplitude sampled on a square grid.
///
/// Samples are stored row-major: `data[grid.idx(i, j)]` with `i` along x.
/// Stages never mutate their input field; each returns a new one.
#[derive(Debug, Clone)]
pub struct ComplexField {
    pub grid: SimulationGrid,
    pub data: Vec<Complex<f64>>,
}

impl ComplexField {
    /// Build a field by evaluating `f(x, y)` at every centered sample position.
    pub fn from_fn<F>(grid: SimulationGrid, f: F) -> Self
    where
        F: Fn(f64, f64) -> Complex<f64>,
    {
        let mut data = Vec::with_capacity(grid.n_cells());
        for j in 0..grid.n {
            for i in 0..grid.n {
                let (x, y) = grid.xy(i, j);
                data.push(f(x, y));
            }
        }
        Self { grid, data }
    }

    #[inline]
    pub fn idx(&self, i: usize, j: usize) -> usize {
        self.grid.idx(i, j)
    }

    #[inline]
    pub fn at(&self, i: usize, j: usize) -> Complex<f64> {
        self.data[self.idx(i, j)]
    }

    /// |u|² per sample.
    pub fn intensity(&self) -> Vec<f64> {
        self.data.iter().map(|v| v.norm_sqr()).collect()
    }

    /// Optical power Σ|u|²·dA.
    pub fn total_power(&self) -> f64 {
        let s: f64 = self.data.iter().map(|v| v.norm_sqr()).sum();
        s * self.grid.cell_area()
    }

    /// Return a copy scaled to unit total power. A zero field is returned unchanged.
    pub fn normalized(&self) -> Self {
        let p = self.total_power();
        if !(p > 0.0 && p.is_finite()) {
            return self.clone();
        }
        let s = 1.0 / p.sqrt();
        Self {
            grid: self.grid,
            data: self.data.iter().map(|v| v * s).collect(),
        }
    }

    /// Largest |u|² on the grid.
    pub fn peak_intensity(&self) -> f64 {
        self.data
            .iter()
            .map(|v| v.norm_sqr())
            .fold(0.0, f64::max)
    }
}
