// src/grid.rs

/// Square sampling grid for a scalar optical field.
///
/// Sample `i` sits at `x = (i - n/2) * dx`, so for every `n` the sample at
/// index `n/2` lies exactly on the optical axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulationGrid {
    pub n: usize,
    /// Sampling pitch (m).
    pub dx: f64,
    /// Vacuum wavelength (m).
    pub wavelength: f64,
}

impl SimulationGrid {
    /// Grid with `n × n` samples covering a window of side `window` (m).
    pub fn new(n: usize, window: f64, wavelength: f64) -> Self {
        let dx = if n > 0 { window / n as f64 } else { 0.0 };
        Self { n, dx, wavelength }
    }

    /// Grid with an explicit pitch (used for rescaled output planes).
    pub fn with_pitch(n: usize, dx: f64, wavelength: f64) -> Self {
        Self { n, dx, wavelength }
    }

    /// Side length of the simulated window (m).
    pub fn window(&self) -> f64 {
        self.n as f64 * self.dx
    }

    /// Total number of samples.
    pub fn n_cells(&self) -> usize {
        self.n * self.n
    }

    /// Area of one sample (m^2).
    pub fn cell_area(&self) -> f64 {
        self.dx * self.dx
    }

    /// Index of the on-axis sample along either direction.
    pub fn center(&self) -> usize {
        self.n / 2
    }

    /// Wavenumber k = 2π/λ.
    pub fn wavenumber(&self) -> f64 {
        2.0 * std::f64::consts::PI / self.wavelength
    }

    /// Convert (i, j) indices to a flat index into a 1D array.
    #[inline]
    pub fn idx(&self, i: usize, j: usize) -> usize {
        debug_assert!(i < self.n && j < self.n);
        j * self.n + i
    }

    /// Physical coordinate of sample index `i` along one axis (m).
    #[inline]
    pub fn coord(&self, i: usize) -> f64 {
        (i as f64 - self.center() as f64) * self.dx
    }

    /// Centered (x, y) coordinates of sample (i, j) (m).
    #[inline]
    pub fn xy(&self, i: usize, j: usize) -> (f64, f64) {
        (self.coord(i), self.coord(j))
    }

    /// Squared radial distance of sample (i, j) from the axis (m^2).
    #[inline]
    pub fn r2(&self, i: usize, j: usize) -> f64 {
        let (x, y) = self.xy(i, j);
        x * x + y * y
    }

    /// Distance beyond which the angular-spectrum transfer function is
    /// undersampled and the single-FFT Fresnel transform becomes the right tool.
    pub fn critical_distance(&self) -> f64 {
        self.n as f64 * self.dx * self.dx / self.wavelength
    }
}
