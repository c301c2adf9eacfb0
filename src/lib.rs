// src/lib.rs

pub mod analysis;
pub mod aperture_mask;
pub mod complex_field;
pub mod config;
pub mod error;
pub mod fft2;
pub mod grid;
pub mod params;
pub mod phase_screen;
pub mod propagation;
pub mod report;
pub mod source;
pub mod sweep;
pub mod visualisation;
