// src/fft2.rs
//
// 2D FFT on square row-major grids, built from rustfft 1D plans.
//
// Rows are transformed in parallel. Columns use a gather-column loop for small
// grids and a transpose + parallel-row pass for large ones, where the extra
// memory traffic pays off. The inverse is scaled by 1/(n*n) (rustfft is
// unnormalised).

use std::sync::Arc;

use rayon::prelude::*;
use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};

const PAR_COLUMN_THRESHOLD: usize = 32_768;

#[inline]
fn use_parallel_column_fft(n: usize) -> bool {
    n >= 64 && n.saturating_mul(n) >= PAR_COLUMN_THRESHOLD
}

/// Forward/inverse plans for an `n × n` grid plus scratch space.
pub struct Fft2 {
    n: usize,
    fwd: Arc<dyn Fft<f64>>,
    inv: Arc<dyn Fft<f64>>,
    tmp: Vec<Complex<f64>>,
}

impl Fft2 {
    pub fn new(n: usize) -> Self {
        let mut planner = FftPlanner::<f64>::new();
        Self {
            n,
            fwd: planner.plan_fft_forward(n),
            inv: planner.plan_fft_inverse(n),
            tmp: vec![Complex::new(0.0, 0.0); n * n],
        }
    }

    /// Unnormalised forward transform, in place.
    pub fn forward(&mut self, data: &mut [Complex<f64>]) {
        let fft = Arc::clone(&self.fwd);
        self.process(data, &fft);
    }

    /// Inverse transform with 1/(n*n) scaling, in place.
    pub fn inverse(&mut self, data: &mut [Complex<f64>]) {
        let fft = Arc::clone(&self.inv);
        self.process(data, &fft);

        let scale = 1.0 / (self.n * self.n) as f64;
        data.par_iter_mut().for_each(|v| {
            v.re *= scale;
            v.im *= scale;
        });
    }

    fn process(&mut self, data: &mut [Complex<f64>], fft: &Arc<dyn Fft<f64>>) {
        let n = self.n;
        let len = n * n;
        assert_eq!(
            data.len(),
            len,
            "Fft2: data length {} does not match {}x{}",
            data.len(),
            n,
            n
        );

        // 1) Rows (parallel)
        data.par_chunks_mut(n).for_each(|row| {
            fft.process(row);
        });

        // 2) Columns
        let tmp = &mut self.tmp[..len];
        if !use_parallel_column_fft(n) {
            let col_buf = &mut tmp[..n];
            for x in 0..n {
                for y in 0..n {
                    col_buf[y] = data[y * n + x];
                }
                fft.process(col_buf);
                for y in 0..n {
                    data[y * n + x] = col_buf[y];
                }
            }
            return;
        }

        // Transpose path: tmp[x*n + y] = data[y*n + x]
        {
            let data_ro: &[Complex<f64>] = &*data;
            tmp.par_chunks_mut(n).enumerate().for_each(|(x, col)| {
                for y in 0..n {
                    col[y] = data_ro[y * n + x];
                }
            });
        }

        tmp.par_chunks_mut(n).for_each(|col| {
            fft.process(col);
        });

        let tmp_ro: &[Complex<f64>] = &*tmp;
        data.par_chunks_mut(n).enumerate().for_each(|(y, row)| {
            for x in 0..n {
                row[x] = tmp_ro[x * n + y];
            }
        });
    }
}

/// Signed FFT frequency index for bin `k` of an `n`-point transform.
#[inline]
pub fn freq_index(k: usize, n: usize) -> f64 {
    if k < n.div_ceil(2) {
        k as f64
    } else {
        k as f64 - n as f64
    }
}

/// Move the sample at `n/2` (on-axis) to index 0 along both axes.
pub fn ifftshift2(data: &[Complex<f64>], n: usize) -> Vec<Complex<f64>> {
    let c = n / 2;
    let mut out = vec![Complex::new(0.0, 0.0); n * n];
    out.par_chunks_mut(n).enumerate().for_each(|(j, row)| {
        let sj = (j + c) % n;
        for (i, v) in row.iter_mut().enumerate() {
            *v = data[sj * n + (i + c) % n];
        }
    });
    out
}

/// Inverse of [`ifftshift2`]: move index 0 back to `n/2`.
pub fn fftshift2(data: &[Complex<f64>], n: usize) -> Vec<Complex<f64>> {
    let c = n / 2;
    let mut out = vec![Complex::new(0.0, 0.0); n * n];
    out.par_chunks_mut(n).enumerate().for_each(|(j, row)| {
        let sj = (j + n - c) % n;
        for (i, v) in row.iter_mut().enumerate() {
            *v = data[sj * n + (i + n - c) % n];
        }
    });
    out
}
