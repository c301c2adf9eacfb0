// src/aperture_mask.rs
//
// Boolean aperture masks on the simulation grid.
//
// Notes:
// - true = transmitting, false = blocked.
// - Coordinates are centered: the sample at index n/2 is on axis (see grid.rs).
// - Blocked samples are set to exactly zero downstream; there is no apodization.

use crate::grid::SimulationGrid;

/// Boolean mask for a square grid (length = n*n).
pub type Mask2D = Vec<bool>;

/// Build a mask from a predicate f(x,y)->bool, where x,y are centered positions.
pub fn mask_from_fn<F>(grid: &SimulationGrid, f: F) -> Mask2D
where
    F: Fn(f64, f64) -> bool,
{
    let mut mask = vec![false; grid.n_cells()];
    for j in 0..grid.n {
        for i in 0..grid.n {
            let (x, y) = grid.xy(i, j);
            mask[grid.idx(i, j)] = f(x, y);
        }
    }
    mask
}

/// Disk mask: x^2 + y^2 <= radius^2 (on-axis center).
pub fn mask_disk(grid: &SimulationGrid, radius: f64) -> Mask2D {
    let r2 = radius * radius;
    mask_from_fn(grid, move |x, y| x * x + y * y <= r2)
}

/// Outer band of the window: samples within `band` indices of any edge.
pub fn mask_edge_band(grid: &SimulationGrid, band: usize) -> Mask2D {
    let n = grid.n;
    let mut mask = vec![false; grid.n_cells()];
    for j in 0..n {
        for i in 0..n {
            let near = i < band || j < band || i + band >= n || j + band >= n;
            mask[grid.idx(i, j)] = near;
        }
    }
    mask
}

/// Count "true" samples.
pub fn mask_count(mask: &[bool]) -> usize {
    mask.iter().filter(|&&v| v).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disk_area_matches_pi_r_squared() {
        let grid = SimulationGrid::new(256, 256.0, 1.0);
        let mask = mask_disk(&grid, 50.0);
        let area = mask_count(&mask) as f64 * grid.cell_area();
        let expected = std::f64::consts::PI * 50.0 * 50.0;
        assert!(
            ((area - expected) / expected).abs() < 0.01,
            "area={} expected={}",
            area,
            expected
        );
    }

    #[test]
    fn disk_contains_center_sample() {
        let grid = SimulationGrid::new(8, 8.0, 1.0);
        let mask = mask_disk(&grid, 0.1);
        assert_eq!(mask_count(&mask), 1);
        assert!(mask[grid.idx(grid.center(), grid.center())]);
    }

    #[test]
    fn edge_band_counts_border_samples() {
        let grid = SimulationGrid::new(10, 10.0, 1.0);
        let mask = mask_edge_band(&grid, 1);
        assert_eq!(mask_count(&mask), 10 * 10 - 8 * 8);
        let none = mask_edge_band(&grid, 0);
        assert_eq!(mask_count(&none), 0);
    }
}
