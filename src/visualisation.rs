// src/visualisation.rs

use crate::analysis::center_row_profile;
use crate::complex_field::ComplexField;
use crate::report::normalised;
use crate::sweep::SweepReport;
use plotters::prelude::*;

/// "hot" colour map: black -> red -> yellow -> white for x in [0, 1].
fn hot_color(x: f64) -> RGBColor {
    let x = if x.is_finite() { x.clamp(0.0, 1.0) } else { 0.0 };
    let r = (3.0 * x).clamp(0.0, 1.0);
    let g = (3.0 * x - 1.0).clamp(0.0, 1.0);
    let b = (3.0 * x - 2.0).clamp(0.0, 1.0);
    RGBColor((255.0 * r) as u8, (255.0 * g) as u8, (255.0 * b) as u8)
}

/// Pad a data range by 10% (or ±1 when degenerate).
fn padded_range(lo: f64, hi: f64) -> (f64, f64) {
    if !lo.is_finite() || !hi.is_finite() {
        return (-1.0, 1.0);
    }
    if (hi - lo).abs() < 1e-30 {
        let delta = if hi.abs() < 1e-30 { 1.0 } else { 0.1 * hi.abs() };
        return (lo - delta, hi + delta);
    }
    let margin = 0.1 * (hi - lo);
    (lo - margin, hi + margin)
}

/// Beam width versus curvature radius, concave face and flat-face reference.
pub fn save_width_vs_radius_plot(
    report: &SweepReport,
    filename: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let points: Vec<(f64, f64)> = report
        .completed()
        .filter_map(|r| r.width().map(|w| (r.curvature_radius * 1e6, w * 1e6)))
        .collect();
    if points.is_empty() {
        return Ok(()); // nothing to plot
    }
    let flat_w = report.flat.metrics.width.map(|w| w * 1e6);

    let x_lo = points.iter().map(|p| p.0).fold(f64::INFINITY, f64::min);
    let x_hi = points.iter().map(|p| p.0).fold(f64::NEG_INFINITY, f64::max);
    let mut y_lo = points.iter().map(|p| p.1).fold(f64::INFINITY, f64::min);
    let mut y_hi = points.iter().map(|p| p.1).fold(f64::NEG_INFINITY, f64::max);
    if let Some(f) = flat_w {
        y_lo = y_lo.min(f);
        y_hi = y_hi.max(f);
    }
    let (x_min, x_max) = padded_range(x_lo, x_hi);
    let (y_min, y_max) = padded_range(y_lo, y_hi);

    let root = BitMapBackend::new(filename, (1024, 768)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .margin(20)
        .caption("Beam width vs curvature radius", ("sans-serif", 30))
        .set_left_and_bottom_label_area_size(60)
        .build_cartesian_2d(x_min..x_max, y_min..y_max)?;

    chart
        .configure_mesh()
        .x_desc("curvature radius (μm)")
        .y_desc("1/e² beam width (μm)")
        .label_style(("sans-serif", 16))
        .axis_desc_style(("sans-serif", 18))
        .draw()?;

    if let Some(f) = flat_w {
        chart
            .draw_series(LineSeries::new(vec![(x_min, f), (x_max, f)], &BLUE))?
            .label("flat face")
            .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &BLUE));
    }

    chart
        .draw_series(LineSeries::new(points.iter().cloned(), &RED))?
        .label("concave face")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &RED));
    chart.draw_series(
        points
            .iter()
            .map(|&(x, y)| Circle::new((x, y), 5, RED.filled())),
    )?;

    chart
        .configure_series_labels()
        .border_style(&BLACK)
        .background_style(&WHITE.mix(0.8))
        .draw()?;

    root.present()?;
    Ok(())
}

/// Divergence half-angle versus 1/Rc; the flat face sits at 1/Rc = 0.
pub fn save_divergence_plot(
    report: &SweepReport,
    filename: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut points: Vec<(f64, f64)> = report
        .completed()
        .filter_map(|r| {
            r.divergence_angle
                .map(|d| (1e-3 / r.curvature_radius, d * 1e3))
        })
        .collect();
    if let Some(d) = report.flat.divergence_angle {
        points.push((0.0, d * 1e3));
    }
    if points.len() < 2 {
        return Ok(());
    }
    points.sort_by(|a, b| a.0.total_cmp(&b.0));

    let x_hi = points.iter().map(|p| p.0).fold(f64::NEG_INFINITY, f64::max);
    let y_lo = points.iter().map(|p| p.1).fold(f64::INFINITY, f64::min);
    let y_hi = points.iter().map(|p| p.1).fold(f64::NEG_INFINITY, f64::max);
    let (_, x_max) = padded_range(0.0, x_hi);
    let (y_min, y_max) = padded_range(y_lo, y_hi);

    let root = BitMapBackend::new(filename, (1024, 768)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .margin(20)
        .caption("Divergence vs end-face curvature", ("sans-serif", 30))
        .set_left_and_bottom_label_area_size(60)
        .build_cartesian_2d(0.0..x_max, y_min..y_max)?;

    chart
        .configure_mesh()
        .x_desc("1/Rc (1/mm)")
        .y_desc("divergence half-angle (mrad)")
        .label_style(("sans-serif", 16))
        .axis_desc_style(("sans-serif", 18))
        .draw()?;

    chart.draw_series(LineSeries::new(points.iter().cloned(), &BLACK))?;
    chart.draw_series(
        points
            .iter()
            .map(|&(x, y)| Circle::new((x, y), 5, BLACK.filled())),
    )?;

    root.present()?;
    Ok(())
}

/// Intensity map cropped to ±`half_extent` metres around the axis.
pub fn save_intensity_map(
    field: &ComplexField,
    half_extent: f64,
    title: &str,
    filename: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let grid = field.grid;
    let c = grid.center() as isize;
    let n = grid.n as isize;
    let half_cells = ((half_extent / grid.dx).ceil() as isize).max(4);
    let lo = (c - half_cells).max(0) as usize;
    let hi = (c + half_cells).min(n - 1) as usize;

    let intensity = field.intensity();
    let peak = intensity.iter().cloned().fold(0.0, f64::max);
    let peak = if peak > 0.0 { peak } else { 1.0 };

    let to_um = |i: usize| grid.coord(i) * 1e6;
    let half_dx_um = 0.5 * grid.dx * 1e6;
    let x_min = to_um(lo) - half_dx_um;
    let x_max = to_um(hi) + half_dx_um;

    let root = BitMapBackend::new(filename, (800, 800)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .margin(40)
        .caption(title, ("sans-serif", 20))
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(x_min..x_max, x_min..x_max)?;

    chart
        .configure_mesh()
        .x_desc("x (μm)")
        .y_desc("y (μm)")
        .axis_desc_style(("sans-serif", 15))
        .disable_mesh()
        .draw()?;

    chart.draw_series((lo..=hi).flat_map(|i| {
        let intensity = &intensity;
        (lo..=hi).map(move |j| {
            let v = intensity[grid.idx(i, j)] / peak;
            let (x, y) = (to_um(i), to_um(j));
            Rectangle::new(
                [(x - half_dx_um, y - half_dx_um), (x + half_dx_um, y + half_dx_um)],
                hot_color(v).filled(),
            )
        })
    }))?;

    root.present()?;
    Ok(())
}

/// Normalised centre-row profiles of the flat face and the inspected radius.
pub fn save_profile_plot(
    report: &SweepReport,
    half_extent: f64,
    filename: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let flat = &report.flat.field;
    let grid = flat.grid;
    let flat_profile = normalised(&center_row_profile(flat));

    let root = BitMapBackend::new(filename, (1024, 768)).into_drawing_area();
    root.fill(&WHITE)?;

    let x_lim = half_extent * 1e6;
    let mut chart = ChartBuilder::on(&root)
        .margin(20)
        .caption("Centre-row intensity profile", ("sans-serif", 30))
        .set_left_and_bottom_label_area_size(60)
        .build_cartesian_2d(-x_lim..x_lim, 0.0..1.1)?;

    chart
        .configure_mesh()
        .x_desc("x (μm)")
        .y_desc("normalised intensity")
        .label_style(("sans-serif", 16))
        .axis_desc_style(("sans-serif", 18))
        .draw()?;

    let in_view = |x: f64| x.abs() <= x_lim;
    chart
        .draw_series(LineSeries::new(
            flat_profile
                .iter()
                .enumerate()
                .map(|(i, &v)| (grid.coord(i) * 1e6, v))
                .filter(|p| in_view(p.0)),
            &BLUE,
        ))?
        .label("flat face")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &BLUE));

    if let Some(r) = report.inspected() {
        if let Some(f) = &r.field {
            let p = normalised(&center_row_profile(f));
            let g = f.grid;
            chart
                .draw_series(LineSeries::new(
                    p.iter()
                        .enumerate()
                        .map(|(i, &v)| (g.coord(i) * 1e6, v))
                        .filter(|p| in_view(p.0)),
                    &RED,
                ))?
                .label(format!("concave, Rc = {:.0} μm", r.curvature_radius * 1e6))
                .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &RED));
        }
    }

    chart
        .configure_series_labels()
        .border_style(&BLACK)
        .background_style(&WHITE.mix(0.8))
        .draw()?;

    root.present()?;
    Ok(())
}
