//! Comparison charts and efficiency heat-maps

use std::path::{Path, PathBuf};

use plotters::prelude::*;

use crate::error::{StudyError, StudyResult, TableError};
use crate::image::Grid;
use crate::table::Table;

pub const PLOT_DIR: &str = "plots";

const SIZE: (u32, u32) = (800, 600);

fn plot_err(e: impl std::fmt::Display) -> StudyError {
    StudyError::PlotError(e.to_string())
}

fn y_bounds(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let (lo, hi) = values
        .filter(|v| v.is_finite())
        .fold((0.0f64, f64::MIN), |(lo, hi), v| (lo.min(v), hi.max(v)));
    if hi <= lo {
        (lo, lo + 1.0)
    } else {
        (lo, hi * 1.1)
    }
}

/// Plot one statistic against a swept metric, one line per trace
///
/// `table` is `[metric, trace, statistic]` with numeric metric
/// coordinates. The chart lands in `{out_dir}/{root}_plot{plot_num+1}.svg`.
pub fn plot_data(
    out_dir: &Path,
    root: &str,
    metric_dim: &str,
    metric_title: &str,
    table: &Table,
    plot_num: usize,
) -> StudyResult<PathBuf> {
    let table = table.transpose(&[metric_dim, "trace", "statistic"])?;
    let xs = table.numeric_coords(metric_dim)?;
    let traces = table.dims()[1].coords.clone();
    let statistic = table.dims()[2]
        .coords
        .get(plot_num)
        .cloned()
        .ok_or_else(|| TableError::OutOfBounds(vec![plot_num]))?;

    let mut series: Vec<(String, Vec<(f64, f64)>)> = Vec::new();
    for (t, trace) in traces.iter().enumerate() {
        let mut points = Vec::new();
        for (m, x) in xs.iter().enumerate() {
            let y = table.get(&[m, t, plot_num])?;
            if y.is_finite() && *x > 0.0 {
                points.push((*x, y));
            }
        }
        series.push((trace.clone(), points));
    }

    let x_min = xs.iter().cloned().filter(|x| *x > 0.0).fold(f64::MAX, f64::min);
    let x_max = xs.iter().cloned().fold(f64::MIN, f64::max);
    if x_min > x_max {
        return Err(TableError::NonNumericCoord(metric_dim.to_string()).into());
    }
    let x_max = if x_max > x_min { x_max } else { x_min * 2.0 };
    let (y_min, y_max) =
        y_bounds(series.iter().flat_map(|(_, p)| p.iter().map(|(_, y)| *y)));

    let title = format!("{} vs. {}", statistic, metric_title);
    let path = out_dir.join(format!("{}_plot{}.svg", root, plot_num + 1));

    // The backend borrows `path` until it is dropped
    {
        let drawing = SVGBackend::new(&path, SIZE).into_drawing_area();
        drawing.fill(&WHITE).map_err(plot_err)?;

        let mut ctx = ChartBuilder::on(&drawing)
            .caption(title.as_str(), ("sans-serif", 30).into_font())
            .margin(10)
            .x_label_area_size(40)
            .y_label_area_size(60)
            .build_cartesian_2d(
                (x_min..x_max).log_scale().base(2.0),
                y_min..y_max,
            )
            .map_err(plot_err)?;
        ctx.configure_mesh()
            .x_desc(metric_title)
            .y_desc(statistic.as_str())
            .draw()
            .map_err(plot_err)?;

        for (i, (label, points)) in series.into_iter().enumerate() {
            let color = Palette99::pick(i).to_rgba();
            ctx.draw_series(LineSeries::new(points.clone(), color))
                .map_err(plot_err)?
                .label(label)
                .legend(move |(x, y)| {
                    PathElement::new(vec![(x, y), (x + 20, y)], color)
                });
            ctx.draw_series(points.into_iter().map(|p| Cross::new(p, 4, color)))
                .map_err(plot_err)?;
        }

        ctx.configure_series_labels()
            .background_style(&WHITE.mix(0.8))
            .border_style(&BLACK)
            .draw()
            .map_err(plot_err)?;
        drawing.present().map_err(plot_err)?;
    }

    tracing::info!("Wrote {}", path.display());
    Ok(path)
}

/// Grouped bars of a 2-D `[group, series]` table, e.g. `[trace, policy]`
pub fn plot_bars(
    path: &Path,
    title: &str,
    y_desc: &str,
    table: &Table,
) -> StudyResult<()> {
    if table.rank() != 2 {
        return Err(TableError::WrongRank {
            expected: 2,
            got: table.rank(),
        }
        .into());
    }
    let groups = table.dims()[0].coords.clone();
    let series = table.dims()[1].coords.clone();
    // One slot per bar plus a spacer between groups
    let slots = series.len() + 1;
    let width = (groups.len() * slots) as i32;
    let (y_min, y_max) = y_bounds(table.data().iter().cloned());

    let drawing = SVGBackend::new(path, SIZE).into_drawing_area();
    drawing.fill(&WHITE).map_err(plot_err)?;

    let mut ctx = ChartBuilder::on(&drawing)
        .caption(title, ("sans-serif", 30).into_font())
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(0..width, y_min..y_max)
        .map_err(plot_err)?;

    let label_slot = series.len() / 2;
    let x_formatter = |x: &i32| {
        let x = *x as usize;
        if x % slots == label_slot {
            groups.get(x / slots).cloned().unwrap_or_default()
        } else {
            String::new()
        }
    };
    ctx.configure_mesh()
        .disable_x_mesh()
        .x_labels(width as usize)
        .x_label_formatter(&x_formatter)
        .y_desc(y_desc)
        .draw()
        .map_err(plot_err)?;

    for (s, name) in series.iter().enumerate() {
        let color = Palette99::pick(s).to_rgba();
        let mut bars = Vec::new();
        for g in 0..groups.len() {
            let value = table.get(&[g, s])?;
            if !value.is_finite() {
                continue;
            }
            let x = (g * slots + s) as i32;
            bars.push(Rectangle::new([(x, 0.0), (x + 1, value)], color.filled()));
        }
        ctx.draw_series(bars)
            .map_err(plot_err)?
            .label(name.as_str())
            .legend(move |(x, y)| {
                Rectangle::new([(x, y - 5), (x + 15, y + 5)], color.filled())
            });
    }

    ctx.configure_series_labels()
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()
        .map_err(plot_err)?;
    drawing.present().map_err(plot_err)?;

    tracing::info!("Wrote {}", path.display());
    Ok(())
}

/// Blue (low) to red (high), grey for padding cells
fn heat_color(value: f64, lo: f64, hi: f64) -> HSLColor {
    if value.is_nan() {
        return HSLColor(0.0, 0.0, 0.85);
    }
    let t = if hi > lo { (value - lo) / (hi - lo) } else { 0.5 };
    HSLColor(2.0 / 3.0 * (1.0 - t.clamp(0.0, 1.0)), 0.9, 0.5)
}

/// Heat-map of an efficiency image
pub fn plot_heatmap(grid: &Grid, title: &str, path: &Path) -> StudyResult<()> {
    let (lo, hi) = grid.range().unwrap_or((0.0, 1.0));
    let caption = format!("{} [{:.3}, {:.3}]", title, lo, hi);

    let drawing = SVGBackend::new(path, SIZE).into_drawing_area();
    drawing.fill(&WHITE).map_err(plot_err)?;

    let rows = grid.rows.max(1) as i32;
    let cols = grid.cols.max(1) as i32;
    let mut ctx = ChartBuilder::on(&drawing)
        .caption(caption.as_str(), ("sans-serif", 24).into_font())
        .margin(10)
        .x_label_area_size(30)
        .y_label_area_size(40)
        .build_cartesian_2d(0..cols, 0..rows)
        .map_err(plot_err)?;
    ctx.configure_mesh()
        .disable_mesh()
        .draw()
        .map_err(plot_err)?;

    let mut cells = Vec::with_capacity(grid.cells.len());
    for r in 0..grid.rows {
        for c in 0..grid.cols {
            let value = grid.get(r, c).unwrap_or(f64::NAN);
            // Row 0 at the top
            let (x, y) = (c as i32, rows - 1 - r as i32);
            cells.push(Rectangle::new(
                [(x, y), (x + 1, y + 1)],
                heat_color(value, lo, hi).filled(),
            ));
        }
    }
    ctx.draw_series(cells).map_err(plot_err)?;
    drawing.present().map_err(plot_err)?;

    tracing::info!("Wrote {}", path.display());
    Ok(())
}
