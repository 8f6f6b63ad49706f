//! Two-panel SVG rendering: magnitude over time, |FFT| over frequency

use std::path::Path;

use anyhow::Result;
use plotters::prelude::*;
use tracing::debug;

use crate::spectrum::Spectrum;

/// Output size and point budget
#[derive(Debug, Clone, Copy)]
pub struct PlotSettings {
    pub width: u32,
    pub height: u32,
    pub max_points: usize,
}

/// Render both panels to `path`.
pub fn render(spectrum: &Spectrum, path: &Path, settings: PlotSettings) -> Result<()> {
    let time: Vec<(f64, f32)> = spectrum
        .magnitude
        .iter()
        .enumerate()
        .map(|(i, m)| (i as f64, *m))
        .collect();
    let time = peak_decimate(&time, settings.max_points);
    let freq = peak_decimate(&spectrum.shifted(), settings.max_points);

    debug!(
        "Drawing {} time points and {} frequency points",
        time.len(),
        freq.len()
    );

    let root = SVGBackend::new(path, (settings.width, settings.height)).into_drawing_area();
    root.fill(&WHITE)?;
    let panels = root.split_evenly((2, 1));

    let n = if spectrum.is_empty() { 1.0 } else { spectrum.len() as f64 };
    let mut chart = ChartBuilder::on(&panels[0])
        .caption("Magnitude", ("sans-serif", 20))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(70)
        .build_cartesian_2d(0f64..n, 0f32..headroom(&time))?;
    chart
        .configure_mesh()
        .x_desc("Sample")
        .y_desc("|x|")
        .draw()?;
    chart.draw_series(LineSeries::new(time, &BLUE))?;

    let nyquist = spectrum.sample_rate / 2.0;
    let mut chart = ChartBuilder::on(&panels[1])
        .caption("Spectrum", ("sans-serif", 20))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(70)
        .build_cartesian_2d(-nyquist..nyquist, 0f32..headroom(&freq))?;
    chart
        .configure_mesh()
        .x_desc("Frequency (Hz)")
        .y_desc("|FFT|")
        .draw()?;
    chart.draw_series(LineSeries::new(freq, &RED))?;

    root.present()?;
    Ok(())
}

/// Upper y bound: 5% above the largest value, never an empty range.
fn headroom(points: &[(f64, f32)]) -> f32 {
    let max = points.iter().map(|p| p.1).fold(0.0f32, f32::max);
    if max > 0.0 {
        max * 1.05
    } else {
        1.0
    }
}

/// Reduce to at most `max_points`, keeping the largest point of each chunk
/// so narrow peaks survive.
pub fn peak_decimate(points: &[(f64, f32)], max_points: usize) -> Vec<(f64, f32)> {
    if max_points == 0 || points.len() <= max_points {
        return points.to_vec();
    }

    let chunk = points.len().div_ceil(max_points);
    points
        .chunks(chunk)
        .filter_map(|c| c.iter().copied().max_by(|a, b| a.1.total_cmp(&b.1)))
        .collect()
}
