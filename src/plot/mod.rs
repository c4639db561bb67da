// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Quick-look plots of simulator products.

mod error;
#[cfg(test)]
mod tests;

pub use error::PlotError;

use std::path::Path;

use crate::mapping::Trajectory;

#[cfg_attr(not(feature = "plotting"), allow(dead_code))]
fn finite_extent(v: &[f64]) -> (f64, f64) {
    v.iter()
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        })
}

/// The limits of a square plot window holding every `(x, y)` offset
/// \[arcmin\], with a margin of `margin` of the widest extent on each side.
#[cfg_attr(not(feature = "plotting"), allow(dead_code))]
fn square_limits(x: &[f64], y: &[f64], margin: f64) -> Option<((f64, f64), (f64, f64))> {
    let (x_min, x_max) = finite_extent(x);
    let (y_min, y_max) = finite_extent(y);
    if x_min > x_max || y_min > y_max {
        return None;
    }

    // A single point still gets a window.
    let half = ((x_max - x_min).max(y_max - y_min) / 2.0).max(0.5) * (1.0 + margin);
    let x_mid = (x_min + x_max) / 2.0;
    let y_mid = (y_min + y_max) / 2.0;
    Some((
        (x_mid - half, x_mid + half),
        (y_mid - half, y_mid + half),
    ))
}

/// Draw the boresight offsets of `trajectory` to a PNG at `path`.
#[cfg(feature = "plotting")]
pub fn plot_trajectory(path: &Path, trajectory: &Trajectory, title: &str) -> Result<(), PlotError> {
    plotting::plot_trajectory(path, trajectory, title)
}

#[cfg(not(feature = "plotting"))]
pub fn plot_trajectory(
    _path: &Path,
    _trajectory: &Trajectory,
    _title: &str,
) -> Result<(), PlotError> {
    // Plotting is an optional feature, as its C dependencies can't be
    // statically compiled.
    Err(PlotError::NoPlottingFeature)
}

#[cfg(feature = "plotting")]
mod plotting {
    use log::debug;
    use plotters::prelude::*;
    use thiserror::Error;

    use super::*;

    /// The number of X pixels on the plots.
    const X_PIXELS: u32 = 1200;
    /// The number of Y pixels on the plots.
    const Y_PIXELS: u32 = 1200;

    pub(super) fn plot_trajectory(
        path: &Path,
        trajectory: &Trajectory,
        title: &str,
    ) -> Result<(), PlotError> {
        let x: Vec<f64> = trajectory.x.iter().map(|v| v * 60.0).collect();
        let y: Vec<f64> = trajectory.y.iter().map(|v| v * 60.0).collect();
        let (x_range, y_range) = square_limits(&x, &y, 0.05).ok_or(PlotError::Empty)?;
        debug!(
            "Plotting {} trajectory samples to {}",
            trajectory.len(),
            path.display()
        );

        let root_area = BitMapBackend::new(path, (X_PIXELS, Y_PIXELS)).into_drawing_area();
        root_area
            .fill(&WHITE)
            .map_err(|e| DrawError::Plotters(Box::new(e)))?;

        let mut cc = ChartBuilder::on(&root_area)
            .caption(title, ("sans-serif", 40))
            .margin(20)
            .x_label_area_size(60)
            .y_label_area_size(80)
            .build_cartesian_2d(x_range.0..x_range.1, y_range.0..y_range.1)
            .map_err(|e| DrawError::Trajectory(e.to_string()))?;

        cc.configure_mesh()
            .light_line_style(WHITE)
            .x_desc("x offset [arcmin]")
            .y_desc("y offset [arcmin]")
            .label_style(("sans-serif", 24))
            .draw()
            .map_err(|e| DrawError::Trajectory(e.to_string()))?;

        cc.draw_series(LineSeries::new(
            x.iter()
                .zip(y.iter())
                .filter(|(x, y)| x.is_finite() && y.is_finite())
                .map(|(&x, &y)| (x, y)),
            &BLUE,
        ))
        .map_err(|e| DrawError::Trajectory(e.to_string()))?;

        // Mark the start.
        if let (Some(&x0), Some(&y0)) = (x.first(), y.first()) {
            cc.draw_series(std::iter::once(Circle::new((x0, y0), 6, RED.filled())))
                .map_err(|e| DrawError::Trajectory(e.to_string()))?;
        }

        root_area
            .present()
            .map_err(|e| DrawError::Plotters(Box::new(e)))?;
        Ok(())
    }

    #[derive(Error, Debug)]
    pub enum DrawError {
        #[error("While plotting the trajectory: {0}")]
        Trajectory(String),

        #[error("Error from the plotters library: {0}")]
        Plotters(Box<dyn std::error::Error>),
    }
}
