// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Mapping patterns: the trajectory the telescope boresight traces around a
//! target.

mod error;
mod lissajous;
mod raster;

pub use error::MappingError;
pub use lissajous::{LissajousConfig, LissajousModel};
pub use raster::{RasterConfig, RasterModel};

use chrono::NaiveDateTime;
use log::trace;
use serde::{Deserialize, Serialize};

use crate::{
    config::Angle,
    coord::{offset_to_lonlat, RADec},
};

/// The mapping target.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Target {
    pub ra: Angle,
    pub dec: Angle,
}

impl Target {
    pub fn radec(&self) -> RADec {
        RADec::new(self.ra.value(), self.dec.value())
    }
}

/// `mapping` in the simulator config; the `type` key says which.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MappingConfig {
    Raster(RasterConfig),
    Lissajous(LissajousConfig),
}

impl MappingConfig {
    pub fn build(&self) -> Result<Box<dyn MappingModel>, MappingError> {
        let model: Box<dyn MappingModel> = match self {
            MappingConfig::Raster(c) => Box::new(RasterModel::new(c)?),
            MappingConfig::Lissajous(c) => Box::new(LissajousModel::new(c)?),
        };
        trace!(
            "Built a {} mapping model with t_pattern = {} s",
            model.name(),
            model.t_pattern()
        );
        Ok(model)
    }
}

/// A boresight pattern as a function of time since the start of the
/// observation.
pub trait MappingModel: Send + Sync {
    fn name(&self) -> &'static str;

    fn target(&self) -> RADec;

    /// The start time of the observation (UTC), if known.
    fn t0(&self) -> Option<NaiveDateTime>;

    /// The time it takes to complete the pattern once \[seconds\].
    fn t_pattern(&self) -> f64;

    /// The tangent-plane offset of the boresight from the target at time `t`
    /// \[degrees\].
    fn offsets(&self, t: f64) -> (f64, f64);

    /// The boresight sky position at time `t`.
    fn evaluate(&self, t: f64) -> RADec {
        let (x, y) = self.offsets(t);
        offset_to_lonlat(x, y, self.target())
    }
}

/// Boresight positions at a set of times.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Trajectory {
    /// \[seconds\]
    pub t: Vec<f64>,
    /// Tangent-plane offsets from the target \[degrees\].
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    /// \[degrees\]
    pub ra: Vec<f64>,
    pub dec: Vec<f64>,
}

impl Trajectory {
    pub fn len(&self) -> usize {
        self.t.len()
    }

    pub fn is_empty(&self) -> bool {
        self.t.is_empty()
    }
}

/// Evaluate `mapping` at the times `t`. If `interp_len` is given, the offsets
/// are evaluated on a grid with that spacing \[seconds\] and linearly
/// interpolated, which is much cheaper for slowly-varying patterns.
pub fn evaluate_trajectory(
    mapping: &dyn MappingModel,
    t: &[f64],
    interp_len: Option<f64>,
) -> Trajectory {
    let (x, y): (Vec<f64>, Vec<f64>) = match (interp_len, t.first(), t.last()) {
        (Some(dt), Some(&t_first), Some(&t_last)) if dt > 0.0 && t.len() > 2 => {
            let n = ((t_last - t_first) / dt).ceil().max(1.0) as usize + 1;
            let grid: Vec<f64> = (0..n).map(|i| t_first + i as f64 * dt).collect();
            let (gx, gy): (Vec<f64>, Vec<f64>) =
                grid.iter().map(|&ti| mapping.offsets(ti)).unzip();
            t.iter()
                .map(|&ti| {
                    (
                        interp(&grid, &gx, ti, t_first, dt),
                        interp(&grid, &gy, ti, t_first, dt),
                    )
                })
                .unzip()
        }
        _ => t.iter().map(|&ti| mapping.offsets(ti)).unzip(),
    };

    let target = mapping.target();
    let (ra, dec) = x
        .iter()
        .zip(y.iter())
        .map(|(&x, &y)| {
            let p = offset_to_lonlat(x, y, target);
            (p.ra, p.dec)
        })
        .unzip();
    Trajectory {
        t: t.to_vec(),
        x,
        y,
        ra,
        dec,
    }
}

/// Linear interpolation on a regular grid starting at `t0` with spacing `dt`.
fn interp(grid: &[f64], values: &[f64], t: f64, t0: f64, dt: f64) -> f64 {
    let last = grid.len() - 1;
    let i = (((t - t0) / dt).floor().max(0.0) as usize).min(last.saturating_sub(1));
    if last == 0 {
        return values[0];
    }
    let frac = ((t - grid[i]) / dt).clamp(0.0, 1.0);
    values[i] * (1.0 - frac) + values[i + 1] * frac
}

/// Parse an optional observation start time.
fn parse_t0(t0: Option<&str>) -> Result<Option<NaiveDateTime>, MappingError> {
    let t0 = match t0 {
        Some(t0) => t0.trim(),
        None => return Ok(None),
    };
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(t) = NaiveDateTime::parse_from_str(t0, format) {
            return Ok(Some(t));
        }
    }
    Err(MappingError::BadT0(t0.to_string()))
}

/// Rotate a tangent-plane offset by `rot` \[degrees\], counter-clockwise.
fn rotate(x: f64, y: f64, rot: f64) -> (f64, f64) {
    let (s, c) = rot.to_radians().sin_cos();
    (x * c - y * s, x * s + y * c)
}

fn check_positive(name: &'static str, value: f64) -> Result<(), MappingError> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(MappingError::NotPositive { name, value })
    }
}
