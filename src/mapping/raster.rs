// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::{check_positive, parse_t0, rotate, MappingError, MappingModel, Target};
use crate::{
    config::{Angle, Speed, Time},
    coord::RADec,
};

fn default_t_turnover() -> Time {
    Time(5.0)
}

/// A raster map: `n_scans` parallel scans of `length`, `space` apart, joined
/// by turnovers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RasterConfig {
    pub target: Target,

    /// The UTC start time, e.g. "2022-03-04T05:06:07".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub t0: Option<String>,

    pub length: Angle,

    pub space: Angle,

    pub n_scans: usize,

    pub speed: Speed,

    #[serde(default)]
    pub rot: Angle,

    #[serde(default = "default_t_turnover")]
    pub t_turnover: Time,
}

#[derive(Debug, Clone)]
pub struct RasterModel {
    target: RADec,
    t0: Option<NaiveDateTime>,
    length: f64,
    space: f64,
    n_scans: usize,
    speed: f64,
    rot: f64,
    t_turnover: f64,
}

impl RasterModel {
    pub fn new(c: &RasterConfig) -> Result<RasterModel, MappingError> {
        check_positive("length", c.length.value())?;
        check_positive("speed", c.speed.value())?;
        if c.n_scans == 0 {
            return Err(MappingError::NoScans);
        }
        if c.n_scans > 1 {
            check_positive("space", c.space.value())?;
        }
        if c.t_turnover.value() < 0.0 {
            return Err(MappingError::NotPositive {
                name: "t_turnover",
                value: c.t_turnover.value(),
            });
        }
        Ok(RasterModel {
            target: c.target.radec(),
            t0: parse_t0(c.t0.as_deref())?,
            length: c.length.value(),
            space: c.space.value(),
            n_scans: c.n_scans,
            speed: c.speed.value(),
            rot: c.rot.value(),
            t_turnover: c.t_turnover.value(),
        })
    }

    /// The time taken by one scan \[seconds\].
    fn t_scan(&self) -> f64 {
        self.length / self.speed
    }

    /// The cross-scan offset of scan `i`.
    fn scan_y(&self, i: usize) -> f64 {
        (i as f64 - (self.n_scans as f64 - 1.0) / 2.0) * self.space
    }

    /// The along-scan offset at the end of scan `i`. Even scans go in the +x
    /// direction, odd scans in -x.
    fn scan_end_x(&self, i: usize) -> f64 {
        if i % 2 == 0 {
            self.length / 2.0
        } else {
            -self.length / 2.0
        }
    }
}

impl MappingModel for RasterModel {
    fn name(&self) -> &'static str {
        "raster"
    }

    fn target(&self) -> RADec {
        self.target
    }

    fn t0(&self) -> Option<NaiveDateTime> {
        self.t0
    }

    fn t_pattern(&self) -> f64 {
        self.n_scans as f64 * self.t_scan() + (self.n_scans as f64 - 1.0) * self.t_turnover
    }

    fn offsets(&self, t: f64) -> (f64, f64) {
        let t = t.clamp(0.0, self.t_pattern());
        let t_scan = self.t_scan();
        let period = t_scan + self.t_turnover;
        let i = ((t / period).floor() as usize).min(self.n_scans - 1);
        let tau = t - i as f64 * period;

        let (x, y) = if tau <= t_scan || i + 1 == self.n_scans {
            let along = (self.speed * tau).min(self.length) - self.length / 2.0;
            let x = if i % 2 == 0 { along } else { -along };
            (x, self.scan_y(i))
        } else {
            // Turning over to the next scan; the cross-scan offset moves
            // linearly while the along-scan offset stays at the scan end.
            let frac = (tau - t_scan) / self.t_turnover;
            let y = self.scan_y(i) + frac * (self.scan_y(i + 1) - self.scan_y(i));
            (self.scan_end_x(i), y)
        };
        rotate(x, y, self.rot)
    }
}
