// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::{check_positive, parse_t0, rotate, MappingError, MappingModel, Target};
use crate::{
    config::{Angle, AngularFreq},
    constants::TAU,
    coord::RADec,
};

/// The largest denominator considered when finding the ratio of the two
/// angular frequencies.
const MAX_OMEGA_RATIO_DENOMINATOR: u64 = 100;

fn default_delta() -> Angle {
    Angle(90.0)
}

/// A Lissajous pattern:
/// `x = x_length / 2 * sin(x_omega * t + delta)`,
/// `y = y_length / 2 * sin(y_omega * t)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LissajousConfig {
    pub target: Target,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub t0: Option<String>,

    pub x_length: Angle,

    pub y_length: Angle,

    pub x_omega: AngularFreq,

    pub y_omega: AngularFreq,

    #[serde(default = "default_delta")]
    pub delta: Angle,

    #[serde(default)]
    pub rot: Angle,
}

#[derive(Debug, Clone)]
pub struct LissajousModel {
    target: RADec,
    t0: Option<NaiveDateTime>,
    x_length: f64,
    y_length: f64,
    x_omega: f64,
    y_omega: f64,
    /// \[radians\]
    delta: f64,
    rot: f64,
    t_pattern: f64,
}

impl LissajousModel {
    pub fn new(c: &LissajousConfig) -> Result<LissajousModel, MappingError> {
        check_positive("x_length", c.x_length.value())?;
        check_positive("y_length", c.y_length.value())?;
        check_positive("x_omega", c.x_omega.value())?;
        check_positive("y_omega", c.y_omega.value())?;

        let x_omega = c.x_omega.value();
        let y_omega = c.y_omega.value();
        let (p, _) = limit_denominator(x_omega / y_omega, MAX_OMEGA_RATIO_DENOMINATOR);
        Ok(LissajousModel {
            target: c.target.radec(),
            t0: parse_t0(c.t0.as_deref())?,
            x_length: c.x_length.value(),
            y_length: c.y_length.value(),
            x_omega,
            y_omega,
            delta: c.delta.value().to_radians(),
            rot: c.rot.value(),
            t_pattern: TAU * p as f64 / x_omega,
        })
    }
}

impl MappingModel for LissajousModel {
    fn name(&self) -> &'static str {
        "lissajous"
    }

    fn target(&self) -> RADec {
        self.target
    }

    fn t0(&self) -> Option<NaiveDateTime> {
        self.t0
    }

    fn t_pattern(&self) -> f64 {
        self.t_pattern
    }

    fn offsets(&self, t: f64) -> (f64, f64) {
        let x = self.x_length / 2.0 * (self.x_omega * t + self.delta).sin();
        let y = self.y_length / 2.0 * (self.y_omega * t).sin();
        rotate(x, y, self.rot)
    }
}

/// The closest fraction `p / q` to `x` (positive) with `q <= max_den`.
pub(super) fn limit_denominator(x: f64, max_den: u64) -> (u64, u64) {
    // Continued fraction convergents.
    let (mut p0, mut q0, mut p1, mut q1) = (0u64, 1u64, 1u64, 0u64);
    let mut r = x;
    loop {
        let mut a = r.floor();
        // Don't let rounding error turn e.g. 2 into 1.999... + a long tail.
        if r - a > 1.0 - 1e-9 {
            a += 1.0;
        }
        let a_int = a as u64;
        let q2 = q0 + a_int * q1;
        if q2 > max_den {
            break;
        }
        (p0, q0, p1, q1) = (p1, q1, p0 + a_int * p1, q2);
        let frac = (r - a).max(0.0);
        if frac < 1e-9 {
            return (p1, q1);
        }
        r = frac.recip();
    }

    // The best semiconvergent is either this or the last convergent.
    let k = (max_den - q0) / q1;
    let (bp, bq) = (p0 + k * p1, q0 + k * q1);
    let err_bound = (bp as f64 / bq as f64 - x).abs();
    let err_conv = (p1 as f64 / q1 as f64 - x).abs();
    if err_conv <= err_bound {
        (p1, q1)
    } else {
        (bp, bq)
    }
}
