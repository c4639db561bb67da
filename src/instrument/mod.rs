// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Instrument stuff: TolTEC arrays, detector layouts and beams.
 */

#[cfg(test)]
mod tests;

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString, IntoStaticStr};
use thiserror::Error;

use crate::{config::Angle, constants::GAUSSIAN_SIGMA_TO_FWHM};

/// The radius of the TolTEC field of view \[arcsec\].
const TOLTEC_FOV_RADIUS_ARCSEC: f64 = 120.0;

/// A detector and its position in the focal plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Detector {
    /// Tangent-plane offset from the boresight, increasing east \[degrees\].
    pub x_t: f64,
    /// Tangent-plane offset from the boresight, increasing north \[degrees\].
    pub y_t: f64,
    /// The polarisation group.
    pub pg: u8,
}

/// The TolTEC arrays.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    Display,
    EnumIter,
    EnumString,
    IntoStaticStr,
    Serialize,
    Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ArrayName {
    #[default]
    A1100,
    A1400,
    A2000,
}

impl ArrayName {
    /// The centre wavelength of the band \[mm\].
    pub fn wavelength(self) -> f64 {
        match self {
            ArrayName::A1100 => 1.1,
            ArrayName::A1400 => 1.4,
            ArrayName::A2000 => 2.0,
        }
    }

    /// The beam FWHM along both axes \[arcsec\].
    pub fn fwhm_arcsec(self) -> f64 {
        match self {
            ArrayName::A1100 => 5.0,
            ArrayName::A1400 => 6.3,
            ArrayName::A2000 => 9.5,
        }
    }

    /// The spacing of detector pixels \[arcsec\].
    fn pitch_arcsec(self) -> f64 {
        2.0 * self.fwhm_arcsec()
    }
}

/// An elliptical Gaussian beam.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Beam {
    /// \[degrees\]
    pub a_fwhm: f64,
    /// \[degrees\]
    pub b_fwhm: f64,
}

impl Beam {
    pub fn a_stddev(&self) -> f64 {
        self.a_fwhm / GAUSSIAN_SIGMA_TO_FWHM
    }

    pub fn b_stddev(&self) -> f64 {
        self.b_fwhm / GAUSSIAN_SIGMA_TO_FWHM
    }

    /// The solid angle of the beam \[square degrees\].
    pub fn area(&self) -> f64 {
        std::f64::consts::TAU * self.a_stddev() * self.b_stddev()
    }

    /// The response of the beam (1 at the centre) at a tangent-plane offset
    /// \[degrees\].
    pub fn response(&self, dx: f64, dy: f64) -> f64 {
        let a = dx / self.a_stddev();
        let b = dy / self.b_stddev();
        (-0.5 * (a * a + b * b)).exp()
    }
}

/// `instrument` in the simulator config; the `name` key says which.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "name", rename_all = "lowercase")]
pub enum InstrumentConfig {
    Toltec(ToltecConfig),
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ToltecConfig {
    /// The array to simulate.
    #[serde(default)]
    pub array_name: ArrayName,

    /// Simulate two orthogonally polarised detectors per pixel.
    #[serde(default)]
    pub polarized: bool,

    /// Use these detectors instead of the nominal layout.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detectors: Option<Vec<DetectorConfig>>,
}

/// A detector in the config, e.g. `{x_t: 10 arcsec, y_t: 0, pg: 1}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectorConfig {
    pub x_t: Angle,
    pub y_t: Angle,
    #[serde(default)]
    pub pg: u8,
}

/// A ready-to-use instrument.
#[derive(Debug, Clone, PartialEq)]
pub struct Instrument {
    pub name: &'static str,
    pub array_name: ArrayName,
    pub detectors: Vec<Detector>,
    pub beam: Beam,
}

impl InstrumentConfig {
    pub fn build(&self) -> Result<Instrument, InstrumentError> {
        match self {
            InstrumentConfig::Toltec(c) => {
                let detectors = match &c.detectors {
                    Some(d) => d
                        .iter()
                        .map(|d| Detector {
                            x_t: d.x_t.value(),
                            y_t: d.y_t.value(),
                            pg: d.pg,
                        })
                        .collect(),
                    None => hex_layout(c.array_name, c.polarized),
                };
                if detectors.is_empty() {
                    return Err(InstrumentError::NoDetectors);
                }
                let fwhm = c.array_name.fwhm_arcsec() / 3600.0;
                Ok(Instrument {
                    name: "toltec",
                    array_name: c.array_name,
                    detectors,
                    beam: Beam {
                        a_fwhm: fwhm,
                        b_fwhm: fwhm,
                    },
                })
            }
        }
    }
}

/// Detector pixels on a hexagonal grid filling the field of view. Pixels are
/// ordered by row, then position along the row.
pub fn hex_layout(array_name: ArrayName, polarized: bool) -> Vec<Detector> {
    let pitch = array_name.pitch_arcsec() / 3600.0;
    let n_rings = (TOLTEC_FOV_RADIUS_ARCSEC / array_name.pitch_arcsec()).floor() as i64;
    let n_pg = if polarized { 2 } else { 1 };
    let row_height = pitch * 3f64.sqrt() / 2.0;

    let mut detectors = Vec::with_capacity(n_pg * (3 * n_rings * (n_rings + 1) + 1) as usize);
    for r in -n_rings..=n_rings {
        let q_min = (-n_rings).max(-n_rings - r);
        let q_max = n_rings.min(n_rings - r);
        for q in q_min..=q_max {
            let x_t = pitch * (q as f64 + r as f64 / 2.0);
            let y_t = row_height * r as f64;
            for pg in 0..n_pg as u8 {
                detectors.push(Detector { x_t, y_t, pg });
            }
        }
    }
    detectors
}

#[derive(Error, Debug)]
pub enum InstrumentError {
    #[error("The instrument has no detectors")]
    NoDetectors,
}
