// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Sky models that contribute signal to the simulated detectors.

#[cfg(test)]
mod tests;

use log::debug;
use ndarray::{prelude::*, Zip};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    config::Angle,
    coord::{RADec, SkyBoundingBox},
    instrument::Beam,
};

/// Beyond this many standard deviations, the beam response is ignored.
const BEAM_CUTOFF_SIGMAS: f64 = 6.0;

/// One entry of `sources` in the simulator config; the `type` key says which.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SourceConfig {
    PointSourceCatalog(PointSourceCatalogConfig),
    Uniform(UniformConfig),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointSourceCatalogConfig {
    pub sources: Vec<PointSourceConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointSourceConfig {
    #[serde(default)]
    pub name: Option<String>,
    pub ra: Angle,
    pub dec: Angle,
    #[serde(rename = "flux_mJy")]
    pub flux_mjy: f64,
}

/// A constant sky background.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UniformConfig {
    #[serde(rename = "level_mJy")]
    pub level_mjy: f64,
}

impl SourceConfig {
    pub fn build(&self) -> Result<Box<dyn SourceModel>, ModelError> {
        Ok(match self {
            SourceConfig::PointSourceCatalog(c) => Box::new(PointSourceCatalog::new(c)?),
            SourceConfig::Uniform(c) => {
                if !c.level_mjy.is_finite() {
                    return Err(ModelError::NonFinite {
                        model: "uniform",
                        what: "level_mJy".to_string(),
                    });
                }
                Box::new(Uniform {
                    level: c.level_mjy,
                })
            }
        })
    }
}

/// What models are given before any chunks are evaluated.
#[derive(Debug, Clone)]
pub struct PreRunSetup<'a> {
    /// The coarse time grid \[seconds\].
    pub t: &'a [f64],
    /// The sky area covered by all detectors over the coarse grid.
    pub footprint: SkyBoundingBox,
    pub beam: &'a Beam,
}

/// A model of the sky.
pub trait SourceModel: Send + Sync {
    fn name(&self) -> &'static str;

    /// A hook for expensive one-off work, given a coarse view of the whole
    /// run.
    fn setup(&mut self, _pre_run: &PreRunSetup) -> Result<(), ModelError> {
        Ok(())
    }

    /// Add this model's signal \[mJy\] to `out` (n_det, n_time), given the
    /// sky positions of each detector at each time.
    fn evaluate(
        &self,
        det_ra: ArrayView2<f64>,
        det_dec: ArrayView2<f64>,
        beam: &Beam,
        out: ArrayViewMut2<f64>,
    ) -> Result<(), ModelError>;
}

#[derive(Debug, Clone)]
struct CatalogSource {
    pos: RADec,
    flux: f64,
}

/// Point sources seen through the instrument beam.
#[derive(Debug, Clone)]
pub struct PointSourceCatalog {
    sources: Vec<CatalogSource>,
}

impl PointSourceCatalog {
    pub fn new(c: &PointSourceCatalogConfig) -> Result<PointSourceCatalog, ModelError> {
        let sources = c
            .sources
            .iter()
            .enumerate()
            .map(|(i, s)| {
                if s.flux_mjy.is_finite() && s.ra.value().is_finite() && s.dec.value().is_finite()
                {
                    Ok(CatalogSource {
                        pos: RADec::new(s.ra.value(), s.dec.value()),
                        flux: s.flux_mjy,
                    })
                } else {
                    Err(ModelError::NonFinite {
                        model: "point_source_catalog",
                        what: s.name.clone().unwrap_or_else(|| format!("source {i}")),
                    })
                }
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(PointSourceCatalog { sources })
    }

    pub fn num_sources(&self) -> usize {
        self.sources.len()
    }
}

impl SourceModel for PointSourceCatalog {
    fn name(&self) -> &'static str {
        "point_source_catalog"
    }

    /// Drop sources that no detector can see.
    fn setup(&mut self, pre_run: &PreRunSetup) -> Result<(), ModelError> {
        let reach = BEAM_CUTOFF_SIGMAS * pre_run.beam.a_stddev().max(pre_run.beam.b_stddev());
        let bbox = pre_run.footprint.pad_with(reach, reach);
        let n_before = self.sources.len();
        self.sources.retain(|s| {
            let lon = bbox.lon_min + (s.pos.ra - bbox.lon_min).rem_euclid(360.0);
            lon <= bbox.lon_max && s.pos.dec >= bbox.lat_min && s.pos.dec <= bbox.lat_max
        });
        debug!(
            "{} of {} catalog sources are inside the footprint",
            self.sources.len(),
            n_before
        );
        Ok(())
    }

    fn evaluate(
        &self,
        det_ra: ArrayView2<f64>,
        det_dec: ArrayView2<f64>,
        beam: &Beam,
        mut out: ArrayViewMut2<f64>,
    ) -> Result<(), ModelError> {
        if self.sources.is_empty() {
            return Ok(());
        }
        let reach = BEAM_CUTOFF_SIGMAS * beam.a_stddev().max(beam.b_stddev());
        Zip::from(&mut out)
            .and(&det_ra)
            .and(&det_dec)
            .par_for_each(|o, &ra, &dec| {
                let c_dec = dec.to_radians().cos();
                for s in &self.sources {
                    let dy = s.pos.dec - dec;
                    if dy.abs() > reach {
                        continue;
                    }
                    let dx = ((s.pos.ra - ra + 180.0).rem_euclid(360.0) - 180.0) * c_dec;
                    if dx.abs() > reach {
                        continue;
                    }
                    *o += s.flux * beam.response(dx, dy);
                }
            });
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct Uniform {
    level: f64,
}

impl SourceModel for Uniform {
    fn name(&self) -> &'static str {
        "uniform"
    }

    fn evaluate(
        &self,
        _det_ra: ArrayView2<f64>,
        _det_dec: ArrayView2<f64>,
        _beam: &Beam,
        mut out: ArrayViewMut2<f64>,
    ) -> Result<(), ModelError> {
        out += self.level;
        Ok(())
    }
}

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("The {model} model has a non-finite value for {what}")]
    NonFinite { model: &'static str, what: String },

    #[error("The {model} model failed: {msg}")]
    Evaluation { model: &'static str, msg: String },
}
