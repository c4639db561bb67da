// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Coverage maps for observation planning.

A boresight trajectory is binned onto a TAN grid, weighted by the sample
interval, then convolved with the detector layout and the beam. The result is
the time each pixel is observed for (s / pix), which can be turned into a
depth (mJy / beam) given an NEFD.
 */

mod convolve;
mod error;
mod histogram;
mod outline;
#[cfg(test)]
mod tests;

pub use error::CoverageError;

use std::path::Path;

use log::{debug, trace};
use ndarray::prelude::*;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};

use crate::{
    constants::*,
    coord::{RADec, SkyBoundingBox, Wcs},
    instrument::{ArrayName, Beam, Detector},
    io::write::{
        can_write_to_file, fits_create, fits_write_image_hdu, fits_write_primary_header,
        format_g, FitsHeader,
    },
    mapping::Trajectory,
};
use convolve::convolve_fft;
use histogram::{beam_kernel, boresight_histogram, detector_kernel};

/// The unit of a coverage map.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumIter, EnumString, Serialize, Deserialize,
)]
pub enum CoverageUnit {
    /// Integration time per pixel.
    #[default]
    #[serde(rename = "time")]
    #[strum(serialize = "time")]
    SecondsPerPixel,

    /// The noise level in a beam.
    #[serde(rename = "depth")]
    #[strum(serialize = "depth")]
    MilliJanskyPerBeam,
}

impl CoverageUnit {
    /// The FITS `BUNIT` string.
    pub fn bunit(self) -> &'static str {
        match self {
            CoverageUnit::SecondsPerPixel => "s / pix",
            CoverageUnit::MilliJanskyPerBeam => "mJy / beam",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CoverageParams {
    /// The smallest pixel size \[degrees\].
    pub pixscale: f64,

    /// The pixel size grows by `pixscale` times this until the map is small
    /// enough.
    pub adaptive_pixscale_factor: f64,

    pub n_pix_max: usize,

    /// The unit of the map that gets written out.
    pub unit: CoverageUnit,

    /// \[mJy s^1/2\]
    pub nefd: Option<f64>,

    pub sens_coeff: f64,
}

impl Default for CoverageParams {
    fn default() -> Self {
        CoverageParams {
            pixscale: DEFAULT_COVERAGE_PIXSCALE / 3600.0,
            adaptive_pixscale_factor: DEFAULT_ADAPTIVE_PIXSCALE_FACTOR,
            n_pix_max: DEFAULT_COVERAGE_N_PIX_MAX,
            unit: CoverageUnit::default(),
            nefd: None,
            sens_coeff: DEFAULT_SENS_COEFF,
        }
    }
}

impl CoverageParams {
    pub fn validate(&self) -> Result<(), CoverageError> {
        let check = |name, value: f64| {
            if value > 0.0 && value.is_finite() {
                Ok(())
            } else {
                Err(CoverageError::BadParameter { name, value })
            }
        };
        check("pixscale", self.pixscale)?;
        check("sens_coeff", self.sens_coeff)?;
        check("n_pix_max", self.n_pix_max as f64)?;
        // The pixel size grows in steps of this factor until the pixel cap is
        // met, so it must be positive for the cap to be reachable.
        check("adaptive_pixscale_factor", self.adaptive_pixscale_factor)?;
        if let Some(nefd) = self.nefd {
            check("nefd", nefd)?;
        }
        if self.unit == CoverageUnit::MilliJanskyPerBeam && self.nefd.is_none() {
            return Err(CoverageError::NoNefd);
        }
        Ok(())
    }
}

/// An image of the sky on a TAN grid. `data` is indexed `(y, x)`.
#[derive(Debug, Clone, PartialEq)]
pub struct CoverageMap {
    pub data: Array2<f64>,
    pub wcs: Wcs,
    pub unit: CoverageUnit,
}

impl CoverageMap {
    pub fn max(&self) -> f64 {
        self.data.iter().copied().fold(0.0, f64::max)
    }

    /// Convert a time map into a depth map:
    /// `depth = sens_coeff * nefd / sqrt(t * beam_area_pix)` where the time
    /// is more than 2% of the peak, and zero elsewhere.
    pub fn to_depth(
        &self,
        beam: &Beam,
        nefd: f64,
        sens_coeff: f64,
    ) -> Result<CoverageMap, CoverageError> {
        if self.unit == CoverageUnit::MilliJanskyPerBeam {
            return Err(CoverageError::AlreadyDepth);
        }
        if !(nefd > 0.0 && nefd.is_finite()) {
            return Err(CoverageError::NoNefd);
        }
        let beam_area_pix = beam.area() / self.wcs.pixel_area();
        let cutoff = DEPTH_COVERAGE_CUTOFF * self.max();
        let data = self.data.mapv(|t| {
            if t > cutoff && t > 0.0 {
                sens_coeff * nefd / (t * beam_area_pix).sqrt()
            } else {
                0.0
            }
        });
        Ok(CoverageMap {
            data,
            wcs: self.wcs,
            unit: CoverageUnit::MilliJanskyPerBeam,
        })
    }

    /// Pixels with more than `frac` of the peak value.
    fn mask_above(&self, frac: f64) -> Array2<bool> {
        let cutoff = frac * self.max();
        self.data.mapv(|v| v > cutoff && v > 0.0)
    }

    /// The outline of the largest region with at least 10% of the peak
    /// coverage, simplified, as sky positions.
    pub fn outline(&self) -> Vec<RADec> {
        let mask = outline::largest_region(self.mask_above(COVERAGE_SUMMARY_CUTOFF).view());
        let boundary = outline::trace_boundary(mask.view());
        // (x, y) pixel coordinates.
        let points: Vec<(f64, f64)> = boundary
            .into_iter()
            .map(|(iy, ix)| (ix as f64, iy as f64))
            .collect();
        let epsilon = OUTLINE_SIMPLIFY_EPSILON * outline::perimeter(&points);
        let simplified = outline::simplify_closed(&points, epsilon);
        trace!(
            "Coverage outline has {} vertices ({} before simplifying)",
            simplified.len(),
            points.len()
        );
        simplified
            .into_iter()
            .map(|(x, y)| self.wcs.pixel_to_world(x, y))
            .collect()
    }

    /// The FITS header of this map's image HDU.
    fn fits_header(&self, array_name: ArrayName) -> FitsHeader {
        let mut header = self.wcs.fits_header();
        header.push_str("BUNIT", self.unit.bunit());
        header.push_str("ARRAYNAM", array_name.to_string());
        header.push_str("BAND", array_name.to_string());
        header
    }
}

/// Everything made by [`synthesize`].
#[derive(Debug, Clone)]
pub struct CoverageResult {
    /// \[s / pix\]
    pub coverage: CoverageMap,

    /// Made when an NEFD is given.
    pub depth: Option<CoverageMap>,

    /// The time between trajectory samples \[seconds\].
    pub dt_smp: f64,

    pub n_samples: usize,

    /// The number of boresight samples that fall on the map.
    pub n_samples_in_map: usize,

    pub n_detectors: usize,

    pub unit: CoverageUnit,
}

/// A short description of a coverage map's sensitivity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoverageSummary {
    /// The area with more than 10% of the peak coverage \[square degrees\].
    pub map_area: f64,

    /// The median depth over `map_area` \[mJy / beam\].
    pub depth_rms: Option<f64>,
}

impl CoverageResult {
    /// The map in the requested unit.
    pub fn output_map(&self) -> &CoverageMap {
        match (self.unit, &self.depth) {
            (CoverageUnit::MilliJanskyPerBeam, Some(depth)) => depth,
            _ => &self.coverage,
        }
    }

    pub fn summary(&self) -> CoverageSummary {
        let mask = self.coverage.mask_above(COVERAGE_SUMMARY_CUTOFF);
        let n_pix = mask.iter().filter(|&&m| m).count();
        let map_area = n_pix as f64 * self.coverage.wcs.pixel_area();
        let depth_rms = self.depth.as_ref().and_then(|depth| {
            let mut values: Vec<f64> = depth
                .data
                .iter()
                .zip(mask.iter())
                .filter_map(|(&d, &m)| m.then_some(d))
                .collect();
            median(&mut values)
        });
        CoverageSummary {
            map_area,
            depth_rms,
        }
    }
}

fn median(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_unstable_by(f64::total_cmp);
    let n = values.len();
    Some(if n % 2 == 1 {
        values[n / 2]
    } else {
        0.5 * (values[n / 2 - 1] + values[n / 2])
    })
}

/// Make a coverage map from the boresight `trajectory`, which must be evenly
/// sampled in time, and the detector offsets.
pub fn synthesize(
    trajectory: &Trajectory,
    detectors: &[Detector],
    beam: &Beam,
    params: &CoverageParams,
) -> Result<CoverageResult, CoverageError> {
    params.validate()?;
    if trajectory.len() < 2 {
        return Err(CoverageError::TooFewSamples(trajectory.len()));
    }
    if detectors.is_empty() {
        return Err(CoverageError::NoDetectors);
    }
    let dt_smp = trajectory.t[1] - trajectory.t[0];
    if !(dt_smp > 0.0 && dt_smp.is_finite()) {
        return Err(CoverageError::BadSampleInterval(dt_smp));
    }

    // Pad the boresight footprint so the whole array stays on the map.
    let det_x: Vec<f64> = detectors.iter().map(|d| d.x_t).collect();
    let det_y: Vec<f64> = detectors.iter().map(|d| d.y_t).collect();
    let (det_w, det_h) = extent(&det_x, &det_y);
    let margin = COVERAGE_BBOX_MARGIN_ARCMIN / 60.0;
    let bbox = SkyBoundingBox::from_lonlat(&trajectory.ra, &trajectory.dec)
        .ok_or(CoverageError::TooFewSamples(0))?
        .pad_with(det_w + margin, det_h + margin);
    let wcs = Wcs::covering(
        &bbox,
        params.pixscale,
        params.adaptive_pixscale_factor,
        params.n_pix_max,
    );
    debug!(
        "Coverage map is {} x {} pixels of {:.3} arcsec",
        wcs.nx(),
        wcs.ny(),
        wcs.pixscale * 3600.0
    );

    let (bs_im, n_samples_in_map) =
        boresight_histogram(&wcs, &trajectory.ra, &trajectory.dec, dt_smp);
    let det_im = detector_kernel(detectors, wcs.pixscale);
    trace!("Detector kernel shape: {:?}", det_im.dim());
    let cov = convolve_fft(bs_im.view(), det_im.view());
    let cov = convolve_fft(cov.view(), beam_kernel(beam, wcs.pixscale).view());
    debug!(
        "Total exposure time on the coverage map: {:.3} min",
        cov.sum() / detectors.len() as f64 / 60.0
    );
    debug!(
        "Total time of the observation: {:.3} min",
        trajectory.len() as f64 * dt_smp / 60.0
    );

    let coverage = CoverageMap {
        data: cov,
        wcs,
        unit: CoverageUnit::SecondsPerPixel,
    };
    let depth = match params.nefd {
        Some(nefd) => Some(coverage.to_depth(beam, nefd, params.sens_coeff)?),
        None => None,
    };
    Ok(CoverageResult {
        coverage,
        depth,
        dt_smp,
        n_samples: trajectory.len(),
        n_samples_in_map,
        n_detectors: detectors.len(),
        unit: params.unit,
    })
}

/// The width and height of the box holding all `(x, y)`.
fn extent(x: &[f64], y: &[f64]) -> (f64, f64) {
    let span = |v: &[f64]| {
        let (lo, hi) = v
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            });
        if hi >= lo {
            hi - lo
        } else {
            0.0
        }
    };
    (span(x), span(y))
}

/// Details about the observation that go into the primary header of a
/// coverage FITS file.
#[derive(Debug, Clone)]
pub struct CoverageFitsInfo {
    pub array_name: ArrayName,

    /// \[seconds\]
    pub t_exp: f64,

    /// The mean altitude of the target \[degrees\].
    pub mean_alt: f64,
}

/// Write `map` as the first extension of a new FITS file.
pub fn write_coverage_fits(
    path: &Path,
    map: &CoverageMap,
    info: &CoverageFitsInfo,
) -> Result<(), CoverageError> {
    can_write_to_file(path)?;
    let mut fptr = fits_create(path)?;

    let mut primary = FitsHeader::default();
    primary.push_str("ORIGIN", FITS_ORIGIN);
    primary.push_str("CREATOR", format!("tolteca {}", env!("CARGO_PKG_VERSION")));
    primary.push_str("TELESCOP", LMT_SITE_NAME);
    primary.push_str("INSTRUME", "toltec");
    primary.push_str("EXPTIME", format_g(info.t_exp, 3));
    primary.push_str("OBSDUR", format_g(info.t_exp, 6));
    primary.push_str("MEANALT", format!("{:.6}", info.mean_alt));
    fits_write_primary_header(&mut fptr, &primary)?;

    fits_write_image_hdu(
        &mut fptr,
        "COVERAGE",
        map.data.view(),
        &map.fits_header(info.array_name),
    )?;
    debug!("Wrote the coverage map to {}", path.display());
    Ok(())
}
