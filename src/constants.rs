// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Useful constants.

All constants *must* be double precision. Angles are in degrees unless their
names say otherwise.
 */

pub use std::f64::consts::{FRAC_PI_2, PI, TAU};

/// The default sampling frequency of the mapping pattern \[Hz\].
pub const DEFAULT_F_SMP_MAPPING: f64 = 12.0;

/// The default sampling frequency of the detectors \[Hz\].
pub const DEFAULT_F_SMP_PROBING: f64 = 120.0;

/// The default length of a simulation chunk \[seconds\].
pub const DEFAULT_CHUNK_LEN: f64 = 10.0;

/// A trailing chunk is merged into the one before it when it is shorter than
/// the previous chunk divided by this number.
pub const DEFAULT_CHUNK_MERGE_RATIO_INV: usize = 10;

/// The default pixel size used to render catalog models \[arcsec\].
pub const DEFAULT_CATALOG_MODEL_RENDER_PIXEL_SIZE: f64 = 0.5;

/// The default interval used to interpolate the sky projection of mapping
/// trajectories \[seconds\].
pub const DEFAULT_MAPPING_ERFA_INTERP_LEN: f64 = 300.0;

/// The default altitude step used when interpolating atmosphere models
/// \[arcmin\].
pub const DEFAULT_ATM_EVAL_INTERP_ALT_STEP: f64 = 4.0;

/// The number of points in the coarse time grid handed to the setup hooks of
/// the simulator models.
pub const DEFAULT_PRE_RUN_SETUP_TIME_GRID_SIZE: usize = 100;

/// The default time step between animation frames \[seconds\].
pub const DEFAULT_ANIM_FRAME_RATE: f64 = 300.0;

/// The default pixel size of coverage maps \[arcsec\].
pub const DEFAULT_COVERAGE_PIXSCALE: f64 = 4.0;

/// When a coverage map would have more than this many pixels, its pixel size
/// is increased.
pub const DEFAULT_COVERAGE_N_PIX_MAX: usize = 1_000_000;

/// The fraction of the base pixel size added to coverage map pixels on each
/// coarsening step.
pub const DEFAULT_ADAPTIVE_PIXSCALE_FACTOR: f64 = 0.5;

/// The padding added around the detector footprint of a coverage map
/// \[arcmin\].
pub const COVERAGE_BBOX_MARGIN_ARCMIN: f64 = 2.0;

/// The default sensitivity coefficient used for depth maps.
pub const DEFAULT_SENS_COEFF: f64 = std::f64::consts::SQRT_2;

/// Coverage values below this fraction of the peak are not considered when
/// computing depth maps.
pub const DEPTH_COVERAGE_CUTOFF: f64 = 0.02;

/// Coverage values below this fraction of the peak are excluded from the
/// coverage summary and the outline.
pub const COVERAGE_SUMMARY_CUTOFF: f64 = 0.1;

/// The tolerance of the outline simplification relative to the outline
/// perimeter.
pub const OUTLINE_SIMPLIFY_EPSILON: f64 = 0.002;

/// The factor between a Gaussian FWHM and its standard deviation.
pub const GAUSSIAN_SIGMA_TO_FWHM: f64 = 2.354_820_045_030_949_3;

/// Observatory site name.
pub const LMT_SITE_NAME: &str = "LMT";

/// LMT longitude \[degrees\]
pub const LMT_LONG_DEG: f64 = -97.314_802_777_777_8;

/// LMT latitude \[degrees\]
pub const LMT_LAT_DEG: f64 = 18.985_761_111_111_1;

/// LMT height \[metres\]
pub const LMT_HEIGHT_M: f64 = 4640.0;

/// Default altitude used when an observation has no explicit one \[degrees\].
pub const DEFAULT_MEAN_ALT_DEG: f64 = 60.0;

/// The "ORIGIN" value written into FITS headers.
pub const FITS_ORIGIN: &str = "The TolTEC Project";
