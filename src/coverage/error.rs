// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Errors associated with making coverage maps.

use thiserror::Error;

use crate::io::write::{FileWriteError, FitsError};

#[derive(Error, Debug)]
pub enum CoverageError {
    #[error("Cannot make a coverage map from a trajectory with {0} samples; at least 2 are needed")]
    TooFewSamples(usize),

    #[error("The trajectory samples are not evenly spaced in time (dt = {0} s)")]
    BadSampleInterval(f64),

    #[error("Cannot make a coverage map without any detectors")]
    NoDetectors,

    #[error("Coverage parameter '{name}' must be positive; got {value}")]
    BadParameter { name: &'static str, value: f64 },

    #[error("A depth map needs a positive NEFD (mJy s^1/2)")]
    NoNefd,

    #[error("The coverage map is already a depth map")]
    AlreadyDepth,

    #[error(transparent)]
    Fits(#[from] FitsError),

    #[error(transparent)]
    FileWrite(#[from] FileWriteError),
}
