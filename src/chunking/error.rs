// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChunkError {
    #[error("The exposure time must be positive and finite; got {0} s")]
    BadExposureTime(f64),

    #[error("The sampling frequency must be positive and finite; got {0} Hz")]
    BadSampleRate(f64),

    #[error("The chunk length must be positive and finite; got {0} s")]
    BadChunkLength(f64),

    #[error("An exposure time of {t_exp} s sampled at {f_smp} Hz has no samples")]
    NoSamples { t_exp: f64, f_smp: f64 },
}
