// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MappingError {
    #[error("The mapping parameter '{name}' must be positive; got {value}")]
    NotPositive { name: &'static str, value: f64 },

    #[error("A raster map needs at least one scan")]
    NoScans,

    #[error("Couldn't parse the mapping start time '{0}'; expected e.g. 2022-03-04T05:06:07")]
    BadT0(String),
}
