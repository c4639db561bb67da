// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use thiserror::Error;

use crate::{
    chunking::ChunkError, coverage::CoverageError, instrument::InstrumentError, io::write::TodWriteError,
    mapping::MappingError, sources::ModelError,
};

#[derive(Error, Debug)]
pub enum SimulateError {
    #[error(transparent)]
    Chunk(#[from] ChunkError),

    #[error(transparent)]
    Instrument(#[from] InstrumentError),

    #[error(transparent)]
    Mapping(#[from] MappingError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("Couldn't write the simulated data: {0}")]
    Write(#[from] TodWriteError),

    #[error(transparent)]
    Coverage(#[from] CoverageError),

    #[error("The instrument has no detectors")]
    NoDetectors,
}
