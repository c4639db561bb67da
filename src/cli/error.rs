// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Error type for all tolteca-related errors. This should be the *only* error
//! enum that is publicly visible.

use thiserror::Error;

use super::setup::SetupError;
use crate::{
    chunking::ChunkError,
    config::ConfigError,
    coverage::CoverageError,
    filespec::FileSpecError,
    instrument::InstrumentError,
    io::write::{FileWriteError, FitsError, TodWriteError},
    mapping::MappingError,
    plot::PlotError,
    reduce::CitlaliError,
    simulate::SimulateError,
    sources::ModelError,
};

/// The *only* publicly visible error from tolteca. Each variant carries a
/// hint about where to look, unless it's "generic".
#[derive(Error, Debug)]
pub enum ToltecaError {
    /// An error in a config document or its overrides.
    #[error("{0}\n\nCheck the simulator config documents and any --set overrides.")]
    Config(String),

    /// An error related to reading config files.
    #[error("{0}\n\nConfig documents are YAML, TOML or JSON files, selected by their extension.")]
    ArgFile(String),

    /// An error while running the simulator.
    #[error("{0}")]
    Simulate(String),

    /// An error while making a coverage map.
    #[error("{0}")]
    Coverage(String),

    /// An error while making plots.
    #[error("{0}")]
    Plot(String),

    /// An error related to citlali.
    #[error("{0}\n\nIs citlali installed and on the PATH? Try turning up verbosity (-v) to see its output.")]
    Reduce(String),

    /// An error related to discovering data files.
    #[error("{0}")]
    FileSpec(String),

    /// An error while setting up a workdir.
    #[error("{0}")]
    Setup(String),

    /// A cfitsio error. Because these are usually quite spartan, some
    /// suggestions are provided here.
    #[error("cfitsio error: {0}\n\nIf you don't know what this means, try turning up verbosity (-v or -vv) and maybe disabling progress bars.")]
    Cfitsio(String),

    /// A generic error that can't be clarified further, e.g. IO errors.
    #[error("{0}")]
    Generic(String),
}

// When changing the error propagation below, ensure `Self::from(e)` uses the
// correct `e`!

impl From<ConfigError> for ToltecaError {
    fn from(e: ConfigError) -> Self {
        match e {
            ConfigError::UnknownFileType { .. }
            | ConfigError::Read { .. }
            | ConfigError::Decode { .. } => Self::ArgFile(e.to_string()),
            ConfigError::BadOverride(_)
            | ConfigError::Invalid(_)
            | ConfigError::IgnoredOverrides(_) => Self::Config(e.to_string()),
            ConfigError::Serialise(_) => Self::Generic(e.to_string()),
        }
    }
}

impl From<SimulateError> for ToltecaError {
    fn from(e: SimulateError) -> Self {
        match e {
            SimulateError::Chunk(e) => Self::from(e),
            SimulateError::Instrument(e) => Self::from(e),
            SimulateError::Mapping(e) => Self::from(e),
            SimulateError::Model(e) => Self::from(e),
            SimulateError::Write(e) => Self::from(e),
            SimulateError::Coverage(e) => Self::from(e),
            SimulateError::NoDetectors => Self::Simulate(e.to_string()),
        }
    }
}

impl From<ChunkError> for ToltecaError {
    fn from(e: ChunkError) -> Self {
        Self::Config(e.to_string())
    }
}

impl From<InstrumentError> for ToltecaError {
    fn from(e: InstrumentError) -> Self {
        Self::Config(e.to_string())
    }
}

impl From<MappingError> for ToltecaError {
    fn from(e: MappingError) -> Self {
        Self::Config(e.to_string())
    }
}

impl From<ModelError> for ToltecaError {
    fn from(e: ModelError) -> Self {
        Self::Simulate(e.to_string())
    }
}

impl From<TodWriteError> for ToltecaError {
    fn from(e: TodWriteError) -> Self {
        match e {
            TodWriteError::NotStarted => Self::Simulate(e.to_string()),
            TodWriteError::Fits(e) => Self::from(e),
            TodWriteError::FileWrite(e) => Self::from(e),
        }
    }
}

impl From<CoverageError> for ToltecaError {
    fn from(e: CoverageError) -> Self {
        match e {
            CoverageError::Fits(e) => Self::from(e),
            CoverageError::FileWrite(e) => Self::from(e),
            _ => Self::Coverage(e.to_string()),
        }
    }
}

impl From<PlotError> for ToltecaError {
    fn from(e: PlotError) -> Self {
        Self::Plot(e.to_string())
    }
}

impl From<CitlaliError> for ToltecaError {
    fn from(e: CitlaliError) -> Self {
        match e {
            CitlaliError::FileWrite(e) => Self::from(e),
            CitlaliError::IO(e) => Self::from(e),
            _ => Self::Reduce(e.to_string()),
        }
    }
}

impl From<FileSpecError> for ToltecaError {
    fn from(e: FileSpecError) -> Self {
        Self::FileSpec(e.to_string())
    }
}

impl From<SetupError> for ToltecaError {
    fn from(e: SetupError) -> Self {
        Self::Setup(e.to_string())
    }
}

// Library code errors.

impl From<FitsError> for ToltecaError {
    fn from(e: FitsError) -> Self {
        Self::Cfitsio(e.to_string())
    }
}

impl From<FileWriteError> for ToltecaError {
    fn from(e: FileWriteError) -> Self {
        Self::Generic(e.to_string())
    }
}

impl From<serde_yaml::Error> for ToltecaError {
    fn from(e: serde_yaml::Error) -> Self {
        Self::Generic(e.to_string())
    }
}

impl From<std::io::Error> for ToltecaError {
    fn from(e: std::io::Error) -> Self {
        Self::Generic(e.to_string())
    }
}
