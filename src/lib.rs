// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Pipeline tooling for the TolTEC camera: data-file discovery and classification,
observation simulation, coverage-map synthesis and driving the `citlali`
reduction engine.
 */

pub mod chunking;
mod cli;
pub mod config;
pub mod constants;
pub mod coord;
pub mod coverage;
pub mod filespec;
pub mod instrument;
pub(crate) mod io;
pub mod mapping;
pub mod plot;
pub mod reduce;
pub mod simulate;
pub mod sources;
pub(crate) mod unit_parsing;

// Re-exports.
pub use chunking::{plan_chunks, TimeChunk};
pub use cli::{Tolteca, ToltecaError};
pub use coverage::{CoverageMap, CoverageParams, CoverageUnit};
pub use filespec::{classify, info_from_path, DataFileStore, ObservationFile};
pub use reduce::Citlali;
pub use simulate::Simulation;

use crossbeam_utils::atomic::AtomicCell;

/// Are progress bars being drawn? This should only ever be enabled by CLI
/// code.
pub(crate) static PROGRESS_BARS: AtomicCell<bool> = AtomicCell::new(false);
