// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Arguments shared between subcommands. The `simulate` and `coverage`
//! subcommands both take simulator config documents, so the same config
//! arguments are used by both.

mod printers;

pub(super) use printers::InfoPrinter;
pub(crate) use printers::{display_warnings, Warn};

use std::path::PathBuf;

use clap::Parser;
use log::debug;

use super::ToltecaError;
use crate::config::{SimuConfig, ARG_FILE_TYPES_COMMA_SEPARATED};

lazy_static::lazy_static! {
    pub(super) static ref CONFIG_FILES_HELP: String =
        format!("Simulator config documents, merged in order; later documents win. The config may be nested under a top-level `simu` key. Supported formats: {}", *ARG_FILE_TYPES_COMMA_SEPARATED);
}

#[derive(Parser, Debug, Clone, Default)]
pub(super) struct ConfigArgs {
    #[clap(name = "CONFIG_FILES", parse(from_os_str), help = CONFIG_FILES_HELP.as_str())]
    pub(super) config_files: Vec<PathBuf>,

    /// Override a config entry, e.g. --set obs_params.t_exp="30 s". Values
    /// are parsed as YAML. May be given many times.
    #[clap(long = "set", value_name = "KEY=VALUE")]
    pub(super) overrides: Vec<String>,
}

impl ConfigArgs {
    /// Read, merge and validate the config documents.
    pub(super) fn load(&self) -> Result<SimuConfig, ToltecaError> {
        if self.config_files.is_empty() {
            return Err(ToltecaError::ArgFile(
                "No config files were given".to_string(),
            ));
        }
        debug!("Reading config files: {:?}", self.config_files);
        if !self.overrides.is_empty() {
            debug!("Config overrides: {:?}", self.overrides);
        }
        Ok(SimuConfig::from_files(&self.config_files, &self.overrides)?)
    }
}
