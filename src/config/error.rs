// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use thiserror::Error;

use super::ArgFileTypes;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file '{file}' has an unrecognised extension; supported types are: {types}")]
    UnknownFileType { file: String, types: String },

    #[error("Couldn't read config file '{file}': {err}")]
    Read { file: String, err: std::io::Error },

    #[error("Couldn't decode {file_type} structure from '{file}':\n{err}")]
    Decode {
        file: String,
        file_type: ArgFileTypes,
        err: String,
    },

    #[error("Invalid config override '{0}'; expected 'key.path=value'")]
    BadOverride(String),

    #[error("Invalid config: {0}")]
    Invalid(serde_yaml::Error),

    #[error("Invalid config items specified in the commandline: {0:?}")]
    IgnoredOverrides(Vec<String>),

    #[error("Couldn't serialise the config: {0}")]
    Serialise(serde_yaml::Error),
}
