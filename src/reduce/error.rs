// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::process::ExitStatus;

use thiserror::Error;

use crate::io::write::FileWriteError;

#[derive(Error, Debug)]
pub enum CitlaliError {
    #[error("Couldn't run '{cmd}': {err}")]
    Spawn { cmd: String, err: std::io::Error },

    #[error("'{cmd} --version' didn't report a version; it said:\n{output}")]
    NoVersion { cmd: String, output: String },

    #[error("citlali version does not satisfy {specifiers}, found {found}")]
    VersionMismatch { specifiers: String, found: String },

    #[error("Couldn't parse '{0}' as a version")]
    BadVersion(String),

    #[error("Couldn't parse '{0}' as version specifiers, e.g. '>=1.2, <2'")]
    BadVersionSpecifiers(String),

    #[error("None of the input files can be reduced by citlali")]
    NoInputs,

    #[error("The reduction config must be a mapping")]
    BadConfig,

    #[error("Couldn't serialise the citlali config: {0}")]
    Serialise(#[from] serde_yaml::Error),

    #[error("citlali exited unsuccessfully ({0})")]
    Failed(ExitStatus),

    #[error(transparent)]
    FileWrite(#[from] FileWriteError),

    #[error(transparent)]
    IO(#[from] std::io::Error),
}
