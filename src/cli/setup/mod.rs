// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Set up a workdir for running tolteca in.


use std::path::{Path, PathBuf};

use chrono::Utc;
use clap::Parser;
use log::{info, warn};
use serde::Serialize;
use thiserror::Error;

use super::ToltecaError;

/// The config document written into a new workdir.
pub(crate) const SETUP_FILENAME: &str = "50_setup.yaml";

#[derive(Parser, Debug, Clone, Default)]
pub(super) struct SetupArgs {
    /// The workdir to set up. Its name is used as the jobkey.
    #[clap(name = "WORKDIR", parse(from_os_str), default_value = ".")]
    workdir: PathBuf,

    /// Set up the workdir even if it isn't empty.
    #[clap(short, long)]
    force: bool,

    /// Replace an existing setup file instead of backing it up.
    #[clap(short, long)]
    overwrite: bool,
}

impl SetupArgs {
    pub(super) fn run(self, dry_run: bool) -> Result<(), ToltecaError> {
        let path = setup_workdir(&self.workdir, self.force, self.overwrite, dry_run)?;
        if dry_run {
            info!("Dry run -- would have written {}", path.display());
        } else {
            info!("Wrote {}", path.display());
        }
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct SetupDocument {
    setup: SetupInfo,
}

#[derive(Debug, Serialize)]
struct SetupInfo {
    jobkey: String,
    prog: &'static str,
    version: &'static str,
    created_at: String,
}

/// Make `dir` a workdir: create it if necessary and write [`SETUP_FILENAME`]
/// into it. A non-empty `dir` is only used when `force` is set. An existing
/// setup file is renamed to `<name>.bak` unless `overwrite` is set. Nothing is
/// touched when `dry_run` is set. Returns the path to the setup file.
pub(crate) fn setup_workdir(
    dir: &Path,
    force: bool,
    overwrite: bool,
    dry_run: bool,
) -> Result<PathBuf, SetupError> {
    if dir.exists() {
        if !dir.is_dir() {
            return Err(SetupError::NotADirectory(dir.to_path_buf()));
        }
        let non_empty = std::fs::read_dir(dir)?.next().is_some();
        if non_empty && !force {
            return Err(SetupError::NotEmpty(dir.to_path_buf()));
        }
    } else if !dry_run {
        std::fs::create_dir_all(dir)?;
    }

    let jobkey = jobkey_from_dir(dir)?;
    let path = dir.join(SETUP_FILENAME);
    let document = SetupDocument {
        setup: SetupInfo {
            jobkey,
            prog: "tolteca",
            version: env!("CARGO_PKG_VERSION"),
            created_at: Utc::now().to_rfc3339(),
        },
    };
    let contents = serde_yaml::to_string(&document)?;
    if dry_run {
        info!("{}:\n{contents}", path.display());
        return Ok(path);
    }

    if path.exists() {
        if overwrite {
            warn!("Overwriting {}", path.display());
        } else {
            let backup = path.with_extension("yaml.bak");
            warn!("Backing up {} to {}", path.display(), backup.display());
            std::fs::rename(&path, &backup)?;
        }
    }
    std::fs::write(&path, contents)?;
    Ok(path)
}

/// The jobkey is the name of the (absolute) workdir.
fn jobkey_from_dir(dir: &Path) -> Result<String, SetupError> {
    let abs = if dir.is_absolute() {
        dir.to_path_buf()
    } else {
        std::env::current_dir()?.join(dir)
    };
    abs.components()
        .rev()
        .find_map(|c| match c {
            std::path::Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
            _ => None,
        })
        .ok_or_else(|| SetupError::NoJobkey(dir.to_path_buf()))
}

#[derive(Error, Debug)]
pub enum SetupError {
    #[error("The workdir {0} is not empty; use --force to set it up anyway")]
    NotEmpty(PathBuf),

    #[error("{0} exists and is not a directory")]
    NotADirectory(PathBuf),

    #[error("Couldn't get a jobkey from the name of {0}")]
    NoJobkey(PathBuf),

    #[error("Couldn't serialise the setup document: {0}")]
    Serialise(#[from] serde_yaml::Error),

    #[error(transparent)]
    IO(#[from] std::io::Error),
}
