// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Code to write out simulator products (time-ordered data, metadata) and
//! coverage maps.

mod error;
mod fits;
mod tod;

pub(crate) use error::{FileWriteError, FitsError};
pub(crate) use fits::{
    fits_create, fits_write_image_hdu, fits_write_primary_header, format_g, CardValue, FitsHeader,
};
pub use tod::{FitsTodSink, MemoryTodSink, TodChunk, TodMeta, TodSink, TodWriteError};

use std::path::Path;

use log::trace;

use crate::cli::Warn;

/// Check whether an output file (or directory) can be written to. If the file
/// already exists, a warning is queued up for display.
pub(crate) fn can_write_to_file(file: &Path) -> Result<(), FileWriteError> {
    trace!("Testing whether we can write to {}", file.display());

    if file.is_dir() {
        let exists = can_write_to_dir(file)?;
        if exists {
            format!("Will overwrite the existing directory '{}'", file.display()).warn();
        }
    } else {
        let exists = can_write_to_file_inner(file)?;
        if exists {
            format!("Will overwrite the existing file '{}'", file.display()).warn();
        }
    }

    Ok(())
}

/// Create `dir` (and its parents) if it doesn't exist, then check that the
/// things inside it are writable.
pub(crate) fn create_output_dir(dir: &Path) -> Result<(), FileWriteError> {
    if !dir.exists() {
        trace!("Creating output directory {}", dir.display());
        std::fs::DirBuilder::new()
            .recursive(true)
            .create(dir)
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::PermissionDenied => {
                    FileWriteError::NewDirectory(dir.to_path_buf())
                }
                _ => FileWriteError::IO(e),
            })?;
        return Ok(());
    }
    can_write_to_dir(dir).map(|_| ())
}

/// Iterate over all of the files and subdirectories of a directory and test
/// whether we can write to them. Testing directories this way is weak; files
/// are tested more rigorously.
fn can_write_to_dir(dir: &Path) -> Result<bool, FileWriteError> {
    let exists = dir.exists();

    let metadata = std::fs::metadata(dir)?;
    let permissions = metadata.permissions();
    if permissions.readonly() {
        return Err(FileWriteError::FileNotWritable {
            file: dir.display().to_string(),
        });
    }

    for entry in std::fs::read_dir(dir)? {
        let entry = entry?.path();
        if entry.is_file() {
            can_write_to_file_inner(&entry)?;
        } else if entry.is_dir() {
            can_write_to_dir(&entry)?;
        }
    }

    Ok(exists)
}

/// Returns whether the file already existed. Existing files are not touched.
fn can_write_to_file_inner(file: &Path) -> Result<bool, FileWriteError> {
    let file_exists = file.exists();

    match std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(file)
        .map_err(|e| e.kind())
    {
        Ok(_) => {
            // Don't leave behind a 0-sized file that wasn't there before.
            if !file_exists {
                std::fs::remove_file(file).map_err(FileWriteError::IO)?;
            }
        }

        // Missing parent directories; make them, or fail now.
        Err(std::io::ErrorKind::NotFound) => {
            if let Some(p) = file.parent() {
                match std::fs::DirBuilder::new()
                    .recursive(true)
                    .create(p)
                    .map_err(|e| e.kind())
                {
                    Ok(()) => (),
                    Err(std::io::ErrorKind::PermissionDenied) => {
                        return Err(FileWriteError::NewDirectory(p.to_path_buf()))
                    }
                    Err(e) => return Err(FileWriteError::IO(e.into())),
                }
            }
        }

        Err(std::io::ErrorKind::PermissionDenied) => {
            return Err(FileWriteError::FileNotWritable {
                file: file.display().to_string(),
            })
        }

        Err(e) => {
            return Err(FileWriteError::IO(e.into()));
        }
    }

    Ok(file_exists)
}
