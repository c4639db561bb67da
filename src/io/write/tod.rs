// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Sinks for simulated time-ordered data (TOD).
//!
//! A sink receives the run metadata once, then each chunk in chunk order,
//! then `finish`. Sinks are append-only; a chunk that has been handed over is
//! never revisited, so a run that fails part way leaves the written chunks
//! in place.

use std::path::{Path, PathBuf};

use fitsio::FitsFile;
use log::debug;
use ndarray::prelude::*;
use thiserror::Error;

use super::{
    fits_create, fits_write_image_hdu, fits_write_primary_header, format_g, FileWriteError,
    FitsError, FitsHeader,
};
use crate::{constants::FITS_ORIGIN, instrument::Detector};

/// Everything about a simulator run that isn't per-chunk data.
#[derive(Debug, Clone, PartialEq)]
pub struct TodMeta {
    pub jobkey: String,
    pub instrument: String,
    pub array_name: String,
    pub mapping_type: String,
    /// \[degrees\]
    pub target_ra: f64,
    /// \[degrees\]
    pub target_dec: f64,
    /// \[seconds\]
    pub t_exp: f64,
    /// \[seconds\]
    pub t_pattern: f64,
    /// \[Hz\]
    pub f_smp_probing: f64,
    /// \[Hz\]
    pub f_smp_mapping: f64,
    pub n_times: usize,
    pub n_chunks: usize,
    pub detectors: Vec<Detector>,
}

/// One evaluated time chunk.
#[derive(Debug, Clone, PartialEq)]
pub struct TodChunk {
    pub index: usize,
    /// The time of the first sample \[seconds\].
    pub t_start: f64,
    /// The sample interval \[seconds\].
    pub dt: f64,
    /// Boresight right ascension per sample \[degrees\].
    pub ra: Vec<f64>,
    /// Boresight declination per sample \[degrees\].
    pub dec: Vec<f64>,
    /// Detector signals with shape (n_det, n_time) \[mJy\].
    pub data: Array2<f64>,
}

impl TodChunk {
    pub fn num_times(&self) -> usize {
        self.data.len_of(Axis(1))
    }
}

pub trait TodSink {
    fn write_meta(&mut self, meta: &TodMeta) -> Result<(), TodWriteError>;

    fn write_chunk(&mut self, chunk: TodChunk) -> Result<(), TodWriteError>;

    fn finish(&mut self) -> Result<(), TodWriteError>;
}

/// Writes `<jobkey>_tod.fits`: run metadata in the primary header, a
/// `DETECTORS` image (one row of `x_t y_t pg` per detector), then a
/// `CHUNKnnnn` data image and a `POINTnnnn` boresight image per chunk.
pub struct FitsTodSink {
    path: PathBuf,
    fptr: Option<FitsFile>,
    n_written: usize,
}

impl FitsTodSink {
    pub fn new<P: AsRef<Path>>(dir: P, jobkey: &str) -> FitsTodSink {
        FitsTodSink {
            path: dir.as_ref().join(format!("{jobkey}_tod.fits")),
            fptr: None,
            n_written: 0,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TodSink for FitsTodSink {
    fn write_meta(&mut self, meta: &TodMeta) -> Result<(), TodWriteError> {
        debug!("Creating {}", self.path.display());
        let mut fptr = fits_create(&self.path)?;

        let mut header = FitsHeader::default();
        header.push_str("ORIGIN", FITS_ORIGIN);
        header.push_str("CREATOR", format!("tolteca {}", env!("CARGO_PKG_VERSION")));
        header.push_str("JOBKEY", meta.jobkey.as_str());
        header.push_str("INSTRUME", meta.instrument.as_str());
        header.push_str("ARRAYNAM", meta.array_name.as_str());
        header.push_str("MAPTYPE", meta.mapping_type.as_str());
        header.push_float("TGT_RA", meta.target_ra);
        header.push_float("TGT_DEC", meta.target_dec);
        header.push_str("EXPTIME", format_g(meta.t_exp, 3));
        header.push_float("TPATTERN", meta.t_pattern);
        header.push_float("FSMP", meta.f_smp_probing);
        header.push_float("FSMPMAP", meta.f_smp_mapping);
        header.push_int("NTIMES", meta.n_times as i64);
        header.push_int("NCHUNKS", meta.n_chunks as i64);
        header.push_int("NDET", meta.detectors.len() as i64);
        fits_write_primary_header(&mut fptr, &header)?;

        let mut detectors = Array2::zeros((meta.detectors.len(), 3));
        for (mut row, det) in detectors.outer_iter_mut().zip(meta.detectors.iter()) {
            row[0] = det.x_t;
            row[1] = det.y_t;
            row[2] = f64::from(det.pg);
        }
        let mut header = FitsHeader::default();
        header.push_str("COLUMNS", "x_t y_t pg");
        header.push_str("BUNIT", "deg");
        fits_write_image_hdu(&mut fptr, "DETECTORS", detectors.view(), &header)?;

        self.fptr = Some(fptr);
        Ok(())
    }

    fn write_chunk(&mut self, chunk: TodChunk) -> Result<(), TodWriteError> {
        let fptr = self.fptr.as_mut().ok_or(TodWriteError::NotStarted)?;

        let mut header = FitsHeader::default();
        header.push_int("CHUNKIDX", chunk.index as i64);
        header.push_float("TSTART", chunk.t_start);
        header.push_float("DT", chunk.dt);
        header.push_int("NSAMP", chunk.num_times() as i64);
        header.push_str("BUNIT", "mJy");
        fits_write_image_hdu(
            fptr,
            &format!("CHUNK{:04}", chunk.index),
            chunk.data.view(),
            &header,
        )?;

        let mut pointing = Array2::zeros((2, chunk.ra.len()));
        pointing
            .row_mut(0)
            .assign(&ArrayView1::from(chunk.ra.as_slice()));
        pointing
            .row_mut(1)
            .assign(&ArrayView1::from(chunk.dec.as_slice()));
        let mut header = FitsHeader::default();
        header.push_str("COLUMNS", "ra dec");
        header.push_str("BUNIT", "deg");
        fits_write_image_hdu(
            fptr,
            &format!("POINT{:04}", chunk.index),
            pointing.view(),
            &header,
        )?;

        self.n_written += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), TodWriteError> {
        // Dropping the handle closes (and flushes) the file.
        if self.fptr.take().is_some() {
            debug!(
                "Finished writing {} chunks to {}",
                self.n_written,
                self.path.display()
            );
        }
        Ok(())
    }
}

/// Keeps everything in memory.
#[derive(Debug, Default)]
pub struct MemoryTodSink {
    pub meta: Option<TodMeta>,
    pub chunks: Vec<TodChunk>,
    pub finished: bool,
}

impl TodSink for MemoryTodSink {
    fn write_meta(&mut self, meta: &TodMeta) -> Result<(), TodWriteError> {
        self.meta = Some(meta.clone());
        Ok(())
    }

    fn write_chunk(&mut self, chunk: TodChunk) -> Result<(), TodWriteError> {
        if self.meta.is_none() {
            return Err(TodWriteError::NotStarted);
        }
        self.chunks.push(chunk);
        Ok(())
    }

    fn finish(&mut self) -> Result<(), TodWriteError> {
        self.finished = true;
        Ok(())
    }
}

#[derive(Error, Debug)]
pub enum TodWriteError {
    #[error("Tried to write a TOD chunk before the run metadata")]
    NotStarted,

    #[error(transparent)]
    Fits(#[from] FitsError),

    #[error(transparent)]
    FileWrite(#[from] FileWriteError),
}
