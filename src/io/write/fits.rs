// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Helpers for writing FITS files with `fitsio`. Errors carry the location of
//! the caller, as cfitsio errors alone are usually quite spartan.

use std::path::Path;

use fitsio::{
    hdu::FitsHdu,
    images::{ImageDescription, ImageType},
    FitsFile,
};
use ndarray::ArrayView2;

use super::FitsError;

/// A header card value.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum CardValue {
    Str(String),
    Float(f64),
    Int(i64),
}

/// An ordered list of FITS header cards. Keys longer than 8 characters are
/// not supported.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct FitsHeader {
    pub(crate) cards: Vec<(String, CardValue)>,
}

impl FitsHeader {
    pub(crate) fn push_str<S: Into<String>>(&mut self, key: &str, value: S) {
        self.cards
            .push((key.to_string(), CardValue::Str(value.into())));
    }

    pub(crate) fn push_float(&mut self, key: &str, value: f64) {
        self.cards.push((key.to_string(), CardValue::Float(value)));
    }

    pub(crate) fn push_int(&mut self, key: &str, value: i64) {
        self.cards.push((key.to_string(), CardValue::Int(value)));
    }

    pub(crate) fn get(&self, key: &str) -> Option<&CardValue> {
        self.cards.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub(crate) fn extend(&mut self, other: FitsHeader) {
        self.cards.extend(other.cards);
    }
}

/// Create a new FITS file, replacing any file that's already there.
#[track_caller]
pub(crate) fn fits_create<P: AsRef<Path>>(file: P) -> Result<FitsFile, FitsError> {
    let file = file.as_ref();
    if file.exists() {
        std::fs::remove_file(file)?;
    }
    FitsFile::create(file).open().map_err(|e| {
        let caller = std::panic::Location::caller();
        FitsError::Create {
            fits_error: Box::new(e),
            fits_filename: file.to_path_buf().into_boxed_path(),
            source_file: caller.file(),
            source_line: caller.line(),
            source_column: caller.column(),
        }
    })
}

#[track_caller]
fn fitsio_error(fptr: &FitsFile, hdu_description: &str, e: fitsio::errors::Error) -> FitsError {
    let caller = std::panic::Location::caller();
    FitsError::Fitsio {
        fits_error: Box::new(e),
        fits_filename: fptr.file_path().to_path_buf().into_boxed_path(),
        hdu_description: hdu_description.into(),
        source_file: caller.file(),
        source_line: caller.line(),
        source_column: caller.column(),
    }
}

/// Write all of the cards of `header` into `hdu`.
#[track_caller]
pub(crate) fn fits_write_header(
    fptr: &mut FitsFile,
    hdu: &FitsHdu,
    header: &FitsHeader,
) -> Result<(), FitsError> {
    let hdu_description = format!("{}", hdu.number + 1);
    for (key, value) in &header.cards {
        let result = match value {
            CardValue::Str(s) => hdu.write_key(fptr, key, s.as_str()),
            CardValue::Float(f) => hdu.write_key(fptr, key, *f),
            CardValue::Int(i) => hdu.write_key(fptr, key, *i),
        };
        result.map_err(|e| fitsio_error(fptr, &hdu_description, e))?;
    }
    Ok(())
}

/// Write header cards into the primary HDU.
#[track_caller]
pub(crate) fn fits_write_primary_header(
    fptr: &mut FitsFile,
    header: &FitsHeader,
) -> Result<(), FitsError> {
    let hdu = fptr
        .primary_hdu()
        .map_err(|e| fitsio_error(fptr, "primary", e))?;
    fits_write_header(fptr, &hdu, header)
}

/// Append a 2D double-precision image extension called `name`. FITS images
/// are row major, so `data` is written with its shape as (NAXIS2, NAXIS1).
#[track_caller]
pub(crate) fn fits_write_image_hdu(
    fptr: &mut FitsFile,
    name: &str,
    data: ArrayView2<f64>,
    header: &FitsHeader,
) -> Result<(), FitsError> {
    let (n_rows, n_cols) = data.dim();
    let dimensions = [n_rows, n_cols];
    let image_description = ImageDescription {
        data_type: ImageType::Double,
        dimensions: &dimensions,
    };
    let hdu = fptr
        .create_image(name, &image_description)
        .map_err(|e| fitsio_error(fptr, name, e))?;
    let flat: Vec<f64> = data.iter().copied().collect();
    hdu.write_image(fptr, &flat)
        .map_err(|e| fitsio_error(fptr, name, e))?;
    fits_write_header(fptr, &hdu, header)
}

/// Format a number like C's "%g" with the given number of significant
/// digits. FITS readers show these strings verbatim.
pub(crate) fn format_g(value: f64, precision: usize) -> String {
    if value == 0.0 || !value.is_finite() {
        return format!("{value}");
    }
    let precision = precision.max(1);
    let exponent = value.abs().log10().floor() as i32;
    // Rounding can bump the exponent, e.g. 9.996 with 3 digits.
    let rounded: f64 = format!("{:.*e}", precision - 1, value)
        .parse()
        .unwrap_or(value);
    let exponent = if rounded.abs() >= 10f64.powi(exponent + 1) {
        exponent + 1
    } else {
        exponent
    };
    if exponent < -4 || exponent >= precision as i32 {
        let s = format!("{:.*e}", precision - 1, value);
        match s.split_once('e') {
            Some((mantissa, exp)) => {
                let mantissa = trim_zeros(mantissa);
                let exp: i32 = exp.parse().unwrap_or(0);
                let sign = if exp < 0 { '-' } else { '+' };
                format!("{mantissa}e{sign}{:02}", exp.abs())
            }
            None => s,
        }
    } else {
        let decimals = (precision as i32 - 1 - exponent).max(0) as usize;
        trim_zeros(&format!("{value:.decimals$}")).to_string()
    }
}

fn trim_zeros(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}
