// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Code to parse strings into plain numbers or some quantity with a unit.
//!
//! Configuration documents carry quantities like "10 s", "120Hz" or
//! "4 arcmin". Each parser returns the number as written together with the
//! unit it was written in; callers convert to the canonical unit with the
//! format's `to_*` method. A naked number has no unit and is taken to already
//! be in the canonical unit.

mod error;
#[cfg(test)]
mod tests;

pub(crate) use error::UnitParseError;

use strum::IntoEnumIterator;
use strum_macros::{EnumIter, EnumString, IntoStaticStr};

#[derive(Debug, Clone, Copy, PartialEq, EnumIter, EnumString, IntoStaticStr)]
#[allow(non_camel_case_types)]
pub(crate) enum TimeFormat {
    /// Seconds
    s,

    /// Milliseconds
    ms,

    /// Minutes
    min,

    /// Hours
    h,

    NoUnit,
}

impl TimeFormat {
    /// Convert a number in this format into seconds.
    pub(crate) fn to_seconds(self, value: f64) -> f64 {
        match self {
            TimeFormat::s | TimeFormat::NoUnit => value,
            TimeFormat::ms => value / 1e3,
            TimeFormat::min => value * 60.0,
            TimeFormat::h => value * 3600.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, EnumIter, EnumString, IntoStaticStr)]
#[allow(non_camel_case_types)]
pub(crate) enum FreqFormat {
    /// Hertz
    Hz,

    /// kiloHertz
    kHz,

    NoUnit,
}

impl FreqFormat {
    /// Convert a number in this format into Hz.
    pub(crate) fn to_hz(self, value: f64) -> f64 {
        match self {
            FreqFormat::Hz | FreqFormat::NoUnit => value,
            FreqFormat::kHz => value * 1e3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, EnumIter, EnumString, IntoStaticStr)]
#[allow(non_camel_case_types)]
pub(crate) enum AngleFormat {
    /// Degrees
    deg,

    /// Arcminutes
    arcmin,

    /// Arcseconds
    arcsec,

    /// Radians
    rad,

    NoUnit,
}

impl AngleFormat {
    /// Convert a number in this format into degrees.
    pub(crate) fn to_degrees(self, value: f64) -> f64 {
        match self {
            AngleFormat::deg | AngleFormat::NoUnit => value,
            AngleFormat::arcmin => value / 60.0,
            AngleFormat::arcsec => value / 3600.0,
            AngleFormat::rad => value.to_degrees(),
        }
    }
}

/// Split a string into its numerical prefix and alphabetic suffix, e.g. "1.5
/// min" becomes ("1.5", "min").
fn split_unit(s: &str) -> (&str, &str) {
    let s = s.trim();
    let number = s.trim_end_matches(char::is_alphabetic);
    let suffix = &s[number.len()..];
    (number.trim(), suffix)
}

macro_rules! parse_with_unit {
    ($s:expr, $format:ty, $unit_type:expr) => {{
        let s: &str = $s;
        // Try to parse a naked number.
        if let Ok(number) = s.trim().parse::<f64>() {
            return Ok((number, <$format>::NoUnit));
        }

        // That didn't work; let's search over our supported formats.
        let (prefix, suffix) = split_unit(s);
        for format in <$format>::iter().filter(|&f| f != <$format>::NoUnit) {
            let format_str: &'static str = format.into();
            if suffix.eq_ignore_ascii_case(format_str) {
                return match prefix.parse::<f64>() {
                    Ok(n) => Ok((n, format)),
                    Err(_) => Err(UnitParseError::GotUnitButCantParse {
                        input: s.to_string(),
                        unit: format_str,
                    }),
                };
            }
        }

        // If we made it this far, we don't know how to parse the string.
        Err(UnitParseError::Unknown {
            input: s.to_string(),
            unit_type: $unit_type,
        })
    }};
}

/// Parse a string that may have a unit of time attached to it.
pub(crate) fn parse_time(s: &str) -> Result<(f64, TimeFormat), UnitParseError> {
    parse_with_unit!(s, TimeFormat, "time")
}

/// Parse a string that may have a unit of frequency attached to it.
pub(crate) fn parse_freq(s: &str) -> Result<(f64, FreqFormat), UnitParseError> {
    parse_with_unit!(s, FreqFormat, "frequency")
}

/// Parse a string that may have a unit of angle attached to it.
pub(crate) fn parse_angle(s: &str) -> Result<(f64, AngleFormat), UnitParseError> {
    parse_with_unit!(s, AngleFormat, "angle")
}
