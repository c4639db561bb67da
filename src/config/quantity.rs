// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Physical quantities in configuration documents.
//!
//! Each quantity deserialises from a bare number (in the canonical unit) or a
//! string with a unit, and serialises back to a string with the canonical
//! unit, e.g. `"10 s"`.

use std::fmt;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use crate::unit_parsing::{parse_angle, parse_freq, parse_time, FreqFormat, UnitParseError};

macro_rules! quantity {
    ($(#[$meta:meta])* $name:ident, $unit:literal, $expecting:literal, |$s:ident| $parse:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
        pub struct $name(pub f64);

        impl $name {
            pub fn value(self) -> f64 {
                self.0
            }

            pub(crate) fn parse($s: &str) -> Result<$name, UnitParseError> {
                $parse.map($name)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                write!(f, "{} {}", self.0, $unit)
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.to_string())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<$name, D::Error> {
                struct Visitor;

                impl<'de> de::Visitor<'de> for Visitor {
                    type Value = $name;

                    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                        f.write_str($expecting)
                    }

                    fn visit_f64<E: de::Error>(self, v: f64) -> Result<$name, E> {
                        Ok($name(v))
                    }

                    fn visit_i64<E: de::Error>(self, v: i64) -> Result<$name, E> {
                        Ok($name(v as f64))
                    }

                    fn visit_u64<E: de::Error>(self, v: u64) -> Result<$name, E> {
                        Ok($name(v as f64))
                    }

                    fn visit_str<E: de::Error>(self, v: &str) -> Result<$name, E> {
                        $name::parse(v).map_err(E::custom)
                    }
                }

                deserializer.deserialize_any(Visitor)
            }
        }
    };
}

quantity!(
    /// A duration \[seconds\].
    Time,
    "s",
    "a time, e.g. 10 or \"10 s\"",
    |s| parse_time(s).map(|(v, f)| f.to_seconds(v))
);

quantity!(
    /// A frequency \[Hz\].
    Freq,
    "Hz",
    "a frequency, e.g. 120 or \"120 Hz\"",
    |s| parse_freq(s).map(|(v, f)| f.to_hz(v))
);

quantity!(
    /// An angle \[degrees\].
    Angle,
    "deg",
    "an angle, e.g. 0.5 or \"30 arcmin\"",
    |s| parse_angle(s).map(|(v, f)| f.to_degrees(v))
);

quantity!(
    /// An angular speed on the sky \[degrees per second\], e.g. `"30 arcsec/s"`.
    Speed,
    "deg/s",
    "an angular speed, e.g. 0.01 or \"30 arcsec/s\"",
    |s| parse_angle(per_second(s)).map(|(v, f)| f.to_degrees(v))
);

quantity!(
    /// An angular frequency \[radians per second\], e.g. `"0.5 rad/s"` or
    /// `"0.1 Hz"`.
    AngularFreq,
    "rad/s",
    "an angular frequency, e.g. 0.5 or \"0.5 rad/s\"",
    |s| match parse_freq(s) {
        Ok((v, FreqFormat::NoUnit)) => Ok(v),
        Ok((v, f)) => Ok(std::f64::consts::TAU * f.to_hz(v)),
        Err(_) => parse_angle(per_second(s)).map(|(v, f)| f.to_degrees(v).to_radians()),
    }
);

/// Strip a trailing "/s" so that the rest can be parsed as an angle.
fn per_second(s: &str) -> &str {
    let s = s.trim();
    s.strip_suffix("/s").map(str::trim_end).unwrap_or(s)
}
