// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use super::*;

use approx::assert_abs_diff_eq;

#[test]
fn test_parse_time_str_without_units() {
    for s in ["1", "1.0", " 1.0 "] {
        let result = parse_time(s);
        assert!(result.is_ok(), "{:?}", result.unwrap_err());
        let pair = result.unwrap();
        assert_abs_diff_eq!(pair.0, 1.0);
        assert_eq!(pair.1, TimeFormat::NoUnit);
    }
}

#[test]
fn test_parse_time_str_with_units() {
    // Iterate over all possible units.
    for time_format in TimeFormat::iter().filter(|&f| f != TimeFormat::NoUnit) {
        let time_format_str: &'static str = time_format.into();
        for time_format_str in [
            time_format_str.to_lowercase(),
            time_format_str.to_uppercase(),
        ] {
            for s in [
                format!("1{time_format_str}"),
                format!("1.0{time_format_str}"),
                format!(" 1.0{time_format_str} "),
                format!(" 1.0 {time_format_str} "),
            ] {
                let result = parse_time(&s);
                assert!(result.is_ok(), "{:?}", result.unwrap_err());
                let pair = result.unwrap();
                assert_abs_diff_eq!(pair.0, 1.0);
                assert_eq!(pair.1, time_format);
            }
        }
    }
}

#[test]
fn test_time_conversions() {
    let (v, f) = parse_time("1.5 min").unwrap();
    assert_abs_diff_eq!(f.to_seconds(v), 90.0);
    let (v, f) = parse_time("250ms").unwrap();
    assert_abs_diff_eq!(f.to_seconds(v), 0.25);
    let (v, f) = parse_time("2 h").unwrap();
    assert_abs_diff_eq!(f.to_seconds(v), 7200.0);
    let (v, f) = parse_time("1e2 s").unwrap();
    assert_abs_diff_eq!(f.to_seconds(v), 100.0);
}

#[test]
fn test_parse_freq_str() {
    let (v, f) = parse_freq("120 Hz").unwrap();
    assert_eq!(f, FreqFormat::Hz);
    assert_abs_diff_eq!(f.to_hz(v), 120.0);

    let (v, f) = parse_freq("0.5kHz").unwrap();
    assert_eq!(f, FreqFormat::kHz);
    assert_abs_diff_eq!(f.to_hz(v), 500.0);

    let (v, f) = parse_freq(" 40.0 ").unwrap();
    assert_eq!(f, FreqFormat::NoUnit);
    assert_abs_diff_eq!(f.to_hz(v), 40.0);
}

#[test]
fn test_parse_angle_str() {
    let (v, f) = parse_angle("4 arcmin").unwrap();
    assert_eq!(f, AngleFormat::arcmin);
    assert_abs_diff_eq!(f.to_degrees(v), 4.0 / 60.0);

    let (v, f) = parse_angle("-30arcsec").unwrap();
    assert_eq!(f, AngleFormat::arcsec);
    assert_abs_diff_eq!(f.to_degrees(v), -30.0 / 3600.0);

    let (v, f) = parse_angle("3.141592653589793 rad").unwrap();
    assert_abs_diff_eq!(f.to_degrees(v), 180.0, epsilon = 1e-12);

    let (v, f) = parse_angle("92.1").unwrap();
    assert_eq!(f, AngleFormat::NoUnit);
    assert_abs_diff_eq!(f.to_degrees(v), 92.1);
}

#[test]
fn test_bad_inputs() {
    assert!(matches!(
        parse_time("1.0 fortnights"),
        Err(UnitParseError::Unknown {
            unit_type: "time",
            ..
        })
    ));
    assert!(matches!(
        parse_freq("1.0.0 Hz"),
        Err(UnitParseError::GotUnitButCantParse { unit: "Hz", .. })
    ));
    assert!(parse_angle("arcmin").is_err());
    assert!(parse_angle("").is_err());
}
