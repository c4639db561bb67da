// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::str::FromStr;

use approx::assert_abs_diff_eq;
use indoc::indoc;

use super::*;

#[test]
fn test_hex_layout_counts() {
    // a1100: 10" pitch, 12 rings.
    let dets = hex_layout(ArrayName::A1100, false);
    assert_eq!(dets.len(), 3 * 12 * 13 + 1);
    assert!(dets.iter().all(|d| d.pg == 0));

    let dets = hex_layout(ArrayName::A1100, true);
    assert_eq!(dets.len(), 2 * (3 * 12 * 13 + 1));
    assert_eq!(dets.iter().filter(|d| d.pg == 1).count(), 3 * 12 * 13 + 1);

    // a2000: 19" pitch, 6 rings.
    let dets = hex_layout(ArrayName::A2000, false);
    assert_eq!(dets.len(), 127);

    // The layout is centred on the boresight, and fits in the field of view.
    let n = dets.len() as f64;
    let mean_x = dets.iter().map(|d| d.x_t).sum::<f64>() / n;
    let mean_y = dets.iter().map(|d| d.y_t).sum::<f64>() / n;
    assert_abs_diff_eq!(mean_x, 0.0, epsilon = 1e-12);
    assert_abs_diff_eq!(mean_y, 0.0, epsilon = 1e-12);
    for d in &dets {
        assert!(d.x_t.hypot(d.y_t) <= 120.0 / 3600.0 + 1e-12);
    }
}

#[test]
fn test_array_names() {
    assert_eq!(ArrayName::from_str("a1400").unwrap(), ArrayName::A1400);
    assert_eq!(ArrayName::A2000.to_string(), "a2000");
    assert_abs_diff_eq!(ArrayName::A1100.wavelength(), 1.1);
}

#[test]
fn test_beam() {
    let beam = Beam {
        a_fwhm: 5.0 / 3600.0,
        b_fwhm: 5.0 / 3600.0,
    };
    assert_abs_diff_eq!(beam.response(0.0, 0.0), 1.0);
    assert_abs_diff_eq!(beam.response(2.5 / 3600.0, 0.0), 0.5, epsilon = 1e-12);
    let sigma = 5.0 / 3600.0 / GAUSSIAN_SIGMA_TO_FWHM;
    assert_abs_diff_eq!(beam.area(), std::f64::consts::TAU * sigma * sigma);
}

#[test]
fn test_instrument_from_config() {
    let config: InstrumentConfig = serde_yaml::from_str(indoc! {"
        name: toltec
        array_name: a2000
        polarized: true
    "})
    .unwrap();
    let inst = config.build().unwrap();
    assert_eq!(inst.name, "toltec");
    assert_eq!(inst.array_name, ArrayName::A2000);
    assert_eq!(inst.detectors.len(), 254);
    assert_abs_diff_eq!(inst.beam.a_fwhm, 9.5 / 3600.0);

    let config: InstrumentConfig = serde_yaml::from_str(indoc! {"
        name: toltec
        detectors:
          - {x_t: 0, y_t: 0}
          - {x_t: 30 arcsec, y_t: -0.5 arcmin, pg: 1}
    "})
    .unwrap();
    let inst = config.build().unwrap();
    assert_eq!(inst.array_name, ArrayName::A1100);
    assert_eq!(inst.detectors.len(), 2);
    assert_abs_diff_eq!(inst.detectors[1].x_t, 30.0 / 3600.0);
    assert_abs_diff_eq!(inst.detectors[1].y_t, -0.5 / 60.0);
    assert_eq!(inst.detectors[1].pg, 1);

    let config: InstrumentConfig = serde_yaml::from_str("{name: toltec, detectors: []}").unwrap();
    assert!(matches!(config.build(), Err(InstrumentError::NoDetectors)));

    let result: Result<InstrumentConfig, _> = serde_yaml::from_str("name: spire");
    assert!(result.is_err());
}
