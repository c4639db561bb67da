// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use approx::assert_abs_diff_eq;
use indoc::indoc;

use super::*;

fn beam() -> Beam {
    Beam {
        a_fwhm: 5.0 / 3600.0,
        b_fwhm: 5.0 / 3600.0,
    }
}

fn catalog() -> Vec<SourceConfig> {
    serde_yaml::from_str(indoc! {"
        - type: point_source_catalog
          sources:
            - {name: src0, ra: 180, dec: 0, flux_mJy: 10}
            - {ra: 180.5, dec: 0.5, flux_mJy: 3}
        - type: uniform
          level_mJy: 0.25
    "})
    .unwrap()
}

#[test]
fn test_point_source_response() {
    let configs = catalog();
    let model = configs[0].build().unwrap();
    assert_eq!(model.name(), "point_source_catalog");

    // Two detectors, two times: on the source, half a FWHM away, far away.
    let ra = array![[180.0, 180.0], [180.0 + 2.5 / 3600.0, 181.0]];
    let dec = array![[0.0, 0.0], [0.0, 0.0]];
    let mut out = Array2::zeros((2, 2));
    model
        .evaluate(ra.view(), dec.view(), &beam(), out.view_mut())
        .unwrap();
    assert_abs_diff_eq!(out[(0, 0)], 10.0, epsilon = 1e-12);
    assert_abs_diff_eq!(out[(0, 1)], 10.0, epsilon = 1e-12);
    assert_abs_diff_eq!(out[(1, 0)], 5.0, epsilon = 1e-9);
    assert_abs_diff_eq!(out[(1, 1)], 0.0);

    // Signals add.
    let uniform = configs[1].build().unwrap();
    uniform
        .evaluate(ra.view(), dec.view(), &beam(), out.view_mut())
        .unwrap();
    assert_abs_diff_eq!(out[(0, 0)], 10.25, epsilon = 1e-12);
    assert_abs_diff_eq!(out[(1, 1)], 0.25);
}

#[test]
fn test_point_source_setup_culls() {
    let SourceConfig::PointSourceCatalog(c) = &catalog()[0] else {
        panic!("expected a catalog");
    };
    let mut model = PointSourceCatalog::new(c).unwrap();
    assert_eq!(model.num_sources(), 2);
    let beam = beam();
    let footprint = SkyBoundingBox {
        lon_min: 179.9,
        lon_max: 180.1,
        lat_min: -0.1,
        lat_max: 0.1,
    };
    model
        .setup(&PreRunSetup {
            t: &[0.0, 1.0],
            footprint,
            beam: &beam,
        })
        .unwrap();
    assert_eq!(model.num_sources(), 1);
}

#[test]
fn test_bad_sources() {
    let config = SourceConfig::Uniform(UniformConfig {
        level_mjy: f64::NAN,
    });
    assert!(matches!(config.build(), Err(ModelError::NonFinite { .. })));

    let result: Result<SourceConfig, _> = serde_yaml::from_str("{type: atmosphere}");
    assert!(result.is_err());
}
