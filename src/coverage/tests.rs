// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use approx::{assert_abs_diff_eq, assert_relative_eq};
use fitsio::FitsFile;
use indoc::indoc;
use ndarray::prelude::*;
use tempfile::TempDir;

use super::{
    convolve::convolve_fft,
    histogram::{beam_kernel, detector_kernel},
    outline::{largest_region, simplify_closed, trace_boundary},
    *,
};
use crate::{
    instrument::hex_layout,
    mapping::{evaluate_trajectory, MappingConfig},
};

/// Convolution by the definition, for comparison.
fn convolve_direct(image: ArrayView2<f64>, kernel: ArrayView2<f64>) -> Array2<f64> {
    let (ny, nx) = image.dim();
    let (ky, kx) = kernel.dim();
    let (cy, cx) = ((ky / 2) as isize, (kx / 2) as isize);
    Array2::from_shape_fn((ny, nx), |(iy, ix)| {
        let mut sum = 0.0;
        for ((jy, jx), &k) in kernel.indexed_iter() {
            let sy = iy as isize - (jy as isize - cy);
            let sx = ix as isize - (jx as isize - cx);
            if sy >= 0 && sx >= 0 && (sy as usize) < ny && (sx as usize) < nx {
                sum += image[(sy as usize, sx as usize)] * k;
            }
        }
        sum
    })
}

#[test]
fn test_convolve_fft_matches_direct() {
    let image = Array2::from_shape_fn((7, 9), |(y, x)| ((3 * y + 5 * x) % 11) as f64 - 2.0);
    let kernel = Array2::from_shape_fn((3, 5), |(y, x)| (y * 5 + x) as f64 * 0.1);
    let fft = convolve_fft(image.view(), kernel.view());
    let direct = convolve_direct(image.view(), kernel.view());
    assert_abs_diff_eq!(fft, direct, epsilon = 1e-10);

    // A delta kernel changes nothing.
    let delta = array![[0.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 0.0]];
    let same = convolve_fft(image.view(), delta.view());
    assert_abs_diff_eq!(same, image, epsilon = 1e-10);
}

#[test]
fn test_detector_kernel() {
    let pixscale = 1.0 / 3600.0;
    let detectors = [
        Detector {
            x_t: 0.0,
            y_t: 0.0,
            pg: 0,
        },
        // Two pixels east, which is -x on the map.
        Detector {
            x_t: 2.0 / 3600.0,
            y_t: 0.0,
            pg: 0,
        },
        Detector {
            x_t: 0.0,
            y_t: 1.0 / 3600.0,
            pg: 1,
        },
    ];
    let kernel = detector_kernel(&detectors, pixscale);
    assert_eq!(kernel.dim(), (3, 5));
    assert_abs_diff_eq!(kernel.sum(), 3.0);
    assert_abs_diff_eq!(kernel[(1, 2)], 1.0);
    assert_abs_diff_eq!(kernel[(1, 0)], 1.0);
    assert_abs_diff_eq!(kernel[(2, 2)], 1.0);
}

#[test]
fn test_beam_kernel_is_normalised() {
    let beam = Beam {
        a_fwhm: 10.0 / 3600.0,
        b_fwhm: 5.0 / 3600.0,
    };
    let kernel = beam_kernel(&beam, 2.0 / 3600.0);
    let (ky, kx) = kernel.dim();
    assert_eq!(ky % 2, 1);
    assert_eq!(kx % 2, 1);
    // Wider along x.
    assert!(kx > ky);
    assert_abs_diff_eq!(kernel.sum(), 1.0, epsilon = 1e-12);
    let peak = kernel.iter().copied().fold(0.0, f64::max);
    assert_abs_diff_eq!(kernel[(ky / 2, kx / 2)], peak);
}

fn raster_trajectory() -> Trajectory {
    let mapping: MappingConfig = serde_yaml::from_str(indoc! {"
        type: raster
        target: {ra: 180 deg, dec: 30 deg}
        length: 5 arcmin
        space: 20 arcsec
        n_scans: 5
        speed: 30 arcsec/s
        t_turnover: 3 s
    "})
    .unwrap();
    let mapping = mapping.build().unwrap();
    let f_smp = 12.0;
    let n = (mapping.t_pattern() * f_smp) as usize;
    let t: Vec<f64> = (0..n).map(|i| i as f64 / f_smp).collect();
    evaluate_trajectory(mapping.as_ref(), &t, None)
}

#[test]
fn test_coverage_conserves_time() {
    let trajectory = raster_trajectory();
    let detectors = hex_layout(ArrayName::A2000, false);
    let beam = Beam {
        a_fwhm: 9.5 / 3600.0,
        b_fwhm: 9.5 / 3600.0,
    };
    let result = synthesize(&trajectory, &detectors, &beam, &CoverageParams::default()).unwrap();

    // Every sample is on the map.
    assert_eq!(result.n_samples_in_map, trajectory.len());
    assert_abs_diff_eq!(result.dt_smp, 1.0 / 12.0, epsilon = 1e-12);
    let expected = trajectory.len() as f64 * result.dt_smp * detectors.len() as f64;
    assert_relative_eq!(result.coverage.data.sum(), expected, max_relative = 1e-6);
    assert_eq!(result.coverage.unit, CoverageUnit::SecondsPerPixel);
    assert!(result.depth.is_none());

    // The map is centred on the pattern.
    let center = result.coverage.wcs.crval;
    assert_abs_diff_eq!(center.ra, 180.0, epsilon = 1e-3);
    assert_abs_diff_eq!(center.dec, 30.0, epsilon = 1e-3);
    assert_abs_diff_eq!(result.coverage.wcs.pixscale, 4.0 / 3600.0, epsilon = 1e-12);
}

#[test]
fn test_coverage_coarsens_big_maps() {
    let trajectory = raster_trajectory();
    let detectors = hex_layout(ArrayName::A2000, false);
    let beam = Beam {
        a_fwhm: 9.5 / 3600.0,
        b_fwhm: 9.5 / 3600.0,
    };
    let params = CoverageParams {
        n_pix_max: 2000,
        ..Default::default()
    };
    let result = synthesize(&trajectory, &detectors, &beam, &params).unwrap();
    let wcs = result.coverage.wcs;
    assert!(wcs.nx() * wcs.ny() <= 2000);
    // The pixel size grows in steps of 2 arcsec.
    let steps = (wcs.pixscale * 3600.0 - 4.0) / 2.0;
    assert_abs_diff_eq!(steps, steps.round(), epsilon = 1e-9);
    assert!(steps >= 1.0);
}

#[test]
fn test_coverage_bad_inputs() {
    let trajectory = raster_trajectory();
    let beam = Beam {
        a_fwhm: 5.0 / 3600.0,
        b_fwhm: 5.0 / 3600.0,
    };
    let detectors = hex_layout(ArrayName::A1100, false);
    let params = CoverageParams::default();

    let short = Trajectory {
        t: vec![0.0],
        x: vec![0.0],
        y: vec![0.0],
        ra: vec![0.0],
        dec: vec![0.0],
    };
    assert!(matches!(
        synthesize(&short, &detectors, &beam, &params),
        Err(CoverageError::TooFewSamples(1))
    ));
    assert!(matches!(
        synthesize(&trajectory, &[], &beam, &params),
        Err(CoverageError::NoDetectors)
    ));

    let depth_without_nefd = CoverageParams {
        unit: CoverageUnit::MilliJanskyPerBeam,
        ..Default::default()
    };
    assert!(matches!(
        synthesize(&trajectory, &detectors, &beam, &depth_without_nefd),
        Err(CoverageError::NoNefd)
    ));

    let bad_pixscale = CoverageParams {
        pixscale: 0.0,
        ..Default::default()
    };
    assert!(matches!(
        synthesize(&trajectory, &detectors, &beam, &bad_pixscale),
        Err(CoverageError::BadParameter {
            name: "pixscale",
            ..
        })
    ));

    // A pixel cap that can only be met by growing the pixels.
    for factor in [0.0, -0.5, f64::NAN] {
        let fixed_pixscale = CoverageParams {
            adaptive_pixscale_factor: factor,
            n_pix_max: 1,
            ..Default::default()
        };
        assert!(matches!(
            synthesize(&trajectory, &detectors, &beam, &fixed_pixscale),
            Err(CoverageError::BadParameter {
                name: "adaptive_pixscale_factor",
                ..
            })
        ));
    }
}

fn uniform_map(value: f64) -> CoverageMap {
    CoverageMap {
        data: Array2::from_elem((10, 12), value),
        wcs: Wcs::new(RADec::new(10.0, -20.0), 2.0 / 3600.0, 12, 10),
        unit: CoverageUnit::SecondsPerPixel,
    }
}

#[test]
fn test_depth_of_uniform_map() {
    let map = uniform_map(100.0);
    let beam = Beam {
        a_fwhm: 5.0 / 3600.0,
        b_fwhm: 5.0 / 3600.0,
    };
    let nefd = 3.0;
    let depth = map.to_depth(&beam, nefd, DEFAULT_SENS_COEFF).unwrap();
    assert_eq!(depth.unit, CoverageUnit::MilliJanskyPerBeam);
    assert_eq!(depth.wcs, map.wcs);

    let beam_area_pix = beam.area() / map.wcs.pixel_area();
    let expected = std::f64::consts::SQRT_2 * nefd / (100.0 * beam_area_pix).sqrt();
    for &d in depth.data.iter() {
        assert_relative_eq!(d, expected, max_relative = 1e-12);
    }
    // The time map is untouched.
    assert_abs_diff_eq!(map.data, Array2::from_elem((10, 12), 100.0));

    assert!(matches!(
        depth.to_depth(&beam, nefd, DEFAULT_SENS_COEFF),
        Err(CoverageError::AlreadyDepth)
    ));
    assert!(matches!(
        map.to_depth(&beam, 0.0, DEFAULT_SENS_COEFF),
        Err(CoverageError::NoNefd)
    ));
}

#[test]
fn test_depth_ignores_poorly_covered_pixels() {
    let mut map = uniform_map(100.0);
    map.data[(0, 0)] = 1.0;
    map.data[(0, 1)] = 0.0;
    let beam = Beam {
        a_fwhm: 5.0 / 3600.0,
        b_fwhm: 5.0 / 3600.0,
    };
    let depth = map.to_depth(&beam, 1.0, 1.0).unwrap();
    assert_abs_diff_eq!(depth.data[(0, 0)], 0.0);
    assert_abs_diff_eq!(depth.data[(0, 1)], 0.0);
    assert!(depth.data[(5, 5)] > 0.0);
}

#[test]
fn test_summary() {
    let mut coverage = uniform_map(50.0);
    // One pixel below 10% of the peak.
    coverage.data[(9, 11)] = 1.0;
    let beam = Beam {
        a_fwhm: 5.0 / 3600.0,
        b_fwhm: 5.0 / 3600.0,
    };
    let depth = coverage.to_depth(&beam, 2.0, DEFAULT_SENS_COEFF).unwrap();
    let expected_depth = depth.data[(0, 0)];
    let result = CoverageResult {
        coverage: coverage.clone(),
        depth: Some(depth),
        dt_smp: 0.1,
        n_samples: 10,
        n_samples_in_map: 10,
        n_detectors: 1,
        unit: CoverageUnit::MilliJanskyPerBeam,
    };
    let summary = result.summary();
    assert_relative_eq!(
        summary.map_area,
        119.0 * coverage.wcs.pixel_area(),
        max_relative = 1e-12
    );
    assert_relative_eq!(
        summary.depth_rms.unwrap(),
        expected_depth,
        max_relative = 1e-12
    );
    assert_eq!(result.output_map().unit, CoverageUnit::MilliJanskyPerBeam);
}

#[test]
fn test_largest_region() {
    let mut mask = Array2::from_elem((6, 6), false);
    mask[(0, 0)] = true;
    mask[(0, 1)] = true;
    // Diagonal neighbours are connected.
    for i in 2..6 {
        mask[(i, i)] = true;
    }
    mask[(3, 2)] = true;
    let region = largest_region(mask.view());
    assert_eq!(region.iter().filter(|&&m| m).count(), 5);
    assert!(!region[(0, 0)]);
    assert!(region[(5, 5)]);
    assert!(region[(3, 2)]);
}

#[test]
fn test_trace_boundary() {
    let mut mask = Array2::from_elem((10, 10), false);
    mask.slice_mut(s![3..7, 2..8]).fill(true);
    let boundary = trace_boundary(mask.view());
    // 2 * (4 + 6) - 4 pixels around the edge.
    assert_eq!(boundary.len(), 16);
    assert_eq!(boundary[0], (3, 2));
    assert_eq!(boundary[1], (3, 3));
    for &(y, x) in &boundary {
        assert!(y == 3 || y == 6 || x == 2 || x == 7);
    }

    let mut single = Array2::from_elem((3, 3), false);
    single[(1, 1)] = true;
    assert_eq!(trace_boundary(single.view()), vec![(1, 1)]);
    assert!(trace_boundary(Array2::from_elem((3, 3), false).view()).is_empty());
}

#[test]
fn test_simplify_closed() {
    // A square with extra points along its edges.
    let points = [
        (0.0, 0.0),
        (1.0, 0.0),
        (2.0, 0.0),
        (2.0, 1.0),
        (2.0, 2.0),
        (1.0, 2.0),
        (0.0, 2.0),
        (0.0, 1.0),
    ];
    let simplified = simplify_closed(&points, 0.01);
    assert_eq!(
        simplified,
        vec![(0.0, 0.0), (2.0, 0.0), (2.0, 2.0), (0.0, 2.0)]
    );
}

#[test]
fn test_outline_of_a_block() {
    let mut map = uniform_map(0.0);
    map.data.slice_mut(s![3..7, 2..8]).fill(10.0);
    let outline = map.outline();
    let expected: Vec<RADec> = [(2.0, 3.0), (7.0, 3.0), (7.0, 6.0), (2.0, 6.0)]
        .into_iter()
        .map(|(x, y)| map.wcs.pixel_to_world(x, y))
        .collect();
    assert_eq!(outline.len(), expected.len());
    for (a, b) in outline.iter().zip(expected.iter()) {
        assert_abs_diff_eq!(a.ra, b.ra, epsilon = 1e-10);
        assert_abs_diff_eq!(a.dec, b.dec, epsilon = 1e-10);
    }
}

#[test]
fn test_write_coverage_fits() {
    let tmp_dir = TempDir::new().unwrap();
    let file = tmp_dir.path().join("coverage.fits");
    let map = uniform_map(3.0);
    let info = CoverageFitsInfo {
        array_name: ArrayName::A1400,
        t_exp: 123.456,
        mean_alt: 45.5,
    };
    write_coverage_fits(&file, &map, &info).unwrap();

    let mut fptr = FitsFile::open(&file).unwrap();
    let hdu = fptr.primary_hdu().unwrap();
    let telescope: String = hdu.read_key(&mut fptr, "TELESCOP").unwrap();
    assert_eq!(telescope, "LMT");
    let exptime: String = hdu.read_key(&mut fptr, "EXPTIME").unwrap();
    assert_eq!(exptime, "123");
    let obsdur: String = hdu.read_key(&mut fptr, "OBSDUR").unwrap();
    assert_eq!(obsdur, "123.456");
    let meanalt: String = hdu.read_key(&mut fptr, "MEANALT").unwrap();
    assert_eq!(meanalt, "45.500000");

    let hdu = fptr.hdu("COVERAGE").unwrap();
    let bunit: String = hdu.read_key(&mut fptr, "BUNIT").unwrap();
    assert_eq!(bunit, "s / pix");
    let band: String = hdu.read_key(&mut fptr, "BAND").unwrap();
    assert_eq!(band, "a1400");
    let naxis1: i64 = hdu.read_key(&mut fptr, "NAXIS1").unwrap();
    assert_eq!(naxis1, 12);
    let data: Vec<f64> = hdu.read_image(&mut fptr).unwrap();
    assert_eq!(data.len(), 120);
    assert_abs_diff_eq!(data[17], 3.0);
}
