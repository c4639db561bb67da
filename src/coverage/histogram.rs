// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The images that get convolved into a coverage map.

use ndarray::prelude::*;

use crate::{
    coord::{RADec, Wcs},
    instrument::{Beam, Detector},
};

/// Half-widths of the beam kernel, in standard deviations.
const BEAM_KERNEL_HALF_WIDTH_SIGMAS: f64 = 4.0;

/// Bin the boresight positions onto `wcs`, with each sample adding `dt`
/// seconds. Also returns the number of samples that landed on the grid.
pub(super) fn boresight_histogram(
    wcs: &Wcs,
    ra: &[f64],
    dec: &[f64],
    dt: f64,
) -> (Array2<f64>, usize) {
    let mut im = Array2::zeros(wcs.shape);
    let mut n_in_map = 0;
    for (&ra, &dec) in ra.iter().zip(dec.iter()) {
        let (x, y) = wcs.world_to_pixel(RADec::new(ra, dec));
        if let Some(index) = wcs.bin(x, y) {
            im[index] += dt;
            n_in_map += 1;
        }
    }
    (im, n_in_map)
}

/// Count detectors per pixel of offset from the boresight. The kernel has odd
/// sides and its centre pixel is zero offset.
pub(super) fn detector_kernel(detectors: &[Detector], pixscale: f64) -> Array2<f64> {
    // Pixel x increases westwards.
    let offsets: Vec<(i64, i64)> = detectors
        .iter()
        .map(|d| {
            (
                (d.y_t / pixscale).round() as i64,
                (-d.x_t / pixscale).round() as i64,
            )
        })
        .collect();
    let hy = offsets.iter().map(|(y, _)| y.unsigned_abs()).max().unwrap_or(0) as usize;
    let hx = offsets.iter().map(|(_, x)| x.unsigned_abs()).max().unwrap_or(0) as usize;

    let mut kernel = Array2::zeros((2 * hy + 1, 2 * hx + 1));
    for (y, x) in offsets {
        let iy = (y + hy as i64) as usize;
        let ix = (x + hx as i64) as usize;
        kernel[(iy, ix)] += 1.0;
    }
    kernel
}

/// A Gaussian for `beam` sampled on pixels of `pixscale`, normalised to sum to
/// 1. The major axis runs along x.
pub(super) fn beam_kernel(beam: &Beam, pixscale: f64) -> Array2<f64> {
    let sx = beam.a_stddev() / pixscale;
    let sy = beam.b_stddev() / pixscale;
    let hx = (BEAM_KERNEL_HALF_WIDTH_SIGMAS * sx).ceil() as usize;
    let hy = (BEAM_KERNEL_HALF_WIDTH_SIGMAS * sy).ceil() as usize;
    let mut kernel = Array2::from_shape_fn((2 * hy + 1, 2 * hx + 1), |(iy, ix)| {
        let x = (ix as f64 - hx as f64) / sx;
        let y = (iy as f64 - hy as f64) / sy;
        (-0.5 * (x * x + y * y)).exp()
    });
    let sum = kernel.sum();
    if sum > 0.0 {
        kernel /= sum;
    }
    kernel
}
