// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Linear 2D convolution with FFTs.

use std::sync::Arc;

use ndarray::prelude::*;
use rustfft::{num_complex::Complex64, Fft, FftPlanner};

/// Convolve `image` with `kernel`, treating everything outside the image as
/// zero. The output has the shape of `image`; the kernel's centre pixel is
/// `(ky / 2, kx / 2)`, so odd-sized kernels are centred exactly.
pub(super) fn convolve_fft(image: ArrayView2<f64>, kernel: ArrayView2<f64>) -> Array2<f64> {
    let (ny, nx) = image.dim();
    let (ky, kx) = kernel.dim();
    if ny == 0 || nx == 0 || ky == 0 || kx == 0 {
        return Array2::zeros((ny, nx));
    }

    // Pad to the full linear-convolution size so nothing wraps around.
    let fy = ny + ky - 1;
    let fx = nx + kx - 1;
    let mut planner = FftPlanner::<f64>::new();
    let plan = Plan2d {
        fy,
        fx,
        row_forward: planner.plan_fft_forward(fx),
        col_forward: planner.plan_fft_forward(fy),
        row_inverse: planner.plan_fft_inverse(fx),
        col_inverse: planner.plan_fft_inverse(fy),
    };

    let mut image_spec = plan.forward(image);
    let kernel_spec = plan.forward(kernel);
    image_spec
        .iter_mut()
        .zip(kernel_spec.iter())
        .for_each(|(a, b)| *a *= *b);
    let full = plan.inverse(image_spec);

    let (cy, cx) = (ky / 2, kx / 2);
    let scale = 1.0 / (fy * fx) as f64;
    Array2::from_shape_fn((ny, nx), |(iy, ix)| {
        full[(iy + cy) * fx + ix + cx].re * scale
    })
}

struct Plan2d {
    fy: usize,
    fx: usize,
    row_forward: Arc<dyn Fft<f64>>,
    col_forward: Arc<dyn Fft<f64>>,
    row_inverse: Arc<dyn Fft<f64>>,
    col_inverse: Arc<dyn Fft<f64>>,
}

impl Plan2d {
    /// Zero-pad `a` to `(fy, fx)` and transform it. The spectrum is returned
    /// transposed, i.e. with shape `(fx, fy)`.
    fn forward(&self, a: ArrayView2<f64>) -> Vec<Complex64> {
        let mut buf = vec![Complex64::new(0.0, 0.0); self.fy * self.fx];
        for ((iy, ix), &v) in a.indexed_iter() {
            buf[iy * self.fx + ix] = Complex64::new(v, 0.0);
        }
        // rustfft transforms each consecutive run of `len` values.
        self.row_forward.process(&mut buf);
        let mut buf = transpose(&buf, self.fy, self.fx);
        self.col_forward.process(&mut buf);
        buf
    }

    /// Undo `forward` (without the 1/N normalisation).
    fn inverse(&self, mut spec: Vec<Complex64>) -> Vec<Complex64> {
        self.col_inverse.process(&mut spec);
        let mut buf = transpose(&spec, self.fx, self.fy);
        self.row_inverse.process(&mut buf);
        buf
    }
}

/// Transpose a row-major `(rows, cols)` buffer.
fn transpose(buf: &[Complex64], rows: usize, cols: usize) -> Vec<Complex64> {
    let mut out = vec![Complex64::new(0.0, 0.0); buf.len()];
    for r in 0..rows {
        for c in 0..cols {
            out[c * rows + r] = buf[r * cols + c];
        }
    }
    out
}
