// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use approx::assert_abs_diff_eq;

use super::*;

#[test]
fn test_square_limits() {
    let x = [-2.0, 2.0, 0.0];
    let y = [-1.0, 0.0, f64::NAN];
    let ((x0, x1), (y0, y1)) = square_limits(&x, &y, 0.0).unwrap();
    assert_abs_diff_eq!(x0, -2.0);
    assert_abs_diff_eq!(x1, 2.0);
    // Square, centred on the y extent.
    assert_abs_diff_eq!(y0, -2.5);
    assert_abs_diff_eq!(y1, 1.5);

    let ((x0, x1), _) = square_limits(&x, &y, 0.1).unwrap();
    assert_abs_diff_eq!(x0, -2.2);
    assert_abs_diff_eq!(x1, 2.2);
}

#[test]
fn test_square_limits_degenerate() {
    let ((x0, x1), (y0, y1)) = square_limits(&[1.0], &[1.0], 0.0).unwrap();
    assert_abs_diff_eq!(x0, 0.5);
    assert_abs_diff_eq!(x1, 1.5);
    assert_abs_diff_eq!(y0, 0.5);
    assert_abs_diff_eq!(y1, 1.5);

    assert!(square_limits(&[], &[], 0.0).is_none());
    assert!(square_limits(&[f64::NAN], &[0.0], 0.0).is_none());
}
