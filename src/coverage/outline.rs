// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The outline of the well-covered part of a map.

use std::collections::VecDeque;

use ndarray::prelude::*;

/// Neighbour offsets `(drow, dcol)`, clockwise starting from east.
const NEIGHBOURS: [(isize, isize); 8] = [
    (0, 1),
    (1, 1),
    (1, 0),
    (1, -1),
    (0, -1),
    (-1, -1),
    (-1, 0),
    (-1, 1),
];

/// The index of `NEIGHBOURS` pointing west.
const WEST: usize = 4;

/// The largest 8-connected region of `mask`. Ties go to the region found
/// first in row-major order.
pub(super) fn largest_region(mask: ArrayView2<bool>) -> Array2<bool> {
    let (ny, nx) = mask.dim();
    let mut label = Array2::<usize>::zeros((ny, nx));
    let mut best = (0, 0);
    let mut next_label = 1;
    let mut queue = VecDeque::new();
    for ((iy, ix), &m) in mask.indexed_iter() {
        if !m || label[(iy, ix)] != 0 {
            continue;
        }
        let mut size = 0;
        label[(iy, ix)] = next_label;
        queue.push_back((iy, ix));
        while let Some((y, x)) = queue.pop_front() {
            size += 1;
            for n in neighbours(y, x, ny, nx) {
                if mask[n] && label[n] == 0 {
                    label[n] = next_label;
                    queue.push_back(n);
                }
            }
        }
        if size > best.1 {
            best = (next_label, size);
        }
        next_label += 1;
    }
    label.mapv(|l| best.0 != 0 && l == best.0)
}

fn neighbours(y: usize, x: usize, ny: usize, nx: usize) -> impl Iterator<Item = (usize, usize)> {
    NEIGHBOURS
        .iter()
        .filter_map(move |&(dy, dx)| step((y, x), (dy, dx), ny, nx))
}

fn step(
    (y, x): (usize, usize),
    (dy, dx): (isize, isize),
    ny: usize,
    nx: usize,
) -> Option<(usize, usize)> {
    let y = y.checked_add_signed(dy)?;
    let x = x.checked_add_signed(dx)?;
    (y < ny && x < nx).then_some((y, x))
}

/// Trace the outer boundary of the single region in `mask` with Moore
/// neighbour tracing. Returns pixel indices `(row, col)` in order, without
/// repeating the first.
pub(super) fn trace_boundary(mask: ArrayView2<bool>) -> Vec<(usize, usize)> {
    let (ny, nx) = mask.dim();
    let start = match mask.indexed_iter().find(|(_, m)| **m) {
        Some((index, _)) => index,
        None => return vec![],
    };
    let is_set = |p: Option<(usize, usize)>| p.map(|p| mask[p]).unwrap_or(false);

    let mut contour = vec![start];
    let mut cur = start;
    // The pixel west of the first set pixel in row-major order is never set.
    let mut backtrack = WEST;
    let mut second = None;
    // Every boundary pixel is visited at most 4 times.
    for _ in 0..4 * ny * nx + 8 {
        let found = (1..=8)
            .map(|k| (backtrack + k) % 8)
            .find(|&d| is_set(step(cur, NEIGHBOURS[d], ny, nx)));
        let dir = match found {
            Some(d) => d,
            // An isolated pixel.
            None => break,
        };
        let next = match step(cur, NEIGHBOURS[dir], ny, nx) {
            Some(n) => n,
            None => break,
        };
        if cur == start && second == Some(next) {
            break;
        }
        if second.is_none() {
            second = Some(next);
        }

        // The last unset neighbour checked becomes the new backtrack point,
        // expressed relative to `next`.
        let (py, px) = NEIGHBOURS[(dir + 7) % 8];
        let (sy, sx) = NEIGHBOURS[dir];
        let rel = (py - sy, px - sx);
        backtrack = NEIGHBOURS.iter().position(|&n| n == rel).unwrap_or(WEST);

        if next == start {
            cur = next;
            continue;
        }
        contour.push(next);
        cur = next;
    }
    contour
}

/// The length of the closed polygon through `points`.
pub(super) fn perimeter(points: &[(f64, f64)]) -> f64 {
    if points.len() < 2 {
        return 0.0;
    }
    points
        .iter()
        .zip(points.iter().cycle().skip(1))
        .map(|(a, b)| (a.0 - b.0).hypot(a.1 - b.1))
        .sum()
}

/// Simplify the closed polygon through `points` with the Douglas-Peucker
/// algorithm, keeping vertices further than `epsilon` from the simplified
/// edges.
pub(super) fn simplify_closed(points: &[(f64, f64)], epsilon: f64) -> Vec<(f64, f64)> {
    if points.len() < 4 {
        return points.to_vec();
    }
    // Split the ring at the first point and the point furthest from it.
    let first = points[0];
    let far = (1..points.len())
        .max_by(|&a, &b| {
            dist2(points[a], first).total_cmp(&dist2(points[b], first))
        })
        .unwrap_or(points.len() / 2);

    let mut ring = points.to_vec();
    ring.push(first);
    let mut keep = vec![false; ring.len()];
    keep[0] = true;
    keep[far] = true;
    keep[ring.len() - 1] = true;
    let mut stack = vec![(0, far), (far, ring.len() - 1)];
    while let Some((i0, i1)) = stack.pop() {
        if i1 <= i0 + 1 {
            continue;
        }
        let (mut i_max, mut d_max) = (i0, 0.0);
        for i in i0 + 1..i1 {
            let d = segment_distance(ring[i], ring[i0], ring[i1]);
            if d > d_max {
                i_max = i;
                d_max = d;
            }
        }
        if d_max > epsilon {
            keep[i_max] = true;
            stack.push((i0, i_max));
            stack.push((i_max, i1));
        }
    }
    ring.pop();
    ring.into_iter()
        .zip(keep)
        .filter_map(|(p, k)| k.then_some(p))
        .collect()
}

fn dist2(a: (f64, f64), b: (f64, f64)) -> f64 {
    (a.0 - b.0).powi(2) + (a.1 - b.1).powi(2)
}

/// The distance from `p` to the segment `a`-`b`.
fn segment_distance(p: (f64, f64), a: (f64, f64), b: (f64, f64)) -> f64 {
    let l2 = dist2(a, b);
    if l2 == 0.0 {
        return dist2(p, a).sqrt();
    }
    let t = (((p.0 - a.0) * (b.0 - a.0) + (p.1 - a.1) * (b.1 - a.1)) / l2).clamp(0.0, 1.0);
    dist2(p, (a.0 + t * (b.0 - a.0), a.1 + t * (b.1 - a.1))).sqrt()
}
