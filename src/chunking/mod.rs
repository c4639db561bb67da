// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Splitting a simulated timeline into bounded chunks of samples.

mod error;

pub use error::ChunkError;

use std::ops::Range;

use log::info;
use ndarray::Array1;
use vec1::Vec1;

use crate::constants::DEFAULT_CHUNK_MERGE_RATIO_INV;

/// A contiguous run of samples of the timeline.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeChunk {
    /// The chunk index. The first chunk is 0.
    pub index: usize,

    /// The sample indices of this chunk. Sample `i` is at time `i / f_smp`.
    pub range: Range<usize>,

    /// The sampling frequency \[Hz\].
    pub f_smp: f64,
}

impl TimeChunk {
    pub fn len(&self) -> usize {
        self.range.len()
    }

    pub fn is_empty(&self) -> bool {
        self.range.is_empty()
    }

    /// The time of the first sample \[seconds\].
    pub fn t_start(&self) -> f64 {
        self.range.start as f64 / self.f_smp
    }

    /// The sample interval \[seconds\].
    pub fn dt(&self) -> f64 {
        self.f_smp.recip()
    }

    /// The sample times of this chunk \[seconds\].
    pub fn times(&self) -> Array1<f64> {
        self.range
            .clone()
            .map(|i| i as f64 / self.f_smp)
            .collect()
    }
}

/// Products within this of an integer are treated as that integer, so that
/// e.g. 100 s at 120 Hz is 12000 samples and not 11999.
const INTEGER_TOLERANCE: f64 = 1e-9;

fn near_integer(x: f64) -> Option<usize> {
    let rounded = x.round();
    ((x - rounded).abs() <= INTEGER_TOLERANCE * rounded.max(1.0)).then_some(rounded as usize)
}

/// How many whole samples fit in `x` sample intervals. A partial interval at
/// the end gets no sample.
fn whole_samples(x: f64) -> usize {
    near_integer(x).unwrap_or_else(|| x.floor() as usize)
}

/// Split `t_exp` seconds sampled at `f_smp` into chunks of `chunk_len`
/// seconds. A trailing chunk less than a tenth of the size of its predecessor
/// is merged into it.
pub fn plan_chunks(t_exp: f64, f_smp: f64, chunk_len: f64) -> Result<Vec1<TimeChunk>, ChunkError> {
    plan_chunks_with_merge_ratio(t_exp, f_smp, chunk_len, DEFAULT_CHUNK_MERGE_RATIO_INV)
}

/// The sample times of `t_exp` seconds sampled at `f_smp` \[seconds\].
pub fn sample_times(t_exp: f64, f_smp: f64) -> Result<Array1<f64>, ChunkError> {
    let n_times = count_samples(t_exp, f_smp)?;
    Ok((0..n_times).map(|i| i as f64 / f_smp).collect())
}

fn count_samples(t_exp: f64, f_smp: f64) -> Result<usize, ChunkError> {
    if !(t_exp.is_finite() && t_exp > 0.0) {
        return Err(ChunkError::BadExposureTime(t_exp));
    }
    if !(f_smp.is_finite() && f_smp > 0.0) {
        return Err(ChunkError::BadSampleRate(f_smp));
    }
    match whole_samples(t_exp * f_smp) {
        0 => Err(ChunkError::NoSamples { t_exp, f_smp }),
        n => Ok(n),
    }
}

/// As [`plan_chunks`], but the trailing chunk is merged when
/// `len(last) * merge_ratio_inv < len(second_to_last)`. A `merge_ratio_inv` of
/// 0 never merges.
pub fn plan_chunks_with_merge_ratio(
    t_exp: f64,
    f_smp: f64,
    chunk_len: f64,
    merge_ratio_inv: usize,
) -> Result<Vec1<TimeChunk>, ChunkError> {
    let n_times = count_samples(t_exp, f_smp)?;
    if !(chunk_len.is_finite() && chunk_len > 0.0) {
        return Err(ChunkError::BadChunkLength(chunk_len));
    }
    let n_times_per_chunk = whole_samples(chunk_len * f_smp).max(1);

    let mut ranges: Vec<Range<usize>> = (0..n_times)
        .step_by(n_times_per_chunk)
        .map(|start| start..(start + n_times_per_chunk).min(n_times))
        .collect();
    if let [.., second_to_last, last] = ranges.as_slice() {
        if merge_ratio_inv > 0 && last.len() * merge_ratio_inv < second_to_last.len() {
            let last = ranges.pop().expect("has at least 2 elements");
            let new_last = ranges.last_mut().expect("has at least 1 element");
            new_last.end = last.end;
        }
    }

    let chunks: Vec<TimeChunk> = ranges
        .into_iter()
        .enumerate()
        .map(|(index, range)| TimeChunk {
            index,
            range,
            f_smp,
        })
        .collect();
    info!(
        "Simulating with {} samples per chunk, {} samples, {} chunks",
        n_times_per_chunk,
        n_times,
        chunks.len()
    );
    Ok(Vec1::try_from_vec(chunks).expect("n_times is not 0, so there's at least 1 chunk"))
}
