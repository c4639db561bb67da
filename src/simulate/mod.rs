// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
The observation simulator.

The timeline is split into chunks (see [`crate::chunking`]). A model thread
evaluates the chunks in order and sends them over a bounded channel to the
writer, which hands them to a [`TodSink`] in the same order. If anything
fails, the run stops; chunks that were already written are kept.
 */

mod error;
#[cfg(test)]
mod tests;

pub use crate::io::write::{FitsTodSink, MemoryTodSink, TodChunk, TodMeta, TodSink, TodWriteError};
pub use error::SimulateError;

use std::thread::{self, ScopedJoinHandle};

use chrono::Duration;
use crossbeam_channel::{bounded, Receiver, Sender};
use crossbeam_utils::atomic::AtomicCell;
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use log::{debug, info, trace};
use ndarray::prelude::*;
use scopeguard::defer_on_unwind;

use crate::{
    chunking::{plan_chunks, sample_times, TimeChunk},
    config::{ObsParams, PerfParams, SimuConfig},
    coord::{lmt_altitude, offset_to_lonlat, RADec, SkyBoundingBox},
    coverage::{synthesize, CoverageParams, CoverageResult},
    instrument::{Detector, Instrument},
    mapping::{evaluate_trajectory, MappingModel, Trajectory},
    sources::{ModelError, PreRunSetup, SourceModel},
    PROGRESS_BARS,
};

/// Everything needed to run the simulator.
pub struct Simulation {
    pub jobkey: String,
    pub instrument: Instrument,
    pub mapping: Box<dyn MappingModel>,
    pub sources: Vec<Box<dyn SourceModel>>,
    pub obs_params: ObsParams,
    pub perf_params: PerfParams,
}

/// What happened in a completed run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulationSummary {
    /// \[seconds\]
    pub t_exp: f64,
    pub n_times: usize,
    pub n_chunks: usize,
}

impl Simulation {
    /// Build all of the models described by `config`.
    pub fn new(config: &SimuConfig) -> Result<Simulation, SimulateError> {
        let instrument = config.instrument.build()?;
        let mapping = config.mapping.build()?;
        let sources = config
            .sources
            .iter()
            .map(|s| s.build())
            .collect::<Result<Vec<_>, _>>()?;
        debug!(
            "Simulating {} with {} detectors, a {} mapping and {} source models",
            instrument.name,
            instrument.detectors.len(),
            mapping.name(),
            sources.len()
        );
        Ok(Simulation {
            jobkey: config.jobkey.clone(),
            instrument,
            mapping,
            sources,
            obs_params: config.obs_params.clone(),
            perf_params: config.perf_params.clone(),
        })
    }

    /// The duration of the observation \[seconds\]. This is the mapping
    /// pattern time unless `t_exp` was given.
    pub fn t_exp(&self) -> f64 {
        match self.obs_params.t_exp {
            Some(t_exp) => t_exp.value(),
            None => self.mapping.t_pattern(),
        }
    }

    /// The spacing of the grid that the mapping model is evaluated on before
    /// interpolating \[seconds\].
    fn mapping_interp_len(&self) -> f64 {
        match self.perf_params.mapping_eval_interp_len {
            Some(len) => len.value(),
            None => self.obs_params.f_smp_mapping.value().recip(),
        }
    }

    /// The boresight over the whole observation, sampled at `f_smp_mapping`.
    pub fn mapping_trajectory(&self) -> Result<Trajectory, SimulateError> {
        let t = sample_times(self.t_exp(), self.obs_params.f_smp_mapping.value())?;
        Ok(evaluate_trajectory(self.mapping.as_ref(), &t.to_vec(), None))
    }

    /// Synthesize the coverage map of the whole observation.
    pub fn coverage(&self, params: &CoverageParams) -> Result<CoverageResult, SimulateError> {
        let trajectory = self.mapping_trajectory()?;
        Ok(synthesize(
            &trajectory,
            &self.instrument.detectors,
            &self.instrument.beam,
            params,
        )?)
    }

    /// The mean altitude of the target over the observation \[degrees\]. This
    /// is only known if the mapping has a start time.
    pub fn mean_altitude(&self) -> Option<f64> {
        let t0 = self.mapping.t0()?;
        let target = self.mapping.target();
        let grid_size = self.perf_params.pre_run_setup_time_grid_size.max(2);
        let t = Array1::linspace(0.0, self.t_exp(), grid_size);
        let sum: f64 = t
            .iter()
            .map(|&t| {
                let t = t0 + Duration::milliseconds((t * 1e3).round() as i64);
                lmt_altitude(target, t)
            })
            .sum();
        Some(sum / grid_size as f64)
    }

    /// Give every source model a coarse view of the whole run.
    pub fn pre_run_setup(&mut self) -> Result<(), SimulateError> {
        let t_exp = self.t_exp();
        let grid_size = self.perf_params.pre_run_setup_time_grid_size.max(2);
        let t = Array1::linspace(0.0, t_exp, grid_size).to_vec();
        let trajectory = evaluate_trajectory(self.mapping.as_ref(), &t, None);
        let (det_ra, det_dec) = detector_positions(&self.instrument.detectors, &trajectory);
        let footprint = SkyBoundingBox::from_lonlat(
            det_ra.as_slice().unwrap_or(&[]),
            det_dec.as_slice().unwrap_or(&[]),
        )
        .ok_or(SimulateError::NoDetectors)?;
        trace!("Pre-run footprint: {footprint:?}");

        let pre_run = PreRunSetup {
            t: &t,
            footprint,
            beam: &self.instrument.beam,
        };
        for source in self.sources.iter_mut() {
            debug!("Setting up the {} model", source.name());
            source.setup(&pre_run)?;
        }
        Ok(())
    }

    /// The metadata of a run split into `chunks`.
    fn tod_meta(&self, t_exp: f64, chunks: &[TimeChunk]) -> TodMeta {
        let target = self.mapping.target();
        TodMeta {
            jobkey: self.jobkey.clone(),
            instrument: self.instrument.name.to_string(),
            array_name: self.instrument.array_name.to_string(),
            mapping_type: self.mapping.name().to_string(),
            target_ra: target.ra,
            target_dec: target.dec,
            t_exp,
            t_pattern: self.mapping.t_pattern(),
            f_smp_probing: self.obs_params.f_smp_probing.value(),
            f_smp_mapping: self.obs_params.f_smp_mapping.value(),
            n_times: chunks.iter().map(|c| c.len()).sum(),
            n_chunks: chunks.len(),
            detectors: self.instrument.detectors.clone(),
        }
    }

    /// Run the setup hooks, then evaluate every chunk and write it to `sink`.
    pub fn run<S: TodSink + ?Sized>(
        &mut self,
        sink: &mut S,
    ) -> Result<SimulationSummary, SimulateError> {
        let t_exp = self.t_exp();
        if self.obs_params.t_exp.is_none() {
            info!("Using t_exp = {t_exp} s from the mapping pattern");
        }
        self.pre_run_setup()?;

        let chunks = plan_chunks(
            t_exp,
            self.obs_params.f_smp_probing.value(),
            self.perf_params.chunk_len.value(),
        )?;
        let meta = self.tod_meta(t_exp, &chunks);
        sink.write_meta(&meta)?;

        // Channel for writing evaluated chunks.
        let (tx_model, rx_model) = bounded(5);

        // Progress bars.
        let multi_progress = MultiProgress::with_draw_target(if PROGRESS_BARS.load() {
            ProgressDrawTarget::stdout()
        } else {
            ProgressDrawTarget::hidden()
        });
        let model_progress = multi_progress.add(
            ProgressBar::new(chunks.len() as _)
                .with_style(
                    ProgressStyle::default_bar()
                        .template("{msg:17}: [{wide_bar:.blue}] {pos:2}/{len:2} chunks ({elapsed_precise}<{eta_precise})").unwrap()
                        .progress_chars("=> "),
                )
                .with_position(0)
                .with_message("Evaluating"),
        );
        let write_progress = multi_progress.add(
            ProgressBar::new(chunks.len() as _)
                .with_style(
                    ProgressStyle::default_bar()
                        .template("{msg:17}: [{wide_bar:.blue}] {pos:2}/{len:2} chunks ({elapsed_precise}<{eta_precise})").unwrap()
                        .progress_chars("=> "),
                )
                .with_position(0)
                .with_message("Writing"),
        );

        // Evaluate the chunks and write them out asynchronously.
        let this = &*self;
        let error = AtomicCell::new(false);
        let scoped_threads_result: Result<usize, SimulateError> = thread::scope(|scope| {
            // Modelling thread.
            let model_handle: ScopedJoinHandle<Result<(), ModelError>> = thread::Builder::new()
                .name("model".to_string())
                .spawn_scoped(scope, || {
                    defer_on_unwind! { error.store(true); }
                    model_progress.tick();

                    let result = model_thread(this, &chunks, tx_model, &error, model_progress);
                    if result.is_err() {
                        error.store(true);
                    }
                    result
                })
                .expect("OS can create threads");

            // The sink needn't be Send, so writing happens on this thread.
            defer_on_unwind! { error.store(true); }
            write_progress.tick();
            let write_result = write_thread(sink, rx_model, write_progress);
            if write_result.is_err() {
                error.store(true);
            }

            // Join the model thread. This propagates any errors and lets us
            // know if it panicked.
            model_handle.join().unwrap()?;
            Ok(write_result?)
        });
        let n_written = scoped_threads_result?;
        info!("Wrote {n_written} chunks of simulated data");

        Ok(SimulationSummary {
            t_exp,
            n_times: meta.n_times,
            n_chunks: meta.n_chunks,
        })
    }

    /// Evaluate the detector signals for one chunk.
    pub fn evaluate_chunk(&self, chunk: &TimeChunk) -> Result<TodChunk, ModelError> {
        let t = chunk.times().to_vec();
        let trajectory = evaluate_trajectory(
            self.mapping.as_ref(),
            &t,
            Some(self.mapping_interp_len()),
        );
        let (det_ra, det_dec) = detector_positions(&self.instrument.detectors, &trajectory);

        let mut data = Array2::zeros(det_ra.dim());
        for source in &self.sources {
            source.evaluate(
                det_ra.view(),
                det_dec.view(),
                &self.instrument.beam,
                data.view_mut(),
            )?;
        }
        if let Some(bad) = data.iter().find(|v| !v.is_finite()) {
            return Err(ModelError::Evaluation {
                model: "simulator",
                msg: format!("chunk {} has a non-finite detector value ({bad})", chunk.index),
            });
        }

        Ok(TodChunk {
            index: chunk.index,
            t_start: chunk.t_start(),
            dt: chunk.dt(),
            ra: trajectory.ra,
            dec: trajectory.dec,
            data,
        })
    }
}

/// The sky positions of every detector at every point of `trajectory`, each
/// with shape (n_det, n_time).
fn detector_positions(detectors: &[Detector], trajectory: &Trajectory) -> (Array2<f64>, Array2<f64>) {
    let shape = (detectors.len(), trajectory.len());
    let mut ra = Array2::zeros(shape);
    let mut dec = Array2::zeros(shape);
    for (i_det, det) in detectors.iter().enumerate() {
        for (i_time, (&b_ra, &b_dec)) in trajectory.ra.iter().zip(trajectory.dec.iter()).enumerate() {
            let pos = offset_to_lonlat(det.x_t, det.y_t, RADec::new(b_ra, b_dec));
            ra[(i_det, i_time)] = pos.ra;
            dec[(i_det, i_time)] = pos.dec;
        }
    }
    (ra, dec)
}

fn model_thread(
    sim: &Simulation,
    chunks: &[TimeChunk],
    tx: Sender<TodChunk>,
    error: &AtomicCell<bool>,
    progress_bar: ProgressBar,
) -> Result<(), ModelError> {
    for chunk in chunks {
        debug!("Working on chunk {} of {}", chunk.index, chunks.len());
        let tod = sim.evaluate_chunk(chunk)?;

        // Should we continue?
        if error.load() {
            return Ok(());
        }

        match tx.send(tod) {
            Ok(()) => (),
            // If we can't send the message, it's because the channel has been
            // closed on the other side. That should only happen because the
            // writer has exited due to error; in that case, just exit this
            // thread.
            Err(_) => return Ok(()),
        }

        progress_bar.inc(1);
    }

    progress_bar.abandon_with_message("Finished evaluating");
    Ok(())
}

/// Write chunks until the channel closes. Every chunk evaluated before a
/// model failure is written, and the sink is always finished, so that
/// whatever was written is kept.
fn write_thread<S: TodSink + ?Sized>(
    sink: &mut S,
    rx: Receiver<TodChunk>,
    progress_bar: ProgressBar,
) -> Result<usize, TodWriteError> {
    let mut n_written = 0;
    let mut result = Ok(());
    for chunk in rx.iter() {
        trace!("Writing chunk {}", chunk.index);
        if let Err(e) = sink.write_chunk(chunk) {
            result = Err(e);
            break;
        }
        n_written += 1;
        progress_bar.inc(1);
    }
    // Let the model thread know that nothing more will be received.
    drop(rx);

    // Always finish the sink, but a failed write is the error to report.
    let finished = sink.finish();
    result?;
    finished?;
    progress_bar.abandon_with_message("Finished writing");
    Ok(n_written)
}
