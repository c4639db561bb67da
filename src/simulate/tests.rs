// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::sync::atomic::{AtomicUsize, Ordering};

use approx::assert_abs_diff_eq;
use fitsio::FitsFile;
use indoc::indoc;
use tempfile::TempDir;

use super::*;
use crate::{instrument::Beam, io::write::FileWriteError};

// A 16 s raster: 3 scans of 4 s with 2 s turnovers.
const SIMU_YAML: &str = indoc! {"
    simu:
      jobkey: sim_test
      instrument:
        name: toltec
        array_name: a2000
      mapping:
        type: raster
        target: {ra: 180 deg, dec: 0 deg}
        length: 4 arcmin
        space: 30 arcsec
        n_scans: 3
        speed: 60 arcsec/s
        t_turnover: 2 s
      obs_params:
        f_smp_probing: 20 Hz
      perf_params:
        chunk_len: 4 s
        pre_run_setup_time_grid_size: 10
      sources:
        - type: point_source_catalog
          sources:
            - {name: src0, ra: 180 deg, dec: 0 deg, flux_mJy: 10}
        - type: uniform
          level_mJy: 0.5
"};

fn get_config(overrides: &[&str]) -> SimuConfig {
    let doc = serde_yaml::from_str(SIMU_YAML).unwrap();
    let overrides: Vec<String> = overrides.iter().map(|s| s.to_string()).collect();
    SimuConfig::from_documents(vec![doc], &overrides).unwrap()
}

/// Fails on its `fail_on`th evaluation (0-indexed).
struct FailingModel {
    fail_on: usize,
    n_calls: AtomicUsize,
}

impl SourceModel for FailingModel {
    fn name(&self) -> &'static str {
        "failing"
    }

    fn evaluate(
        &self,
        _det_ra: ArrayView2<f64>,
        _det_dec: ArrayView2<f64>,
        _beam: &Beam,
        _out: ArrayViewMut2<f64>,
    ) -> Result<(), ModelError> {
        let n = self.n_calls.fetch_add(1, Ordering::SeqCst);
        if n == self.fail_on {
            return Err(ModelError::Evaluation {
                model: "failing",
                msg: format!("call {n}"),
            });
        }
        Ok(())
    }
}

#[test]
fn test_t_exp_defaults_to_pattern_time() {
    let sim = Simulation::new(&get_config(&[])).unwrap();
    assert_abs_diff_eq!(sim.t_exp(), 16.0, epsilon = 1e-9);

    let sim = Simulation::new(&get_config(&["obs_params.t_exp=6 s"])).unwrap();
    assert_abs_diff_eq!(sim.t_exp(), 6.0);
}

#[test]
fn test_run_into_memory() {
    let mut sim = Simulation::new(&get_config(&[])).unwrap();
    let mut sink = MemoryTodSink::default();
    let summary = sim.run(&mut sink).unwrap();

    assert_abs_diff_eq!(summary.t_exp, 16.0, epsilon = 1e-9);
    assert_eq!(summary.n_times, 320);
    assert_eq!(summary.n_chunks, 4);
    assert!(sink.finished);

    let meta = sink.meta.as_ref().unwrap();
    assert_eq!(meta.jobkey, "sim_test");
    assert_eq!(meta.array_name, "a2000");
    assert_eq!(meta.mapping_type, "raster");
    assert_eq!(meta.n_times, 320);
    assert_eq!(meta.detectors.len(), sim.instrument.detectors.len());

    // Chunks arrive in order and tile the timeline.
    assert_eq!(sink.chunks.len(), 4);
    for (i, chunk) in sink.chunks.iter().enumerate() {
        assert_eq!(chunk.index, i);
        assert_abs_diff_eq!(chunk.t_start, i as f64 * 4.0, epsilon = 1e-12);
        assert_abs_diff_eq!(chunk.dt, 0.05);
        assert_eq!(chunk.num_times(), 80);
        assert_eq!(chunk.ra.len(), 80);
        assert_eq!(chunk.data.dim(), (meta.detectors.len(), 80));
        // The uniform background is everywhere; the point source only adds.
        assert!(chunk.data.iter().all(|&v| v >= 0.5 - 1e-12));
    }
    // Something passes over the source.
    let peak = sink
        .chunks
        .iter()
        .flat_map(|c| c.data.iter())
        .fold(f64::NEG_INFINITY, |acc, &v| acc.max(v));
    assert!(peak > 1.0, "{peak}");
}

#[test]
fn test_evaluate_chunk_matches_run() {
    let mut sim = Simulation::new(&get_config(&[])).unwrap();
    let mut sink = MemoryTodSink::default();
    sim.run(&mut sink).unwrap();

    let chunks = plan_chunks(16.0, 20.0, 4.0).unwrap();
    let again = sim.evaluate_chunk(&chunks[2]).unwrap();
    assert_eq!(again, sink.chunks[2]);
}

#[test]
fn test_model_failure_keeps_earlier_chunks() {
    let mut sim = Simulation::new(&get_config(&[])).unwrap();
    sim.sources.push(Box::new(FailingModel {
        fail_on: 2,
        n_calls: AtomicUsize::new(0),
    }));
    let mut sink = MemoryTodSink::default();
    let result = sim.run(&mut sink);

    assert!(
        matches!(result, Err(SimulateError::Model(ModelError::Evaluation { .. }))),
        "{result:?}"
    );
    assert!(sink.finished);
    let indices: Vec<usize> = sink.chunks.iter().map(|c| c.index).collect();
    assert_eq!(indices, vec![0, 1]);
}

/// Fails to write chunk `fail_on`, then fails to finish.
#[derive(Default)]
struct BrokenSink {
    inner: MemoryTodSink,
    fail_on: usize,
    finish_called: bool,
}

impl TodSink for BrokenSink {
    fn write_meta(&mut self, meta: &TodMeta) -> Result<(), TodWriteError> {
        self.inner.write_meta(meta)
    }

    fn write_chunk(&mut self, chunk: TodChunk) -> Result<(), TodWriteError> {
        if chunk.index == self.fail_on {
            return Err(TodWriteError::NotStarted);
        }
        self.inner.write_chunk(chunk)
    }

    fn finish(&mut self) -> Result<(), TodWriteError> {
        self.finish_called = true;
        Err(TodWriteError::FileWrite(FileWriteError::FileNotWritable {
            file: "broken".to_string(),
        }))
    }
}

#[test]
fn test_write_failure_is_reported_over_finish_failure() {
    let mut sim = Simulation::new(&get_config(&[])).unwrap();
    let mut sink = BrokenSink {
        fail_on: 1,
        ..Default::default()
    };
    let result = sim.run(&mut sink);

    assert!(
        matches!(result, Err(SimulateError::Write(TodWriteError::NotStarted))),
        "{result:?}"
    );
    assert!(sink.finish_called);
    let indices: Vec<usize> = sink.inner.chunks.iter().map(|c| c.index).collect();
    assert_eq!(indices, vec![0]);

    // With every chunk written, the failure to finish is the error.
    let mut sink = BrokenSink {
        fail_on: usize::MAX,
        ..Default::default()
    };
    let result = sim.run(&mut sink);
    assert!(
        matches!(
            result,
            Err(SimulateError::Write(TodWriteError::FileWrite(
                FileWriteError::FileNotWritable { .. }
            )))
        ),
        "{result:?}"
    );
    assert_eq!(sink.inner.chunks.len(), 4);
}

#[test]
fn test_pre_run_setup_without_sources() {
    let mut config = get_config(&[]);
    config.sources.clear();
    let mut sim = Simulation::new(&config).unwrap();
    assert!(sim.pre_run_setup().is_ok());

    let mut sink = MemoryTodSink::default();
    sim.run(&mut sink).unwrap();
    assert!(sink
        .chunks
        .iter()
        .all(|c| c.data.iter().all(|&v| v == 0.0)));
}

#[test]
fn test_mapping_trajectory() {
    let sim = Simulation::new(&get_config(&[])).unwrap();
    let trajectory = sim.mapping_trajectory().unwrap();
    // 16 s at 12 Hz.
    assert_eq!(trajectory.len(), 192);
    assert_abs_diff_eq!(trajectory.t[1] - trajectory.t[0], 1.0 / 12.0, epsilon = 1e-12);
}

#[test]
fn test_run_into_fits() {
    let tmp = TempDir::new().unwrap();
    let mut sim = Simulation::new(&get_config(&[])).unwrap();
    let mut sink = FitsTodSink::new(tmp.path(), &sim.jobkey);
    let summary = sim.run(&mut sink).unwrap();
    assert_eq!(summary.n_chunks, 4);

    let file = tmp.path().join("sim_test_tod.fits");
    assert_eq!(sink.path(), file);
    let mut fptr = FitsFile::open(&file).unwrap();
    let hdu = fptr.hdu(0).unwrap();
    let n_chunks: i64 = hdu.read_key(&mut fptr, "NCHUNKS").unwrap();
    assert_eq!(n_chunks, 4);
    for i in 0..4 {
        assert!(fptr.hdu(format!("CHUNK{i:04}").as_str()).is_ok());
        assert!(fptr.hdu(format!("POINT{i:04}").as_str()).is_ok());
    }
}

#[test]
fn test_coverage_of_the_observation() {
    let sim = Simulation::new(&get_config(&[])).unwrap();
    let params = CoverageParams::default();
    let result = sim.coverage(&params).unwrap();
    assert_eq!(result.n_samples, 192);
    assert_eq!(result.n_detectors, sim.instrument.detectors.len());
    assert_abs_diff_eq!(result.dt_smp, 1.0 / 12.0, epsilon = 1e-12);
    assert!(result.summary().map_area > 0.0);
}

#[test]
fn test_mean_altitude() {
    let sim = Simulation::new(&get_config(&[])).unwrap();
    assert!(sim.mean_altitude().is_none());

    let sim = Simulation::new(&get_config(&["mapping.t0=2022-03-04T05:06:07"])).unwrap();
    let alt = sim.mean_altitude().unwrap();
    assert!((-90.0..=90.0).contains(&alt), "{alt}");
}
