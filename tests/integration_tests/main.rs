// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Integration tests.
//!
//! Some help for laying out these tests was taken from:
//! https://matklad.github.io/2021/02/27/delete-cargo-integration-tests.html

mod classify;
mod coverage;
mod no_stderr;
mod reduce;
mod setup;
mod simulate;

use std::{
    path::{Path, PathBuf},
    process::Output,
    str::from_utf8,
};

use assert_cmd::{output::OutputError, Command};

fn tolteca() -> Command {
    Command::cargo_bin("tolteca").unwrap()
}

fn get_cmd_output(result: Result<Output, OutputError>) -> (String, String) {
    let output = match result {
        Ok(o) => o,
        Err(o) => o.as_output().unwrap().clone(),
    };
    (
        from_utf8(&output.stdout).unwrap().to_string(),
        from_utf8(&output.stderr).unwrap().to_string(),
    )
}

/// A 16 s raster on the 2 mm array, sampled slowly enough to keep things quick.
const SIMU_YAML: &str = r#"simu:
  jobkey: int_job
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
  exports:
    - type: coverage
      pixscale: 10 arcsec
"#;

/// Write [`SIMU_YAML`] into `dir`.
fn write_simu_config(dir: &Path) -> PathBuf {
    let path = dir.join("60_simu.yaml");
    std::fs::write(&path, SIMU_YAML).unwrap();
    path
}

#[test]
fn test_help() {
    let cmd = tolteca().arg("--help").ok();
    assert!(cmd.is_ok(), "{:?}", cmd.err());
    let (stdout, _) = get_cmd_output(cmd);
    for sub in ["simulate", "coverage", "classify", "reduce", "setup"] {
        assert!(stdout.contains(sub), "{sub} missing from:\n{stdout}");
    }
}

#[test]
fn test_no_subcommand_is_an_error() {
    let cmd = tolteca().ok();
    assert!(cmd.is_err());
}
