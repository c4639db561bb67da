// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use fitsio::FitsFile;
use tempfile::TempDir;

use crate::{get_cmd_output, tolteca, write_simu_config};

#[test]
fn test_simulate_dry_run() {
    let tmp_dir = TempDir::new().unwrap();
    let config = write_simu_config(tmp_dir.path());

    #[rustfmt::skip]
    let cmd = tolteca()
        .args([
            "simulate", "--dry-run",
            &config.display().to_string(),
            "--output-dir", &tmp_dir.path().display().to_string(),
        ])
        .ok();
    assert!(cmd.is_ok(), "{:?}", cmd.err());
    let (stdout, _) = get_cmd_output(cmd);
    assert!(stdout.contains("Simulating int_job"), "{stdout}");
    assert!(stdout.contains("raster"), "{stdout}");
    assert!(!tmp_dir.path().join("int_job").exists());
}

#[test]
fn test_simulate_writes_job_dir() {
    let tmp_dir = TempDir::new().unwrap();
    let config = write_simu_config(tmp_dir.path());

    #[rustfmt::skip]
    let cmd = tolteca()
        .args([
            "simu", "--no-progress-bars",
            &config.display().to_string(),
            "--output-dir", &tmp_dir.path().display().to_string(),
        ])
        .ok();
    assert!(cmd.is_ok(), "{:?}", cmd.err());

    let job_dir = tmp_dir.path().join("int_job");
    for name in ["tolteca.yaml", "simu.log", "int_job_tod.fits", "int_job_coverage.fits"] {
        assert!(job_dir.join(name).exists(), "{name} is missing");
    }
    let log = std::fs::read_to_string(job_dir.join("simu.log")).unwrap();
    assert!(log.contains("Simulated 320 samples"), "{log}");

    let mut fptr = FitsFile::open(job_dir.join("int_job_tod.fits")).unwrap();
    let hdu = fptr.hdu(0).unwrap();
    let n_chunks: i64 = hdu.read_key(&mut fptr, "NCHUNKS").unwrap();
    assert_eq!(n_chunks, 4);
}

#[test]
fn test_simulate_bad_override() {
    let tmp_dir = TempDir::new().unwrap();
    let config = write_simu_config(tmp_dir.path());

    #[rustfmt::skip]
    let cmd = tolteca()
        .args([
            "simulate", "--dry-run",
            &config.display().to_string(),
            "--set", "obs_params.t_expo=30 s",
        ])
        .ok();
    assert!(cmd.is_err());
    let (_, stderr) = get_cmd_output(cmd);
    assert!(stderr.contains("--set"), "{stderr}");
}

#[test]
fn test_simulate_needs_config() {
    let cmd = tolteca().args(["simulate", "--dry-run"]).ok();
    assert!(cmd.is_err());
}
