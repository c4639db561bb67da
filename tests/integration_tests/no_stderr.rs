// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Tests to ensure there is no stderr output for successful commands.

use tempfile::TempDir;

use crate::{get_cmd_output, tolteca, write_simu_config};

#[test]
fn test_coverage_no_stderr() {
    let tmp_dir = TempDir::new().unwrap();
    let config = write_simu_config(tmp_dir.path());
    let output = tmp_dir.path().join("cov.fits");

    #[rustfmt::skip]
    let cmd = tolteca()
        .args([
            "coverage", "--no-progress-bars",
            &config.display().to_string(),
            "--output", &output.display().to_string(),
        ])
        .ok();
    assert!(cmd.is_ok(), "coverage failed: {}", cmd.err().unwrap());
    let (_, stderr) = get_cmd_output(cmd);
    assert!(stderr.is_empty(), "stderr wasn't empty: {stderr}");
}

#[test]
fn test_classify_no_stderr() {
    let cmd = tolteca()
        .args([
            "classify",
            "--names",
            "toltec0_9_0_1_2021_01_01_00_00_00_tune.nc",
        ])
        .ok();
    assert!(cmd.is_ok(), "classify failed: {}", cmd.err().unwrap());
    let (_, stderr) = get_cmd_output(cmd);
    assert!(stderr.is_empty(), "stderr wasn't empty: {stderr}");
}
