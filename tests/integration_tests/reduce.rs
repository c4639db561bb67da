// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use tempfile::TempDir;

use crate::{get_cmd_output, tolteca};

#[test]
fn test_reduce_dry_run_prints_the_plan() {
    let tmp_dir = TempDir::new().unwrap();
    for name in [
        "toltec0_000100_000_0001_2022_03_04_05_06_07_timestream.nc",
        "toltec1_000100_000_0001_2022_03_04_05_06_07_timestream.nc",
        "toltec0_000101_000_0001_2022_03_04_06_06_07_timestream.nc",
    ] {
        std::fs::write(tmp_dir.path().join(name), "").unwrap();
    }
    let config = tmp_dir.path().join("citlali_config.yaml");
    std::fs::write(&config, "mapmaking:\n  pixel_size_arcsec: 1\n").unwrap();

    #[rustfmt::skip]
    let cmd = tolteca()
        .args([
            "reduce", "--dry-run",
            "--root", &tmp_dir.path().display().to_string(),
            "--config", &config.display().to_string(),
            // Not on the PATH, but a dry run doesn't look for it.
            "--citlali", "/definitely/not/citlali",
            "toltec*_000100_*.nc",
        ])
        .ok();
    assert!(cmd.is_ok(), "{:?}", cmd.err());
    let (stdout, _) = get_cmd_output(cmd);
    assert!(stdout.contains("Reducing 2 files"), "{stdout}");
    assert!(stdout.contains("100_0_1"), "{stdout}");
    assert!(!stdout.contains("101_0_1"), "{stdout}");
    assert!(!tmp_dir.path().join("citlali.yaml").exists());
}

#[test]
fn test_reduce_missing_citlali() {
    let tmp_dir = TempDir::new().unwrap();
    std::fs::write(
        tmp_dir
            .path()
            .join("toltec0_000100_000_0001_2022_03_04_05_06_07_timestream.nc"),
        "",
    )
    .unwrap();

    #[rustfmt::skip]
    let cmd = tolteca()
        .args([
            "reduce",
            "--root", &tmp_dir.path().display().to_string(),
            "--citlali", "/definitely/not/citlali",
            "--output-dir", &tmp_dir.path().join("out").display().to_string(),
            "toltec0_*.nc",
        ])
        .ok();
    assert!(cmd.is_err());
    let (_, stderr) = get_cmd_output(cmd);
    assert!(stderr.contains("citlali"), "{stderr}");
}
