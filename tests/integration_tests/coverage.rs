// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use fitsio::FitsFile;
use tempfile::TempDir;

use crate::{get_cmd_output, tolteca, write_simu_config};

#[test]
fn test_coverage_depth_map() {
    let tmp_dir = TempDir::new().unwrap();
    let config = write_simu_config(tmp_dir.path());
    let output = tmp_dir.path().join("depth.fits");

    #[rustfmt::skip]
    let cmd = tolteca()
        .args([
            "coverage",
            &config.display().to_string(),
            "--unit", "depth",
            "--nefd", "2.5",
            "--output", &output.display().to_string(),
        ])
        .ok();
    assert!(cmd.is_ok(), "{:?}", cmd.err());
    let (stdout, _) = get_cmd_output(cmd);
    assert!(stdout.contains("Median depth"), "{stdout}");
    // There's no start time, so the default altitude is used.
    assert!(stdout.contains("mean altitude of 60 deg"), "{stdout}");

    let mut fptr = FitsFile::open(&output).unwrap();
    let hdu = fptr.hdu("COVERAGE").unwrap();
    let bunit: String = hdu.read_key(&mut fptr, "BUNIT").unwrap();
    assert_eq!(bunit, "mJy / beam");
}

#[test]
fn test_coverage_depth_needs_nefd() {
    let tmp_dir = TempDir::new().unwrap();
    let config = write_simu_config(tmp_dir.path());

    let cmd = tolteca()
        .args(["coverage", &config.display().to_string(), "--unit", "depth"])
        .ok();
    assert!(cmd.is_err());
    let (_, stderr) = get_cmd_output(cmd);
    assert!(stderr.contains("NEFD"), "{stderr}");
}
