// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use tempfile::TempDir;

use crate::{get_cmd_output, tolteca};

#[test]
fn test_classify_names() {
    #[rustfmt::skip]
    let cmd = tolteca()
        .args([
            "classify", "--names",
            "toltec3_012345_001_0002_2020_02_29_12_34_56.nc",
            "not_a_data_file.txt",
        ])
        .ok();
    assert!(cmd.is_ok(), "{:?}", cmd.err());
    let (stdout, _) = get_cmd_output(cmd);
    assert!(stdout.contains("Classified 1 files"), "{stdout}");
    assert!(stdout.contains("obsnum=12345"), "{stdout}");
    assert!(stdout.contains("not_a_data_file.txt: not a recognised data file"));
}

#[test]
fn test_classify_files_on_disk() {
    let tmp_dir = TempDir::new().unwrap();
    let data_dir = tmp_dir.path().join("toltec/tcs/toltec0");
    std::fs::create_dir_all(&data_dir).unwrap();
    for name in [
        "toltec0_000100_000_0001_2022_03_04_05_06_07_timestream.nc",
        "toltec0_000101_000_0001_2022_03_04_06_06_07_timestream.nc",
        "README.txt",
    ] {
        std::fs::write(data_dir.join(name), "").unwrap();
    }

    #[rustfmt::skip]
    let cmd = tolteca()
        .args([
            "classify",
            "--root", &tmp_dir.path().display().to_string(),
            "toltec/tcs/toltec0/*",
        ])
        .ok();
    assert!(cmd.is_ok(), "{:?}", cmd.err());
    let (stdout, _) = get_cmd_output(cmd);
    assert!(stdout.contains("Classified 2 files"), "{stdout}");
    assert!(stdout.contains("obsnum=100"));
    assert!(stdout.contains("obsnum=101"));
}

#[test]
fn test_classify_master_needs_runtime_links() {
    let cmd = tolteca()
        .args(["classify", "--master", "ics", "foo.nc"])
        .ok();
    assert!(cmd.is_err());
}
