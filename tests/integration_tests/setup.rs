// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use tempfile::TempDir;

use crate::{get_cmd_output, tolteca};

#[test]
fn test_setup_workdir() {
    let tmp_dir = TempDir::new().unwrap();
    let workdir = tmp_dir.path().join("job");

    let cmd = tolteca()
        .args(["setup", &workdir.display().to_string()])
        .ok();
    assert!(cmd.is_ok(), "{:?}", cmd.err());
    let contents = std::fs::read_to_string(workdir.join("50_setup.yaml")).unwrap();
    assert!(contents.contains("jobkey: job"), "{contents}");
    assert!(contents.contains("prog: tolteca"), "{contents}");

    // Not empty any more.
    let cmd = tolteca()
        .args(["setup", &workdir.display().to_string()])
        .ok();
    assert!(cmd.is_err());
    let (_, stderr) = get_cmd_output(cmd);
    assert!(stderr.contains("--force"), "{stderr}");

    let cmd = tolteca()
        .args(["setup", "--force", &workdir.display().to_string()])
        .ok();
    assert!(cmd.is_ok(), "{:?}", cmd.err());
    assert!(workdir.join("50_setup.yaml.bak").exists());
}

#[test]
fn test_setup_dry_run() {
    let tmp_dir = TempDir::new().unwrap();
    let workdir = tmp_dir.path().join("job");
    let cmd = tolteca()
        .args(["setup", "--dry-run", &workdir.display().to_string()])
        .ok();
    assert!(cmd.is_ok(), "{:?}", cmd.err());
    assert!(!workdir.exists());
}
