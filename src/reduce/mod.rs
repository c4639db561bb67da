// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Driving the `citlali` reduction engine.

Files are grouped into observations, written into a low-level `citlali.yaml`
along with the user's reduction config and handed to the `citlali`
executable. Its output is streamed to the log as it runs.
 */

mod error;
mod version;

pub use error::CitlaliError;
pub use version::{Version, VersionSpecifiers};

use std::{
    collections::BTreeMap,
    io::{BufRead, BufReader, Read},
    path::{Path, PathBuf},
    process::{Command, Stdio},
    thread,
};

use lazy_static::lazy_static;
use log::{debug, info, log, Level};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};

use crate::{
    filespec::{ObsGroupKey, ObservationFile},
    io::write::create_output_dir,
};

/// The name of the low-level config file written into the output directory.
pub const CITLALI_CONFIG_FILENAME: &str = "citlali.yaml";

lazy_static! {
    static ref VERSION_LINE: Regex =
        Regex::new(r"(?m)^citlali\s(?P<version>.+)\s\((?P<timestamp>.+)\)$").unwrap();
}

/// One input file as citlali sees it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputItem {
    pub filepath: PathBuf,
    pub meta: InputItemMeta,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputItemMeta {
    pub interface: String,
}

/// All of the files of one observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObsInput {
    pub meta: ObsInputMeta,
    pub data_items: Vec<InputItem>,
    pub cal_items: Vec<InputItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObsInputMeta {
    /// "{obsnum}_{subobsnum}_{scannum}"
    pub name: String,
}

/// Group `files` by observation. TolTEC and LMT files are data; APT tables
/// are calibration. Anything else is skipped.
pub fn resolve_inputs(files: &[ObservationFile]) -> Vec<ObsInput> {
    let mut groups: BTreeMap<ObsGroupKey, Vec<&ObservationFile>> = BTreeMap::new();
    for f in files {
        groups.entry(f.group_key()).or_default().push(f);
    }
    debug!("Collected {} observations", groups.len());

    groups
        .into_iter()
        .map(|(key, group)| {
            let name = format!("{}_{}_{}", key.obsnum, key.subobsnum, key.scannum);
            let mut data_items = vec![];
            let mut cal_items = vec![];
            for f in group {
                let bucket = if f.instru == "toltec" || f.interface == "lmt" {
                    &mut data_items
                } else if f.interface == "apt" {
                    &mut cal_items
                } else {
                    debug!("Not reducing {}", f.source.display());
                    continue;
                };
                bucket.push(InputItem {
                    filepath: f.source.clone(),
                    meta: InputItemMeta {
                        interface: f.interface.clone(),
                    },
                });
            }
            debug!(
                "Observation {name}: {} data items, {} cal items",
                data_items.len(),
                cal_items.len()
            );
            ObsInput {
                meta: ObsInputMeta { name },
                data_items,
                cal_items,
            }
        })
        .collect()
}

/// The config handed to citlali: `config` with `inputs` replaced and
/// `runtime.output_filepath` pointing at `outdir`.
pub fn low_level_config(
    config: &Value,
    inputs: &[ObsInput],
    outdir: &Path,
) -> Result<Value, CitlaliError> {
    let mut cfg = match config {
        Value::Mapping(m) => m.clone(),
        Value::Null => Mapping::new(),
        _ => return Err(CitlaliError::BadConfig),
    };
    cfg.insert("inputs".into(), serde_yaml::to_value(inputs)?);

    let runtime = cfg
        .entry("runtime".into())
        .or_insert_with(|| Value::Mapping(Mapping::new()));
    if runtime.is_null() {
        *runtime = Value::Mapping(Mapping::new());
    }
    let runtime = runtime.as_mapping_mut().ok_or(CitlaliError::BadConfig)?;
    let mut output_filepath = outdir.display().to_string();
    if !output_filepath.ends_with('/') {
        output_filepath.push('/');
    }
    runtime.insert("output_filepath".into(), output_filepath.into());
    Ok(Value::Mapping(cfg))
}

/// A `citlali` executable.
#[derive(Debug, Clone)]
pub struct Citlali {
    cmd: PathBuf,
    version: String,
}

impl Citlali {
    /// Find citlali, either at `binpath` (a file, or a directory containing
    /// `citlali`) or on the `PATH`. If `version_specifiers` are given, the
    /// version of citlali must satisfy them.
    pub fn new(
        binpath: Option<&Path>,
        version_specifiers: Option<&str>,
    ) -> Result<Citlali, CitlaliError> {
        let cmd = match binpath {
            Some(p) if p.is_dir() => p.join("citlali"),
            Some(p) => p.to_path_buf(),
            None => PathBuf::from("citlali"),
        };
        let version = query_version(&cmd);

        if let Some(specifiers) = version_specifiers {
            let specifiers: VersionSpecifiers = specifiers.parse()?;
            let found = version.as_deref().unwrap_or("unknown");
            let ok = match found.parse::<Version>() {
                Ok(v) => specifiers.contains(&v),
                Err(_) => false,
            };
            if !ok {
                return Err(CitlaliError::VersionMismatch {
                    specifiers: specifiers.to_string(),
                    found: found.to_string(),
                });
            }
        }

        let version = version?;
        debug!("citlali: {} (version {version})", cmd.display());
        Ok(Citlali { cmd, version })
    }

    pub fn cmd(&self) -> &Path {
        &self.cmd
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Reduce `files` with the high-level `config` into `outdir`. Returns the
    /// path to the low-level config that citlali was run with.
    pub fn reduce(
        &self,
        files: &[ObservationFile],
        config: &Value,
        outdir: &Path,
    ) -> Result<PathBuf, CitlaliError> {
        let inputs = resolve_inputs(files);
        if inputs.iter().all(|i| i.data_items.is_empty()) {
            return Err(CitlaliError::NoInputs);
        }
        create_output_dir(outdir)?;
        let cfg = low_level_config(config, &inputs, outdir)?;
        let cfg_path = outdir.join(CITLALI_CONFIG_FILENAME);
        let cfg_str = serde_yaml::to_string(&cfg)?;
        debug!("Resolved citlali config:\n{cfg_str}");
        std::fs::write(&cfg_path, cfg_str)?;

        info!(
            "Reducing {} observations with {} {}",
            inputs.len(),
            self.cmd.display(),
            cfg_path.display()
        );
        self.run(&cfg_path)?;
        Ok(cfg_path)
    }

    /// Run citlali on a config file, logging everything it prints.
    fn run(&self, cfg_path: &Path) -> Result<(), CitlaliError> {
        let spawn_err = |err| CitlaliError::Spawn {
            cmd: self.cmd.display().to_string(),
            err,
        };
        let mut child = Command::new(&self.cmd)
            .arg(cfg_path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(spawn_err)?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        thread::scope(|scope| {
            if let Some(stderr) = stderr {
                thread::Builder::new()
                    .name("citlali stderr".to_string())
                    .spawn_scoped(scope, || stream_lines(stderr, Level::Warn))
                    .expect("OS can create threads");
            }
            if let Some(stdout) = stdout {
                stream_lines(stdout, Level::Info);
            }
        });

        let status = child.wait()?;
        if status.success() {
            Ok(())
        } else {
            Err(CitlaliError::Failed(status))
        }
    }
}

fn stream_lines<R: Read>(r: R, level: Level) {
    for line in BufReader::new(r).lines().map_while(Result::ok) {
        log!(level, "citlali: {line}");
    }
}

/// Ask `cmd` for its version.
fn query_version(cmd: &Path) -> Result<String, CitlaliError> {
    let output = Command::new(cmd)
        .arg("--version")
        .stdin(Stdio::null())
        .output()
        .map_err(|err| CitlaliError::Spawn {
            cmd: cmd.display().to_string(),
            err,
        })?;
    // The version may be printed on either stream.
    let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
    text.push_str(&String::from_utf8_lossy(&output.stderr));
    parse_version_output(&text).ok_or_else(|| CitlaliError::NoVersion {
        cmd: cmd.display().to_string(),
        output: text.trim().to_string(),
    })
}

fn parse_version_output(text: &str) -> Option<String> {
    VERSION_LINE
        .captures(text)
        .map(|caps| caps["version"].to_string())
}
