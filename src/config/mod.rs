// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Simulator configuration.

Config documents may be YAML, TOML or JSON. They are all read into YAML
values, deep-merged in the order given (later documents win), then any
`--set key.path=value` overrides are merged on top before the whole thing is
validated into a [`SimuConfig`].
 */

mod error;
mod quantity;

pub use error::ConfigError;
pub use quantity::{Angle, AngularFreq, Freq, Speed, Time};

use std::{fs::File, io::Read, path::Path, str::FromStr};

use itertools::Itertools;
use log::{debug, trace};
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter, EnumString};

use crate::{
    constants::*, coverage::CoverageUnit, instrument::InstrumentConfig, mapping::MappingConfig,
    sources::SourceConfig,
};

/// Everything for the simulator may be nested under this key.
pub const SIMU_CONFIG_KEY: &str = "simu";

/// The key of the workdir info written by `tolteca setup`.
pub const SETUP_CONFIG_KEY: &str = "setup";

/// Top-level sections of config documents that aren't for the simulator.
const OTHER_SECTION_KEYS: [&str; 2] = [SETUP_CONFIG_KEY, "reduce"];

lazy_static::lazy_static! {
    pub static ref ARG_FILE_TYPES_COMMA_SEPARATED: String = ArgFileTypes::iter().join(", ");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter, EnumString)]
pub enum ArgFileTypes {
    #[strum(serialize = "yaml", serialize = "yml")]
    Yaml,
    #[strum(serialize = "toml")]
    Toml,
    #[strum(serialize = "json")]
    Json,
}

/// The top-level simulator config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SimuConfig {
    /// Names the output directory.
    pub jobkey: String,

    pub instrument: InstrumentConfig,

    pub mapping: MappingConfig,

    #[serde(default)]
    pub obs_params: ObsParams,

    #[serde(default)]
    pub sources: Vec<SourceConfig>,

    #[serde(default)]
    pub perf_params: PerfParams,

    #[serde(default)]
    pub plots: Vec<PlotConfig>,

    #[serde(default)]
    pub exports: Vec<ExportConfig>,

    /// Only make the plots in `plots`.
    #[serde(default)]
    pub plot_only: bool,
}

fn default_f_smp_mapping() -> Freq {
    Freq(DEFAULT_F_SMP_MAPPING)
}

fn default_f_smp_probing() -> Freq {
    Freq(DEFAULT_F_SMP_PROBING)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ObsParams {
    /// The duration of the observation. If not given, the mapping pattern
    /// time is used.
    #[serde(default)]
    pub t_exp: Option<Time>,

    /// The sampling frequency used to evaluate mapping models.
    #[serde(default = "default_f_smp_mapping")]
    pub f_smp_mapping: Freq,

    /// The sampling frequency of the detector signals.
    #[serde(default = "default_f_smp_probing")]
    pub f_smp_probing: Freq,
}

impl Default for ObsParams {
    fn default() -> Self {
        ObsParams {
            t_exp: None,
            f_smp_mapping: default_f_smp_mapping(),
            f_smp_probing: default_f_smp_probing(),
        }
    }
}

fn default_chunk_len() -> Time {
    Time(DEFAULT_CHUNK_LEN)
}

fn default_catalog_model_render_pixel_size() -> Angle {
    Angle(DEFAULT_CATALOG_MODEL_RENDER_PIXEL_SIZE / 3600.0)
}

fn default_mapping_erfa_interp_len() -> Time {
    Time(DEFAULT_MAPPING_ERFA_INTERP_LEN)
}

fn default_atm_eval_interp_alt_step() -> Angle {
    Angle(DEFAULT_ATM_EVAL_INTERP_ALT_STEP / 60.0)
}

fn default_pre_run_setup_time_grid_size() -> usize {
    DEFAULT_PRE_RUN_SETUP_TIME_GRID_SIZE
}

fn default_anim_frame_rate() -> Time {
    Time(DEFAULT_ANIM_FRAME_RATE)
}

/// Knobs that trade accuracy for speed. None of these change what is being
/// simulated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PerfParams {
    /// The length of the time chunks the simulation is split into.
    #[serde(default = "default_chunk_len")]
    pub chunk_len: Time,

    #[serde(default = "default_catalog_model_render_pixel_size")]
    pub catalog_model_render_pixel_size: Angle,

    /// If given, mapping models are evaluated on a grid with this spacing
    /// and interpolated. Otherwise the grid spacing is `1 / f_smp_mapping`.
    #[serde(default)]
    pub mapping_eval_interp_len: Option<Time>,

    #[serde(default = "default_mapping_erfa_interp_len")]
    pub mapping_erfa_interp_len: Time,

    #[serde(default = "default_atm_eval_interp_alt_step")]
    pub atm_eval_interp_alt_step: Angle,

    /// The size of the coarse time grid handed to models before the run.
    #[serde(default = "default_pre_run_setup_time_grid_size")]
    pub pre_run_setup_time_grid_size: usize,

    #[serde(default = "default_anim_frame_rate")]
    pub anim_frame_rate: Time,
}

impl Default for PerfParams {
    fn default() -> Self {
        PerfParams {
            chunk_len: default_chunk_len(),
            catalog_model_render_pixel_size: default_catalog_model_render_pixel_size(),
            mapping_eval_interp_len: None,
            mapping_erfa_interp_len: default_mapping_erfa_interp_len(),
            atm_eval_interp_alt_step: default_atm_eval_interp_alt_step(),
            pre_run_setup_time_grid_size: default_pre_run_setup_time_grid_size(),
            anim_frame_rate: default_anim_frame_rate(),
        }
    }
}

/// One entry of `plots`; the `type` key says which.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PlotConfig {
    /// The boresight trajectory on the sky.
    Trajectory(TrajectoryPlotConfig),
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TrajectoryPlotConfig {
    /// The file name, relative to the output directory. Defaults to
    /// `<jobkey>_trajectory.png`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
}

/// One entry of `exports`; the `type` key says which.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ExportConfig {
    /// A planning-mode coverage map.
    Coverage(CoverageExportConfig),
}

fn default_coverage_pixscale() -> Angle {
    Angle(DEFAULT_COVERAGE_PIXSCALE / 3600.0)
}

fn default_n_pix_max() -> usize {
    DEFAULT_COVERAGE_N_PIX_MAX
}

fn default_adaptive_pixscale_factor() -> f64 {
    DEFAULT_ADAPTIVE_PIXSCALE_FACTOR
}

fn default_sens_coeff() -> f64 {
    DEFAULT_SENS_COEFF
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CoverageExportConfig {
    #[serde(default)]
    pub unit: CoverageUnit,

    /// \[mJy s^1/2\]
    #[serde(default, rename = "nefd_mJy", skip_serializing_if = "Option::is_none")]
    pub nefd: Option<f64>,

    #[serde(default = "default_coverage_pixscale")]
    pub pixscale: Angle,

    #[serde(default = "default_n_pix_max")]
    pub n_pix_max: usize,

    #[serde(default = "default_adaptive_pixscale_factor")]
    pub adaptive_pixscale_factor: f64,

    #[serde(default = "default_sens_coeff")]
    pub sens_coeff: f64,

    /// The mean altitude of the target, used when the mapping has no start
    /// time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mean_alt: Option<Angle>,

    /// Defaults to `<jobkey>_coverage.fits`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
}

impl Default for CoverageExportConfig {
    fn default() -> Self {
        CoverageExportConfig {
            unit: CoverageUnit::default(),
            nefd: None,
            pixscale: default_coverage_pixscale(),
            n_pix_max: default_n_pix_max(),
            adaptive_pixscale_factor: default_adaptive_pixscale_factor(),
            sens_coeff: default_sens_coeff(),
            mean_alt: None,
            filename: None,
        }
    }
}

impl CoverageExportConfig {
    pub fn params(&self) -> crate::coverage::CoverageParams {
        crate::coverage::CoverageParams {
            pixscale: self.pixscale.value(),
            adaptive_pixscale_factor: self.adaptive_pixscale_factor,
            n_pix_max: self.n_pix_max,
            unit: self.unit,
            nefd: self.nefd,
            sens_coeff: self.sens_coeff,
        }
    }
}

impl SimuConfig {
    /// Merge `documents` in order, apply `overrides` (`key.path=value`) and
    /// validate the result.
    pub fn from_documents(documents: Vec<Value>, overrides: &[String]) -> Result<SimuConfig, ConfigError> {
        let mut merged = Value::Mapping(Mapping::new());
        let mut setup_jobkey = None;
        for doc in documents {
            if let Some(jobkey) = doc
                .get(SETUP_CONFIG_KEY)
                .and_then(|s| s.get("jobkey"))
                .and_then(Value::as_str)
            {
                setup_jobkey = Some(jobkey.to_string());
            }
            merge(&mut merged, unnest(doc));
        }
        // The workdir's jobkey is used unless one is given.
        if let (Some(jobkey), Value::Mapping(m)) = (setup_jobkey, &mut merged) {
            if !m.contains_key("jobkey") {
                m.insert("jobkey".into(), jobkey.into());
            }
        }

        let mut override_doc = Value::Mapping(Mapping::new());
        for s in overrides {
            merge(&mut override_doc, parse_override(s)?);
        }
        if !overrides.is_empty() {
            debug!(
                "Config specified with command-line arguments:\n{}",
                serde_yaml::to_string(&override_doc).unwrap_or_default()
            );
        }
        merge(&mut merged, override_doc.clone());
        trace!(
            "Merged config:\n{}",
            serde_yaml::to_string(&merged).unwrap_or_default()
        );

        let config: SimuConfig = serde_yaml::from_value(merged).map_err(ConfigError::Invalid)?;

        // Anything given on the command line must survive validation;
        // otherwise it was silently ignored.
        let validated = serde_yaml::to_value(&config).map_err(ConfigError::Serialise)?;
        let mut ignored = vec![];
        find_ignored("", &override_doc, &validated, &mut ignored);
        if !ignored.is_empty() {
            return Err(ConfigError::IgnoredOverrides(ignored));
        }
        Ok(config)
    }

    /// Read, merge and validate config files.
    pub fn from_files<P: AsRef<Path>>(files: &[P], overrides: &[String]) -> Result<SimuConfig, ConfigError> {
        let documents = files
            .iter()
            .map(|f| read_config_file(f.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        SimuConfig::from_documents(documents, overrides)
    }

    /// The config as a YAML document, nested under `simu`.
    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        let mut top = Mapping::new();
        top.insert(
            Value::from(SIMU_CONFIG_KEY),
            serde_yaml::to_value(self).map_err(ConfigError::Serialise)?,
        );
        serde_yaml::to_string(&top).map_err(ConfigError::Serialise)
    }
}

/// Read a config file into a YAML value. The format comes from the file
/// extension.
pub fn read_config_file(file: &Path) -> Result<Value, ConfigError> {
    debug!("Attempting to parse config file {}", file.display());
    let file_type = file
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .and_then(|e| ArgFileTypes::from_str(&e).ok())
        .ok_or_else(|| ConfigError::UnknownFileType {
            file: file.display().to_string(),
            types: ARG_FILE_TYPES_COMMA_SEPARATED.clone(),
        })?;

    let mut contents = String::new();
    File::open(file)
        .and_then(|mut fh| fh.read_to_string(&mut contents))
        .map_err(|err| ConfigError::Read {
            file: file.display().to_string(),
            err,
        })?;
    let file = file.display().to_string();
    let value = match file_type {
        ArgFileTypes::Yaml => {
            debug!("Parsing yaml file...");
            serde_yaml::from_str(&contents).map_err(|err| ConfigError::Decode {
                file,
                file_type,
                err: err.to_string(),
            })?
        }
        ArgFileTypes::Toml => {
            debug!("Parsing toml file...");
            let toml: toml::Value = toml::from_str(&contents).map_err(|err| ConfigError::Decode {
                file: file.clone(),
                file_type,
                err: err.to_string(),
            })?;
            serde_yaml::to_value(toml).map_err(ConfigError::Serialise)?
        }
        ArgFileTypes::Json => {
            debug!("Parsing json file...");
            let json: serde_json::Value =
                serde_json::from_str(&contents).map_err(|err| ConfigError::Decode {
                    file: file.clone(),
                    file_type,
                    err: err.to_string(),
                })?;
            serde_yaml::to_value(json).map_err(ConfigError::Serialise)?
        }
    };
    Ok(value)
}

/// Take the content of the `simu` key if there is one. Sections belonging to
/// other subcommands are dropped.
fn unnest(doc: Value) -> Value {
    match doc {
        Value::Mapping(mut m) => match m.remove(SIMU_CONFIG_KEY) {
            Some(inner) => inner,
            None => {
                for key in OTHER_SECTION_KEYS {
                    m.remove(key);
                }
                Value::Mapping(m)
            }
        },
        // An empty document.
        Value::Null => Value::Mapping(Mapping::new()),
        other => other,
    }
}

/// Recursively merge `other` into `base`. Mappings are merged key by key;
/// anything else in `other` replaces what's in `base`.
pub fn merge(base: &mut Value, other: Value) {
    match (base, other) {
        (Value::Mapping(base), Value::Mapping(other)) => {
            for (k, v) in other {
                match base.get_mut(&k) {
                    Some(existing) => merge(existing, v),
                    None => {
                        base.insert(k, v);
                    }
                }
            }
        }
        (base, other) => *base = other,
    }
}

/// Turn `a.b.c=value` into `{a: {b: {c: value}}}`. The value is read as YAML,
/// so numbers and booleans keep their types; "10 s" stays a string.
pub fn parse_override(s: &str) -> Result<Value, ConfigError> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| ConfigError::BadOverride(s.to_string()))?;
    let key = key.trim();
    if key.is_empty() || key.split('.').any(|k| k.trim().is_empty()) {
        return Err(ConfigError::BadOverride(s.to_string()));
    }
    let value = value.trim();
    let mut value = if value.is_empty() {
        Value::Null
    } else {
        serde_yaml::from_str(value).unwrap_or_else(|_| Value::from(value))
    };
    for k in key.rsplit('.') {
        let mut m = Mapping::new();
        m.insert(Value::from(k.trim()), value);
        value = Value::Mapping(m);
    }
    Ok(value)
}

/// Collect the keys of `given` that don't appear in `validated`. A null value
/// clears its key, so it is honoured by the key's absence.
fn find_ignored(prefix: &str, given: &Value, validated: &Value, ignored: &mut Vec<String>) {
    if let (Value::Mapping(given), Value::Mapping(validated)) = (given, validated) {
        for (k, v) in given {
            let name = match k {
                Value::String(s) => s.clone(),
                other => serde_yaml::to_string(other)
                    .unwrap_or_default()
                    .trim()
                    .to_string(),
            };
            let path = if prefix.is_empty() {
                name
            } else {
                format!("{prefix}.{name}")
            };
            match validated.get(k) {
                Some(c) => find_ignored(&path, v, c, ignored),
                None if v.is_null() => (),
                None => ignored.push(path),
            }
        }
    }
}
