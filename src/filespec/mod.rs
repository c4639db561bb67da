// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Code to recognise TolTEC data files by name.
//!
//! A filename is tested against an ordered list of file specs; the first
//! matching spec converts the captured fields into an [`ObservationFile`] and
//! then applies its post-processing. Support for a new instrument is added by
//! appending to [`FILE_SPECS`]; existing entries are never reordered.


use std::{
    collections::HashMap,
    fmt::Display,
    path::{Path, PathBuf},
};

use chrono::{NaiveDate, NaiveDateTime};
use log::{debug, trace};
use regex::{Captures, Regex, RegexBuilder};
use thiserror::Error;

use crate::io::{get_all_matches_from_glob, GlobError};

lazy_static::lazy_static! {
    static ref RE_TOLTEC: Regex = RegexBuilder::new(
        r"^(?P<interface>(?P<instru>toltec)(?P<nwid>\d+))_(?P<obsid>\d+)_(?P<subobsid>\d+)_(?P<scanid>\d+)_(?P<ut>\d{4}_\d{2}_\d{2}(?:_\d{2}_\d{2}_\d{2}))(?:_(?P<kindstr>[^/.]+))?\.(?P<fileext>.+)$"
    ).build().unwrap();

    static ref RE_WYATT: Regex = RegexBuilder::new(
        r"^(?P<interface>(?P<instru>wyatt))_(?P<ut>\d{4}-\d{2}-\d{2})_(?P<obsid>\d+)_(?P<subobsid>\d+)_(?P<scanid>\d+)(?:_(?P<kindstr>[^/.]+))?\.(?P<fileext>.+)$"
    ).build().unwrap();

    /// All known file specs, tried in order.
    static ref FILE_SPECS: [FileSpec; 2] = [
        FileSpec {
            name: "toltec",
            pattern: &RE_TOLTEC,
            ut_format: UtFormat::DateTime("%Y_%m_%d_%H_%M_%S"),
            post: post_toltec,
        },
        FileSpec {
            name: "wyatt",
            pattern: &RE_WYATT,
            ut_format: UtFormat::Date("%Y-%m-%d"),
            post: |_| (),
        },
    ];
}

/// Patterns of the links maintained by the data acquisition system to the
/// files currently being written.
const RUNTIME_LINK_PATTERNS: [&str; 2] = ["toltec[0-9].nc", "toltec[0-9][0-9].nc"];

/// How the `ut` field of a file name is written.
#[derive(Debug, Clone, Copy)]
enum UtFormat {
    /// A full timestamp.
    DateTime(&'static str),

    /// A date; the time is midnight.
    Date(&'static str),
}

impl UtFormat {
    fn parse(self, s: &str) -> Option<NaiveDateTime> {
        match self {
            UtFormat::DateTime(f) => NaiveDateTime::parse_from_str(s, f).ok(),
            UtFormat::Date(f) => NaiveDate::parse_from_str(s, f)
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0)),
        }
    }
}

struct FileSpec {
    name: &'static str,
    pattern: &'static Regex,
    ut_format: UtFormat,
    post: fn(&mut ObservationFile),
}

impl FileSpec {
    fn info_from_filename(&self, filename: &str) -> Option<ObservationFile> {
        let caps = self.pattern.captures(filename)?;
        let info = self.dispatch(&caps);
        if info.is_none() {
            // The pattern matched, but a field couldn't be converted, e.g. an
            // impossible date.
            debug!(
                "'{filename}' matched the {} file spec but has invalid fields",
                self.name
            );
        }
        let mut info = info?;
        (self.post)(&mut info);
        Some(info)
    }

    /// Convert captured fields into their types.
    fn dispatch(&self, caps: &Captures) -> Option<ObservationFile> {
        let text = |name: &str| caps.name(name).map(|m| m.as_str().to_string());
        Some(ObservationFile {
            source: PathBuf::new(),
            interface: text("interface")?,
            instru: text("instru")?,
            nwid: match caps.name("nwid") {
                Some(m) => Some(parse_number("nwid", m.as_str())?),
                None => None,
            },
            obsnum: parse_number("obsid", caps.name("obsid")?.as_str())?,
            subobsnum: parse_number("subobsid", caps.name("subobsid")?.as_str())?,
            scannum: parse_number("scanid", caps.name("scanid")?.as_str())?,
            ut: self.ut_format.parse(caps.name("ut")?.as_str())?,
            kindstr: text("kindstr"),
            fileext: text("fileext")?,
            master: None,
            repeat: 0,
        })
    }
}

/// Parse a run of digits captured from a file name. Numbers too big for their
/// field (`u32` for the network index, `u64` otherwise) make the file name
/// unrecognisable.
fn parse_number<T: std::str::FromStr>(field: &str, digits: &str) -> Option<T> {
    let n = digits.parse().ok();
    if n.is_none() {
        debug!("{field} '{digits}' is out of range");
    }
    n
}

fn post_toltec(info: &mut ObservationFile) {
    if info.kindstr.is_none() {
        info.kindstr = Some("timestream".to_string());
    }
    if !info.fileext.eq_ignore_ascii_case("nc") {
        info.kindstr = Some("ancillary".to_string());
    }
}

/// Metadata of a single data file, extracted from its name and location.
#[derive(Debug, Clone, PartialEq)]
pub struct ObservationFile {
    /// Where the file lives. When built by [`classify`], this is the bare file
    /// name.
    pub source: PathBuf,

    /// The data interface that wrote the file, e.g. "toltec3".
    pub interface: String,

    /// The instrument, e.g. "toltec".
    pub instru: String,

    /// The network (readout) index, for interfaces that have one.
    pub nwid: Option<u32>,

    pub obsnum: u64,
    pub subobsnum: u64,
    pub scannum: u64,

    /// UT date (and time) of the observation.
    pub ut: NaiveDateTime,

    /// The kind of data in the file, e.g. "timestream" or "tune".
    pub kindstr: Option<String>,

    /// The file extension (without the leading dot).
    pub fileext: String,

    /// The name of the master (the machine or directory owning the data).
    pub master: Option<String>,

    /// The occurrence index of this file among files with the same identity
    /// in a dataset. Zero unless set by [`DataFileStore::index`].
    pub repeat: u32,
}

/// The key used to group files belonging to the same observation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObsGroupKey {
    pub obsnum: u64,
    pub subobsnum: u64,
    pub scannum: u64,
    pub master: Option<String>,
    pub repeat: u32,
}

impl ObservationFile {
    pub fn group_key(&self) -> ObsGroupKey {
        ObsGroupKey {
            obsnum: self.obsnum,
            subobsnum: self.subobsnum,
            scannum: self.scannum,
            master: self.master.clone(),
            repeat: self.repeat,
        }
    }
}

impl Display for ObservationFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} obsnum={} subobsnum={} scannum={} ut={} kind={} ext={}",
            self.interface,
            self.obsnum,
            self.subobsnum,
            self.scannum,
            self.ut.format("%Y-%m-%dT%H:%M:%S"),
            self.kindstr.as_deref().unwrap_or("-"),
            self.fileext,
        )?;
        if let Some(master) = &self.master {
            write!(f, " master={master}")?;
        }
        if self.repeat > 0 {
            write!(f, " repeat={}", self.repeat)?;
        }
        Ok(())
    }
}

/// Recognise a file name. `None` is returned if no file spec matches; this is
/// not an error. A name whose numeric fields overflow their types (e.g. an
/// obsnum above `u64::MAX`) is not recognised either.
pub fn classify(filename: &str) -> Option<ObservationFile> {
    let info = FILE_SPECS
        .iter()
        .find_map(|spec| spec.info_from_filename(filename));
    let mut info = info?;
    info.source = PathBuf::from(filename);
    Some(info)
}

/// Recognise a file from its path. The directory containing the file names its
/// master; if that directory is named after the file's interface, the master
/// is one level further up. If `resolve` is true, a symbolic link is followed
/// before anything else is done.
pub fn info_from_path<P: AsRef<Path>>(path: P, resolve: bool) -> Option<ObservationFile> {
    let mut path = path.as_ref().to_path_buf();
    if resolve && path.is_symlink() {
        match path.canonicalize() {
            Ok(p) => path = p,
            Err(e) => debug!("Couldn't resolve the link {}: {e}", path.display()),
        }
    }

    let filename = path.file_name()?.to_str()?;
    let mut info = classify(filename)?;
    let dir_name = |p: Option<&Path>| {
        p.and_then(|p| p.file_name())
            .and_then(|n| n.to_str())
            .map(|n| n.to_string())
    };
    let parent = path.parent();
    let mut master = dir_name(parent);
    if master.as_deref() == Some(info.interface.as_str()) {
        master = dir_name(parent.and_then(|p| p.parent()));
    }
    info.master = master;
    info.source = path;
    Some(info)
}

/// Find the runtime links in `path`, or below `master`'s directory when it's
/// given (e.g. `path/<master>/toltec3/toltec3.nc`). An empty master looks in
/// the per-interface subdirectories of `path`.
fn runtime_datafile_links_in(path: &Path, master: Option<&str>) -> Result<Vec<PathBuf>, GlobError> {
    let mut files = vec![];
    for pattern in RUNTIME_LINK_PATTERNS {
        let pattern = match master {
            Some(master) => {
                let stem = pattern.split('.').next().unwrap_or(pattern);
                path.join(master).join(stem).join(pattern)
            }
            None => path.join(pattern),
        };
        trace!("Looking for runtime links with {}", pattern.display());
        files.extend(get_all_matches_from_glob(&pattern.display().to_string())?);
    }
    Ok(files)
}

/// A tree of data files on disk.
#[derive(Debug, Clone)]
pub struct DataFileStore {
    rootpath: PathBuf,
}

impl DataFileStore {
    pub fn new<P: AsRef<Path>>(rootpath: P) -> Self {
        Self {
            rootpath: normalize_path(rootpath.as_ref()),
        }
    }

    pub fn rootpath(&self) -> &Path {
        &self.rootpath
    }

    /// Get the runtime links of the store. If `master` isn't given, the links
    /// are looked for directly in the root, then in per-interface
    /// subdirectories of the root, then below the root's parent using the
    /// root's name as the master.
    pub fn runtime_datafile_links(
        &self,
        master: Option<&str>,
    ) -> Result<Vec<PathBuf>, FileSpecError> {
        if let Some(master) = master {
            return Ok(runtime_datafile_links_in(&self.rootpath, Some(master))?);
        }

        let mut candidates = vec![(self.rootpath.as_path(), None), (self.rootpath.as_path(), Some(""))];
        if let (Some(parent), Some(name)) = (
            self.rootpath.parent(),
            self.rootpath.file_name().and_then(|n| n.to_str()),
        ) {
            candidates.push((parent, Some(name)));
        }
        for (path, master) in candidates {
            let links = runtime_datafile_links_in(path, master)?;
            if !links.is_empty() {
                return Ok(links);
            }
        }
        Ok(vec![])
    }

    /// Classify files, given either as paths relative to the root (or
    /// absolute) or as glob patterns. Files that can't be classified are
    /// skipped. Files sharing the same identity are given increasing `repeat`
    /// values in the order they're found.
    pub fn index<S: AsRef<str>>(&self, items: &[S]) -> Result<Vec<ObservationFile>, FileSpecError> {
        let mut paths = vec![];
        for item in items {
            let item = item.as_ref();
            let pb = self.rootpath.join(item);
            if pb.exists() {
                paths.push(pb);
                continue;
            }
            // Maybe it's a glob.
            let matches = get_all_matches_from_glob(&pb.display().to_string())?;
            if matches.is_empty() {
                return Err(FileSpecError::DoesNotExist(pb));
            }
            paths.extend(matches);
        }

        Ok(index_files(paths))
    }
}

/// Classify paths and assign `repeat` values.
pub fn index_files<I: IntoIterator<Item = PathBuf>>(paths: I) -> Vec<ObservationFile> {
    let mut seen: HashMap<(String, u64, u64, u64, Option<String>, Option<String>, String), u32> =
        HashMap::new();
    let mut files = vec![];
    for path in paths {
        let mut info = match info_from_path(&path, true) {
            Some(i) => i,
            None => {
                debug!("Ignoring unrecognised file {}", path.display());
                continue;
            }
        };
        let count = seen
            .entry((
                info.interface.clone(),
                info.obsnum,
                info.subobsnum,
                info.scannum,
                info.master.clone(),
                info.kindstr.clone(),
                info.fileext.clone(),
            ))
            .or_insert(0);
        info.repeat = *count;
        *count += 1;
        files.push(info);
    }
    files
}

fn normalize_path(p: &Path) -> PathBuf {
    let expanded = match (p.strip_prefix("~"), std::env::var_os("HOME")) {
        (Ok(rest), Some(home)) => PathBuf::from(home).join(rest),
        _ => p.to_path_buf(),
    };
    if expanded.is_absolute() {
        expanded
    } else {
        match std::env::current_dir() {
            Ok(cwd) => cwd.join(expanded),
            Err(e) => {
                log::error!("unable to resolve path {}: {e}", p.display());
                expanded
            }
        }
    }
}

#[derive(Error, Debug)]
pub enum FileSpecError {
    #[error("'{0}' doesn't exist and doesn't match any files as a glob")]
    DoesNotExist(PathBuf),

    #[error(transparent)]
    Glob(#[from] GlobError),
}
