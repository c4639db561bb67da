// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Command-line interface code. More specific options for `tolteca`
//! subcommands are contained in modules.
//!
//! Only 3 things should be public in this module: `Tolteca`, `Tolteca::run`,
//! and `ToltecaError`.

mod classify;
mod common;
mod coverage;
mod error;
mod reduce;
mod setup;
mod simulate;
#[cfg(test)]
mod tests;

pub(crate) use common::Warn;
pub use error::ToltecaError;

use std::{
    fs::File,
    io::Write,
    path::Path,
    sync::Mutex,
};

use clap::{AppSettings, Args, Parser, Subcommand};
use log::info;

use crate::PROGRESS_BARS;

// Add build-time information from the "built" crate.
include!(concat!(env!("OUT_DIR"), "/built.rs"));

lazy_static::lazy_static! {
    /// When set, log messages are also written here.
    static ref LOG_FILE: Mutex<Option<File>> = Mutex::new(None);
}

#[derive(Debug, Parser)]
#[clap(
    version,
    author,
    about = r#"Pipeline tools for the TolTEC camera on the Large Millimeter Telescope (LMT)
Simulate observations, plan coverage, classify data files and drive citlali."#
)]
#[clap(global_setting(AppSettings::DeriveDisplayOrder))]
#[clap(disable_help_subcommand = true)]
#[clap(infer_subcommands = true)]
#[clap(propagate_version = true)]
#[clap(infer_long_args = true)]
pub struct Tolteca {
    #[clap(flatten)]
    global_opts: GlobalArgs,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Debug, Args)]
struct GlobalArgs {
    /// Don't draw progress bars.
    #[clap(long)]
    #[clap(global = true)]
    no_progress_bars: bool,

    /// The verbosity of the program. Increase by specifying multiple times
    /// (e.g. -vv). The default is to print only high-level information.
    #[clap(short, long, parse(from_occurrences))]
    #[clap(global = true)]
    verbosity: u8,

    /// Only verify that arguments were correctly ingested and print out
    /// high-level information.
    #[clap(long)]
    #[clap(global = true)]
    dry_run: bool,
}

#[derive(Debug, Subcommand)]
#[clap(arg_required_else_help = true)]
enum Command {
    #[clap(alias = "simu")]
    #[clap(about = "Simulate a TolTEC observation from a config document.")]
    Simulate(simulate::SimulateArgs),

    #[clap(about = "Make a planning-mode coverage map of an observation, without simulating it.")]
    Coverage(coverage::CoverageArgs),

    #[clap(about = "Print the metadata that can be read from the names of data files.")]
    Classify(classify::ClassifyArgs),

    #[clap(about = "Reduce data files with citlali.")]
    Reduce(reduce::ReduceArgs),

    #[clap(about = "Set up a pipeline/simulation workdir.")]
    Setup(setup::SetupArgs),
}

impl Tolteca {
    pub fn run(self) -> Result<(), ToltecaError> {
        // Set up logging.
        let GlobalArgs {
            verbosity,
            dry_run,
            no_progress_bars,
        } = self.global_opts;
        setup_logging(verbosity).expect("Failed to initialise logging.");
        // Enable progress bars if the user didn't say "no progress bars".
        if !no_progress_bars {
            PROGRESS_BARS.store(true);
        }

        // Print the version of tolteca and its build-time information.
        let sub_command = match &self.command {
            Command::Simulate(_) => "simulate",
            Command::Coverage(_) => "coverage",
            Command::Classify(_) => "classify",
            Command::Reduce(_) => "reduce",
            Command::Setup(_) => "setup",
        };
        info!("tolteca {} {}", sub_command, env!("CARGO_PKG_VERSION"));
        display_build_info();

        match self.command {
            Command::Simulate(args) => args.run(dry_run)?,
            Command::Coverage(args) => args.run(dry_run)?,
            Command::Classify(args) => args.run()?,
            Command::Reduce(args) => args.run(dry_run)?,
            Command::Setup(args) => args.run(dry_run)?,
        }

        info!("tolteca {} complete.", sub_command);
        Ok(())
    }
}

/// Writes log messages to stdout and, if one has been opened with
/// [`log_to_file`], a log file.
struct LogTee;

impl Write for LogTee {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        std::io::stdout().write_all(buf)?;
        if let Some(f) = LOG_FILE.lock().unwrap().as_mut() {
            f.write_all(buf)?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        std::io::stdout().flush()?;
        if let Some(f) = LOG_FILE.lock().unwrap().as_mut() {
            f.flush()?;
        }
        Ok(())
    }
}

/// Also write all subsequent log messages to `path`.
fn log_to_file(path: &Path) -> std::io::Result<()> {
    let f = File::create(path)?;
    *LOG_FILE.lock().unwrap() = Some(f);
    info!("Logging to {}", path.display());
    Ok(())
}

/// Activate a logger. All log messages are put onto `stdout` (and the log file,
/// if one is opened later). Source code lines are displayed in log messages
/// when verbosity >= 3.
fn setup_logging(verbosity: u8) -> Result<(), log::SetLoggerError> {
    let mut builder = env_logger::Builder::from_default_env();
    builder.target(env_logger::Target::Pipe(Box::new(LogTee)));
    builder.format_target(false);
    match verbosity {
        0 => builder.filter_level(log::LevelFilter::Info),
        1 => builder.filter_level(log::LevelFilter::Debug),
        2 => builder.filter_level(log::LevelFilter::Trace),
        _ => {
            builder.filter_level(log::LevelFilter::Trace);
            builder.format(|buf, record| {
                let timestamp = buf.timestamp();
                let level = record.level();
                let target = record.target();
                let line = record.line().unwrap_or(0);
                let message = record.args();

                writeln!(buf, "[{timestamp} {level} {target}:{line}] {message}")
            })
        }
    };
    builder.try_init()
}

/// Write many info-level log lines of how this executable was compiled.
fn display_build_info() {
    let dirty = match GIT_DIRTY {
        Some(true) => " (dirty)",
        _ => "",
    };
    match GIT_COMMIT_HASH_SHORT {
        Some(hash) => {
            info!("Compiled on git commit hash: {hash}{dirty}");
        }
        None => info!("Compiled on git commit hash: <no git info>"),
    }
    if let Some(hr) = GIT_HEAD_REF {
        info!("            git head ref: {}", hr);
    }
    info!("            {}", BUILT_TIME_UTC);
    info!("         with compiler {}", RUSTC_VERSION);
    info!("");
}
