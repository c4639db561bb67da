// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Simulate an observation.

use std::path::PathBuf;

use clap::Parser;
use console::style;
use log::info;

use super::{
    common::{display_warnings, ConfigArgs, InfoPrinter},
    coverage::{coverage_filename, export_coverage},
    log_to_file, ToltecaError,
};
use crate::{
    config::{ExportConfig, PlotConfig, SimuConfig},
    io::write::create_output_dir,
    plot::plot_trajectory,
    simulate::{FitsTodSink, Simulation},
};

/// The name of the config snapshot written into the job directory.
const CONFIG_SNAPSHOT_FILENAME: &str = "tolteca.yaml";

/// The name of the log file written into the job directory.
const LOG_FILENAME: &str = "simu.log";

#[derive(Parser, Debug, Clone, Default)]
pub(super) struct SimulateArgs {
    #[clap(flatten)]
    config: ConfigArgs,

    /// The directory in which the job directory (named after the jobkey) is
    /// made. Default: the current directory
    #[clap(short, long, parse(from_os_str))]
    output_dir: Option<PathBuf>,

    /// Only make the plots; don't simulate anything.
    #[clap(long)]
    plot_only: bool,
}

impl SimulateArgs {
    pub(super) fn run(self, dry_run: bool) -> Result<(), ToltecaError> {
        let mut config = self.config.load()?;
        if self.plot_only {
            config.plot_only = true;
        }
        let mut sim = Simulation::new(&config)?;
        let job_dir = self
            .output_dir
            .unwrap_or_else(|| PathBuf::from("."))
            .join(&config.jobkey);
        display_simulation(&config, &sim, &job_dir);
        display_warnings();

        if dry_run {
            info!("Dry run -- exiting now.");
            return Ok(());
        }

        create_output_dir(&job_dir)?;
        log_to_file(&job_dir.join(LOG_FILENAME))?;
        let snapshot = job_dir.join(CONFIG_SNAPSHOT_FILENAME);
        std::fs::write(&snapshot, config.to_yaml()?)?;
        info!("Wrote the config to {}", snapshot.display());

        for plot in &config.plots {
            match plot {
                PlotConfig::Trajectory(p) => {
                    let path = job_dir.join(
                        p.filename
                            .clone()
                            .unwrap_or_else(|| format!("{}_trajectory.png", config.jobkey)),
                    );
                    let trajectory = sim.mapping_trajectory()?;
                    plot_trajectory(
                        &path,
                        &trajectory,
                        &format!("{} {} trajectory", config.jobkey, sim.mapping.name()),
                    )?;
                    info!("Plotted the trajectory to {}", path.display());
                }
            }
        }
        if config.plot_only {
            info!("plot_only is set; not simulating");
            return Ok(());
        }

        for export in &config.exports {
            match export {
                ExportConfig::Coverage(c) => {
                    let path = job_dir.join(coverage_filename(&config.jobkey, c));
                    export_coverage(&sim, c, &path)?;
                }
            }
        }

        let mut sink = FitsTodSink::new(&job_dir, &config.jobkey);
        let summary = sim.run(&mut sink)?;
        info!(
            "Simulated {} samples ({} s) in {} chunks to {}",
            summary.n_times,
            summary.t_exp,
            summary.n_chunks,
            style(sink.path().display()).bold()
        );
        Ok(())
    }
}

fn display_simulation(config: &SimuConfig, sim: &Simulation, job_dir: &std::path::Path) {
    let mut printer = InfoPrinter::new(format!("Simulating {}", config.jobkey).into());
    printer.push_line(format!("Output directory: {}", job_dir.display()).into());
    printer.push_line(
        format!(
            "Instrument: {} {} with {} detectors",
            sim.instrument.name,
            sim.instrument.array_name,
            sim.instrument.detectors.len()
        )
        .into(),
    );
    let target = sim.mapping.target();
    printer.push_block(vec![
        format!(
            "Mapping: {} around RA {:.6} deg, Dec {:.6} deg",
            sim.mapping.name(),
            target.ra,
            target.dec
        )
        .into(),
        format!("Pattern time: {:.3} s", sim.mapping.t_pattern()).into(),
    ]);
    let chunk_len = config.perf_params.chunk_len;
    printer.push_block(vec![
        format!("Exposure time: {:.3} s", sim.t_exp()).into(),
        format!(
            "Sampling: {} (mapping), {} (detectors)",
            config.obs_params.f_smp_mapping, config.obs_params.f_smp_probing
        )
        .into(),
        format!("Chunk length: {chunk_len}").into(),
    ]);
    let sources: Vec<&str> = sim.sources.iter().map(|s| s.name()).collect();
    printer.push_line(format!("Sources: [{}]", sources.join(", ")).into());
    if !config.plots.is_empty() || !config.exports.is_empty() {
        printer.push_line(
            format!(
                "{} plots, {} exports{}",
                config.plots.len(),
                config.exports.len(),
                if config.plot_only { " (plots only)" } else { "" }
            )
            .into(),
        );
    }
    printer.display();
}
