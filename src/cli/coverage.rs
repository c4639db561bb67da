// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Planning-mode coverage maps.

use std::path::{Path, PathBuf};

use clap::Parser;
use console::style;
use log::info;

use super::{
    common::{display_warnings, ConfigArgs, InfoPrinter, Warn},
    ToltecaError,
};
use crate::{
    config::{Angle, CoverageExportConfig, ExportConfig, SimuConfig},
    constants::DEFAULT_MEAN_ALT_DEG,
    coverage::{write_coverage_fits, CoverageFitsInfo, CoverageUnit},
    simulate::Simulation,
};

#[derive(Parser, Debug, Clone, Default)]
pub(super) struct CoverageArgs {
    #[clap(flatten)]
    config: ConfigArgs,

    /// The output FITS file. Default: <jobkey>_coverage.fits
    #[clap(short, long, parse(from_os_str))]
    output: Option<PathBuf>,

    /// The unit of the output map: "time" [s / pix] or "depth" [mJy / beam].
    /// This overrides any coverage export in the config.
    #[clap(long)]
    unit: Option<CoverageUnit>,

    /// The noise-equivalent flux density [mJy s^1/2]. Needed for depth maps.
    #[clap(long)]
    nefd: Option<f64>,

    /// The pixel size, e.g. "3 arcsec". Default: 4 arcsec
    #[clap(long)]
    pixscale: Option<String>,
}

impl CoverageArgs {
    pub(super) fn run(self, dry_run: bool) -> Result<(), ToltecaError> {
        let config = self.config.load()?;
        let mut export = coverage_export(&config).cloned().unwrap_or_default();
        if let Some(unit) = self.unit {
            export.unit = unit;
        }
        if let Some(nefd) = self.nefd {
            export.nefd = Some(nefd);
        }
        if let Some(pixscale) = self.pixscale.as_deref() {
            export.pixscale = Angle::parse(pixscale)
                .map_err(|e| ToltecaError::Config(format!("Bad --pixscale: {e}")))?;
        }
        export.params().validate()?;

        let sim = Simulation::new(&config)?;
        let output = self
            .output
            .unwrap_or_else(|| PathBuf::from(coverage_filename(&config.jobkey, &export)));
        display_warnings();
        if dry_run {
            info!("Dry run -- exiting now.");
            return Ok(());
        }

        export_coverage(&sim, &export, &output)?;
        Ok(())
    }
}

/// The first coverage export of the config, if there is one.
pub(super) fn coverage_export(config: &SimuConfig) -> Option<&CoverageExportConfig> {
    config.exports.iter().find_map(|e| match e {
        ExportConfig::Coverage(c) => Some(c),
    })
}

pub(super) fn coverage_filename(jobkey: &str, export: &CoverageExportConfig) -> String {
    export
        .filename
        .clone()
        .unwrap_or_else(|| format!("{jobkey}_coverage.fits"))
}

/// Synthesize the coverage map of `sim`, log a summary of it and write it to
/// `path`.
pub(super) fn export_coverage(
    sim: &Simulation,
    export: &CoverageExportConfig,
    path: &Path,
) -> Result<(), ToltecaError> {
    let params = export.params();
    let mut printer = InfoPrinter::new("Coverage map".into());
    printer.push_block(vec![
        format!("Unit: {} ({})", params.unit, params.unit.bunit()).into(),
        format!("Pixel size: {:.2} arcsec", params.pixscale * 3600.0).into(),
        format!("Max. pixels: {}", params.n_pix_max).into(),
    ]);
    if let Some(nefd) = params.nefd {
        printer.push_line(format!("NEFD: {nefd} mJy s^1/2").into());
    }
    printer.display();

    let result = sim.coverage(&params)?;
    let summary = result.summary();
    let map = result.output_map();

    let mean_alt = match (export.mean_alt, sim.mean_altitude()) {
        (Some(alt), _) => alt.value(),
        (None, Some(alt)) => alt,
        (None, None) => {
            format!("The mapping has no start time; using a mean altitude of {DEFAULT_MEAN_ALT_DEG} deg").warn();
            DEFAULT_MEAN_ALT_DEG
        }
    };
    display_warnings();

    let info = CoverageFitsInfo {
        array_name: sim.instrument.array_name,
        t_exp: sim.t_exp(),
        mean_alt,
    };
    write_coverage_fits(path, map, &info)?;

    let mut printer = InfoPrinter::new(format!("Wrote {}", style(path.display()).bold()).into());
    printer.push_block(vec![
        format!(
            "{} x {} pixels of {:.2} arcsec",
            map.wcs.nx(),
            map.wcs.ny(),
            map.wcs.pixscale * 3600.0
        )
        .into(),
        format!(
            "{} of {} samples in the map, {} detectors",
            result.n_samples_in_map, result.n_samples, result.n_detectors
        )
        .into(),
    ]);
    let mut block = vec![format!("Map area above 10% of peak: {:.4} deg^2", summary.map_area).into()];
    if let Some(depth) = summary.depth_rms {
        block.push(format!("Median depth: {depth:.4} mJy/beam").into());
    }
    printer.push_block(block);
    printer.push_line(format!("Mean altitude: {mean_alt:.2} deg").into());
    printer.display();
    Ok(())
}
