// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Reduce data files with citlali.

use std::path::PathBuf;

use clap::Parser;
use console::style;
use log::info;
use serde_yaml::Value;

use super::{
    common::{display_warnings, InfoPrinter, Warn},
    ToltecaError,
};
use crate::{
    config::{merge, read_config_file},
    filespec::DataFileStore,
    reduce::{resolve_inputs, Citlali},
};

#[derive(Parser, Debug, Clone, Default)]
pub(super) struct ReduceArgs {
    /// Data files or glob patterns, relative to the root directory.
    #[clap(name = "FILES", required = true)]
    items: Vec<String>,

    /// The root of the data file tree. Default: the current directory
    #[clap(short, long, parse(from_os_str))]
    root: Option<PathBuf>,

    /// citlali config files (YAML, TOML or JSON). Later files override
    /// earlier ones. The "inputs" and "runtime.output_filepath" keys are
    /// filled in by tolteca.
    #[clap(short, long, parse(from_os_str))]
    config: Vec<PathBuf>,

    /// The directory citlali writes its products to.
    #[clap(short, long, parse(from_os_str), default_value = ".")]
    output_dir: PathBuf,

    /// The citlali executable, or a directory containing it. Default: citlali
    /// on the PATH
    #[clap(long, parse(from_os_str))]
    citlali: Option<PathBuf>,

    /// The versions of citlali that may be used, e.g. ">=1.3, <2".
    #[clap(long)]
    citlali_version: Option<String>,
}

impl ReduceArgs {
    pub(super) fn run(self, dry_run: bool) -> Result<(), ToltecaError> {
        let ReduceArgs {
            items,
            root,
            config,
            output_dir,
            citlali,
            citlali_version,
        } = self;

        let mut high_level = Value::Null;
        for file in &config {
            merge(&mut high_level, read_config_file(file)?);
        }
        if config.is_empty() {
            "No citlali config files were given; citlali will use its defaults".warn();
        }

        let store = DataFileStore::new(root.unwrap_or_else(|| PathBuf::from(".")));
        let files = store.index(&items[..])?;
        let inputs = resolve_inputs(&files);

        let mut printer = InfoPrinter::new(
            format!("Reducing {} files from {}", files.len(), store.rootpath().display()).into(),
        );
        for input in &inputs {
            let mut block = vec![format!("{}", style(&input.meta.name).bold()).into()];
            for item in input.data_items.iter().chain(input.cal_items.iter()) {
                block.push(
                    format!("{} ({})", item.filepath.display(), item.meta.interface).into(),
                );
            }
            printer.push_block(block);
        }
        printer.push_line(format!("Output directory: {}", output_dir.display()).into());
        printer.display();
        display_warnings();

        if dry_run {
            info!("Dry run -- exiting now.");
            return Ok(());
        }

        let citlali = Citlali::new(citlali.as_deref(), citlali_version.as_deref())?;
        info!(
            "Using citlali {} ({})",
            citlali.version(),
            citlali.cmd().display()
        );
        let cfg_path = citlali.reduce(&files, &high_level, &output_dir)?;
        info!("citlali finished; its config is {}", cfg_path.display());
        Ok(())
    }
}
