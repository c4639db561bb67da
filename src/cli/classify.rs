// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Print what can be learned about data files from their names.

use std::path::PathBuf;

use clap::Parser;
use log::info;

use super::{common::InfoPrinter, ToltecaError};
use crate::filespec::{classify, DataFileStore, ObservationFile};

#[derive(Parser, Debug, Clone, Default)]
pub(super) struct ClassifyArgs {
    /// Data files or glob patterns, relative to the root directory.
    #[clap(name = "FILES")]
    items: Vec<String>,

    /// The root of the data file tree. Default: the current directory
    #[clap(short, long, parse(from_os_str))]
    root: Option<PathBuf>,

    /// Only look at the given names; don't look for the files on disk.
    #[clap(long)]
    names: bool,

    /// Also list the runtime links (e.g. toltec3.nc) of the data file tree.
    #[clap(long)]
    pub(super) runtime_links: bool,

    /// The master whose runtime links are listed, e.g. "ics".
    #[clap(long, requires = "runtime-links")]
    pub(super) master: Option<String>,
}

impl ClassifyArgs {
    pub(super) fn run(self) -> Result<(), ToltecaError> {
        let ClassifyArgs {
            items,
            root,
            names,
            runtime_links,
            master,
        } = self;

        let files: Vec<ObservationFile> = if names {
            items
                .iter()
                .filter_map(|name| {
                    let info = classify(name);
                    if info.is_none() {
                        info!("{name}: not a recognised data file");
                    }
                    info
                })
                .collect()
        } else {
            let store = DataFileStore::new(root.unwrap_or_else(|| PathBuf::from(".")));
            if runtime_links {
                let links = store.runtime_datafile_links(master.as_deref())?;
                let mut printer =
                    InfoPrinter::new(format!("Runtime links in {}", store.rootpath().display()).into());
                if links.is_empty() {
                    printer.push_line("none found".into());
                }
                for link in links {
                    printer.push_line(link.display().to_string().into());
                }
                printer.display();
            }
            store.index(&items[..])?
        };

        let mut printer = InfoPrinter::new(format!("Classified {} files", files.len()).into());
        for file in files {
            printer.push_block(vec![
                file.source.display().to_string().into(),
                file.to_string().into(),
            ]);
        }
        printer.display();
        Ok(())
    }
}
