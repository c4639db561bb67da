// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use clap::{CommandFactory, ErrorKind, Parser};

use super::*;

#[test]
fn test_cli_definition_is_consistent() {
    // Panics on e.g. a `requires` naming an argument that doesn't exist.
    Tolteca::command().debug_assert();
}

#[test]
fn test_classify_master_requires_runtime_links() {
    let result = Tolteca::try_parse_from(["tolteca", "classify", "--master", "ics"]);
    assert!(matches!(
        result.err().unwrap().kind(),
        ErrorKind::MissingRequiredArgument
    ));

    #[rustfmt::skip]
    let tolteca = Tolteca::try_parse_from([
        "tolteca", "classify",
        "--runtime-links",
        "--master", "ics",
    ])
    .unwrap();
    match tolteca.command {
        Command::Classify(args) => {
            assert!(args.runtime_links);
            assert_eq!(args.master.as_deref(), Some("ics"));
        }
        c => panic!("unexpected subcommand {c:?}"),
    }
}
