//! `blr endpoints` / `blr contracts` — fabric-export projections.

use std::path::PathBuf;

use baseliner_io::fabric;

use crate::exit_codes::{EXIT_IO, EXIT_PARSE};
use crate::util::write_or_print;
use crate::CliError;

fn load_doc(input: &PathBuf) -> Result<fabric::FabricDoc, CliError> {
    let data = std::fs::read_to_string(input)
        .map_err(|e| CliError::new(EXIT_IO, format!("cannot read {}: {e}", input.display())))?;
    fabric::parse_str(&data)
        .map_err(|e| CliError::new(EXIT_PARSE, format!("{}: {e}", input.display())))
}

pub fn cmd_endpoints(input: PathBuf, output: Option<PathBuf>) -> Result<(), CliError> {
    let doc = load_doc(&input)?;
    let set = fabric::endpoint_records(&doc);
    write_or_print(&set, &set.schema.clone(), output.as_ref())?;
    eprintln!("{} endpoint(s) extracted", set.len());
    Ok(())
}

pub fn cmd_contracts(input: PathBuf, links: bool, output: Option<PathBuf>) -> Result<(), CliError> {
    let doc = load_doc(&input)?;
    let set = if links {
        fabric::contract_link_records(&doc)
    } else {
        fabric::contract_records(&doc)
    };
    write_or_print(&set, &set.schema.clone(), output.as_ref())?;
    eprintln!(
        "{} {} extracted",
        set.len(),
        if links { "contract link(s)" } else { "contract(s)" },
    );
    Ok(())
}
