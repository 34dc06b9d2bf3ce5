use anyhow::Result;
use mmdb_census::MetadataReport;
use std::path::PathBuf;

use crate::cli_utils::{describe_failure, parse_format, render_options};

pub fn cmd_metadata(
    database: PathBuf,
    format: String,
    nocolor: bool,
    data_types: bool,
) -> Result<()> {
    let format = parse_format(&format)?;

    let report = MetadataReport::build(&database, data_types)
        .map_err(|e| describe_failure(&database, e))?;

    print!("{}", report.render(format, render_options(nocolor)));
    Ok(())
}
