use anyhow::{bail, Result};
use log::debug;
use mmdb_census::report::render_type_sizes;
use mmdb_census::{census, Metadata, MetadataSection, OutputFormat, SectionLayout};
use std::path::PathBuf;

use crate::cli_utils::{describe_failure, parse_format, render_options};

pub fn cmd_census(
    database: PathBuf,
    start: Option<u64>,
    end: Option<u64>,
    format: String,
    nocolor: bool,
) -> Result<()> {
    let format = parse_format(&format)?;

    // An explicit range works on any file; otherwise derive it from metadata
    let (start, end) = match (start, end) {
        (Some(start), Some(end)) => (start, end),
        (start, end) => {
            let MetadataSection {
                marker_offset,
                metadata,
            } = Metadata::from_file(&database).map_err(|e| describe_failure(&database, e))?;
            let layout = SectionLayout::new(metadata.record_size, metadata.node_count, marker_offset)
                .map_err(|e| describe_failure(&database, e))?;
            (
                start.unwrap_or(layout.data_section_start),
                end.unwrap_or(layout.data_section_end),
            )
        }
    };

    if start > end {
        bail!("--start ({}) must not be past --end ({})", start, end);
    }
    debug!("census range [{}, {})", start, end);

    let totals =
        census::decode(&database, start, end).map_err(|e| describe_failure(&database, e))?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&totals)?),
        OutputFormat::Pretty => print!("{}", render_type_sizes(&totals, render_options(nocolor))),
    }
    Ok(())
}
