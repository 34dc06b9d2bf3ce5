use anyhow::{anyhow, Result};
use mmdb_census::{CensusError, OutputFormat, RenderOptions};
use std::io::IsTerminal;
use std::path::Path;

/// Route `log` output to stderr; `-v` lowers the default level to debug
pub fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .init();
}

/// Color only when asked for, printing to a terminal, and NO_COLOR is unset
pub fn render_options(nocolor: bool) -> RenderOptions {
    let color = !nocolor
        && std::env::var_os("NO_COLOR").is_none()
        && std::io::stdout().is_terminal();
    RenderOptions { color }
}

pub fn parse_format(format: &str) -> Result<OutputFormat> {
    format.parse::<OutputFormat>().map_err(|e| match e {
        CensusError::InvalidArgument(msg) => anyhow!(msg),
        other => anyhow!(other),
    })
}

/// Turn a library error into the message shown to the user
pub fn describe_failure(database: &Path, err: CensusError) -> anyhow::Error {
    match err {
        CensusError::MetadataNotFound => anyhow!(
            "input valid mmdb file required: no metadata marker in {}",
            database.display()
        ),
        other => anyhow::Error::new(other)
            .context(format!("couldn't process the mmdb file: {}", database.display())),
    }
}
