mod cli_utils;
mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use commands::{cmd_census, cmd_metadata};

#[derive(Parser)]
#[command(name = "mmdb-census")]
#[command(
    about = "Section layout and data type census for MaxMind DB files",
    long_about = "mmdb-census - Inspect the binary layout of MaxMind DB (.mmdb) files\n\n\
    Locates the metadata section, derives the search tree and data section offsets,\n\
    and walks the data section's control bytes to total the bytes declared per type.\n\n\
    Examples:\n\
      mmdb-census metadata GeoLite2-Country.mmdb\n\
      mmdb-census metadata GeoLite2-Country.mmdb --data-types --format json\n\
      mmdb-census census GeoLite2-Country.mmdb --nocolor\n\
      mmdb-census census dump.bin --start 1024 --end 4096"
)]
#[command(version)]
struct Cli {
    /// Show debug logging on stderr (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print metadata and section offsets of an MMDB file
    Metadata {
        /// Path to the MMDB file
        #[arg(value_name = "MMDB_FILE")]
        database: PathBuf,

        /// Output format: pretty (default) or json
        #[arg(short = 'f', long, default_value = "pretty")]
        format: String,

        /// Disable colored output
        #[arg(long)]
        nocolor: bool,

        /// Show data type sizes within the data section
        #[arg(long)]
        data_types: bool,
    },

    /// Total the bytes declared per type in a data section
    Census {
        /// Path to the MMDB file
        #[arg(value_name = "MMDB_FILE")]
        database: PathBuf,

        /// First byte of the range (default: data section start from metadata)
        #[arg(long)]
        start: Option<u64>,

        /// End of the range, exclusive (default: metadata marker offset)
        #[arg(long)]
        end: Option<u64>,

        /// Output format: pretty (default) or json
        #[arg(short = 'f', long, default_value = "pretty")]
        format: String,

        /// Disable colored output
        #[arg(long)]
        nocolor: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    cli_utils::init_logging(cli.verbose);

    match cli.command {
        Commands::Metadata {
            database,
            format,
            nocolor,
            data_types,
        } => cmd_metadata(database, format, nocolor, data_types),
        Commands::Census {
            database,
            start,
            end,
            format,
            nocolor,
        } => cmd_census(database, start, end, format, nocolor),
    }
}
