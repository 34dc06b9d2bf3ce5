//! mmdb-census - Section layout and data type census for MaxMind DB files
//!
//! Reads an MMDB file without building its search tree: finds the metadata
//! marker, derives where each section starts and ends, and walks the data
//! section's control bytes to total how many bytes each value type declares.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use mmdb_census::{MetadataReport, OutputFormat, RenderOptions};
//!
//! let report = MetadataReport::build("GeoLite2-Country.mmdb", true)?;
//! println!("Data section: {} bytes", report.layout.data_section_size);
//! print!("{}", report.render(OutputFormat::Pretty, RenderOptions::default()));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Lower-level pieces
//!
//! ```rust,no_run
//! use mmdb_census::{census, locator, RecordSize, SectionLayout};
//!
//! let marker = locator::locate_metadata_marker("db.mmdb")?
//!     .ok_or(mmdb_census::CensusError::MetadataNotFound)?;
//! let layout = SectionLayout::new(RecordSize::Bits28, 3_500_000, marker)?;
//! let totals = census::decode("db.mmdb", layout.data_section_start, layout.data_section_end)?;
//! println!("strings: {} bytes", totals.utf8_string_bytes);
//! # Ok::<(), mmdb_census::CensusError>(())
//! ```
//!
//! # File Layout
//!
//! ```text
//! ┌──────────────────────────────────────┐
//! │  1. Search tree (binary trie)        │
//! │  2. 16-byte zero separator           │
//! │  3. Data section                     │
//! │  4. "\xAB\xCD\xEFMaxMind.com"        │
//! │  5. Metadata map                     │
//! └──────────────────────────────────────┘
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Data section type census
pub mod census;
/// Control byte layout and length extension
pub mod control;
/// Error types
pub mod error;
/// Section offsets from tree geometry
pub mod geometry;
/// Metadata marker search
pub mod locator;
/// Metadata map decoding
pub mod metadata;
/// Read-only file mapping
pub mod mmap;
/// Report assembly and rendering
pub mod report;

// Re-exports for Rust consumers

pub use crate::census::{CensusDecoder, TypeSizeTotals};
pub use crate::error::{CensusError, Result};
pub use crate::geometry::{RecordSize, SectionLayout};
pub use crate::locator::METADATA_MARKER;
pub use crate::metadata::{DataValue, IpVersion, Metadata, MetadataSection};
pub use crate::report::{MetadataReport, OutputFormat, RenderOptions};

/// Library version string
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
