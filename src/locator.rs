//! Metadata boundary search
//!
//! An MMDB file ends with `\xAB\xCD\xEFMaxMind.com` followed by the metadata
//! map. The marker bytes may also show up inside the data section (a string
//! value can contain anything), so only the LAST occurrence is trusted.

use crate::error::{CensusError, Result};
use crate::mmap::MappedFile;
use log::debug;
use memchr::memmem;
use std::path::Path;

/// MMDB metadata marker: "\xAB\xCD\xEFMaxMind.com"
pub const METADATA_MARKER: &[u8] = b"\xAB\xCD\xEFMaxMind.com";

/// Find the last occurrence of `marker` in a file.
///
/// Returns `Ok(None)` when the file does not contain the marker; that is not
/// an error here, callers decide whether it makes the file invalid.
///
/// # Errors
///
/// - [`CensusError::InvalidArgument`] for an empty marker
/// - [`CensusError::Io`] if the file cannot be opened or mapped
pub fn locate<P: AsRef<Path>>(path: P, marker: &[u8]) -> Result<Option<u64>> {
    if marker.is_empty() {
        return Err(CensusError::InvalidArgument(
            "search marker must not be empty".to_string(),
        ));
    }

    let path = path.as_ref();
    let mapped = MappedFile::open(path)?;
    let found = locate_in(mapped.as_slice(), marker);

    debug!(
        "marker search in {} ({} bytes): {:?}",
        path.display(),
        mapped.size(),
        found
    );

    Ok(found.map(|offset| offset as u64))
}

/// Find the MMDB metadata marker in a file.
pub fn locate_metadata_marker<P: AsRef<Path>>(path: P) -> Result<Option<u64>> {
    locate(path, METADATA_MARKER)
}

/// Find the last occurrence of `marker` in an in-memory buffer (zero allocation).
///
/// An empty marker never matches.
pub fn locate_in(data: &[u8], marker: &[u8]) -> Option<usize> {
    if marker.is_empty() || data.len() < marker.len() {
        return None;
    }
    memmem::rfind(data, marker)
}
