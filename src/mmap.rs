//! Read-only memory-mapped MMDB files.
//!
//! The mapping is released when the [`MappedFile`] is dropped, so callers
//! that keep it in a local binding get unmapping on every exit path.
//!
//! # Example
//!
//! ```no_run
//! use mmdb_census::mmap::MappedFile;
//!
//! let file = MappedFile::open("GeoLite2-Country.mmdb")?;
//! println!("Size: {} bytes", file.size());
//! # Ok::<(), mmdb_census::CensusError>(())
//! ```

use crate::error::Result;
use memmap2::Mmap;
use std::fmt;
use std::fs::File;
use std::path::Path;

/// A read-only view of a whole file.
///
/// Empty files are never handed to `mmap`; they expose an empty slice.
pub struct MappedFile {
    mmap: Option<Mmap>,
}

impl MappedFile {
    /// Open and memory-map a file read-only.
    ///
    /// # Errors
    ///
    /// Returns [`CensusError::Io`](crate::CensusError::Io) if the file cannot
    /// be opened, stat'ed or mapped.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        if file.metadata()?.len() == 0 {
            return Ok(MappedFile { mmap: None });
        }

        // SAFETY: the file is opened read-only and the tool assumes exclusive
        // access to a finalized database; nothing mutates it while mapped.
        let mmap = unsafe { Mmap::map(&file)? };
        Ok(MappedFile { mmap: Some(mmap) })
    }

    /// Size of the mapped file in bytes.
    pub fn size(&self) -> usize {
        self.as_slice().len()
    }

    /// The whole file as a byte slice.
    pub fn as_slice(&self) -> &[u8] {
        match &self.mmap {
            Some(mmap) => &mmap[..],
            None => &[],
        }
    }
}

impl fmt::Debug for MappedFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MappedFile")
            .field("size", &self.size())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CensusError;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_test_file(data: &[u8]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(data).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_empty_file() {
        let file = create_test_file(&[]);
        let mapped = MappedFile::open(file.path()).unwrap();
        assert_eq!(mapped.size(), 0);
        assert!(mapped.as_slice().is_empty());
    }

    #[test]
    fn test_contents_visible() {
        let file = create_test_file(b"\x01\x02\x03\x04");
        let mapped = MappedFile::open(file.path()).unwrap();
        assert_eq!(mapped.size(), 4);
        assert_eq!(mapped.as_slice(), &[1, 2, 3, 4]);
    }

    #[test]
    fn test_nonexistent_file() {
        let result = MappedFile::open("/nonexistent/path/to/file.mmdb");
        assert!(matches!(result, Err(CensusError::Io(_))));
    }
}
