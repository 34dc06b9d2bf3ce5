//! Section offsets derived from tree geometry
//!
//! ```text
//! ┌──────────────────────────────┐ 0
//! │  Search tree                 │ node_count * node_bytes
//! ├──────────────────────────────┤
//! │  16 zero bytes               │
//! ├──────────────────────────────┤ data_section_start
//! │  Data section                │
//! ├──────────────────────────────┤ data_section_end (= marker offset)
//! │  "\xAB\xCD\xEFMaxMind.com"   │
//! ├──────────────────────────────┤ metadata_start
//! │  Metadata map                │
//! └──────────────────────────────┘
//! ```

use crate::error::{CensusError, Result};
use crate::locator::METADATA_MARKER;
use serde::Serialize;
use std::ops::Range;

/// Width of the zero separator between the search tree and the data section
pub const DATA_SECTION_SEPARATOR_SIZE: u64 = 16;

/// Record size in bits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordSize {
    /// 24-bit records (3 bytes per record, 6 bytes per node)
    Bits24 = 24,
    /// 28-bit records (3.5 bytes per record, 7 bytes per node)
    Bits28 = 28,
    /// 32-bit records (4 bytes per record, 8 bytes per node)
    Bits32 = 32,
}

impl RecordSize {
    /// Number of bits per record
    pub fn bits(self) -> u16 {
        self as u16
    }

    /// Size of a node (two records packed together) in bytes
    pub fn node_bytes(self) -> u64 {
        (self.bits() as u64 * 2) / 8
    }

    /// Create from bit size
    pub fn from_bits(bits: u64) -> Result<Self> {
        match bits {
            24 => Ok(RecordSize::Bits24),
            28 => Ok(RecordSize::Bits28),
            32 => Ok(RecordSize::Bits32),
            _ => Err(CensusError::InvalidMetadata(format!(
                "Invalid record size: {} bits",
                bits
            ))),
        }
    }
}

/// Size of the search tree in bytes
pub fn tree_size_bytes(record_size: RecordSize, node_count: u64) -> Option<u64> {
    record_size.node_bytes().checked_mul(node_count)
}

/// Byte offsets of the sections of one MMDB file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SectionLayout {
    /// Size of the search tree
    pub tree_size: u64,
    /// First byte of the data section
    pub data_section_start: u64,
    /// One past the last byte of the data section (the marker offset)
    pub data_section_end: u64,
    /// `data_section_end - data_section_start`
    pub data_section_size: u64,
    /// First byte after the metadata marker
    pub metadata_start: u64,
}

impl SectionLayout {
    /// Derive the layout from the tree geometry and the marker offset.
    ///
    /// # Errors
    ///
    /// [`CensusError::InvalidLayout`] when the arithmetic overflows or the
    /// marker sits before the computed start of the data section.
    pub fn new(record_size: RecordSize, node_count: u64, marker_offset: u64) -> Result<Self> {
        let overflow = || CensusError::InvalidLayout("section offsets overflow".to_string());

        let tree_size = tree_size_bytes(record_size, node_count).ok_or_else(overflow)?;
        let data_section_start = tree_size
            .checked_add(DATA_SECTION_SEPARATOR_SIZE)
            .ok_or_else(overflow)?;
        let data_section_end = marker_offset;
        let data_section_size = data_section_end
            .checked_sub(data_section_start)
            .ok_or_else(|| {
                CensusError::InvalidLayout(format!(
                    "metadata marker at {} precedes data section start {}",
                    marker_offset, data_section_start
                ))
            })?;
        let metadata_start = marker_offset
            .checked_add(METADATA_MARKER.len() as u64)
            .ok_or_else(overflow)?;

        Ok(SectionLayout {
            tree_size,
            data_section_start,
            data_section_end,
            data_section_size,
            metadata_start,
        })
    }

    /// The data section as a half-open byte range
    pub fn data_range(&self) -> Range<u64> {
        self.data_section_start..self.data_section_end
    }
}
