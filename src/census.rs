//! Data section type census
//!
//! Walks the data section control byte by control byte and totals how much
//! payload each MMDB type declares, without building any values.
//!
//! The cursor only moves over encoding bytes: the control byte, the
//! extended-type byte and any length-extension bytes. Payload bytes are not
//! skipped, so every byte in the range is interpreted as a control byte in
//! turn.
//!
//! # Example
//!
//! ```rust
//! use mmdb_census::census;
//!
//! // "ab" as a 2-byte string, then a uint16 declaring 2 bytes
//! let data = [0x42, 0xA2];
//! let totals = census::decode_bytes(&data, 0, data.len() as u64)?;
//! assert_eq!(totals.utf8_string_bytes, 2);
//! assert_eq!(totals.uint16_bytes, 2);
//! # Ok::<(), mmdb_census::CensusError>(())
//! ```

use crate::control::{extension_width, resolve_length, ControlByte};
use crate::error::{CensusError, Result};
use log::{debug, trace};
use serde::Serialize;
use std::fs::File;
use std::io::{self, BufReader, Read, Seek, SeekFrom};
use std::path::Path;

/// Buffer size for sequential data section reads
const BUFFER_SIZE: usize = 128 * 1024;

/// Per-type totals accumulated over a data section.
///
/// Counters only ever grow while decoding; the finished value is a snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TypeSizeTotals {
    /// Pointer width selectors (1-3) summed over all pointers
    #[serde(rename = "pointer_size")]
    pub pointer_bytes: u64,
    /// UTF-8 string payload bytes
    #[serde(rename = "utf8_string_size")]
    pub utf8_string_bytes: u64,
    /// Double payload bytes (8 per value)
    #[serde(rename = "double_size")]
    pub double_bytes: u64,
    /// Byte array payload bytes
    #[serde(rename = "bytes_size")]
    pub byte_array_bytes: u64,
    /// Unsigned 16-bit integer payload bytes
    #[serde(rename = "unsigned_16bit_int_size")]
    pub uint16_bytes: u64,
    /// Unsigned 32-bit integer payload bytes
    #[serde(rename = "unsigned_32bit_int_size")]
    pub uint32_bytes: u64,
    /// Signed 32-bit integer payload bytes
    #[serde(rename = "signed_32bit_int_size")]
    pub int32_bytes: u64,
    /// Unsigned 64-bit integer payload bytes
    #[serde(rename = "unsigned_64bit_int_size")]
    pub uint64_bytes: u64,
    /// Unsigned 128-bit integer payload bytes
    #[serde(rename = "unsigned_128bit_int_size")]
    pub uint128_bytes: u64,
    /// Key/value pairs declared by maps
    #[serde(rename = "map_key_value_pair_count")]
    pub map_entry_count: u64,
    /// Elements declared by arrays
    #[serde(rename = "array_length")]
    pub array_element_count: u64,
    /// Float payload bytes (4 per value)
    #[serde(rename = "float_size")]
    pub float_bytes: u64,
    /// Extended-type codes outside the MMDB type table; they add to no total
    #[serde(skip_serializing_if = "is_zero")]
    pub unrecognized_count: u64,
}

fn is_zero(n: &u64) -> bool {
    *n == 0
}

/// Sequential decoder over a data section stream.
///
/// The reader must be positioned at `start`; the decoder tracks the absolute
/// file offset itself so errors can point at the failing byte.
pub struct CensusDecoder<R> {
    reader: R,
    cursor: u64,
    totals: TypeSizeTotals,
}

impl<R: Read> CensusDecoder<R> {
    /// Create a decoder whose reader is positioned at file offset `start`
    pub fn new(reader: R, start: u64) -> Self {
        Self {
            reader,
            cursor: start,
            totals: TypeSizeTotals::default(),
        }
    }

    /// Absolute offset of the next unread byte
    pub fn cursor(&self) -> u64 {
        self.cursor
    }

    /// Totals accumulated so far
    pub fn totals(&self) -> &TypeSizeTotals {
        &self.totals
    }

    /// Decode values until the cursor reaches `end`.
    ///
    /// The last value's length extension may run past `end`; it is read in
    /// full so the value is counted consistently.
    pub fn run(mut self, end: u64) -> Result<TypeSizeTotals> {
        while self.cursor < end {
            self.step()?;
        }
        Ok(self.totals)
    }

    /// Decode one value's encoding bytes and add it to the totals
    pub fn step(&mut self) -> Result<()> {
        let ctrl = ControlByte::new(self.read_byte()?);

        match ctrl.type_tag() {
            0 => self.step_extended(ctrl)?,
            1 => {
                // Pointer: the width lives in the control byte itself
                let selector = ctrl.pointer_size_selector();
                if selector > 0 {
                    self.totals.pointer_bytes += selector as u64;
                }
            }
            2 => {
                let len = self.read_length(ctrl.short_length())?;
                self.totals.utf8_string_bytes += len;
            }
            3 => self.totals.double_bytes += 8,
            4 => {
                let len = self.read_length(ctrl.short_length())?;
                self.totals.byte_array_bytes += len;
            }
            5 => {
                let len = self.read_length(ctrl.short_length())?;
                self.totals.uint16_bytes += len;
            }
            6 => {
                let len = self.read_length(ctrl.short_length())?;
                self.totals.uint32_bytes += len;
            }
            7 => {
                let count = self.read_length(ctrl.short_length())?;
                self.totals.map_entry_count += count;
            }
            _ => unreachable!("type tag is masked to three bits"),
        }

        Ok(())
    }

    fn step_extended(&mut self, ctrl: ControlByte) -> Result<()> {
        let ext_type = self.read_byte()?;
        // Resolved for every code so the cursor stays aligned
        let len = self.read_length(ctrl.short_length())?;

        match ext_type {
            1 => self.totals.int32_bytes += len,
            2 => self.totals.uint64_bytes += len,
            3 => self.totals.uint128_bytes += len,
            4 => self.totals.array_element_count += len,
            8 => self.totals.float_bytes += 4,
            // Data cache container, end marker, boolean: nothing to total
            5..=7 => {}
            other => {
                trace!(
                    "unrecognized extended type {} at offset {}",
                    other,
                    self.cursor
                );
                self.totals.unrecognized_count += 1;
            }
        }

        Ok(())
    }

    fn read_length(&mut self, short_length: u8) -> Result<u64> {
        let mut extension = [0u8; 3];
        let width = extension_width(short_length);
        self.read_exact(&mut extension[..width])?;
        Ok(resolve_length(short_length, &extension[..width]) as u64)
    }

    fn read_byte(&mut self) -> Result<u8> {
        let mut byte = [0u8; 1];
        self.read_exact(&mut byte)?;
        Ok(byte[0])
    }

    fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        if buf.is_empty() {
            return Ok(());
        }
        match self.reader.read_exact(buf) {
            Ok(()) => {
                self.cursor += buf.len() as u64;
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                Err(CensusError::TruncatedInput {
                    offset: self.cursor,
                    needed: buf.len(),
                })
            }
            Err(e) => Err(CensusError::Io(e)),
        }
    }
}

fn check_range(start: u64, end: u64) -> Result<()> {
    if start > end {
        return Err(CensusError::InvalidArgument(format!(
            "census range start {} is past end {}",
            start, end
        )));
    }
    Ok(())
}

/// Run the census over `[start, end)` of a file.
///
/// # Errors
///
/// - [`CensusError::Io`] if the file cannot be opened, seeked or read
/// - [`CensusError::TruncatedInput`] if the file ends inside an encoding
/// - [`CensusError::InvalidArgument`] if `start > end`
pub fn decode<P: AsRef<Path>>(path: P, start: u64, end: u64) -> Result<TypeSizeTotals> {
    check_range(start, end)?;

    let path = path.as_ref();
    let mut file = File::open(path)?;
    file.seek(SeekFrom::Start(start))?;

    debug!(
        "census of {} over [{}, {}) ({} bytes)",
        path.display(),
        start,
        end,
        end - start
    );

    let reader = BufReader::with_capacity(BUFFER_SIZE, file);
    let totals = CensusDecoder::new(reader, start).run(end)?;

    if totals.unrecognized_count > 0 {
        debug!(
            "{} value(s) with unrecognized extended types were not counted",
            totals.unrecognized_count
        );
    }
    Ok(totals)
}

/// Run the census over a reader already positioned at `start`.
pub fn decode_reader<R: Read>(reader: R, start: u64, end: u64) -> Result<TypeSizeTotals> {
    check_range(start, end)?;
    CensusDecoder::new(reader, start).run(end)
}

/// Run the census over `[start, end)` of an in-memory file image.
///
/// Offsets are absolute positions in `data`, as with [`decode`].
pub fn decode_bytes(data: &[u8], start: u64, end: u64) -> Result<TypeSizeTotals> {
    check_range(start, end)?;
    let tail = usize::try_from(start)
        .ok()
        .and_then(|start| data.get(start..))
        .unwrap_or(&[]);
    CensusDecoder::new(tail, start).run(end)
}
