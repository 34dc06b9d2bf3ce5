//! MMDB metadata section decoding
//!
//! The metadata is a single MMDB map stored right after the metadata marker.
//! It carries the tree geometry (`node_count`, `record_size`) needed to find
//! the data section, plus descriptive fields.
//!
//! The decoder here understands the full MMDB value grammar:
//! - **Pointer**: resolved relative to the start of the metadata section
//! - **String**, **Bytes**: length-prefixed payloads
//! - **Double** (8 bytes), **Float** (4 bytes)
//! - **Uint16/32/64/128**, **Int32**: big-endian, 0..=N payload bytes
//! - **Map**, **Array**: counts from the length field
//! - **Bool**: value carried in the length field
//!
//! See: https://maxmind.github.io/MaxMind-DB/

use crate::control::{extension_width, resolve_length, ControlByte};
use crate::error::{CensusError, Result};
use crate::geometry::RecordSize;
use crate::locator::{locate, locate_in, METADATA_MARKER};
use log::debug;
use std::cell::Cell;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

/// Nesting limit for maps, arrays and pointer chains
const MAX_DEPTH: usize = 64;

/// Values allowed per input byte before decoding gives up.
///
/// Without pointers every value consumes at least one byte. Pointers can
/// revisit shared values, so repeated pointers to the same map would
/// otherwise multiply the work at every level.
const VALUES_PER_BYTE: usize = 4;

/// Floor on the value budget for very short sections
const MIN_VALUE_BUDGET: usize = 64;

/// Decoded MMDB value
#[derive(Debug, Clone, PartialEq)]
pub enum DataValue {
    /// UTF-8 string
    String(String),
    /// IEEE 754 double precision float
    Double(f64),
    /// Raw byte array
    Bytes(Vec<u8>),
    /// Unsigned 16-bit integer
    Uint16(u16),
    /// Unsigned 32-bit integer
    Uint32(u32),
    /// Key-value map (string keys only)
    Map(BTreeMap<String, DataValue>),
    /// Signed 32-bit integer
    Int32(i32),
    /// Unsigned 64-bit integer
    Uint64(u64),
    /// Unsigned 128-bit integer
    Uint128(u128),
    /// Array of values
    Array(Vec<DataValue>),
    /// Boolean value
    Bool(bool),
    /// IEEE 754 single precision float
    Float(f32),
}

impl DataValue {
    /// Unsigned integer value of any width that fits in a u64
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            DataValue::Uint16(n) => Some(*n as u64),
            DataValue::Uint32(n) => Some(*n as u64),
            DataValue::Uint64(n) => Some(*n),
            DataValue::Uint128(n) => u64::try_from(*n).ok(),
            _ => None,
        }
    }

    /// String contents
    pub fn as_str(&self) -> Option<&str> {
        match self {
            DataValue::String(s) => Some(s),
            _ => None,
        }
    }
}

/// Value decoder over one section buffer.
///
/// Offsets passed to [`decode`](ValueDecoder::decode) and pointer targets are
/// relative to the start of `buffer`. Each call to `decode` may produce at
/// most a fixed number of values proportional to `buffer.len()`.
pub struct ValueDecoder<'a> {
    buffer: &'a [u8],
    remaining: Cell<usize>,
}

impl<'a> ValueDecoder<'a> {
    /// Create a decoder for a section
    pub fn new(buffer: &'a [u8]) -> Self {
        Self {
            buffer,
            remaining: Cell::new(0),
        }
    }

    /// Decode a value at the given offset
    pub fn decode(&self, offset: usize) -> std::result::Result<DataValue, &'static str> {
        self.remaining.set(
            self.buffer
                .len()
                .saturating_mul(VALUES_PER_BYTE)
                .max(MIN_VALUE_BUDGET),
        );
        let mut cursor = offset;
        self.decode_at(&mut cursor, 0)
    }

    fn decode_at(
        &self,
        cursor: &mut usize,
        depth: usize,
    ) -> std::result::Result<DataValue, &'static str> {
        if depth > MAX_DEPTH {
            return Err("Value nesting too deep");
        }
        match self.remaining.get().checked_sub(1) {
            Some(left) => self.remaining.set(left),
            None => return Err("Too many values for section size"),
        }

        let ctrl = ControlByte::new(self.take(cursor, 1)?[0]);

        let type_id = if ctrl.is_extended() {
            let ext = self.take(cursor, 1)?[0];
            match ext.checked_add(7) {
                Some(t) if t >= 8 => t,
                _ => return Err("Invalid extended type"),
            }
        } else {
            ctrl.type_tag()
        };

        if type_id == 1 {
            let target = self.decode_pointer(cursor, ctrl)?;
            let mut target_cursor = target;
            return self.decode_at(&mut target_cursor, depth + 1);
        }

        let size = self.decode_size(cursor, ctrl.short_length())?;

        match type_id {
            2 => {
                let bytes = self.take(cursor, size)?;
                let s = std::str::from_utf8(bytes).map_err(|_| "Invalid UTF-8")?;
                Ok(DataValue::String(s.to_string()))
            }
            3 => {
                if size != 8 {
                    return Err("Double must be 8 bytes");
                }
                let mut bytes = [0u8; 8];
                bytes.copy_from_slice(self.take(cursor, 8)?);
                Ok(DataValue::Double(f64::from_be_bytes(bytes)))
            }
            4 => Ok(DataValue::Bytes(self.take(cursor, size)?.to_vec())),
            5 => Ok(DataValue::Uint16(self.decode_uint(cursor, size, 2)? as u16)),
            6 => Ok(DataValue::Uint32(self.decode_uint(cursor, size, 4)? as u32)),
            7 => {
                let mut map = BTreeMap::new();
                for _ in 0..size {
                    let key = match self.decode_at(cursor, depth + 1)? {
                        DataValue::String(s) => s,
                        _ => return Err("Map key must be string"),
                    };
                    let value = self.decode_at(cursor, depth + 1)?;
                    map.insert(key, value);
                }
                Ok(DataValue::Map(map))
            }
            8 => Ok(DataValue::Int32(self.decode_uint(cursor, size, 4)? as u32 as i32)),
            9 => Ok(DataValue::Uint64(self.decode_uint(cursor, size, 8)? as u64)),
            10 => Ok(DataValue::Uint128(self.decode_uint(cursor, size, 16)?)),
            11 => {
                // Each element takes at least one byte
                if size > self.buffer.len() {
                    return Err("Array length out of bounds");
                }
                let mut array = Vec::with_capacity(size);
                for _ in 0..size {
                    array.push(self.decode_at(cursor, depth + 1)?);
                }
                Ok(DataValue::Array(array))
            }
            14 => match size {
                0 => Ok(DataValue::Bool(false)),
                1 => Ok(DataValue::Bool(true)),
                _ => Err("Invalid boolean size"),
            },
            15 => {
                if size != 4 {
                    return Err("Float must be 4 bytes");
                }
                let mut bytes = [0u8; 4];
                bytes.copy_from_slice(self.take(cursor, 4)?);
                Ok(DataValue::Float(f32::from_be_bytes(bytes)))
            }
            _ => Err("Unsupported type"),
        }
    }

    fn decode_pointer(
        &self,
        cursor: &mut usize,
        ctrl: ControlByte,
    ) -> std::result::Result<usize, &'static str> {
        let high = (ctrl.raw() & 0x7) as usize;
        let be = |bytes: &[u8]| bytes.iter().fold(0usize, |acc, &b| (acc << 8) | b as usize);

        let offset = match ctrl.pointer_size_selector() {
            0 => (high << 8) | be(self.take(cursor, 1)?),
            1 => 0x800 + ((high << 16) | be(self.take(cursor, 2)?)),
            2 => 0x80800 + ((high << 24) | be(self.take(cursor, 3)?)),
            _ => be(self.take(cursor, 4)?),
        };
        Ok(offset)
    }

    fn decode_size(
        &self,
        cursor: &mut usize,
        short_length: u8,
    ) -> std::result::Result<usize, &'static str> {
        let extension = self
            .take(cursor, extension_width(short_length))
            .map_err(|_| "Size bytes out of bounds")?;
        Ok(resolve_length(short_length, extension))
    }

    fn decode_uint(
        &self,
        cursor: &mut usize,
        size: usize,
        max_width: usize,
    ) -> std::result::Result<u128, &'static str> {
        if size > max_width {
            return Err("Integer payload too wide");
        }
        let bytes = self.take(cursor, size)?;
        Ok(bytes.iter().fold(0u128, |acc, &b| (acc << 8) | b as u128))
    }

    fn take(&self, cursor: &mut usize, len: usize) -> std::result::Result<&'a [u8], &'static str> {
        let end = cursor.checked_add(len).ok_or("Data out of bounds")?;
        let bytes = self.buffer.get(*cursor..end).ok_or("Data out of bounds")?;
        *cursor = end;
        Ok(bytes)
    }
}

/// IP version
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IpVersion {
    /// IPv4 only
    V4,
    /// IPv6 (may include IPv4-mapped addresses)
    V6,
}

impl IpVersion {
    /// Numeric version as stored in the metadata
    pub fn number(self) -> u16 {
        match self {
            IpVersion::V4 => 4,
            IpVersion::V6 => 6,
        }
    }
}

/// Fields of the MMDB metadata map
#[derive(Debug, Clone, PartialEq)]
pub struct Metadata {
    /// Major version of the binary format
    pub binary_format_major_version: u16,
    /// Minor version of the binary format
    pub binary_format_minor_version: u16,
    /// Free-form database type, e.g. "GeoLite2-Country"
    pub database_type: String,
    /// IP version of the search tree
    pub ip_version: IpVersion,
    /// Bits per tree record
    pub record_size: RecordSize,
    /// Number of nodes in the search tree
    pub node_count: u64,
    /// Descriptions keyed by language code
    pub description: BTreeMap<String, String>,
    /// Locale codes the database has names for
    pub languages: Vec<String>,
    /// Build time, seconds since the Unix epoch
    pub build_epoch: u64,
}

impl Metadata {
    /// Decode the metadata map that starts at the beginning of `section`.
    ///
    /// `node_count`, `record_size` and `ip_version` are required; the other
    /// fields default to empty/zero when absent.
    pub fn decode(section: &[u8]) -> Result<Self> {
        let value = ValueDecoder::new(section)
            .decode(0)
            .map_err(|e| CensusError::InvalidMetadata(format!("Failed to decode metadata: {}", e)))?;

        let map = match value {
            DataValue::Map(map) => map,
            _ => {
                return Err(CensusError::InvalidMetadata(
                    "Metadata is not a map".to_string(),
                ))
            }
        };

        let node_count = extract_uint(&map, "node_count")?;
        let record_size = RecordSize::from_bits(extract_uint(&map, "record_size")?)?;
        let ip_version = match extract_uint(&map, "ip_version")? {
            4 => IpVersion::V4,
            6 => IpVersion::V6,
            other => {
                return Err(CensusError::InvalidMetadata(format!(
                    "Invalid IP version: {}",
                    other
                )))
            }
        };

        Ok(Metadata {
            binary_format_major_version: optional_u16(&map, "binary_format_major_version")?,
            binary_format_minor_version: optional_u16(&map, "binary_format_minor_version")?,
            database_type: map
                .get("database_type")
                .and_then(DataValue::as_str)
                .unwrap_or_default()
                .to_string(),
            ip_version,
            record_size,
            node_count,
            description: extract_string_map(&map, "description"),
            languages: extract_string_array(&map, "languages"),
            build_epoch: match map.get("build_epoch") {
                Some(_) => extract_uint(&map, "build_epoch")?,
                None => 0,
            },
        })
    }

    /// Locate and decode the metadata of an in-memory MMDB image
    pub fn from_bytes(data: &[u8]) -> Result<MetadataSection> {
        let marker_offset = locate_in(data, METADATA_MARKER)
            .ok_or(CensusError::MetadataNotFound)?;
        let metadata = Metadata::decode(&data[marker_offset + METADATA_MARKER.len()..])?;
        Ok(MetadataSection {
            marker_offset: marker_offset as u64,
            metadata,
        })
    }

    /// Locate and decode the metadata of an MMDB file
    ///
    /// # Errors
    ///
    /// - [`CensusError::Io`] on open/read failure
    /// - [`CensusError::MetadataNotFound`] if the marker is absent
    /// - [`CensusError::InvalidMetadata`] if the map cannot be decoded
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<MetadataSection> {
        let path = path.as_ref();
        let marker_offset = locate(path, METADATA_MARKER)?.ok_or(CensusError::MetadataNotFound)?;

        let mut file = File::open(path)?;
        file.seek(SeekFrom::Start(marker_offset + METADATA_MARKER.len() as u64))?;
        let mut section = Vec::new();
        file.read_to_end(&mut section)?;

        debug!(
            "metadata of {} at offset {} ({} bytes)",
            path.display(),
            marker_offset,
            section.len()
        );

        Ok(MetadataSection {
            marker_offset,
            metadata: Metadata::decode(&section)?,
        })
    }

    /// Binary format version as "major.minor"
    pub fn binary_format(&self) -> String {
        format!(
            "{}.{}",
            self.binary_format_major_version, self.binary_format_minor_version
        )
    }
}

/// Decoded metadata together with the offset of the marker that precedes it
#[derive(Debug, Clone, PartialEq)]
pub struct MetadataSection {
    /// Offset of the last metadata marker in the file
    pub marker_offset: u64,
    /// The decoded metadata map
    pub metadata: Metadata,
}

// Helper functions to extract values from the metadata map

fn extract_uint(map: &BTreeMap<String, DataValue>, key: &str) -> Result<u64> {
    match map.get(key) {
        Some(value) => value.as_u64().ok_or_else(|| {
            CensusError::InvalidMetadata(format!("Field '{}' is not an unsigned integer", key))
        }),
        None => Err(CensusError::InvalidMetadata(format!(
            "Required field '{}' not found",
            key
        ))),
    }
}

fn optional_u16(map: &BTreeMap<String, DataValue>, key: &str) -> Result<u16> {
    if !map.contains_key(key) {
        return Ok(0);
    }
    u16::try_from(extract_uint(map, key)?)
        .map_err(|_| CensusError::InvalidMetadata(format!("Field '{}' out of range", key)))
}

fn extract_string_map(map: &BTreeMap<String, DataValue>, key: &str) -> BTreeMap<String, String> {
    match map.get(key) {
        Some(DataValue::Map(entries)) => entries
            .iter()
            .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
            .collect(),
        _ => BTreeMap::new(),
    }
}

fn extract_string_array(map: &BTreeMap<String, DataValue>, key: &str) -> Vec<String> {
    match map.get(key) {
        Some(DataValue::Array(items)) => items
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect(),
        _ => Vec::new(),
    }
}
