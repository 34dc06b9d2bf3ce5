//! Synthetic MMDB files for integration tests
//!
//! Builds `tree | 16 zero bytes | data section | marker | metadata map` with
//! an all-zero tree of the requested geometry and a caller-supplied data
//! section.

#![allow(dead_code)]

use mmdb_census::METADATA_MARKER;
use std::io::Write;
use tempfile::NamedTempFile;

/// Encode a control byte (and extension bytes) for a type id and size.
///
/// Type ids 1-7 go in the control byte; 8 and up use the extended form.
pub fn encode_with_size(type_id: u8, size: usize, buffer: &mut Vec<u8>) {
    let (type_bits, ext) = if type_id <= 7 {
        (type_id << 5, None)
    } else {
        (0, Some(type_id - 7))
    };

    let push_ctrl = |len_bits: u8, buffer: &mut Vec<u8>| {
        buffer.push(type_bits | len_bits);
        if let Some(ext) = ext {
            buffer.push(ext);
        }
    };

    if size < 29 {
        push_ctrl(size as u8, buffer);
    } else if size < 29 + 256 {
        push_ctrl(29, buffer);
        buffer.push((size - 29) as u8);
    } else if size < 29 + 256 + 65536 {
        push_ctrl(30, buffer);
        buffer.extend_from_slice(&((size - 285) as u16).to_be_bytes());
    } else {
        push_ctrl(31, buffer);
        buffer.extend_from_slice(&((size - 65_821) as u32).to_be_bytes()[1..]);
    }
}

pub fn string(s: &str, buffer: &mut Vec<u8>) {
    encode_with_size(2, s.len(), buffer);
    buffer.extend_from_slice(s.as_bytes());
}

fn uint(type_id: u8, n: u128, max_width: usize, buffer: &mut Vec<u8>) {
    let bytes = n.to_be_bytes();
    let significant = bytes.iter().position(|&b| b != 0).unwrap_or(bytes.len());
    let payload = &bytes[significant..];
    assert!(payload.len() <= max_width);
    encode_with_size(type_id, payload.len(), buffer);
    buffer.extend_from_slice(payload);
}

pub fn uint16(n: u16, buffer: &mut Vec<u8>) {
    uint(5, n as u128, 2, buffer);
}

pub fn uint32(n: u32, buffer: &mut Vec<u8>) {
    uint(6, n as u128, 4, buffer);
}

pub fn uint64(n: u64, buffer: &mut Vec<u8>) {
    uint(9, n as u128, 8, buffer);
}

/// MMDB file under construction
#[derive(Debug, Clone)]
pub struct MmdbFixture {
    pub record_size: u16,
    pub node_count: u32,
    pub ip_version: u16,
    pub database_type: String,
    pub description: Vec<(String, String)>,
    pub languages: Vec<String>,
    pub build_epoch: u64,
    pub data_section: Vec<u8>,
}

impl MmdbFixture {
    pub fn new(record_size: u16, node_count: u32) -> Self {
        Self {
            record_size,
            node_count,
            ip_version: 6,
            database_type: "Census-Test".to_string(),
            description: vec![("en".to_string(), "Census test database".to_string())],
            languages: vec!["en".to_string()],
            build_epoch: 1_700_000_000,
            data_section: Vec::new(),
        }
    }

    pub fn with_data(mut self, data: &[u8]) -> Self {
        self.data_section = data.to_vec();
        self
    }

    pub fn tree_size(&self) -> usize {
        (self.record_size as usize * 2 / 8) * self.node_count as usize
    }

    pub fn data_section_start(&self) -> u64 {
        self.tree_size() as u64 + 16
    }

    pub fn marker_offset(&self) -> u64 {
        self.data_section_start() + self.data_section.len() as u64
    }

    pub fn metadata_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        encode_with_size(7, 9, &mut out);

        string("binary_format_major_version", &mut out);
        uint16(2, &mut out);
        string("binary_format_minor_version", &mut out);
        uint16(0, &mut out);
        string("build_epoch", &mut out);
        uint64(self.build_epoch, &mut out);
        string("database_type", &mut out);
        string(&self.database_type, &mut out);

        string("description", &mut out);
        encode_with_size(7, self.description.len(), &mut out);
        for (lang, text) in &self.description {
            string(lang, &mut out);
            string(text, &mut out);
        }

        string("languages", &mut out);
        encode_with_size(11, self.languages.len(), &mut out);
        for lang in &self.languages {
            string(lang, &mut out);
        }

        string("ip_version", &mut out);
        uint16(self.ip_version, &mut out);
        string("node_count", &mut out);
        uint32(self.node_count, &mut out);
        string("record_size", &mut out);
        uint16(self.record_size, &mut out);
        out
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = vec![0u8; self.tree_size() + 16];
        out.extend_from_slice(&self.data_section);
        out.extend_from_slice(METADATA_MARKER);
        out.extend(self.metadata_bytes());
        out
    }

    pub fn write_temp(&self) -> NamedTempFile {
        write_temp(&self.to_bytes())
    }
}

pub fn write_temp(data: &[u8]) -> NamedTempFile {
    let mut file = NamedTempFile::with_suffix(".mmdb").unwrap();
    file.write_all(data).unwrap();
    file.flush().unwrap();
    file
}
