//! Metadata report assembly and rendering
//!
//! Rendering takes an explicit [`RenderOptions`]; nothing here consults
//! process-wide color state.

use crate::census::{self, TypeSizeTotals};
use crate::error::{CensusError, Result};
use crate::geometry::SectionLayout;
use crate::metadata::{Metadata, MetadataSection};
use log::debug;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Write;
use std::path::Path;
use std::str::FromStr;

const CYAN: &str = "\x1b[36m";
const GREEN: &str = "\x1b[32m";
const RESET: &str = "\x1b[0m";

/// Width of the name column in pretty output
const NAME_WIDTH: usize = 13;

/// Report output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Aligned, optionally colored lines
    #[default]
    Pretty,
    /// Pretty-printed JSON document
    Json,
}

impl FromStr for OutputFormat {
    type Err = CensusError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "" | "pretty" => Ok(OutputFormat::Pretty),
            "json" => Ok(OutputFormat::Json),
            _ => Err(CensusError::InvalidArgument(
                "format must be one of \"pretty\" or \"json\"".to_string(),
            )),
        }
    }
}

/// Presentation settings passed to the renderers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RenderOptions {
    /// Wrap names and values in ANSI color codes
    pub color: bool,
}

/// Everything the `metadata` command reports about one file
#[derive(Debug, Clone, PartialEq)]
pub struct MetadataReport {
    /// Decoded metadata map
    pub metadata: Metadata,
    /// Derived section offsets
    pub layout: SectionLayout,
    /// Data section census, when requested
    pub type_sizes: Option<TypeSizeTotals>,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    binary_format: String,
    db_type: &'a str,
    ip: u16,
    record_size: u16,
    node_count: u64,
    tree_size: u64,
    data_section_size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    data_type_sizes: Option<&'a TypeSizeTotals>,
    data_section_start_offset: u64,
    data_section_end_offset: u64,
    metadata_section_start_offset: u64,
    description: &'a BTreeMap<String, String>,
    languages: &'a [String],
    build_epoch: u64,
}

impl MetadataReport {
    /// Read metadata, derive the layout and optionally run the census.
    ///
    /// # Errors
    ///
    /// [`CensusError::MetadataNotFound`] for files without the marker, plus
    /// any error from metadata decoding, layout derivation or the census.
    pub fn build<P: AsRef<Path>>(path: P, with_data_types: bool) -> Result<Self> {
        let path = path.as_ref();
        let MetadataSection {
            marker_offset,
            metadata,
        } = Metadata::from_file(path)?;

        let layout = SectionLayout::new(metadata.record_size, metadata.node_count, marker_offset)?;
        debug!("section layout of {}: {:?}", path.display(), layout);

        let type_sizes = if with_data_types {
            Some(census::decode(
                path,
                layout.data_section_start,
                layout.data_section_end,
            )?)
        } else {
            None
        };

        Ok(MetadataReport {
            metadata,
            layout,
            type_sizes,
        })
    }

    /// JSON document with the same keys as the pretty output
    pub fn to_json(&self) -> serde_json::Value {
        let md = &self.metadata;
        let report = JsonReport {
            binary_format: md.binary_format(),
            db_type: &md.database_type,
            ip: md.ip_version.number(),
            record_size: md.record_size.bits(),
            node_count: md.node_count,
            tree_size: self.layout.tree_size,
            data_section_size: self.layout.data_section_size,
            data_type_sizes: self.type_sizes.as_ref(),
            data_section_start_offset: self.layout.data_section_start,
            data_section_end_offset: self.layout.data_section_end,
            metadata_section_start_offset: self.layout.metadata_start,
            description: &md.description,
            languages: &md.languages,
            build_epoch: md.build_epoch,
        };
        // Plain data with string keys: serialization cannot fail
        serde_json::to_value(report).unwrap_or(serde_json::Value::Null)
    }

    /// Render in the requested format
    pub fn render(&self, format: OutputFormat, options: RenderOptions) -> String {
        match format {
            OutputFormat::Pretty => self.render_pretty(options),
            OutputFormat::Json => {
                let mut out = serde_json::to_string_pretty(&self.to_json()).unwrap_or_default();
                out.push('\n');
                out
            }
        }
    }

    /// Aligned human-readable lines
    pub fn render_pretty(&self, options: RenderOptions) -> String {
        let painter = Painter(options);
        let md = &self.metadata;
        let layout = &self.layout;
        let mut out = String::new();

        painter.line(&mut out, "", "Binary Format", &md.binary_format(), "");
        painter.line(&mut out, "", "Database Type", &md.database_type, "");
        painter.line(&mut out, "", "IP Version", &md.ip_version.number().to_string(), "");
        painter.number(&mut out, "", "Record Size", md.record_size.bits() as u64);
        painter.number(&mut out, "", "Node Count", md.node_count);
        painter.number(&mut out, "", "Tree Size", layout.tree_size);
        painter.number(&mut out, "", "Data Section Size", layout.data_section_size);
        if let Some(totals) = &self.type_sizes {
            write_type_sizes(&painter, &mut out, "    ", totals);
        }
        painter.number(&mut out, "", "Data Section Start Offset", layout.data_section_start);
        painter.number(&mut out, "", "Data Section End Offset", layout.data_section_end);
        painter.number(&mut out, "", "Metadata Section Start Offset", layout.metadata_start);
        painter.line(&mut out, "", "Description", "", "");

        let key_width = md.description.keys().map(String::len).max().unwrap_or(0);
        for (lang, text) in &md.description {
            let _ = writeln!(
                out,
                "    {} {}",
                painter.name(&format!("{:<width$}", lang, width = key_width)),
                painter.value(text)
            );
        }

        painter.line(&mut out, "", "Languages", &md.languages.join(", "), "");
        painter.line(&mut out, "", "Build Epoch", &md.build_epoch.to_string(), "");
        out
    }
}

/// Render census totals alone, as printed by the `census` command
pub fn render_type_sizes(totals: &TypeSizeTotals, options: RenderOptions) -> String {
    let mut out = String::new();
    write_type_sizes(&Painter(options), &mut out, "", totals);
    out
}

fn write_type_sizes(painter: &Painter, out: &mut String, indent: &str, totals: &TypeSizeTotals) {
    let rows = [
        ("Pointer Size", totals.pointer_bytes),
        ("UTF-8 String Size", totals.utf8_string_bytes),
        ("Double Size", totals.double_bytes),
        ("Bytes Size", totals.byte_array_bytes),
        ("Unsigned 16-bit Integer Size", totals.uint16_bytes),
        ("Unsigned 32-bit Integer Size", totals.uint32_bytes),
        ("Signed 32-bit Integer Size", totals.int32_bytes),
        ("Unsigned 64-bit Integer Size", totals.uint64_bytes),
        ("Unsigned 128-bit Integer Size", totals.uint128_bytes),
        ("Map Key-Value Pair Count", totals.map_entry_count),
        ("Array Length", totals.array_element_count),
        ("Float Size", totals.float_bytes),
    ];
    for (name, value) in rows {
        painter.number(out, indent, name, value);
    }
    if totals.unrecognized_count > 0 {
        painter.number(out, indent, "Unrecognized Types", totals.unrecognized_count);
    }
}

struct Painter(RenderOptions);

impl Painter {
    fn paint(&self, color: &str, text: &str) -> String {
        if self.0.color && !text.is_empty() {
            format!("{}{}{}", color, text, RESET)
        } else {
            text.to_string()
        }
    }

    fn name(&self, text: &str) -> String {
        self.paint(CYAN, text)
    }

    fn value(&self, text: &str) -> String {
        self.paint(GREEN, text)
    }

    fn line(&self, out: &mut String, indent: &str, name: &str, value: &str, simplified: &str) {
        let mut line = format!(
            "{}- {} {} {}",
            indent,
            self.name(&format!("{:<width$}", name, width = NAME_WIDTH)),
            self.value(value),
            self.value(simplified)
        );
        line.truncate(line.trim_end().len());
        out.push_str(&line);
        out.push('\n');
    }

    fn number(&self, out: &mut String, indent: &str, name: &str, value: u64) {
        self.line(out, indent, name, &value.to_string(), &simplify_size(value));
    }
}

/// Human-friendly size suffix, e.g. "(1.50 KB)"; empty below 1 KiB
pub fn simplify_size(size: u64) -> String {
    const KB: u64 = 1 << 10;
    const MB: u64 = 1 << 20;
    const GB: u64 = 1 << 30;
    const TB: u64 = 1 << 40;

    let (unit, name) = match size {
        s if s >= TB => (TB, "TB"),
        s if s >= GB => (GB, "GB"),
        s if s >= MB => (MB, "MB"),
        s if s >= KB => (KB, "KB"),
        _ => return String::new(),
    };
    format!("({:.2} {})", size as f64 / unit as f64, name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::RecordSize;
    use crate::metadata::IpVersion;

    fn sample_report(type_sizes: Option<TypeSizeTotals>) -> MetadataReport {
        let mut description = BTreeMap::new();
        description.insert("en".to_string(), "Sample".to_string());
        description.insert("zh-CN".to_string(), "样本".to_string());

        MetadataReport {
            metadata: Metadata {
                binary_format_major_version: 2,
                binary_format_minor_version: 0,
                database_type: "Sample-DB".to_string(),
                ip_version: IpVersion::V6,
                record_size: RecordSize::Bits24,
                node_count: 1000,
                description,
                languages: vec!["en".to_string(), "zh-CN".to_string()],
                build_epoch: 1_700_000_000,
            },
            layout: SectionLayout::new(RecordSize::Bits24, 1000, 9000).unwrap(),
            type_sizes,
        }
    }

    #[test]
    fn test_simplify_size() {
        assert_eq!(simplify_size(0), "");
        assert_eq!(simplify_size(1023), "");
        assert_eq!(simplify_size(1024), "(1.00 KB)");
        assert_eq!(simplify_size(1536), "(1.50 KB)");
        assert_eq!(simplify_size(5 * 1024 * 1024), "(5.00 MB)");
        assert_eq!(simplify_size(3 << 30), "(3.00 GB)");
        assert_eq!(simplify_size(1 << 40), "(1.00 TB)");
    }

    #[test]
    fn test_output_format_parse() {
        assert_eq!("pretty".parse::<OutputFormat>().unwrap(), OutputFormat::Pretty);
        assert_eq!("".parse::<OutputFormat>().unwrap(), OutputFormat::Pretty);
        assert_eq!("json".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert!("yaml".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_pretty_without_color() {
        let out = sample_report(None).render_pretty(RenderOptions { color: false });
        assert!(!out.contains('\x1b'));
        assert!(out.contains("- Binary Format 2.0\n"));
        assert!(out.contains("- Tree Size     6000 (5.86 KB)\n"));
        assert!(out.contains("- Data Section Start Offset 6016 (5.8"));
        assert!(out.contains("- Metadata Section Start Offset 9014 (8.80 KB)\n"));
        assert!(out.contains("    en    Sample\n"));
        assert!(out.contains("- Languages     en, zh-CN\n"));
        assert!(!out.contains("Pointer Size"));
    }

    #[test]
    fn test_pretty_with_type_sizes() {
        let totals = TypeSizeTotals {
            utf8_string_bytes: 2048,
            ..Default::default()
        };
        let out = sample_report(Some(totals)).render_pretty(RenderOptions::default());
        assert!(out.contains("    - UTF-8 String Size 2048 (2.00 KB)\n"));
        assert!(out.contains("    - Float Size    0\n"));

        let data_size = out.find("Data Section Size").unwrap();
        let pointer = out.find("Pointer Size").unwrap();
        let start = out.find("Data Section Start Offset").unwrap();
        assert!(data_size < pointer && pointer < start);
    }

    #[test]
    fn test_pretty_with_color() {
        let out = sample_report(None).render_pretty(RenderOptions { color: true });
        assert!(out.contains("\x1b[36mBinary Format\x1b[0m \x1b[32m2.0\x1b[0m\n"));
    }

    #[test]
    fn test_json_keys() {
        let json = sample_report(None).to_json();
        assert_eq!(json["binary_format"], "2.0");
        assert_eq!(json["db_type"], "Sample-DB");
        assert_eq!(json["ip"], 6);
        assert_eq!(json["record_size"], 24);
        assert_eq!(json["tree_size"], 6000);
        assert_eq!(json["data_section_size"], 2984);
        assert_eq!(json["data_section_start_offset"], 6016);
        assert_eq!(json["data_section_end_offset"], 9000);
        assert_eq!(json["metadata_section_start_offset"], 9014);
        assert_eq!(json["description"]["en"], "Sample");
        assert_eq!(json["languages"][1], "zh-CN");
        assert_eq!(json["build_epoch"], 1_700_000_000u64);
        assert!(json.get("data_type_sizes").is_none());

        let json = sample_report(Some(TypeSizeTotals::default())).to_json();
        assert_eq!(json["data_type_sizes"]["float_size"], 0);
    }

    #[test]
    fn test_render_type_sizes() {
        let totals = TypeSizeTotals {
            pointer_bytes: 3,
            unrecognized_count: 2,
            ..Default::default()
        };
        let out = render_type_sizes(&totals, RenderOptions::default());
        assert!(out.starts_with("- Pointer Size  3\n"));
        assert!(out.ends_with("- Unrecognized Types 2\n"));
        assert_eq!(out.lines().count(), 13);
    }
}
