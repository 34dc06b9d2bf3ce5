#![no_main]
use libfuzzer_sys::fuzz_target;
use mmdb_census::{Metadata, SectionLayout, METADATA_MARKER};

fuzz_target!(|data: &[u8]| {
    // Garbage after a marker must never panic the metadata decoder
    let mut file = METADATA_MARKER.to_vec();
    file.extend_from_slice(data);

    if let Ok(section) = Metadata::from_bytes(&file) {
        let md = section.metadata;
        let _ = SectionLayout::new(md.record_size, md.node_count, section.marker_offset);
    }
});
