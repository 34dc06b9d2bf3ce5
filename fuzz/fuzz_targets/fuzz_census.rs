#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Any byte string is a data section: the walk either finishes or reports truncation
    let _ = mmdb_census::census::decode_bytes(data, 0, data.len() as u64);

    if let Some((&skip, rest)) = data.split_first() {
        let start = skip as u64 % (rest.len() as u64 + 1);
        let _ = mmdb_census::census::decode_bytes(rest, start, rest.len() as u64);
    }
});
