#![no_main]
use chrono::Datelike;
use libfuzzer_sys::fuzz_target;
use soil_core::time::{from_storage, normalize_measured_at, to_storage};

fuzz_target!(|input: (&str, i64)| {
    let (raw, slot) = input;
    if let Ok(at) = normalize_measured_at(raw, slot) {
        // Four-digit years must survive the storage format unchanged.
        if (0..=9999).contains(&at.year()) {
            assert_eq!(from_storage(&to_storage(at)), Some(at));
        }
    }
});
