#![no_main]

use chrono::{DateTime, Utc};
use libfuzzer_sys::fuzz_target;
use logtide_log_pipeline::parser::{KeyValueAdapter, ParserAdapter};
use logtide_log_pipeline::{Provenance, RawRecord};

fuzz_target!(|data: &[u8]| {
    let raw = RawRecord::new(
        data.to_vec(),
        Provenance::new("fuzz", 1, DateTime::<Utc>::UNIX_EPOCH),
    );
    let adapter = KeyValueAdapter::new().null_tokens(["N/A"]);
    let _ = adapter.parse(&raw).map(Iterator::count);
});
