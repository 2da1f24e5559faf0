#![no_main]

use chrono::{DateTime, Utc};
use libfuzzer_sys::fuzz_target;
use logtide_log_pipeline::parser::{JsonEnvelopeAdapter, ParserAdapter};
use logtide_log_pipeline::{Provenance, RawRecord};

fuzz_target!(|data: &[u8]| {
    let raw = RawRecord::new(
        data.to_vec(),
        Provenance::new("fuzz", 1, DateTime::<Utc>::UNIX_EPOCH),
    );
    let adapter = JsonEnvelopeAdapter::new("Records").allow_bare_records(true);
    if let Ok(candidates) = adapter.parse(&raw) {
        // 후보 인덱스는 0부터 연속
        for (expected, candidate) in candidates.enumerate() {
            assert_eq!(candidate.index as usize, expected);
        }
    }
});
