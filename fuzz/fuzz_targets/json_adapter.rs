#![no_main]

use chrono::{DateTime, Utc};
use libfuzzer_sys::fuzz_target;
use logtide_log_pipeline::parser::{JsonAdapter, ParserAdapter};
use logtide_log_pipeline::{Provenance, RawRecord};

fuzz_target!(|data: &[u8]| {
    let raw = RawRecord::new(
        data.to_vec(),
        Provenance::new("fuzz", 1, DateTime::<Utc>::UNIX_EPOCH),
    );
    if let Ok(candidates) = JsonAdapter::default().parse(&raw) {
        // 한 줄은 최대 하나의 후보
        assert!(candidates.count() <= 1);
    }
});
