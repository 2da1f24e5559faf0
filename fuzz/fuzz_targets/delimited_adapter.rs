#![no_main]

use arbitrary::Arbitrary;
use chrono::{DateTime, Utc};
use libfuzzer_sys::fuzz_target;
use logtide_log_pipeline::parser::delimited::FieldCountPolicy;
use logtide_log_pipeline::parser::{CsvAdapter, ParserAdapter};
use logtide_log_pipeline::{Provenance, RawRecord};

/// 퍼저용 구조적 입력
#[derive(Arbitrary, Debug)]
struct FuzzInput {
    delimiter: FuzzDelimiter,
    reject_mismatch: bool,
    line: String,
}

#[derive(Arbitrary, Debug)]
enum FuzzDelimiter {
    Comma,
    Tab,
    Space,
}

fuzz_target!(|input: FuzzInput| {
    let delimiter = match input.delimiter {
        FuzzDelimiter::Comma => b',',
        FuzzDelimiter::Tab => b'\t',
        FuzzDelimiter::Space => b' ',
    };
    let policy = if input.reject_mismatch {
        FieldCountPolicy::Reject
    } else {
        FieldCountPolicy::Lenient
    };
    let adapter = CsvAdapter::new(["ts", "src", "dst", "action"])
        .delimiter(delimiter)
        .comment(b'#')
        .null_tokens(["-"])
        .field_count_policy(policy);

    let raw = RawRecord::new(
        input.line.into_bytes(),
        Provenance::new("fuzz", 1, DateTime::<Utc>::UNIX_EPOCH),
    );
    let _ = adapter.parse(&raw).map(Iterator::count);
});
