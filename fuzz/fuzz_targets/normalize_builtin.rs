#![no_main]

use std::sync::OnceLock;

use arbitrary::Arbitrary;
use chrono::{DateTime, Utc};
use libfuzzer_sys::fuzz_target;
use logtide_log_pipeline::{LogTypeRegistry, Normalizer, Provenance, RawRecord, logtypes};

/// 퍼저용 구조적 입력
#[derive(Arbitrary, Debug)]
struct FuzzInput {
    /// 내장 로그 타입 선택 (레지스트리 크기로 나머지 연산)
    log_type: u8,
    data: Vec<u8>,
}

fn registry() -> &'static LogTypeRegistry {
    static REGISTRY: OnceLock<LogTypeRegistry> = OnceLock::new();
    REGISTRY.get_or_init(|| logtypes::builtin_registry().expect("builtin registry"))
}

fuzz_target!(|input: FuzzInput| {
    let registry = registry();
    let names = registry.names();
    let name = names[usize::from(input.log_type) % names.len()];
    let Ok(log_type) = registry.lookup(name) else {
        return;
    };
    let Ok(parser) = log_type.new_parser() else {
        return;
    };

    let provenance = Provenance::new("fuzz", 1, DateTime::<Utc>::UNIX_EPOCH);
    let raw = RawRecord::new(input.data, provenance.clone());
    let Ok(candidates) = parser.parse(&raw) else {
        return;
    };

    let normalizer = Normalizer::new();
    for candidate in candidates {
        if let Ok(event) = normalizer.normalize(candidate, log_type, &provenance) {
            // 이벤트는 디스패치된 로그 타입을 유지
            assert_eq!(event.log_type(), name);
        }
    }
});
