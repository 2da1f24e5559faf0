//! 정규화 -- 후보 레코드를 스키마로 검증하고 표준 필드를 붙입니다.
//!
//! 처리 순서:
//! 1. `schema.match_value`로 타입 검사 및 변환
//! 2. 이벤트 시각 결정 (스키마의 이벤트 시각 필드, 없으면 수집 시각)
//! 3. (소스 식별자, 오프셋, 후보 순번)에서 결정적인 행 식별자 생성
//! 4. 로그 타입 이름과 출처 정보 부착
//!
//! 같은 입력은 항상 같은 [`NormalizedEvent`]를 만듭니다.

use chrono::{DateTime, Utc};
use serde::ser::{Serialize, SerializeMap, Serializer};
use uuid::Uuid;

use crate::error::LogPipelineError;
use crate::logtype::LogType;
use crate::record::{CandidateRecord, Provenance};
use crate::schema::TypedValue;
use crate::schema::value::format_timestamp;

/// 행 식별자 UUIDv5 네임스페이스
const ROW_ID_NAMESPACE: Uuid = Uuid::from_u128(0x6c6f_6774_6964_4500_8000_726f_775f_6964);

/// 표준 필드 (이름, 카탈로그 타입, 설명)
pub const STANDARD_FIELDS: [(&str, &str, &str); 6] = [
    ("p_log_type", "string", "Log type name"),
    ("p_event_time", "timestamp", "Canonical event time"),
    ("p_row_id", "string", "Row identifier unique within its source"),
    ("p_source_id", "string", "Source stream identifier"),
    ("p_source_offset", "bigint", "Record offset within the source"),
    ("p_ingest_time", "timestamp", "Time the raw record was ingested"),
];

/// 검증을 통과하고 표준 필드가 붙은 이벤트
///
/// 생성 후에는 변경할 수 없습니다.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedEvent {
    log_type: String,
    event_time: DateTime<Utc>,
    row_id: Uuid,
    provenance: Provenance,
    fields: TypedValue,
    degraded: Vec<String>,
}

impl NormalizedEvent {
    pub fn log_type(&self) -> &str {
        &self.log_type
    }

    pub fn event_time(&self) -> DateTime<Utc> {
        self.event_time
    }

    pub fn row_id(&self) -> Uuid {
        self.row_id
    }

    pub fn provenance(&self) -> &Provenance {
        &self.provenance
    }

    /// 스키마 필드 값 (최상위 객체)
    pub fn fields(&self) -> &TypedValue {
        &self.fields
    }

    pub fn get(&self, name: &str) -> Option<&TypedValue> {
        self.fields.get(name)
    }

    /// 타입 불일치로 null 처리된 선택 필드 경로
    pub fn degraded_fields(&self) -> &[String] {
        &self.degraded
    }
}

impl Serialize for NormalizedEvent {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let entries = self.fields.entries();
        let mut map = serializer.serialize_map(Some(entries.len() + STANDARD_FIELDS.len()))?;
        for (name, value) in entries {
            map.serialize_entry(name, value)?;
        }
        map.serialize_entry("p_log_type", &self.log_type)?;
        map.serialize_entry("p_event_time", &format_timestamp(&self.event_time))?;
        map.serialize_entry("p_row_id", &self.row_id)?;
        map.serialize_entry("p_source_id", &*self.provenance.source_id)?;
        map.serialize_entry("p_source_offset", &self.provenance.offset)?;
        map.serialize_entry(
            "p_ingest_time",
            &format_timestamp(&self.provenance.ingested_at),
        )?;
        map.end()
    }
}

/// 결정적인 행 식별자
pub fn row_id(source_id: &str, offset: u64, index: u32) -> Uuid {
    let name = format!("{source_id}\u{1f}{offset}\u{1f}{index}");
    Uuid::new_v5(&ROW_ID_NAMESPACE, name.as_bytes())
}

/// 후보 레코드 정규화기
///
/// 상태가 없으므로 워커마다 하나씩 두거나 공유해도 됩니다.
#[derive(Debug, Clone, Copy, Default)]
pub struct Normalizer;

impl Normalizer {
    pub fn new() -> Self {
        Self
    }

    pub fn normalize(
        &self,
        candidate: CandidateRecord,
        log_type: &LogType,
        provenance: &Provenance,
    ) -> Result<NormalizedEvent, LogPipelineError> {
        let schema = log_type.schema();
        let matched =
            schema
                .match_value(&candidate.fields)
                .map_err(|e| LogPipelineError::Validation {
                    log_type: log_type.name().to_owned(),
                    reason: e.to_string(),
                })?;

        let event_time = schema
            .event_time(&matched.value)
            .unwrap_or(provenance.ingested_at);

        Ok(NormalizedEvent {
            log_type: log_type.name().to_owned(),
            event_time,
            row_id: row_id(&provenance.source_id, provenance.offset, candidate.index),
            provenance: provenance.clone(),
            fields: matched.value,
            degraded: matched.degraded,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logtype::{LogTypeConfig, LogTypeRegistry};
    use crate::parser::{AdapterFactory, JsonAdapter};
    use crate::schema::{Field, Schema, TimeFormat};
    use chrono::TimeZone;
    use serde_json::json;

    fn registry() -> LogTypeRegistry {
        LogTypeRegistry::build([LogTypeConfig::new(
            "DNS",
            "DNS queries",
            "https://example.com/dns",
            Schema::new(vec![
                Field::string("query", "질의").required(),
                Field::timestamp("timestamp", TimeFormat::Rfc3339, "시각")
                    .required()
                    .event_time(),
                Field::integer("ttl", "TTL"),
            ]),
        )
        .with_parser(AdapterFactory::shared(JsonAdapter::default()))])
        .unwrap()
    }

    fn provenance(offset: u64) -> Provenance {
        Provenance::new(
            "s3://bucket/dns/part-0001.log",
            offset,
            Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap(),
        )
    }

    #[test]
    fn normalizes_dns_record() {
        let registry = registry();
        let event = Normalizer::new()
            .normalize(
                CandidateRecord::new(
                    0,
                    json!({"query": "example.com", "timestamp": "2021-01-01T00:00:00Z"}),
                ),
                registry.lookup("DNS").unwrap(),
                &provenance(1),
            )
            .unwrap();

        assert_eq!(event.log_type(), "DNS");
        assert_eq!(
            event.get("query").and_then(TypedValue::as_str),
            Some("example.com")
        );
        assert_eq!(
            event.event_time(),
            Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn missing_required_field_is_validation_error() {
        let registry = registry();
        let err = Normalizer::new()
            .normalize(
                CandidateRecord::new(0, json!({"timestamp": "2021-01-01T00:00:00Z"})),
                registry.lookup("DNS").unwrap(),
                &provenance(1),
            )
            .unwrap_err();
        assert!(matches!(
            err,
            LogPipelineError::Validation { ref log_type, .. } if log_type == "DNS"
        ));
        assert!(err.to_string().contains("query"));
    }

    #[test]
    fn event_time_falls_back_to_ingest_time() {
        let log_type = LogTypeRegistry::build([LogTypeConfig::new(
            "Plain",
            "no time fields",
            "https://example.com",
            Schema::new(vec![Field::string("msg", "본문")]),
        )
        .with_parser(AdapterFactory::shared(JsonAdapter::default()))])
        .unwrap();
        let prov = provenance(3);
        let event = Normalizer::new()
            .normalize(
                CandidateRecord::new(0, json!({"msg": "hi"})),
                log_type.lookup("Plain").unwrap(),
                &prov,
            )
            .unwrap();
        assert_eq!(event.event_time(), prov.ingested_at);
    }

    #[test]
    fn row_id_is_deterministic_and_position_sensitive() {
        assert_eq!(row_id("a.log", 10, 0), row_id("a.log", 10, 0));
        assert_ne!(row_id("a.log", 10, 0), row_id("a.log", 11, 0));
        assert_ne!(row_id("a.log", 10, 0), row_id("a.log", 10, 1));
        assert_ne!(row_id("a.log", 10, 0), row_id("b.log", 10, 0));
        assert_eq!(row_id("a.log", 10, 0).get_version_num(), 5);
    }

    #[test]
    fn degraded_optional_field_is_reported() {
        let registry = registry();
        let event = Normalizer::new()
            .normalize(
                CandidateRecord::new(
                    0,
                    json!({"query": "a.com", "timestamp": "2021-01-01T00:00:00Z", "ttl": "soon"}),
                ),
                registry.lookup("DNS").unwrap(),
                &provenance(1),
            )
            .unwrap();
        assert!(event.get("ttl").unwrap().is_null());
        assert_eq!(event.degraded_fields(), ["ttl"]);
    }

    #[test]
    fn serialized_event_carries_standard_fields() {
        let registry = registry();
        let event = Normalizer::new()
            .normalize(
                CandidateRecord::new(
                    0,
                    json!({"query": "example.com", "timestamp": "2021-01-01T00:00:00Z"}),
                ),
                registry.lookup("DNS").unwrap(),
                &provenance(42),
            )
            .unwrap();
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["query"], "example.com");
        assert_eq!(json["timestamp"], "2021-01-01T00:00:00Z");
        assert_eq!(json["p_log_type"], "DNS");
        assert_eq!(json["p_event_time"], "2021-01-01T00:00:00Z");
        assert_eq!(json["p_source_offset"], 42);
        assert_eq!(json["p_row_id"], event.row_id().to_string());
        assert!(json["ttl"].is_null());
    }
}
