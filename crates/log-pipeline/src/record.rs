//! 파이프라인 단계 사이를 흐르는 레코드 타입
//!
//! ```text
//! RawRecord --ParserAdapter--> CandidateRecord --Normalizer--> NormalizedEvent
//! ```

use std::sync::Arc;

use bytes::Bytes;
use chrono::{DateTime, Utc};

/// 원시 레코드의 출처 정보
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provenance {
    /// 소스 식별자 (파일 경로 등)
    pub source_id: Arc<str>,
    /// 소스 내 위치 (1부터 시작하는 라인 번호)
    pub offset: u64,
    /// 수집 시각
    pub ingested_at: DateTime<Utc>,
}

impl Provenance {
    pub fn new(source_id: impl Into<Arc<str>>, offset: u64, ingested_at: DateTime<Utc>) -> Self {
        Self {
            source_id: source_id.into(),
            offset,
            ingested_at,
        }
    }
}

/// 소스 스트림에서 읽은 불투명한 바이트 단위
///
/// 정확히 한 번의 파서 호출에서 소비됩니다.
#[derive(Debug, Clone)]
pub struct RawRecord {
    pub data: Bytes,
    pub provenance: Provenance,
}

impl RawRecord {
    pub fn new(data: impl Into<Bytes>, provenance: Provenance) -> Self {
        Self {
            data: data.into(),
            provenance,
        }
    }

    /// 출처 오프셋
    pub fn offset(&self) -> u64 {
        self.provenance.offset
    }
}

/// 파서 어댑터가 만든 검증 전 레코드
///
/// 구조적으로 불완전할 수 있으며, 정규화 단계에서 스키마와 대조됩니다.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateRecord {
    /// 하나의 원시 레코드 안에서의 순번 (단일 레코드 포맷은 항상 0)
    pub index: u32,
    /// 느슨한 타입의 필드 값
    pub fields: serde_json::Value,
}

impl CandidateRecord {
    pub fn new(index: u32, fields: serde_json::Value) -> Self {
        Self { index, fields }
    }
}
