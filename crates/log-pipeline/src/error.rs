//! 로그 파이프라인 에러 타입
//!
//! [`LogPipelineError`]는 로그 파이프라인 내부에서 발생하는 모든 에러를 표현합니다.
//! `From<LogPipelineError> for LogtideError` 변환이 구현되어 있어
//! 상위 레이어에서 `?` 연산자로 자연스럽게 전파할 수 있습니다.
//!
//! # 에러 분류
//!
//! | 분류 | 변형 | 처리 |
//! |------|------|------|
//! | 기동 시점 | `InvalidSchema`, `DuplicateLogType`, `MissingParser`, `InvalidLogType` | 프로세스 기동 중단 |
//! | 조회 | `LogTypeNotFound` | 호출자에게 반환 |
//! | 레코드 단위 | `UnknownSource`, `Parse`, `Validation` | 레코드 드롭, 집계 후 계속 처리 |

use std::fmt;

use logtide_core::error::{LogtideError, PipelineError};
use serde::{Deserialize, Serialize};

use crate::schema::SchemaError;

/// 로그 파이프라인 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum LogPipelineError {
    /// 로그 타입 스키마 자체 검증 실패
    #[error("invalid schema for log type '{log_type}': {source}")]
    InvalidSchema {
        /// 로그 타입 이름
        log_type: String,
        /// 스키마 검증 에러
        source: SchemaError,
    },

    /// 동일한 이름의 로그 타입이 이미 등록됨
    #[error("duplicate log type: {0}")]
    DuplicateLogType(String),

    /// 파서 팩토리가 지정되지 않은 로그 타입
    #[error("log type '{0}' has no parser factory")]
    MissingParser(String),

    /// 로그 타입 메타데이터(이름, 설명, 참조 URL) 검증 실패
    #[error("invalid log type '{name}': {reason}")]
    InvalidLogType {
        /// 로그 타입 이름
        name: String,
        /// 실패 사유
        reason: String,
    },

    /// 레지스트리에 없는 로그 타입 조회
    #[error("log type not found: {0}")]
    LogTypeNotFound(String),

    /// 소스를 로그 타입으로 분류할 수 없음
    #[error("unknown source: {0}")]
    UnknownSource(String),

    /// 원시 레코드 디코딩 실패
    #[error("parse error: {format} at offset {offset}: {reason}")]
    Parse {
        /// 파서 형식 (json, csv, kv 등)
        format: String,
        /// 소스 내 레코드 위치 (라인 번호)
        offset: u64,
        /// 실패 사유
        reason: String,
    },

    /// 후보 레코드가 필수 필드 제약을 만족하지 못함
    #[error("validation error: {log_type}: {reason}")]
    Validation {
        /// 로그 타입 이름
        log_type: String,
        /// 실패 사유
        reason: String,
    },

    /// 설정 에러
    #[error("config error: {field}: {reason}")]
    Config {
        /// 설정 필드명
        field: String,
        /// 에러 사유
        reason: String,
    },

    /// 배치 전달 실패
    #[error("sink error: {target}: {reason}")]
    Sink {
        /// 전달 대상 (경로, 채널 이름 등)
        target: String,
        /// 실패 사유
        reason: String,
    },

    /// 채널 통신 에러
    #[error("channel error: {0}")]
    Channel(String),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON 직렬화 에러
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// 정규식 컴파일 에러
    #[error("regex error: {0}")]
    Regex(#[from] regex::Error),
}

impl LogPipelineError {
    /// 레코드 단위 에러이면 그 종류를 반환합니다.
    ///
    /// 레코드 단위 에러는 해당 레코드만 드롭하고 스트림 처리를 계속합니다.
    /// `None`이면 기동 시점 에러이거나 스트림 전체에 영향을 주는 에러입니다.
    pub fn record_error_kind(&self) -> Option<RecordErrorKind> {
        match self {
            Self::UnknownSource(_) | Self::LogTypeNotFound(_) => Some(RecordErrorKind::UnknownSource),
            Self::Parse { .. } => Some(RecordErrorKind::Parse),
            Self::Validation { .. } => Some(RecordErrorKind::Validation),
            _ => None,
        }
    }
}

impl From<LogPipelineError> for LogtideError {
    fn from(err: LogPipelineError) -> Self {
        LogtideError::Pipeline(PipelineError::InitFailed(err.to_string()))
    }
}

/// 레코드 단위 에러 종류
///
/// 운영자에게 로그 타입별/종류별 집계로 노출됩니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordErrorKind {
    /// 소스 분류 실패
    UnknownSource,
    /// 디코딩 실패
    Parse,
    /// 필수 필드 검증 실패
    Validation,
}

impl RecordErrorKind {
    /// 모든 종류 (집계 출력 순서)
    pub const ALL: [RecordErrorKind; 3] = [Self::UnknownSource, Self::Parse, Self::Validation];

    /// 메트릭 레이블 값
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UnknownSource => "unknown_source",
            Self::Parse => "parse",
            Self::Validation => "validation",
        }
    }
}

impl fmt::Display for RecordErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
