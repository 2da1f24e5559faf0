//! 내장 로그 타입 선언
//!
//! 플랫폼이 지원하는 포맷의 유일한 목록입니다. 벤더별 모듈이 자기 선언을 반환하고,
//! [`builtin`]이 고정된 순서로 이어 붙입니다. 순서는 카탈로그 출력의 결정성에 영향을 주므로
//! 새 벤더는 끝에 추가합니다.

pub mod aws;
pub mod fortinet;
pub mod zeek;

use crate::error::LogPipelineError;
use crate::logtype::{LogTypeConfig, LogTypeRegistry};

/// 모든 내장 로그 타입 선언 (등록 순서)
pub fn builtin() -> Vec<LogTypeConfig> {
    let mut types = zeek::log_types();
    types.extend(aws::log_types());
    types.extend(fortinet::log_types());
    types
}

/// 내장 선언으로 레지스트리를 구성합니다.
pub fn builtin_registry() -> Result<LogTypeRegistry, LogPipelineError> {
    LogTypeRegistry::build(builtin())
}
