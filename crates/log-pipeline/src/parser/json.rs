//! JSON 라인 파서
//!
//! 한 줄에 JSON 객체 하나가 있는 형식을 디코딩합니다.
//! Zeek JSON 로그, CloudWatch 이벤트 등 대부분의 구조화 로그가 이 형식입니다.
//!
//! # 사용 예시
//! ```ignore
//! use logtide_log_pipeline::parser::{JsonAdapter, ParserAdapter};
//!
//! let parser = JsonAdapter::default();
//! let mut candidates = parser.parse(&raw)?;
//! let first = candidates.next().unwrap();
//! assert_eq!(first.fields["query"], "example.com");
//! ```

use serde_json::Value;

use super::{Candidates, ParserAdapter, check_size, parse_error};
use crate::error::LogPipelineError;
use crate::record::RawRecord;

const FORMAT: &str = "json";

/// JSON 라인 파서
///
/// 최상위 값이 객체가 아니면 파싱 에러입니다.
#[derive(Debug, Clone)]
pub struct JsonAdapter {
    /// 어댑터 자체 입력 상한 (바이트). 없으면 소스 한도만 적용
    max_input_size: Option<usize>,
}

impl JsonAdapter {
    pub fn new() -> Self {
        Self {
            max_input_size: None,
        }
    }

    /// 최대 입력 크기를 설정합니다.
    pub fn with_max_input_size(mut self, size: usize) -> Self {
        self.max_input_size = Some(size);
        self
    }
}

impl Default for JsonAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl ParserAdapter for JsonAdapter {
    fn format_name(&self) -> &str {
        FORMAT
    }

    fn parse(&self, raw: &RawRecord) -> Result<Candidates, LogPipelineError> {
        check_size(FORMAT, raw, self.max_input_size)?;

        let value: Value = serde_json::from_slice(&raw.data)
            .map_err(|e| parse_error(FORMAT, raw, format!("column {}: {e}", e.column())))?;

        // 최상위가 JSON 객체여야 합니다
        if !value.is_object() {
            return Err(parse_error(
                FORMAT,
                raw,
                "expected JSON object at top level",
            ));
        }

        Ok(Candidates::one(value))
    }
}
