//! JSON 봉투(envelope) 파서 -- 레코드 배열을 담은 JSON 문서
//!
//! CloudTrail 로그 파일처럼 하나의 문서가 `{"Records": [ ... ]}` 형태로
//! 여러 레코드를 담는 형식입니다. 배열 원소마다 후보 레코드 하나를 만들며,
//! 원소 순번이 [`CandidateRecord::index`](crate::record::CandidateRecord::index)가 됩니다.

use serde_json::Value;

use super::{Candidates, ParserAdapter, check_size, parse_error};
use crate::error::LogPipelineError;
use crate::record::{CandidateRecord, RawRecord};

const FORMAT: &str = "json_envelope";

/// 레코드 배열 봉투 파서
#[derive(Debug, Clone)]
pub struct JsonEnvelopeAdapter {
    /// 레코드 배열이 들어 있는 최상위 키
    records_key: String,
    /// 봉투 없이 들어온 레코드(객체 하나 또는 배열)도 허용할지 여부
    allow_bare_records: bool,
    max_input_size: Option<usize>,
}

impl JsonEnvelopeAdapter {
    pub fn new(records_key: impl Into<String>) -> Self {
        Self {
            records_key: records_key.into(),
            allow_bare_records: false,
            max_input_size: None,
        }
    }

    /// 봉투 없는 입력을 허용합니다.
    ///
    /// - 최상위 배열: 원소마다 후보 하나 (`[{..}, {..}]`)
    /// - 봉투 키가 없는 객체: 후보 하나
    ///
    /// 같은 로그가 파일(봉투)과 이벤트 스트림(단일 레코드) 양쪽으로 들어올 때 사용합니다.
    pub fn allow_bare_records(mut self, allow: bool) -> Self {
        self.allow_bare_records = allow;
        self
    }

    pub fn with_max_input_size(mut self, size: usize) -> Self {
        self.max_input_size = Some(size);
        self
    }
}

impl ParserAdapter for JsonEnvelopeAdapter {
    fn format_name(&self) -> &str {
        FORMAT
    }

    fn parse(&self, raw: &RawRecord) -> Result<Candidates, LogPipelineError> {
        check_size(FORMAT, raw, self.max_input_size)?;

        let value: Value = serde_json::from_slice(&raw.data)
            .map_err(|e| parse_error(FORMAT, raw, format!("column {}: {e}", e.column())))?;

        let mut doc = match value {
            Value::Object(doc) => doc,
            Value::Array(records) if self.allow_bare_records => return Ok(fan_out(records)),
            _ => {
                return Err(parse_error(
                    FORMAT,
                    raw,
                    "expected JSON object at top level",
                ));
            }
        };

        match doc.remove(&self.records_key) {
            Some(Value::Array(records)) => Ok(fan_out(records)),
            Some(other) => Err(parse_error(
                FORMAT,
                raw,
                format!(
                    "'{}' must be an array, found {}",
                    self.records_key,
                    crate::schema::coerce::json_type_name(&other)
                ),
            )),
            None if self.allow_bare_records => Ok(Candidates::one(Value::Object(doc))),
            None => Err(parse_error(
                FORMAT,
                raw,
                format!("missing '{}' array", self.records_key),
            )),
        }
    }
}

/// 배열 원소마다 후보 하나. 원소 순번이 인덱스가 됩니다.
fn fan_out(records: Vec<Value>) -> Candidates {
    Candidates::from_records(
        records
            .into_iter()
            .enumerate()
            .map(|(idx, fields)| CandidateRecord::new(idx as u32, fields)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::test_util::raw;

    #[test]
    fn yields_one_candidate_per_element_in_order() {
        let parser = JsonEnvelopeAdapter::new("Records");
        let candidates: Vec<_> = parser
            .parse(&raw(
                r#"{"Records":[{"eventName":"A"},{"eventName":"B"},{"eventName":"C"}]}"#,
            ))
            .unwrap()
            .collect();
        let names: Vec<_> = candidates
            .iter()
            .map(|c| (c.index, c.fields["eventName"].as_str().unwrap().to_owned()))
            .collect();
        assert_eq!(
            names,
            [(0, "A".to_owned()), (1, "B".to_owned()), (2, "C".to_owned())]
        );
    }

    #[test]
    fn empty_records_array_yields_nothing() {
        let parser = JsonEnvelopeAdapter::new("Records");
        assert_eq!(parser.parse(&raw(r#"{"Records":[]}"#)).unwrap().count(), 0);
    }

    #[test]
    fn missing_key_is_error_unless_bare_allowed() {
        let strict = JsonEnvelopeAdapter::new("Records");
        assert!(strict.parse(&raw(r#"{"eventName":"A"}"#)).is_err());

        let lenient = JsonEnvelopeAdapter::new("Records").allow_bare_records(true);
        let candidates: Vec<_> = lenient
            .parse(&raw(r#"{"eventName":"A"}"#))
            .unwrap()
            .collect();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].fields["eventName"], "A");
    }

    #[test]
    fn bare_array_is_fanned_out_when_allowed() {
        let input = r#"[{"eventName":"A"},{"eventName":"B"}]"#;

        let strict = JsonEnvelopeAdapter::new("Records");
        let err = strict.parse(&raw(input)).unwrap_err();
        assert!(err.to_string().contains("expected JSON object"));

        let lenient = JsonEnvelopeAdapter::new("Records").allow_bare_records(true);
        let candidates: Vec<_> = lenient.parse(&raw(input)).unwrap().collect();
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].index, 0);
        assert_eq!(candidates[1].index, 1);
        assert_eq!(candidates[1].fields["eventName"], "B");
    }

    #[test]
    fn bare_scalar_is_error_even_when_allowed() {
        let lenient = JsonEnvelopeAdapter::new("Records").allow_bare_records(true);
        assert!(lenient.parse(&raw("42")).is_err());
    }

    #[test]
    fn non_array_records_is_error() {
        let parser = JsonEnvelopeAdapter::new("Records");
        let err = parser.parse(&raw(r#"{"Records":{"a":1}}"#)).unwrap_err();
        assert!(err.to_string().contains("must be an array"));
    }
}
