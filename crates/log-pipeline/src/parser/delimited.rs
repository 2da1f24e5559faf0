//! 구분자 텍스트 파서 -- 헤더가 고정된 CSV/TSV/공백 구분 레코드
//!
//! 헤더는 생성 시점에 고정되며, 각 레코드의 열을 헤더 이름에 대응시켜
//! 문자열 값의 JSON 객체를 만듭니다. 타입 변환은 스키마 매칭 단계에서 수행합니다.
//!
//! 인용 규칙과 이스케이프는 `csv` 크레이트에 맡깁니다.

use serde_json::{Map, Value};

use super::{Candidates, ParserAdapter, check_size, parse_error};
use crate::error::LogPipelineError;
use crate::record::RawRecord;

const FORMAT: &str = "csv";

/// 열 개수가 헤더와 다를 때의 처리 방식
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FieldCountPolicy {
    /// 레코드 거부 (기본값)
    #[default]
    Reject,
    /// 부족한 열은 null, 남는 열은 무시
    Lenient,
}

/// 헤더 고정 구분자 텍스트 파서
#[derive(Debug, Clone)]
pub struct CsvAdapter {
    header: Vec<String>,
    delimiter: u8,
    comment: Option<u8>,
    null_tokens: Vec<String>,
    field_count: FieldCountPolicy,
    max_input_size: Option<usize>,
}

impl CsvAdapter {
    /// 쉼표 구분 파서를 생성합니다.
    pub fn new<I, S>(header: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            header: header.into_iter().map(Into::into).collect(),
            delimiter: b',',
            comment: None,
            null_tokens: Vec::new(),
            field_count: FieldCountPolicy::Reject,
            max_input_size: None,
        }
    }

    pub fn delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// 이 바이트로 시작하는 라인은 주석으로 보고 건너뜁니다.
    pub fn comment(mut self, prefix: u8) -> Self {
        self.comment = Some(prefix);
        self
    }

    /// null로 취급할 값 (예: `-`, `NODATA`)
    pub fn null_tokens<I, S>(mut self, tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.null_tokens = tokens.into_iter().map(Into::into).collect();
        self
    }

    pub fn field_count_policy(mut self, policy: FieldCountPolicy) -> Self {
        self.field_count = policy;
        self
    }

    pub fn with_max_input_size(mut self, size: usize) -> Self {
        self.max_input_size = Some(size);
        self
    }

    pub fn header(&self) -> &[String] {
        &self.header
    }

    fn is_header_line(&self, record: &csv::StringRecord) -> bool {
        record.len() == self.header.len() && record.iter().zip(&self.header).all(|(a, b)| a == b)
    }

    fn to_value(&self, field: &str) -> Value {
        if self.null_tokens.iter().any(|t| t == field) {
            Value::Null
        } else {
            Value::String(field.to_owned())
        }
    }
}

impl ParserAdapter for CsvAdapter {
    fn format_name(&self) -> &str {
        FORMAT
    }

    fn parse(&self, raw: &RawRecord) -> Result<Candidates, LogPipelineError> {
        check_size(FORMAT, raw, self.max_input_size)?;

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .delimiter(self.delimiter)
            .comment(self.comment)
            .from_reader(raw.data.as_ref());

        let mut record = csv::StringRecord::new();
        let found = reader
            .read_record(&mut record)
            .map_err(|e| parse_error(FORMAT, raw, e.to_string()))?;

        // 주석 또는 빈 레코드
        if !found || self.is_header_line(&record) {
            return Ok(Candidates::empty());
        }

        if record.len() != self.header.len() && self.field_count == FieldCountPolicy::Reject {
            return Err(parse_error(
                FORMAT,
                raw,
                format!(
                    "expected {} fields, found {}",
                    self.header.len(),
                    record.len()
                ),
            ));
        }

        let mut fields = Map::with_capacity(self.header.len());
        for (idx, name) in self.header.iter().enumerate() {
            let value = record.get(idx).map_or(Value::Null, |f| self.to_value(f));
            fields.insert(name.clone(), value);
        }

        Ok(Candidates::one(Value::Object(fields)))
    }
}
