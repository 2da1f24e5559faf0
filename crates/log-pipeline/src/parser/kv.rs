//! key=value 파서
//!
//! FortiGate, 일부 방화벽/프록시 로그처럼 공백으로 구분된 `key=value` 쌍을 디코딩합니다.
//! 값은 큰따옴표로 감쌀 수 있으며, 따옴표 안에서는 `\"`와 `\\` 이스케이프를 지원합니다.
//!
//! ```text
//! date=2019-05-10 time=11:37:47 devname="FG 100E" srcip=10.1.100.11 action="deny"
//! ```

use serde_json::{Map, Value};

use super::{Candidates, ParserAdapter, check_size, parse_error};
use crate::error::LogPipelineError;
use crate::record::RawRecord;

const FORMAT: &str = "kv";

/// key=value 쌍 파서
///
/// 같은 키가 여러 번 나오면 마지막 값을 사용합니다.
#[derive(Debug, Clone)]
pub struct KeyValueAdapter {
    separator: char,
    null_tokens: Vec<String>,
    max_input_size: Option<usize>,
}

impl KeyValueAdapter {
    pub fn new() -> Self {
        Self {
            separator: '=',
            null_tokens: Vec::new(),
            max_input_size: None,
        }
    }

    /// 키와 값 사이의 구분 문자 (기본 `=`)
    pub fn separator(mut self, separator: char) -> Self {
        self.separator = separator;
        self
    }

    /// null로 취급할 값. 따옴표로 감싼 값에는 적용하지 않습니다.
    pub fn null_tokens<I, S>(mut self, tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.null_tokens = tokens.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_max_input_size(mut self, size: usize) -> Self {
        self.max_input_size = Some(size);
        self
    }

    fn split_pairs(&self, line: &str) -> Result<Map<String, Value>, String> {
        let mut fields = Map::new();
        let mut chars = line.char_indices().peekable();

        loop {
            // 쌍 사이 공백
            while chars.next_if(|(_, c)| c.is_whitespace()).is_some() {}
            let Some(&(key_start, _)) = chars.peek() else {
                break;
            };

            let mut key_end = None;
            while let Some((idx, c)) = chars.next() {
                if c == self.separator {
                    key_end = Some(idx);
                    break;
                }
                if c.is_whitespace() {
                    return Err(format!(
                        "token '{}' has no '{}'",
                        &line[key_start..idx],
                        self.separator
                    ));
                }
            }
            let Some(key_end) = key_end else {
                return Err(format!(
                    "token '{}' has no '{}'",
                    &line[key_start..],
                    self.separator
                ));
            };
            let key = &line[key_start..key_end];
            if key.is_empty() {
                return Err(format!("empty key at byte {key_start}"));
            }

            let value = if chars.next_if(|(_, c)| *c == '"').is_some() {
                let mut buf = String::new();
                let mut closed = false;
                while let Some((_, c)) = chars.next() {
                    match c {
                        '\\' => match chars.next() {
                            Some((_, escaped)) => buf.push(escaped),
                            None => break,
                        },
                        '"' => {
                            closed = true;
                            break;
                        }
                        other => buf.push(other),
                    }
                }
                if !closed {
                    return Err(format!("unterminated quote in value of '{key}'"));
                }
                Value::String(buf)
            } else {
                let start = chars.peek().map_or(line.len(), |(idx, _)| *idx);
                let mut end = line.len();
                while let Some(&(idx, c)) = chars.peek() {
                    if c.is_whitespace() {
                        end = idx;
                        break;
                    }
                    chars.next();
                }
                let text = &line[start..end];
                if self.null_tokens.iter().any(|t| t == text) {
                    Value::Null
                } else {
                    Value::String(text.to_owned())
                }
            };

            fields.insert(key.to_owned(), value);
        }

        Ok(fields)
    }
}

impl Default for KeyValueAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl ParserAdapter for KeyValueAdapter {
    fn format_name(&self) -> &str {
        FORMAT
    }

    fn parse(&self, raw: &RawRecord) -> Result<Candidates, LogPipelineError> {
        check_size(FORMAT, raw, self.max_input_size)?;

        let line = std::str::from_utf8(&raw.data)
            .map_err(|e| parse_error(FORMAT, raw, format!("invalid utf-8: {e}")))?;

        let fields = self
            .split_pairs(line)
            .map_err(|reason| parse_error(FORMAT, raw, reason))?;

        if fields.is_empty() {
            return Err(parse_error(FORMAT, raw, "no key-value pairs"));
        }

        Ok(Candidates::one(Value::Object(fields)))
    }
}
