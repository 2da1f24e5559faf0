//! 스키마 모델 -- 로그 타입별 정규화 레코드의 형태를 기술합니다.
//!
//! [`Schema`]는 최상위 객체의 필드 목록이며, 각 [`Field`]는 기본 타입
//! (문자열, 정수, 실수, 불리언, 타임스탬프) 또는 복합 타입(배열, 객체)을 가집니다.
//!
//! - [`Schema::validate`]: 선언 자체의 일관성 검사 (중복 이름, 빈 객체, 이름 규칙)
//! - [`Schema::match_value`]: 느슨한 타입의 JSON 값을 스키마에 맞춰 변환
//!
//! 두 연산 모두 순수 함수이며 I/O나 전역 상태를 사용하지 않습니다.
//!
//! # 사용 예시
//! ```
//! use logtide_log_pipeline::schema::{Field, Schema, TimeFormat};
//!
//! let schema = Schema::new(vec![
//!     Field::string("query", "DNS 질의 도메인").required(),
//!     Field::timestamp("timestamp", TimeFormat::Rfc3339, "이벤트 시각")
//!         .required()
//!         .event_time(),
//! ]);
//! schema.validate().unwrap();
//!
//! let matched = schema
//!     .match_value(&serde_json::json!({"query": "example.com", "timestamp": "2021-01-01T00:00:00Z"}))
//!     .unwrap();
//! assert_eq!(matched.value.get("query").and_then(|v| v.as_str()), Some("example.com"));
//! ```

pub mod coerce;
pub mod time;
pub mod value;

use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

pub use time::TimeFormat;
pub use value::TypedValue;

/// 표준 필드 이름 접두어. 스키마 선언에서 사용할 수 없습니다.
pub const RESERVED_PREFIX: &str = "p_";

/// 필드 타입
///
/// 닫힌 집합이므로 알 수 없는 타입은 표현 자체가 불가능합니다.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    String,
    Integer,
    Float,
    Boolean,
    /// 형식 힌트를 가진 타임스탬프
    Timestamp(TimeFormat),
    /// 모든 원소가 같은 타입인 순서 있는 목록
    Array(Box<FieldKind>),
    /// 이름 있는 자식 필드의 집합 (선언 순서 유지)
    Object(Vec<Field>),
}

impl FieldKind {
    /// 에러 메시지에 사용하는 타입 이름
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Boolean => "boolean",
            Self::Timestamp(_) => "timestamp",
            Self::Array(_) => "array",
            Self::Object(_) => "object",
        }
    }
}

/// 스키마의 단일 필드
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    name: String,
    kind: FieldKind,
    required: bool,
    description: String,
    source: Option<String>,
    event_time: bool,
}

impl Field {
    /// 선택(nullable) 필드를 생성합니다.
    pub fn new(name: impl Into<String>, kind: FieldKind, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            required: false,
            description: description.into(),
            source: None,
            event_time: false,
        }
    }

    pub fn string(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, FieldKind::String, description)
    }

    pub fn integer(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Integer, description)
    }

    pub fn float(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Float, description)
    }

    pub fn boolean(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Boolean, description)
    }

    pub fn timestamp(
        name: impl Into<String>,
        format: TimeFormat,
        description: impl Into<String>,
    ) -> Self {
        Self::new(name, FieldKind::Timestamp(format), description)
    }

    pub fn array(
        name: impl Into<String>,
        element: FieldKind,
        description: impl Into<String>,
    ) -> Self {
        Self::new(name, FieldKind::Array(Box::new(element)), description)
    }

    pub fn object(
        name: impl Into<String>,
        children: Vec<Field>,
        description: impl Into<String>,
    ) -> Self {
        Self::new(name, FieldKind::Object(children), description)
    }

    /// 필수 필드로 표시합니다. 누락되거나 타입이 맞지 않으면 레코드가 거부됩니다.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// 원본 입력의 키가 정규화 이름과 다를 때 원본 키를 지정합니다.
    pub fn source(mut self, key: impl Into<String>) -> Self {
        self.source = Some(key.into());
        self
    }

    /// 이벤트 시각 후보로 표시합니다. 타임스탬프 필드에만 허용됩니다.
    pub fn event_time(mut self) -> Self {
        self.event_time = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &FieldKind {
        &self.kind
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// 원본 입력에서 값을 찾을 키
    pub fn input_key(&self) -> &str {
        self.source.as_deref().unwrap_or(&self.name)
    }

    pub fn is_event_time(&self) -> bool {
        self.event_time
    }
}

/// 스키마 선언 에러
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    /// 최상위 필드가 없음
    #[error("schema has no fields")]
    Empty,

    /// 자식이 없는 객체 필드
    #[error("object field '{path}' has no children")]
    EmptyObject { path: String },

    /// 같은 레벨에 같은 이름이 두 번 선언됨
    #[error("duplicate field '{path}'")]
    DuplicateField { path: String },

    /// 이름 규칙 위반 (`[A-Za-z_][A-Za-z0-9_]*`)
    #[error("invalid field name '{name}' at '{path}'")]
    InvalidName { path: String, name: String },

    /// 표준 필드 접두어(`p_`) 사용
    #[error("field name '{path}' uses reserved prefix 'p_'")]
    ReservedName { path: String },

    /// 타임스탬프가 아닌 필드에 이벤트 시각 표시
    #[error("event time field '{path}' is not a timestamp")]
    EventTimeNotTimestamp { path: String },

    /// 잘못된 타임스탬프 형식 힌트
    #[error("invalid time format at '{path}': {reason}")]
    InvalidTimeFormat { path: String, reason: String },
}

/// 스키마 매칭 실패
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MatchError {
    /// 필수 필드 누락 또는 null
    #[error("missing required field '{path}'")]
    MissingRequired { path: String },

    /// 필수 필드의 타입 불일치
    #[error("field '{path}': expected {expected}, found {found}")]
    TypeMismatch {
        path: String,
        expected: &'static str,
        found: String,
    },
}

/// 스키마 매칭 결과
#[derive(Debug, Clone, PartialEq)]
pub struct Matched {
    /// 스키마에 맞춰 변환된 최상위 객체
    pub value: TypedValue,
    /// 타입 불일치로 null 처리된 선택 필드 경로
    pub degraded: Vec<String>,
}

/// 로그 타입 하나의 정규화 레코드 스키마
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    root: Vec<Field>,
}

impl Schema {
    pub fn new(root: Vec<Field>) -> Self {
        Self { root }
    }

    /// 최상위 필드 목록
    pub fn fields(&self) -> &[Field] {
        &self.root
    }

    /// 선언의 내부 일관성을 검사합니다.
    pub fn validate(&self) -> Result<(), SchemaError> {
        if self.root.is_empty() {
            return Err(SchemaError::Empty);
        }
        validate_fields(&self.root, "")
    }

    /// 입력 값을 스키마에 맞춰 변환합니다.
    ///
    /// - 스키마에 없는 입력 키는 버립니다.
    /// - 누락/null 선택 필드는 `Null`이 됩니다.
    /// - 선택 필드의 타입 불일치는 `Null`로 강등하고 경로를 `degraded`에 기록합니다.
    /// - 필수 필드의 누락이나 타입 불일치는 에러입니다.
    pub fn match_value(&self, input: &Value) -> Result<Matched, MatchError> {
        let Value::Object(map) = input else {
            return Err(MatchError::TypeMismatch {
                path: "$".to_owned(),
                expected: "object",
                found: coerce::json_type_name(input).to_owned(),
            });
        };

        let mut degraded = Vec::new();
        let entries = match_object(&self.root, map, "", &mut degraded)?;
        Ok(Matched {
            value: TypedValue::Object(entries),
            degraded,
        })
    }

    /// 변환된 레코드에서 이벤트 시각을 찾습니다.
    ///
    /// 이벤트 시각 후보로 표시된 필드를 선언 순서(깊이 우선)로 탐색하여
    /// 값이 있는 첫 번째 필드를 사용합니다. 표시된 필드가 하나도 없는 스키마는
    /// 최상위 타임스탬프 필드 중 첫 번째 값을 사용합니다.
    pub fn event_time(&self, value: &TypedValue) -> Option<DateTime<Utc>> {
        if has_event_time_marker(&self.root) {
            find_event_time(&self.root, value)
        } else {
            self.root
                .iter()
                .filter(|f| matches!(f.kind, FieldKind::Timestamp(_)))
                .find_map(|f| value.get(&f.name).and_then(TypedValue::as_timestamp))
        }
    }
}

fn join_path(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_owned()
    } else {
        format!("{prefix}.{name}")
    }
}

/// 식별자 규칙: `[A-Za-z_][A-Za-z0-9_]*`
pub fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn validate_fields(fields: &[Field], prefix: &str) -> Result<(), SchemaError> {
    let mut seen = HashSet::with_capacity(fields.len());
    for field in fields {
        let path = join_path(prefix, &field.name);
        if !is_valid_name(&field.name) {
            return Err(SchemaError::InvalidName {
                path,
                name: field.name.clone(),
            });
        }
        if prefix.is_empty() && field.name.starts_with(RESERVED_PREFIX) {
            return Err(SchemaError::ReservedName { path });
        }
        if !seen.insert(field.name.as_str()) {
            return Err(SchemaError::DuplicateField { path });
        }
        if field.event_time && !matches!(field.kind, FieldKind::Timestamp(_)) {
            return Err(SchemaError::EventTimeNotTimestamp { path });
        }
        validate_kind(&field.kind, &path)?;
    }
    Ok(())
}

fn validate_kind(kind: &FieldKind, path: &str) -> Result<(), SchemaError> {
    match kind {
        FieldKind::Timestamp(TimeFormat::Strftime(layout)) if layout.trim().is_empty() => {
            Err(SchemaError::InvalidTimeFormat {
                path: path.to_owned(),
                reason: "empty strftime layout".to_owned(),
            })
        }
        FieldKind::Array(element) => validate_kind(element, &format!("{path}[]")),
        FieldKind::Object(children) if children.is_empty() => Err(SchemaError::EmptyObject {
            path: path.to_owned(),
        }),
        FieldKind::Object(children) => validate_fields(children, path),
        _ => Ok(()),
    }
}

fn match_object(
    fields: &[Field],
    input: &Map<String, Value>,
    prefix: &str,
    degraded: &mut Vec<String>,
) -> Result<Vec<(String, TypedValue)>, MatchError> {
    let mut out = Vec::with_capacity(fields.len());
    for field in fields {
        let path = join_path(prefix, &field.name);
        let value = match input.get(field.input_key()) {
            None | Some(Value::Null) if field.required => {
                return Err(MatchError::MissingRequired { path });
            }
            None | Some(Value::Null) => TypedValue::Null,
            Some(raw) => {
                let mark = degraded.len();
                match match_kind(&field.kind, raw, &path, degraded) {
                    Ok(typed) => typed,
                    Err(e) if field.required => return Err(e),
                    Err(_) => {
                        degraded.truncate(mark);
                        degraded.push(path);
                        TypedValue::Null
                    }
                }
            }
        };
        out.push((field.name.clone(), value));
    }
    Ok(out)
}

fn match_kind(
    kind: &FieldKind,
    raw: &Value,
    path: &str,
    degraded: &mut Vec<String>,
) -> Result<TypedValue, MatchError> {
    let mismatch = || MatchError::TypeMismatch {
        path: path.to_owned(),
        expected: kind.type_name(),
        found: coerce::json_type_name(raw).to_owned(),
    };

    match kind {
        FieldKind::String => coerce::to_string(raw)
            .map(TypedValue::String)
            .ok_or_else(mismatch),
        FieldKind::Integer => coerce::to_integer(raw)
            .map(TypedValue::Integer)
            .ok_or_else(mismatch),
        FieldKind::Float => coerce::to_float(raw)
            .map(TypedValue::Float)
            .ok_or_else(mismatch),
        FieldKind::Boolean => coerce::to_boolean(raw)
            .map(TypedValue::Boolean)
            .ok_or_else(mismatch),
        FieldKind::Timestamp(format) => format
            .parse_value(raw)
            .map(TypedValue::Timestamp)
            .ok_or_else(mismatch),
        FieldKind::Array(element) => {
            let Value::Array(items) = raw else {
                return Err(mismatch());
            };
            let mut out = Vec::with_capacity(items.len());
            for (idx, item) in items.iter().enumerate() {
                if item.is_null() {
                    out.push(TypedValue::Null);
                    continue;
                }
                out.push(match_kind(element, item, &format!("{path}[{idx}]"), degraded)?);
            }
            Ok(TypedValue::Array(out))
        }
        FieldKind::Object(children) => {
            let Value::Object(map) = raw else {
                return Err(mismatch());
            };
            match_object(children, map, path, degraded).map(TypedValue::Object)
        }
    }
}

fn has_event_time_marker(fields: &[Field]) -> bool {
    fields.iter().any(|f| {
        f.event_time
            || matches!(&f.kind, FieldKind::Object(children) if has_event_time_marker(children))
    })
}

fn find_event_time(fields: &[Field], value: &TypedValue) -> Option<DateTime<Utc>> {
    for field in fields {
        let Some(child) = value.get(&field.name) else {
            continue;
        };
        if field.event_time {
            if let Some(ts) = child.as_timestamp() {
                return Some(ts);
            }
        } else if let FieldKind::Object(children) = &field.kind {
            if let Some(ts) = find_event_time(children, child) {
                return Some(ts);
            }
        }
    }
    None
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timestamp(format) => write!(f, "timestamp({format})"),
            Self::Array(element) => write!(f, "array<{element}>"),
            other => f.write_str(other.type_name()),
        }
    }
}
