//! 로그 타입 디스크립터 -- 포맷 이름, 메타데이터, 스키마, 파서 팩토리의 불변 묶음
//!
//! 정적 선언인 [`LogTypeConfig`]는 [`LogTypeRegistry::build`]에서 검증된 뒤
//! [`LogType`]으로 바뀌며, 이후에는 getter로만 접근할 수 있습니다.

pub mod registry;

use std::fmt;
use std::sync::Arc;

pub use registry::LogTypeRegistry;

use crate::error::LogPipelineError;
use crate::parser::{ParserAdapter, ParserFactory};
use crate::schema::Schema;

/// 로그 타입 정적 선언
///
/// 프로세스 기동 시 레지스트리 구성의 입력입니다.
#[derive(Clone)]
pub struct LogTypeConfig {
    /// 전역적으로 유일한 안정 식별자 (예: `Zeek.DNS`)
    pub name: String,
    pub description: String,
    /// 원본 포맷의 참조 문서 URL
    pub reference_url: String,
    pub schema: Schema,
    /// 파서 팩토리. 없으면 레지스트리 구성이 실패합니다.
    pub parser: Option<Arc<dyn ParserFactory>>,
}

impl LogTypeConfig {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        reference_url: impl Into<String>,
        schema: Schema,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            reference_url: reference_url.into(),
            schema,
            parser: None,
        }
    }

    pub fn with_parser(mut self, factory: Arc<dyn ParserFactory>) -> Self {
        self.parser = Some(factory);
        self
    }

    /// 이름, 설명, 참조 URL의 형식을 검사합니다.
    pub(crate) fn check_descriptor(&self) -> Result<(), LogPipelineError> {
        let invalid = |reason: &str| LogPipelineError::InvalidLogType {
            name: self.name.clone(),
            reason: reason.to_owned(),
        };

        if !is_valid_log_type_name(&self.name) {
            return Err(invalid(
                "name must be dot-separated segments of [A-Za-z0-9_]",
            ));
        }
        if self.description.trim().is_empty() {
            return Err(invalid("description must not be empty"));
        }
        if !(self.reference_url.starts_with("https://") || self.reference_url.starts_with("http://"))
        {
            return Err(invalid("reference URL must be http(s)"));
        }
        Ok(())
    }
}

impl fmt::Debug for LogTypeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogTypeConfig")
            .field("name", &self.name)
            .field("reference_url", &self.reference_url)
            .field("has_parser", &self.parser.is_some())
            .finish_non_exhaustive()
    }
}

/// 등록된 로그 타입
///
/// 레지스트리가 단독으로 소유하며 등록 후에는 변경되지 않습니다.
pub struct LogType {
    name: String,
    description: String,
    reference_url: String,
    schema: Schema,
    parser: Arc<dyn ParserFactory>,
}

impl LogType {
    pub(crate) fn from_parts(config: LogTypeConfig, parser: Arc<dyn ParserFactory>) -> Self {
        Self {
            name: config.name,
            description: config.description,
            reference_url: config.reference_url,
            schema: config.schema,
            parser,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn reference_url(&self) -> &str {
        &self.reference_url
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// 저장된 팩토리로 새 파서 인스턴스를 만듭니다.
    pub fn new_parser(&self) -> Result<Box<dyn ParserAdapter>, LogPipelineError> {
        self.parser.new_parser()
    }

    /// 출력 테이블 이름 (`Zeek.DNS` -> `zeek_dns`)
    pub fn table_name(&self) -> String {
        table_name(&self.name)
    }
}

impl fmt::Debug for LogType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogType")
            .field("name", &self.name)
            .field("reference_url", &self.reference_url)
            .field("fields", &self.schema.fields().len())
            .finish_non_exhaustive()
    }
}

/// 로그 타입 이름을 테이블 이름으로 바꿉니다.
pub fn table_name(log_type: &str) -> String {
    log_type.to_ascii_lowercase().replace('.', "_")
}

/// 로그 타입 이름 규칙: 점으로 구분된 비어 있지 않은 `[A-Za-z0-9_]` 세그먼트
pub fn is_valid_log_type_name(name: &str) -> bool {
    !name.is_empty()
        && name.split('.').all(|segment| {
            !segment.is_empty() && segment.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{AdapterFactory, JsonAdapter};
    use crate::schema::Field;

    fn config(name: &str) -> LogTypeConfig {
        LogTypeConfig::new(
            name,
            "test log",
            "https://example.com/docs",
            Schema::new(vec![Field::string("message", "본문")]),
        )
        .with_parser(AdapterFactory::shared(JsonAdapter::default()))
    }

    #[test]
    fn table_names() {
        assert_eq!(table_name("Zeek.DNS"), "zeek_dns");
        assert_eq!(table_name("AWS.CloudTrail"), "aws_cloudtrail");
        assert_eq!(table_name("DNS"), "dns");
    }

    #[test]
    fn log_type_names() {
        assert!(is_valid_log_type_name("DNS"));
        assert!(is_valid_log_type_name("AWS.VPCFlow"));
        assert!(!is_valid_log_type_name(""));
        assert!(!is_valid_log_type_name("Zeek..DNS"));
        assert!(!is_valid_log_type_name(".DNS"));
        assert!(!is_valid_log_type_name("Zeek DNS"));
    }

    #[test]
    fn descriptor_checks() {
        config("Zeek.DNS").check_descriptor().unwrap();

        let mut no_desc = config("A");
        no_desc.description = " ".to_owned();
        assert!(no_desc.check_descriptor().is_err());

        let mut bad_url = config("A");
        bad_url.reference_url = "docs.zeek.org".to_owned();
        assert!(matches!(
            bad_url.check_descriptor(),
            Err(LogPipelineError::InvalidLogType { .. })
        ));
    }

    #[test]
    fn debug_does_not_require_factory_debug() {
        let text = format!("{:?}", config("DNS"));
        assert!(text.contains("has_parser: true"));
    }
}
