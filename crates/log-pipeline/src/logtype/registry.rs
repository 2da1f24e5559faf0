//! 로그 타입 레지스트리 -- 기동 시 한 번 구성되는 불변 이름 색인
//!
//! [`LogTypeRegistry::build`]가 유일한 생성 경로입니다. 선언을 입력 순서대로 검증하며,
//! 첫 번째 실패에서 전체 구성을 중단합니다. 부분적으로 유효한 레지스트리는
//! 만들어지지 않습니다.
//!
//! 구성 이후에는 `&self` 메서드만 제공하므로 `Arc<LogTypeRegistry>`로 모든 워커가
//! 락 없이 공유합니다.

use std::collections::HashMap;

use tracing::debug;

use super::{LogType, LogTypeConfig, table_name};
use crate::error::LogPipelineError;

/// 이름으로 색인된 로그 타입 집합
pub struct LogTypeRegistry {
    /// 등록 순서
    types: Vec<LogType>,
    /// 이름 -> `types` 인덱스
    index: HashMap<String, usize>,
}

impl LogTypeRegistry {
    /// 선언 목록으로 레지스트리를 구성합니다.
    ///
    /// 선언마다 다음 순서로 검사합니다.
    /// 1. 이름/설명/참조 URL 형식 (`InvalidLogType`)
    /// 2. 이름 중복 (`DuplicateLogType`), 테이블 이름 충돌 (`InvalidLogType`)
    /// 3. 스키마 자체 검증 (`InvalidSchema`)
    /// 4. 파서 팩토리 존재 (`MissingParser`)
    pub fn build<I>(configs: I) -> Result<Self, LogPipelineError>
    where
        I: IntoIterator<Item = LogTypeConfig>,
    {
        let configs = configs.into_iter();
        let mut types = Vec::with_capacity(configs.size_hint().0);
        let mut index = HashMap::with_capacity(configs.size_hint().0);
        // 테이블 이름 -> 먼저 등록된 로그 타입 이름
        let mut tables: HashMap<String, String> = HashMap::new();

        for config in configs {
            config.check_descriptor()?;

            if index.contains_key(&config.name) {
                return Err(LogPipelineError::DuplicateLogType(config.name));
            }
            let table = table_name(&config.name);
            if let Some(owner) = tables.get(&table) {
                return Err(LogPipelineError::InvalidLogType {
                    reason: format!("table name '{table}' is already used by '{owner}'"),
                    name: config.name,
                });
            }

            config
                .schema
                .validate()
                .map_err(|source| LogPipelineError::InvalidSchema {
                    log_type: config.name.clone(),
                    source,
                })?;

            let Some(parser) = config.parser.clone() else {
                return Err(LogPipelineError::MissingParser(config.name));
            };

            debug!(log_type = %config.name, "log type registered");
            tables.insert(table, config.name.clone());
            index.insert(config.name.clone(), types.len());
            types.push(LogType::from_parts(config, parser));
        }

        Ok(Self { types, index })
    }

    /// 이름으로 로그 타입을 조회합니다.
    pub fn lookup(&self, name: &str) -> Result<&LogType, LogPipelineError> {
        self.get(name)
            .ok_or_else(|| LogPipelineError::LogTypeNotFound(name.to_owned()))
    }

    pub fn get(&self, name: &str) -> Option<&LogType> {
        self.index.get(name).map(|&idx| &self.types[idx])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// 등록 순서대로 모든 로그 타입을 순회합니다. 호출할 때마다 처음부터 시작합니다.
    pub fn all(&self) -> impl ExactSizeIterator<Item = &LogType> + '_ {
        self.types.iter()
    }

    /// 등록 순서대로 이름 목록
    pub fn names(&self) -> Vec<&str> {
        self.types.iter().map(LogType::name).collect()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl std::fmt::Debug for LogTypeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogTypeRegistry")
            .field("types", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{AdapterFactory, JsonAdapter};
    use crate::schema::{Field, Schema};

    fn decl(name: &str) -> LogTypeConfig {
        LogTypeConfig::new(
            name,
            format!("{name} log"),
            "https://example.com/docs",
            Schema::new(vec![Field::string("message", "본문").required()]),
        )
        .with_parser(AdapterFactory::shared(JsonAdapter::default()))
    }

    #[test]
    fn build_keeps_registration_order() {
        let registry = LogTypeRegistry::build([decl("Zeta"), decl("Alpha"), decl("Mid")]).unwrap();
        assert_eq!(registry.names(), ["Zeta", "Alpha", "Mid"]);
        assert_eq!(registry.all().len(), 3);
        // 재시작 가능
        assert_eq!(registry.all().count(), registry.all().count());
    }

    #[test]
    fn lookup_returns_registered_descriptor() {
        let registry = LogTypeRegistry::build([decl("DNS"), decl("HTTP")]).unwrap();
        let dns = registry.lookup("DNS").unwrap();
        assert_eq!(dns.name(), "DNS");
        assert_eq!(dns.description(), "DNS log");
        assert!(matches!(
            registry.lookup("SMTP"),
            Err(LogPipelineError::LogTypeNotFound(name)) if name == "SMTP"
        ));
    }

    #[test]
    fn duplicate_name_fails_whole_build() {
        let result = LogTypeRegistry::build([decl("DNS"), decl("HTTP"), decl("DNS")]);
        assert!(matches!(
            result,
            Err(LogPipelineError::DuplicateLogType(name)) if name == "DNS"
        ));
    }

    #[test]
    fn names_sharing_a_table_fail_build() {
        let result = LogTypeRegistry::build([decl("Zeek.DNS"), decl("zeek_dns")]);
        assert!(matches!(
            result,
            Err(LogPipelineError::InvalidLogType { ref name, ref reason })
                if name == "zeek_dns" && reason.contains("'Zeek.DNS'")
        ));

        let result = LogTypeRegistry::build([decl("Foo.Bar"), decl("foo.bar")]);
        assert!(matches!(result, Err(LogPipelineError::InvalidLogType { .. })));
    }

    #[test]
    fn invalid_schema_fails_build() {
        let mut bad = decl("Broken");
        bad.schema = Schema::new(vec![Field::string("a", "x"), Field::string("a", "y")]);
        let result = LogTypeRegistry::build([decl("DNS"), bad]);
        assert!(matches!(
            result,
            Err(LogPipelineError::InvalidSchema { log_type, .. }) if log_type == "Broken"
        ));
    }

    #[test]
    fn missing_parser_fails_build() {
        let mut no_parser = decl("NoParser");
        no_parser.parser = None;
        assert!(matches!(
            LogTypeRegistry::build([no_parser]),
            Err(LogPipelineError::MissingParser(name)) if name == "NoParser"
        ));
    }

    #[test]
    fn first_failure_wins() {
        let mut no_parser = decl("NoParser");
        no_parser.parser = None;
        let result = LogTypeRegistry::build([decl("A"), decl("A"), no_parser]);
        assert!(matches!(result, Err(LogPipelineError::DuplicateLogType(_))));
    }

    #[test]
    fn empty_registry_is_allowed() {
        let registry = LogTypeRegistry::build(Vec::new()).unwrap();
        assert!(registry.is_empty());
    }

    #[test]
    fn registry_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<LogTypeRegistry>();
    }
}
