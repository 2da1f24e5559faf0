//! 소스 분류 및 파서 디스패치
//!
//! - [`SourceClassifier`]: 소스 식별자를 로그 타입 이름으로 해석합니다.
//!   분류 정책은 설정으로 주입되며, 해석할 수 없는 소스는 기본 파서로 넘기지 않고
//!   `UnknownSource`로 실패합니다.
//! - [`Dispatcher`]: 레지스트리 조회와 해당 파서 어댑터 호출을 합성합니다.
//!   워커마다 하나씩 소유하며, 어댑터는 처음 사용할 때 팩토리로 만듭니다.

use std::collections::HashMap;
use std::sync::Arc;

use logtide_core::config::ClassificationRuleConfig;
use regex::Regex;
use tracing::debug;

use crate::error::LogPipelineError;
use crate::logtype::LogTypeRegistry;
use crate::parser::{Candidates, ParserAdapter};
use crate::record::RawRecord;

/// 소스 식별자 -> 로그 타입 이름
pub trait SourceClassifier: Send + Sync {
    fn classify(&self, source_id: &str) -> Result<&str, LogPipelineError>;
}

/// 소스 식별자 매처
#[derive(Debug, Clone)]
pub enum SourceMatcher {
    /// 전체 일치
    Exact(String),
    /// 접두어 일치
    Prefix(String),
    /// 정규식 일치 (부분 일치, 앵커는 패턴에서 지정)
    Regex(Regex),
}

impl SourceMatcher {
    pub fn matches(&self, source_id: &str) -> bool {
        match self {
            Self::Exact(s) => source_id == s,
            Self::Prefix(p) => source_id.starts_with(p.as_str()),
            Self::Regex(re) => re.is_match(source_id),
        }
    }
}

/// 분류 규칙 하나
#[derive(Debug, Clone)]
pub struct ClassificationRule {
    pub matcher: SourceMatcher,
    pub log_type: String,
}

impl ClassificationRule {
    pub fn new(matcher: SourceMatcher, log_type: impl Into<String>) -> Self {
        Self {
            matcher,
            log_type: log_type.into(),
        }
    }

    /// 설정 항목에서 규칙을 만듭니다.
    pub fn from_config(config: &ClassificationRuleConfig) -> Result<Self, LogPipelineError> {
        let matcher = match config.matcher.as_str() {
            "exact" => SourceMatcher::Exact(config.pattern.clone()),
            "prefix" => SourceMatcher::Prefix(config.pattern.clone()),
            "regex" => SourceMatcher::Regex(Regex::new(&config.pattern)?),
            other => {
                return Err(LogPipelineError::Config {
                    field: "classification.match".to_owned(),
                    reason: format!("unknown matcher '{other}'"),
                });
            }
        };
        Ok(Self::new(matcher, config.log_type.clone()))
    }
}

/// 순서 있는 규칙 목록으로 분류합니다. 첫 번째로 일치한 규칙이 이깁니다.
#[derive(Debug, Clone, Default)]
pub struct RuleClassifier {
    rules: Vec<ClassificationRule>,
}

impl RuleClassifier {
    /// 규칙이 참조하는 로그 타입이 모두 레지스트리에 있는지 확인하고 분류기를 만듭니다.
    pub fn new(
        rules: Vec<ClassificationRule>,
        registry: &LogTypeRegistry,
    ) -> Result<Self, LogPipelineError> {
        for (idx, rule) in rules.iter().enumerate() {
            if !registry.contains(&rule.log_type) {
                return Err(LogPipelineError::Config {
                    field: format!("classification[{idx}].log_type"),
                    reason: format!("log type '{}' is not registered", rule.log_type),
                });
            }
        }
        Ok(Self { rules })
    }

    /// 설정 목록에서 분류기를 만듭니다.
    pub fn from_config(
        configs: &[ClassificationRuleConfig],
        registry: &LogTypeRegistry,
    ) -> Result<Self, LogPipelineError> {
        let rules = configs
            .iter()
            .map(ClassificationRule::from_config)
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(rules, registry)
    }

    pub fn rules(&self) -> &[ClassificationRule] {
        &self.rules
    }
}

impl SourceClassifier for RuleClassifier {
    fn classify(&self, source_id: &str) -> Result<&str, LogPipelineError> {
        self.rules
            .iter()
            .find(|rule| rule.matcher.matches(source_id))
            .map(|rule| rule.log_type.as_str())
            .ok_or_else(|| LogPipelineError::UnknownSource(source_id.to_owned()))
    }
}

/// 소스가 로그 타입을 직접 선언한 경우의 분류기
#[derive(Debug, Clone)]
pub struct FixedClassifier {
    log_type: String,
}

impl FixedClassifier {
    pub fn new(
        log_type: impl Into<String>,
        registry: &LogTypeRegistry,
    ) -> Result<Self, LogPipelineError> {
        let log_type = log_type.into();
        registry.lookup(&log_type)?;
        Ok(Self { log_type })
    }
}

impl SourceClassifier for FixedClassifier {
    fn classify(&self, _source_id: &str) -> Result<&str, LogPipelineError> {
        Ok(&self.log_type)
    }
}

/// 레지스트리 조회 + 파서 호출
///
/// 어댑터 인스턴스는 이 디스패처가 소유하며 다른 워커와 공유하지 않습니다.
pub struct Dispatcher {
    registry: Arc<LogTypeRegistry>,
    adapters: HashMap<String, Box<dyn ParserAdapter>>,
}

impl Dispatcher {
    pub fn new(registry: Arc<LogTypeRegistry>) -> Self {
        Self {
            registry,
            adapters: HashMap::new(),
        }
    }

    pub fn registry(&self) -> &Arc<LogTypeRegistry> {
        &self.registry
    }

    /// 로그 타입 이름으로 파서를 찾아 원시 레코드를 디코딩합니다.
    pub fn dispatch(&mut self, name: &str, raw: &RawRecord) -> Result<Candidates, LogPipelineError> {
        if !self.adapters.contains_key(name) {
            let parser = self.registry.lookup(name)?.new_parser()?;
            debug!(log_type = name, format = parser.format_name(), "parser created");
            self.adapters.insert(name.to_owned(), parser);
        }

        match self.adapters.get(name) {
            Some(parser) => parser.parse(raw),
            None => Err(LogPipelineError::LogTypeNotFound(name.to_owned())),
        }
    }
}
