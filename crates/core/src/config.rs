//! 설정 관리 -- logtide.toml 파싱 및 런타임 설정
//!
//! [`LogtideConfig`]는 모든 모듈의 설정을 담는 최상위 구조체입니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`LOGTIDE_PIPELINE_WORKERS=8` 형식)
//! 3. 설정 파일 (`logtide.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), logtide_core::error::LogtideError> {
//! use logtide_core::config::LogtideConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let config = LogtideConfig::load("logtide.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = LogtideConfig::parse("[general]\nlog_level = \"debug\"")?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, LogtideError};

/// 허용되는 분류 규칙 매처
pub const CLASSIFICATION_MATCHERS: &[&str] = &["exact", "prefix", "regex"];

/// 허용되는 파티션 단위
pub const PARTITION_GRANULARITIES: &[&str] = &["hourly", "daily"];

/// logtide 통합 설정
///
/// `logtide.toml` 파일의 최상위 구조를 나타냅니다.
/// 각 모듈은 자기 섹션만 읽어 사용합니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogtideConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// 파싱 파이프라인 설정
    #[serde(default)]
    pub pipeline: PipelineSection,
    /// 출력(배치/스키마) 설정
    #[serde(default)]
    pub output: OutputConfig,
    /// 메트릭 노출 설정
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl LogtideConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    ///
    /// 설정 로딩 순서:
    /// 1. TOML 파일 파싱
    /// 2. 환경변수 오버라이드 적용
    /// 3. 유효성 검증
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, LogtideError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, LogtideError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                LogtideError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                LogtideError::Io(e)
            }
        })?;
        let config = Self::parse(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, LogtideError> {
        toml::from_str(toml_str).map_err(|e| {
            LogtideError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `LOGTIDE_{SECTION}_{FIELD}`
    /// 예: `LOGTIDE_PIPELINE_WORKERS=8`
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "LOGTIDE_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "LOGTIDE_GENERAL_LOG_FORMAT");

        // Pipeline
        override_usize(&mut self.pipeline.workers, "LOGTIDE_PIPELINE_WORKERS");
        override_usize(
            &mut self.pipeline.batch_max_events,
            "LOGTIDE_PIPELINE_BATCH_MAX_EVENTS",
        );
        override_u64(
            &mut self.pipeline.batch_max_age_secs,
            "LOGTIDE_PIPELINE_BATCH_MAX_AGE_SECS",
        );
        override_string(&mut self.pipeline.partition, "LOGTIDE_PIPELINE_PARTITION");
        override_usize(
            &mut self.pipeline.max_record_size,
            "LOGTIDE_PIPELINE_MAX_RECORD_SIZE",
        );
        override_usize(
            &mut self.pipeline.error_sample_limit,
            "LOGTIDE_PIPELINE_ERROR_SAMPLE_LIMIT",
        );

        // Output
        override_string(&mut self.output.dir, "LOGTIDE_OUTPUT_DIR");
        override_string(&mut self.output.schema_dir, "LOGTIDE_OUTPUT_SCHEMA_DIR");

        // Metrics
        override_bool(&mut self.metrics.enabled, "LOGTIDE_METRICS_ENABLED");
        override_string(&mut self.metrics.listen_addr, "LOGTIDE_METRICS_LISTEN_ADDR");
        override_u16(&mut self.metrics.port, "LOGTIDE_METRICS_PORT");
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), LogtideError> {
        // log_level 검증
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(invalid(
                "general.log_level",
                format!("must be one of: {}", valid_levels.join(", ")),
            ));
        }

        // log_format 검증
        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(invalid(
                "general.log_format",
                format!("must be one of: {}", valid_formats.join(", ")),
            ));
        }

        if self.pipeline.workers == 0 {
            return Err(invalid("pipeline.workers", "must be greater than 0"));
        }

        if !PARTITION_GRANULARITIES.contains(&self.pipeline.partition.as_str()) {
            return Err(invalid(
                "pipeline.partition",
                format!("must be one of: {}", PARTITION_GRANULARITIES.join(", ")),
            ));
        }

        for (idx, input) in self.pipeline.inputs.iter().enumerate() {
            if input.path.trim().is_empty() {
                return Err(invalid(
                    &format!("pipeline.inputs[{idx}].path"),
                    "must not be empty",
                ));
            }
        }

        for (idx, rule) in self.pipeline.classification.iter().enumerate() {
            if !CLASSIFICATION_MATCHERS.contains(&rule.matcher.as_str()) {
                return Err(invalid(
                    &format!("pipeline.classification[{idx}].match"),
                    format!("must be one of: {}", CLASSIFICATION_MATCHERS.join(", ")),
                ));
            }
            if rule.pattern.is_empty() {
                return Err(invalid(
                    &format!("pipeline.classification[{idx}].pattern"),
                    "must not be empty",
                ));
            }
            if rule.log_type.is_empty() {
                return Err(invalid(
                    &format!("pipeline.classification[{idx}].log_type"),
                    "must not be empty",
                ));
            }
        }

        if self.output.dir.trim().is_empty() {
            return Err(invalid("output.dir", "must not be empty"));
        }

        if self.metrics.enabled && self.metrics.port == 0 {
            return Err(invalid(
                "metrics.port",
                "must be non-zero when metrics are enabled",
            ));
        }

        Ok(())
    }
}

fn invalid(field: &str, reason: impl Into<String>) -> LogtideError {
    ConfigError::InvalidValue {
        field: field.to_owned(),
        reason: reason.into(),
    }
    .into()
}

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "json".to_owned(),
        }
    }
}

/// 파싱 파이프라인 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSection {
    /// 동시에 실행할 스트림 워커 수
    pub workers: usize,
    /// 배치당 최대 이벤트 수 (도달 시 봉인)
    pub batch_max_events: usize,
    /// 배치 최대 보관 시간 (초, 경과 시 봉인)
    pub batch_max_age_secs: u64,
    /// 파티션 단위 (hourly, daily)
    pub partition: String,
    /// 원시 레코드 최대 크기 (바이트)
    pub max_record_size: usize,
    /// 로그 타입 x 에러 종류별로 보관할 에러 샘플 수
    pub error_sample_limit: usize,
    /// 입력 소스 목록
    pub inputs: Vec<InputConfig>,
    /// 소스 분류 규칙 (순서대로 평가, 첫 매칭 승리)
    pub classification: Vec<ClassificationRuleConfig>,
}

impl Default for PipelineSection {
    fn default() -> Self {
        Self {
            workers: 4,
            batch_max_events: 10_000,
            batch_max_age_secs: 60,
            partition: "hourly".to_owned(),
            max_record_size: 1024 * 1024, // 1MB
            error_sample_limit: 5,
            inputs: Vec::new(),
            classification: Vec::new(),
        }
    }
}

/// 입력 소스 설정
///
/// `path`가 디렉토리면 하위의 모든 일반 파일이 각각 하나의 스트림이 됩니다.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// 파일 또는 디렉토리 경로
    pub path: String,
    /// 명시적 로그 타입. 지정하면 분류 규칙을 거치지 않습니다.
    pub log_type: Option<String>,
}

/// 소스 분류 규칙 설정
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassificationRuleConfig {
    /// 매처 종류 (exact, prefix, regex)
    #[serde(rename = "match")]
    pub matcher: String,
    /// 소스 식별자와 비교할 패턴
    pub pattern: String,
    /// 매칭 시 할당할 로그 타입 이름
    pub log_type: String,
}

/// 출력 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// 봉인된 배치를 기록할 루트 디렉토리
    pub dir: String,
    /// 카탈로그용 스키마 설명을 기록할 디렉토리 (빈 문자열이면 기록 안 함)
    pub schema_dir: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: "/var/lib/logtide/events".to_owned(),
            schema_dir: "/var/lib/logtide/schemas".to_owned(),
        }
    }
}

/// 메트릭 노출 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// 활성화 여부
    pub enabled: bool,
    /// 바인드 주소
    pub listen_addr: String,
    /// 포트
    pub port: u16,
    /// 스크레이프 경로
    pub endpoint: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            listen_addr: "127.0.0.1".to_owned(),
            port: 9108,
            endpoint: "/metrics".to_owned(),
        }
    }
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_bool(target: &mut bool, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<bool>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse bool from env var, ignoring"
            ),
        }
    }
}

fn override_usize(target: &mut usize, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<usize>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse usize from env var, ignoring"
            ),
        }
    }
}

fn override_u16(target: &mut u16, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u16>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u16 from env var, ignoring"
            ),
        }
    }
}

fn override_u64(target: &mut u64, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u64>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u64 from env var, ignoring"
            ),
        }
    }
}
