//! 로그 파이프라인 설정
//!
//! [`PipelineConfig`]는 core의 [`LogtideConfig`]에서 파이프라인 실행에 필요한 값만 모은
//! 설정입니다. 문자열로 들어온 값(파티션 단위 등)은 여기서 타입으로 바뀝니다.
//!
//! # 사용 예시
//! ```ignore
//! use logtide_core::config::LogtideConfig;
//! use logtide_log_pipeline::config::PipelineConfig;
//!
//! let core_config = LogtideConfig::load("logtide.toml").await?;
//! let config = PipelineConfig::from_core(&core_config)?;
//! ```

use std::time::Duration;

use logtide_core::config::{ClassificationRuleConfig, InputConfig, LogtideConfig};

use crate::batch::PartitionGranularity;
use crate::error::LogPipelineError;

const MAX_WORKERS: usize = 1024;
const MAX_BATCH_EVENTS: usize = 1_000_000;
const MAX_BATCH_AGE_SECS: u64 = 86_400;
const MAX_RECORD_SIZE: usize = 256 * 1024 * 1024;

/// 로그 파이프라인 설정
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// 동시에 처리하는 스트림 수
    pub workers: usize,
    /// 배치 크기 임계값 (이벤트 수)
    pub batch_max_events: usize,
    /// 배치 시간 임계값 (초)
    pub batch_max_age_secs: u64,
    /// 만료 배치 확인 주기 (밀리초)
    pub flush_interval_ms: u64,
    /// 출력 파티션 단위
    pub partition: PartitionGranularity,
    /// 원시 레코드 최대 크기 (바이트)
    pub max_record_size: usize,
    /// 에러 종류별 보관 샘플 수
    pub error_sample_limit: usize,
    /// 입력 소스
    pub inputs: Vec<InputConfig>,
    /// 소스 분류 규칙
    pub classification: Vec<ClassificationRuleConfig>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            batch_max_events: 10_000,
            batch_max_age_secs: 60,
            flush_interval_ms: 1000,
            partition: PartitionGranularity::Hourly,
            max_record_size: 1024 * 1024,
            error_sample_limit: 5,
            inputs: Vec::new(),
            classification: Vec::new(),
        }
    }
}

impl PipelineConfig {
    /// core 설정에서 파이프라인 설정을 만듭니다.
    ///
    /// core에 없는 필드(`flush_interval_ms`)는 기본값을 쓰되, 배치 시간 임계값보다
    /// 길지 않게 맞춥니다.
    pub fn from_core(core: &LogtideConfig) -> Result<Self, LogPipelineError> {
        let section = &core.pipeline;
        let defaults = Self::default();
        Ok(Self {
            workers: section.workers,
            batch_max_events: section.batch_max_events,
            batch_max_age_secs: section.batch_max_age_secs,
            flush_interval_ms: defaults
                .flush_interval_ms
                .min(section.batch_max_age_secs.saturating_mul(1000).max(1)),
            partition: section.partition.parse()?,
            max_record_size: section.max_record_size,
            error_sample_limit: section.error_sample_limit,
            inputs: section.inputs.clone(),
            classification: section.classification.clone(),
        })
    }

    pub fn batch_max_age(&self) -> Duration {
        Duration::from_secs(self.batch_max_age_secs)
    }

    pub fn flush_interval(&self) -> Duration {
        Duration::from_millis(self.flush_interval_ms)
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), LogPipelineError> {
        fn out_of_range(field: &str, reason: String) -> LogPipelineError {
            LogPipelineError::Config {
                field: field.to_owned(),
                reason,
            }
        }

        if self.workers == 0 || self.workers > MAX_WORKERS {
            return Err(out_of_range("workers", format!("must be 1-{MAX_WORKERS}")));
        }

        if self.batch_max_events == 0 || self.batch_max_events > MAX_BATCH_EVENTS {
            return Err(out_of_range(
                "batch_max_events",
                format!("must be 1-{MAX_BATCH_EVENTS}"),
            ));
        }

        if self.batch_max_age_secs == 0 || self.batch_max_age_secs > MAX_BATCH_AGE_SECS {
            return Err(out_of_range(
                "batch_max_age_secs",
                format!("must be 1-{MAX_BATCH_AGE_SECS}"),
            ));
        }

        if self.flush_interval_ms == 0 || self.flush_interval_ms > self.batch_max_age_secs * 1000
        {
            return Err(out_of_range(
                "flush_interval_ms",
                "must be greater than 0 and not exceed batch_max_age_secs".to_owned(),
            ));
        }

        if self.max_record_size == 0 || self.max_record_size > MAX_RECORD_SIZE {
            return Err(out_of_range(
                "max_record_size",
                format!("must be 1-{MAX_RECORD_SIZE}"),
            ));
        }

        for (idx, input) in self.inputs.iter().enumerate() {
            if input.path.trim().is_empty() {
                return Err(out_of_range(
                    &format!("inputs[{idx}].path"),
                    "must not be empty".to_owned(),
                ));
            }
        }

        Ok(())
    }
}

/// 파이프라인 설정 빌더
#[derive(Default)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn workers(mut self, workers: usize) -> Self {
        self.config.workers = workers;
        self
    }

    pub fn batch_max_events(mut self, max: usize) -> Self {
        self.config.batch_max_events = max;
        self
    }

    pub fn batch_max_age_secs(mut self, secs: u64) -> Self {
        self.config.batch_max_age_secs = secs;
        self
    }

    pub fn flush_interval_ms(mut self, ms: u64) -> Self {
        self.config.flush_interval_ms = ms;
        self
    }

    pub fn partition(mut self, granularity: PartitionGranularity) -> Self {
        self.config.partition = granularity;
        self
    }

    pub fn max_record_size(mut self, size: usize) -> Self {
        self.config.max_record_size = size;
        self
    }

    pub fn error_sample_limit(mut self, limit: usize) -> Self {
        self.config.error_sample_limit = limit;
        self
    }

    /// 입력 소스를 하나 추가합니다.
    pub fn input(mut self, path: impl Into<String>, log_type: Option<&str>) -> Self {
        self.config.inputs.push(InputConfig {
            path: path.into(),
            log_type: log_type.map(str::to_owned),
        });
        self
    }

    /// 분류 규칙을 하나 추가합니다.
    pub fn classify(
        mut self,
        matcher: &str,
        pattern: impl Into<String>,
        log_type: impl Into<String>,
    ) -> Self {
        self.config.classification.push(ClassificationRuleConfig {
            matcher: matcher.to_owned(),
            pattern: pattern.into(),
            log_type: log_type.into(),
        });
        self
    }

    /// 설정을 검증하고 `PipelineConfig`를 생성합니다.
    pub fn build(self) -> Result<PipelineConfig, LogPipelineError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
