#![doc = include_str!("../README.md")]
//!
//! # 모듈 구성
//!
//! - [`schema`]: 필드/스키마 모델, 타입 변환, 타임스탬프 형식
//! - [`logtype`]: 로그 타입 선언과 레지스트리
//! - [`logtypes`]: 내장 로그 타입 (Zeek, AWS, Fortinet)
//! - [`parser`]: 포맷별 파서 어댑터 (JSON, JSON envelope, CSV, key=value)
//! - [`classify`]: 소스 분류와 파서 디스패치
//! - [`normalize`]: 스키마 검증과 표준 필드 부착
//! - [`batch`]: 파티션 키와 출력 배치
//! - [`source`] / [`sink`]: 레코드 입력과 배치 출력
//! - [`catalog`]: 스키마 설명 내보내기
//! - [`worker`] / [`pipeline`]: 스트림 처리와 오케스트레이션 (Pipeline trait 구현)
//! - [`config`]: 파이프라인 설정 (core 설정에서 파생)
//! - [`stats`]: 처리 통계
//! - [`error`]: 도메인 에러 타입

pub mod batch;
pub mod catalog;
pub mod classify;
pub mod config;
pub mod error;
pub mod logtype;
pub mod logtypes;
pub mod normalize;
pub mod parser;
pub mod pipeline;
pub mod record;
pub mod schema;
pub mod sink;
pub mod source;
pub mod stats;
pub mod worker;

// --- 주요 타입 re-export ---

// 파이프라인
pub use pipeline::{LogPipeline, LogPipelineBuilder};
pub use worker::StreamWorker;

// 설정
pub use config::{PipelineConfig, PipelineConfigBuilder};

// 에러
pub use error::{LogPipelineError, RecordErrorKind};

// 로그 타입
pub use logtype::{LogType, LogTypeConfig, LogTypeRegistry};
pub use schema::{Field, FieldKind, Schema, TimeFormat, TypedValue};

// 처리 단계
pub use batch::{Batch, OutputBatcher, PartitionGranularity, PartitionKey};
pub use classify::{Dispatcher, FixedClassifier, RuleClassifier, SourceClassifier};
pub use normalize::{NormalizedEvent, Normalizer};
pub use parser::{ParserAdapter, ParserFactory};
pub use record::{CandidateRecord, Provenance, RawRecord};

// 입출력
pub use sink::{BatchSink, ChannelSink, DirectorySink};
pub use source::{LineSource, MemorySource, RecordSource};
pub use stats::PipelineStats;
