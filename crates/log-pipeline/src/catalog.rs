//! 스키마 카탈로그 내보내기
//!
//! 등록된 로그 타입의 테이블 설명을 만들어 외부 카탈로그가 읽을 수 있는 JSON 파일로
//! 기록합니다. 컬럼 타입은 Hive 타입 표기(`bigint`, `array<string>`, `struct<a:string>`)를
//! 따르며, 표준 `p_*` 컬럼이 항상 뒤에 붙습니다.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::info;

use crate::error::LogPipelineError;
use crate::logtype::{LogType, LogTypeRegistry};
use crate::normalize::STANDARD_FIELDS;
use crate::schema::{Field, FieldKind};

/// 로그 타입 하나의 테이블 설명
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogTypeDescription {
    pub name: String,
    pub table: String,
    pub description: String,
    pub reference_url: String,
    pub columns: Vec<ColumnDescription>,
}

/// 컬럼 설명
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnDescription {
    pub name: String,
    pub data_type: String,
    pub nullable: bool,
    pub description: String,
}

/// 필드 종류의 Hive 타입 표기
pub fn hive_type(kind: &FieldKind) -> String {
    match kind {
        FieldKind::String => "string".to_owned(),
        FieldKind::Integer => "bigint".to_owned(),
        FieldKind::Float => "double".to_owned(),
        FieldKind::Boolean => "boolean".to_owned(),
        FieldKind::Timestamp(_) => "timestamp".to_owned(),
        FieldKind::Array(element) => format!("array<{}>", hive_type(element)),
        FieldKind::Object(children) => {
            let members: Vec<String> = children
                .iter()
                .map(|f| format!("{}:{}", f.name(), hive_type(f.kind())))
                .collect();
            format!("struct<{}>", members.join(","))
        }
    }
}

fn column(field: &Field) -> ColumnDescription {
    ColumnDescription {
        name: field.name().to_owned(),
        data_type: hive_type(field.kind()),
        nullable: !field.is_required(),
        description: field.description().to_owned(),
    }
}

/// 로그 타입의 테이블 설명을 만듭니다.
pub fn describe(log_type: &LogType) -> LogTypeDescription {
    let mut columns: Vec<ColumnDescription> =
        log_type.schema().fields().iter().map(column).collect();
    columns.extend(
        STANDARD_FIELDS
            .iter()
            .map(|(name, data_type, description)| ColumnDescription {
                name: (*name).to_owned(),
                data_type: (*data_type).to_owned(),
                nullable: false,
                description: (*description).to_owned(),
            }),
    );

    LogTypeDescription {
        name: log_type.name().to_owned(),
        table: log_type.table_name(),
        description: log_type.description().to_owned(),
        reference_url: log_type.reference_url().to_owned(),
        columns,
    }
}

/// 레지스트리의 모든 로그 타입을 설명합니다 (등록 순서).
pub fn describe_all(registry: &LogTypeRegistry) -> Vec<LogTypeDescription> {
    registry.all().map(describe).collect()
}

/// `<dir>/<table>.json` 파일로 설명을 기록하고 기록한 경로를 반환합니다.
pub async fn write_descriptions(
    dir: &Path,
    registry: &LogTypeRegistry,
) -> Result<Vec<PathBuf>, LogPipelineError> {
    tokio::fs::create_dir_all(dir).await?;

    let mut written = Vec::with_capacity(registry.len());
    for description in describe_all(registry) {
        let path = dir.join(format!("{}.json", description.table));
        let body = serde_json::to_vec_pretty(&description)?;
        tokio::fs::write(&path, body).await?;
        written.push(path);
    }

    info!(dir = %dir.display(), count = written.len(), "schema descriptions exported");
    Ok(written)
}
