//! 파서 어댑터 -- 포맷별 디코딩 로직을 하나의 인터페이스로 노출합니다.
//!
//! 모든 포맷은 [`ParserAdapter`]를 구현하며, 원시 레코드 하나를 받아
//! 0개 이상의 [`CandidateRecord`]를 지연 생성하는 [`Candidates`]를 반환합니다.
//! 로그 타입 레지스트리는 어댑터 대신 [`ParserFactory`]를 저장하고,
//! 워커는 팩토리로 자신만의 어댑터 인스턴스를 만듭니다.
//!
//! # 지원 형식
//! - 라인 단위 JSON 객체 ([`JsonAdapter`])
//! - 레코드 배열을 담은 JSON 문서 ([`JsonEnvelopeAdapter`])
//! - 헤더가 고정된 구분자 텍스트 ([`CsvAdapter`])
//! - `key=value` 쌍 ([`KeyValueAdapter`])
//!
//! # 사용 예시
//! ```
//! use logtide_log_pipeline::parser::{AdapterFactory, JsonAdapter, ParserFactory};
//!
//! let factory = AdapterFactory::new(JsonAdapter::default());
//! let parser = factory.new_parser().unwrap();
//! assert_eq!(parser.format_name(), "json");
//! ```

pub mod delimited;
pub mod envelope;
pub mod json;
pub mod kv;

use std::fmt;
use std::sync::Arc;

pub use delimited::CsvAdapter;
pub use envelope::JsonEnvelopeAdapter;
pub use json::JsonAdapter;
pub use kv::KeyValueAdapter;

use crate::error::LogPipelineError;
use crate::record::{CandidateRecord, RawRecord};

/// 포맷별 디코더
///
/// 어댑터는 생성 시점의 포맷 설정(헤더, 구분자 등)만 가지며,
/// 호출 사이에 변경되는 상태를 가지지 않습니다.
pub trait ParserAdapter: Send + Sync {
    /// 포맷 이름 (에러 메시지와 메트릭에 사용)
    fn format_name(&self) -> &str;

    /// 원시 레코드 하나를 디코딩합니다.
    ///
    /// 실패는 해당 레코드에만 국한되며, 같은 배치의 다른 레코드에 영향을 주지 않습니다.
    fn parse(&self, raw: &RawRecord) -> Result<Candidates, LogPipelineError>;
}

/// 어댑터 생성기
///
/// 레지스트리에 저장되는 파서 참조입니다.
pub trait ParserFactory: Send + Sync {
    fn new_parser(&self) -> Result<Box<dyn ParserAdapter>, LogPipelineError>;
}

/// 설정된 프로토타입 어댑터를 복제하는 팩토리
#[derive(Debug, Clone)]
pub struct AdapterFactory<P> {
    prototype: P,
}

impl<P> AdapterFactory<P>
where
    P: ParserAdapter + Clone + 'static,
{
    pub fn new(prototype: P) -> Self {
        Self { prototype }
    }

    /// 레지스트리에 넘길 수 있는 공유 팩토리로 감쌉니다.
    pub fn shared(prototype: P) -> Arc<dyn ParserFactory> {
        Arc::new(Self::new(prototype))
    }
}

impl<P> ParserFactory for AdapterFactory<P>
where
    P: ParserAdapter + Clone + 'static,
{
    fn new_parser(&self) -> Result<Box<dyn ParserAdapter>, LogPipelineError> {
        Ok(Box::new(self.prototype.clone()))
    }
}

/// 원시 레코드 하나에서 나온 후보 레코드의 지연, 유한 시퀀스
pub struct Candidates {
    inner: Box<dyn Iterator<Item = CandidateRecord> + Send>,
}

impl Candidates {
    /// 빈 시퀀스 (헤더 라인, 주석 등)
    pub fn empty() -> Self {
        Self {
            inner: Box::new(std::iter::empty()),
        }
    }

    /// 후보 하나
    pub fn one(fields: serde_json::Value) -> Self {
        Self {
            inner: Box::new(std::iter::once(CandidateRecord::new(0, fields))),
        }
    }

    /// 임의의 반복자로부터 생성합니다.
    pub fn from_records<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = CandidateRecord>,
        I::IntoIter: Send + 'static,
    {
        Self {
            inner: Box::new(iter.into_iter()),
        }
    }
}

impl Iterator for Candidates {
    type Item = CandidateRecord;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl fmt::Debug for Candidates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Candidates")
            .field("size_hint", &self.inner.size_hint())
            .finish()
    }
}

/// 레코드 단위 파싱 에러를 생성합니다.
pub(crate) fn parse_error(
    format: &str,
    raw: &RawRecord,
    reason: impl Into<String>,
) -> LogPipelineError {
    LogPipelineError::Parse {
        format: format.to_owned(),
        offset: raw.offset(),
        reason: reason.into(),
    }
}

/// 어댑터 자체 입력 크기 상한을 확인합니다.
///
/// 레코드 크기의 기본 한도는 소스의 `max_record_size`이며, 어댑터 상한은
/// `with_max_input_size`로 설정한 경우에만 적용됩니다.
pub(crate) fn check_size(
    format: &str,
    raw: &RawRecord,
    max: Option<usize>,
) -> Result<(), LogPipelineError> {
    let Some(max) = max else {
        return Ok(());
    };
    if raw.data.len() > max {
        return Err(parse_error(
            format,
            raw,
            format!("input too large: {} bytes (max: {max})", raw.data.len()),
        ));
    }
    Ok(())
}


#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn factory_creates_independent_parsers() {
        let factory = AdapterFactory::shared(JsonAdapter::default().with_max_input_size(64));
        let a = factory.new_parser().unwrap();
        let b = factory.new_parser().unwrap();
        assert_eq!(a.format_name(), b.format_name());
    }

    #[test]
    fn candidates_one_has_index_zero() {
        let items: Vec<_> = Candidates::one(json!({"a": 1})).collect();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].index, 0);
    }

    #[test]
    fn candidates_empty() {
        assert_eq!(Candidates::empty().count(), 0);
    }

    #[test]
    fn oversized_input_is_parse_error() {
        let raw = test_util::raw_at("0123456789", 7);
        let err = check_size("json", &raw, Some(4)).unwrap_err();
        assert!(matches!(err, LogPipelineError::Parse { offset: 7, .. }));
    }

    #[test]
    fn no_adapter_cap_accepts_any_size() {
        let raw = test_util::raw(&"x".repeat(4 * 1024 * 1024));
        assert!(check_size("json", &raw, None).is_ok());
    }
}
