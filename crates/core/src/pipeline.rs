//! 파이프라인 trait -- 장기 실행 모듈의 생명주기 정의
//!
//! 데몬은 [`Pipeline`]을 구현한 모듈을 동일한 방식으로 시작/정지/상태 확인합니다.

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use crate::error::LogtideError;

/// `Send` 가능한 박스 Future
///
/// dyn-compatible trait에서 비동기 메서드를 반환할 때 사용합니다.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// 모듈 건강 상태
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// 정상
    Healthy,
    /// 동작 중이지만 성능 저하 또는 부분 장애
    Degraded(String),
    /// 동작 불가
    Unhealthy(String),
}

impl HealthStatus {
    /// 정상 상태인지 확인합니다.
    pub fn is_healthy(&self) -> bool {
        matches!(self, Self::Healthy)
    }

    /// 동작 불가 상태인지 확인합니다.
    pub fn is_unhealthy(&self) -> bool {
        matches!(self, Self::Unhealthy(_))
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Healthy => write!(f, "healthy"),
            Self::Degraded(reason) => write!(f, "degraded: {reason}"),
            Self::Unhealthy(reason) => write!(f, "unhealthy: {reason}"),
        }
    }
}

/// 장기 실행 모듈의 생명주기 trait
///
/// ```text
/// build → start() → Running → stop() → Stopped
/// ```
pub trait Pipeline: Send {
    /// 모듈을 시작합니다. 이미 실행 중이면 에러를 반환합니다.
    fn start(&mut self) -> impl Future<Output = Result<(), LogtideError>> + Send;

    /// 모듈을 정지합니다. 진행 중인 작업은 정리(graceful drain)한 뒤 반환합니다.
    fn stop(&mut self) -> impl Future<Output = Result<(), LogtideError>> + Send;

    /// 현재 건강 상태를 확인합니다.
    fn health_check(&self) -> impl Future<Output = HealthStatus> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_status_predicates() {
        assert!(HealthStatus::Healthy.is_healthy());
        assert!(!HealthStatus::Degraded("slow".to_owned()).is_healthy());
        assert!(HealthStatus::Unhealthy("stopped".to_owned()).is_unhealthy());
    }

    #[test]
    fn health_status_display() {
        assert_eq!(HealthStatus::Healthy.to_string(), "healthy");
        assert_eq!(
            HealthStatus::Degraded("sink slow".to_owned()).to_string(),
            "degraded: sink slow"
        );
    }
}
