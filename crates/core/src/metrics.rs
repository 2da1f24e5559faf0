//! 메트릭 상수 및 설명 등록
//!
//! 모든 Prometheus 메트릭의 이름과 설명을 중앙에서 정의합니다.
//! 각 모듈은 이 상수를 사용하여 `metrics::counter!()`, `metrics::gauge!()`,
//! `metrics::histogram!()` 매크로를 호출합니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `logtide_`
//! - 모듈명: `pipeline_`, `batch_`, `daemon_`
//! - 접미어: `_total` (counter), `_seconds` (histogram/latency), 없음 (gauge)
//!
//! # 사용 예시
//!
//! ```ignore
//! use metrics::counter;
//!
//! counter!(logtide_core::metrics::PIPELINE_EVENTS_EMITTED_TOTAL, "log_type" => "Zeek.DNS")
//!     .increment(1);
//! ```

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// 로그 타입 레이블 키 (Zeek.DNS, AWS.CloudTrail, ...)
pub const LABEL_LOG_TYPE: &str = "log_type";

/// 레코드 에러 종류 레이블 키 (parse, validation, unknown_source)
pub const LABEL_ERROR_KIND: &str = "kind";

/// 결과 레이블 키 (success, failure)
pub const LABEL_RESULT: &str = "result";

// ─── Pipeline 메트릭 ────────────────────────────────────────────────

/// Pipeline: 읽은 원시 레코드 수 (counter)
pub const PIPELINE_RECORDS_READ_TOTAL: &str = "logtide_pipeline_records_read_total";

/// Pipeline: 정규화되어 배치에 들어간 이벤트 수 (counter, label: log_type)
pub const PIPELINE_EVENTS_EMITTED_TOTAL: &str = "logtide_pipeline_events_emitted_total";

/// Pipeline: 레코드 단위 에러 수 (counter, labels: kind, log_type)
pub const PIPELINE_RECORD_ERRORS_TOTAL: &str = "logtide_pipeline_record_errors_total";

/// Pipeline: 타입 불일치로 null 처리된 선택 필드 수 (counter, label: log_type)
pub const PIPELINE_DEGRADED_FIELDS_TOTAL: &str = "logtide_pipeline_degraded_fields_total";

/// Pipeline: 레코드 하나의 파싱~정규화 소요 시간 (histogram, 초)
pub const PIPELINE_PROCESSING_DURATION_SECONDS: &str =
    "logtide_pipeline_processing_duration_seconds";

/// Pipeline: 실행 중인 스트림 워커 수 (gauge)
pub const PIPELINE_WORKERS_ACTIVE: &str = "logtide_pipeline_workers_active";

// ─── Batch 메트릭 ───────────────────────────────────────────────────

/// Batch: 봉인된 배치 수 (counter, label: log_type)
pub const BATCH_SEALED_TOTAL: &str = "logtide_batch_sealed_total";

/// Batch: 싱크 전달 결과 수 (counter, label: result)
pub const BATCH_DELIVERIES_TOTAL: &str = "logtide_batch_deliveries_total";

/// Batch: 봉인 시점의 배치 크기 (histogram, 이벤트 수)
pub const BATCH_SIZE_EVENTS: &str = "logtide_batch_size_events";

// ─── Daemon 메트릭 ──────────────────────────────────────────────────

/// Daemon: 가동 시간 (gauge, 초)
pub const DAEMON_UPTIME_SECONDS: &str = "logtide_daemon_uptime_seconds";

/// Daemon: 등록된 로그 타입 수 (gauge)
pub const DAEMON_LOG_TYPES_REGISTERED: &str = "logtide_daemon_log_types_registered";

/// Daemon: 빌드 정보 (gauge, 항상 1, label: version)
pub const DAEMON_BUILD_INFO: &str = "logtide_daemon_build_info";

// ─── 히스토그램 버킷 정의 ────────────────────────────────────────────

/// 레코드 처리 지연 시간 히스토그램 버킷 (초)
///
/// 10us ~ 1s 범위
pub const PROCESSING_DURATION_BUCKETS: [f64; 9] =
    [0.00001, 0.00005, 0.0001, 0.0005, 0.001, 0.005, 0.01, 0.1, 1.0];

/// 배치 크기 히스토그램 버킷 (이벤트 수)
pub const BATCH_SIZE_BUCKETS: [f64; 7] = [1.0, 10.0, 100.0, 1_000.0, 10_000.0, 50_000.0, 100_000.0];

// ─── 설명 등록 함수 ─────────────────────────────────────────────────

/// 모든 메트릭의 설명(description)을 등록합니다.
///
/// 전역 레코더 설치 후 한 번만 호출해야 합니다.
/// 일반적으로 `logtide-daemon`의 시작 시점에서 호출합니다.
pub fn describe_all() {
    use metrics::{describe_counter, describe_gauge, describe_histogram};

    // Pipeline
    describe_counter!(
        PIPELINE_RECORDS_READ_TOTAL,
        "Total number of raw records read from all sources"
    );
    describe_counter!(
        PIPELINE_EVENTS_EMITTED_TOTAL,
        "Total number of normalized events accepted into batches"
    );
    describe_counter!(
        PIPELINE_RECORD_ERRORS_TOTAL,
        "Total number of records dropped by error kind"
    );
    describe_counter!(
        PIPELINE_DEGRADED_FIELDS_TOTAL,
        "Total number of optional fields nulled due to type mismatch"
    );
    describe_histogram!(
        PIPELINE_PROCESSING_DURATION_SECONDS,
        "Time to parse and normalize a single record in seconds"
    );
    describe_gauge!(
        PIPELINE_WORKERS_ACTIVE,
        "Number of stream workers currently running"
    );

    // Batch
    describe_counter!(BATCH_SEALED_TOTAL, "Total number of sealed output batches");
    describe_counter!(
        BATCH_DELIVERIES_TOTAL,
        "Batch deliveries to the output sink by result"
    );
    describe_histogram!(BATCH_SIZE_EVENTS, "Number of events in a sealed batch");

    // Daemon
    describe_gauge!(DAEMON_UPTIME_SECONDS, "logtide daemon uptime in seconds");
    describe_gauge!(
        DAEMON_LOG_TYPES_REGISTERED,
        "Number of log types registered in the catalog"
    );
    describe_gauge!(
        DAEMON_BUILD_INFO,
        "Build information (always 1, with version label)"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_METRIC_NAMES: &[&str] = &[
        PIPELINE_RECORDS_READ_TOTAL,
        PIPELINE_EVENTS_EMITTED_TOTAL,
        PIPELINE_RECORD_ERRORS_TOTAL,
        PIPELINE_DEGRADED_FIELDS_TOTAL,
        PIPELINE_PROCESSING_DURATION_SECONDS,
        PIPELINE_WORKERS_ACTIVE,
        BATCH_SEALED_TOTAL,
        BATCH_DELIVERIES_TOTAL,
        BATCH_SIZE_EVENTS,
        DAEMON_UPTIME_SECONDS,
        DAEMON_LOG_TYPES_REGISTERED,
        DAEMON_BUILD_INFO,
    ];

    #[test]
    fn all_metrics_start_with_logtide_prefix() {
        for name in ALL_METRIC_NAMES {
            assert!(
                name.starts_with("logtide_"),
                "Metric '{name}' does not start with 'logtide_' prefix"
            );
        }
    }

    #[test]
    fn metric_names_are_unique() {
        let mut names = ALL_METRIC_NAMES.to_vec();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), ALL_METRIC_NAMES.len());
    }

    #[test]
    fn describe_all_does_not_panic() {
        // 레코더 미설치 상태에서도 패닉하지 않아야 함
        describe_all();
    }

    #[test]
    fn label_keys_are_lowercase() {
        for label in [LABEL_LOG_TYPE, LABEL_ERROR_KIND, LABEL_RESULT] {
            assert_eq!(label.to_lowercase(), label);
        }
    }

    #[test]
    fn histogram_buckets_are_sorted() {
        for buckets in [&PROCESSING_DURATION_BUCKETS[..], &BATCH_SIZE_BUCKETS[..]] {
            assert!(buckets.windows(2).all(|w| w[1] > w[0]));
        }
    }
}
