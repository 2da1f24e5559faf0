//! 처리 통계 -- 로그 타입별 이벤트 수와 에러 종류별 집계
//!
//! 워커마다 자기 [`PipelineStats`]를 갖고, 파이프라인이 종료 시 [`PipelineStats::merge`]로
//! 합칩니다. 에러 샘플은 집계마다 `sample_limit`개까지만 보관합니다.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::RecordErrorKind;

/// 에러 샘플 하나
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorSample {
    pub source_id: String,
    pub offset: u64,
    pub message: String,
}

/// 에러 종류 하나의 집계
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ErrorTally {
    pub count: u64,
    pub samples: Vec<ErrorSample>,
}

impl ErrorTally {
    /// 에러를 세고, 한도 안이면 샘플을 보관합니다. 샘플을 보관했으면 `true`.
    fn record(&mut self, sample: ErrorSample, limit: usize) -> bool {
        self.count += 1;
        if self.samples.len() < limit {
            self.samples.push(sample);
            true
        } else {
            false
        }
    }

    fn merge(&mut self, other: ErrorTally, limit: usize) {
        self.count += other.count;
        let room = limit.saturating_sub(self.samples.len());
        self.samples.extend(other.samples.into_iter().take(room));
    }
}

/// 로그 타입 하나의 통계
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LogTypeStats {
    pub events: u64,
    pub degraded_fields: u64,
    pub errors: BTreeMap<RecordErrorKind, ErrorTally>,
}

impl LogTypeStats {
    pub fn error_count(&self, kind: RecordErrorKind) -> u64 {
        self.errors.get(&kind).map_or(0, |t| t.count)
    }
}

/// 파이프라인 처리 통계
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipelineStats {
    pub records_read: u64,
    pub events_emitted: u64,
    pub batches_delivered: u64,
    pub delivery_failures: u64,
    pub sources_completed: u64,
    pub sources_failed: u64,
    pub per_log_type: BTreeMap<String, LogTypeStats>,
    /// 로그 타입을 정하지 못한 레코드의 에러
    pub unclassified: BTreeMap<RecordErrorKind, ErrorTally>,
    #[serde(skip)]
    sample_limit: usize,
}

impl Default for PipelineStats {
    fn default() -> Self {
        Self::new(5)
    }
}

impl PipelineStats {
    pub fn new(sample_limit: usize) -> Self {
        Self {
            records_read: 0,
            events_emitted: 0,
            batches_delivered: 0,
            delivery_failures: 0,
            sources_completed: 0,
            sources_failed: 0,
            per_log_type: BTreeMap::new(),
            unclassified: BTreeMap::new(),
            sample_limit,
        }
    }

    pub fn sample_limit(&self) -> usize {
        self.sample_limit
    }

    pub fn record_event(&mut self, log_type: &str, degraded_fields: usize) {
        self.events_emitted += 1;
        let entry = self.log_type_entry(log_type);
        entry.events += 1;
        entry.degraded_fields += degraded_fields as u64;
    }

    /// 레코드 에러를 집계합니다. 샘플로 보관했으면 `true`.
    pub fn record_error(
        &mut self,
        log_type: Option<&str>,
        kind: RecordErrorKind,
        sample: ErrorSample,
    ) -> bool {
        let limit = self.sample_limit;
        let tally = match log_type {
            Some(name) => self.log_type_entry(name).errors.entry(kind).or_default(),
            None => self.unclassified.entry(kind).or_default(),
        };
        tally.record(sample, limit)
    }

    fn log_type_entry(&mut self, log_type: &str) -> &mut LogTypeStats {
        self.per_log_type.entry(log_type.to_owned()).or_default()
    }

    /// 에러 종류별 합계 (로그 타입 무관)
    pub fn error_count(&self, kind: RecordErrorKind) -> u64 {
        let classified: u64 = self
            .per_log_type
            .values()
            .map(|s| s.error_count(kind))
            .sum();
        classified + self.unclassified.get(&kind).map_or(0, |t| t.count)
    }

    pub fn total_errors(&self) -> u64 {
        RecordErrorKind::ALL
            .iter()
            .map(|&kind| self.error_count(kind))
            .sum()
    }

    /// 다른 통계를 합칩니다.
    pub fn merge(&mut self, other: PipelineStats) {
        let limit = self.sample_limit;
        self.records_read += other.records_read;
        self.events_emitted += other.events_emitted;
        self.batches_delivered += other.batches_delivered;
        self.delivery_failures += other.delivery_failures;
        self.sources_completed += other.sources_completed;
        self.sources_failed += other.sources_failed;

        for (name, stats) in other.per_log_type {
            let entry = self.per_log_type.entry(name).or_default();
            entry.events += stats.events;
            entry.degraded_fields += stats.degraded_fields;
            for (kind, tally) in stats.errors {
                entry.errors.entry(kind).or_default().merge(tally, limit);
            }
        }
        for (kind, tally) in other.unclassified {
            self.unclassified.entry(kind).or_default().merge(tally, limit);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(offset: u64) -> ErrorSample {
        ErrorSample {
            source_id: "dns.log".to_owned(),
            offset,
            message: "bad".to_owned(),
        }
    }

    #[test]
    fn samples_are_bounded() {
        let mut stats = PipelineStats::new(2);
        assert!(stats.record_error(Some("DNS"), RecordErrorKind::Parse, sample(1)));
        assert!(stats.record_error(Some("DNS"), RecordErrorKind::Parse, sample(2)));
        assert!(!stats.record_error(Some("DNS"), RecordErrorKind::Parse, sample(3)));

        let tally = &stats.per_log_type["DNS"].errors[&RecordErrorKind::Parse];
        assert_eq!(tally.count, 3);
        assert_eq!(tally.samples.len(), 2);
    }

    #[test]
    fn error_counts_by_kind() {
        let mut stats = PipelineStats::new(5);
        stats.record_error(Some("DNS"), RecordErrorKind::Validation, sample(1));
        stats.record_error(Some("VPC"), RecordErrorKind::Validation, sample(2));
        stats.record_error(None, RecordErrorKind::UnknownSource, sample(3));

        assert_eq!(stats.error_count(RecordErrorKind::Validation), 2);
        assert_eq!(stats.error_count(RecordErrorKind::UnknownSource), 1);
        assert_eq!(stats.error_count(RecordErrorKind::Parse), 0);
        assert_eq!(stats.total_errors(), 3);
    }

    #[test]
    fn merge_sums_counts_and_keeps_sample_limit() {
        let mut a = PipelineStats::new(2);
        a.records_read = 10;
        a.record_event("DNS", 1);
        a.record_error(Some("DNS"), RecordErrorKind::Parse, sample(1));

        let mut b = PipelineStats::new(2);
        b.records_read = 5;
        b.record_event("DNS", 0);
        b.record_event("VPC", 2);
        b.record_error(Some("DNS"), RecordErrorKind::Parse, sample(7));
        b.record_error(Some("DNS"), RecordErrorKind::Parse, sample(8));

        a.merge(b);
        assert_eq!(a.records_read, 15);
        assert_eq!(a.events_emitted, 3);
        assert_eq!(a.per_log_type["DNS"].events, 2);
        assert_eq!(a.per_log_type["DNS"].degraded_fields, 1);
        assert_eq!(a.per_log_type["VPC"].degraded_fields, 2);

        let tally = &a.per_log_type["DNS"].errors[&RecordErrorKind::Parse];
        assert_eq!(tally.count, 3);
        assert_eq!(
            tally.samples.iter().map(|s| s.offset).collect::<Vec<_>>(),
            [1, 7]
        );
    }

    #[test]
    fn serializes_error_kinds_as_keys() {
        let mut stats = PipelineStats::new(1);
        stats.record_error(Some("DNS"), RecordErrorKind::Validation, sample(1));
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["per_log_type"]["DNS"]["errors"]["validation"]["count"], 1);
        assert!(json.get("sample_limit").is_none());
    }
}
