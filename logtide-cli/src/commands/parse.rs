//! `logtide parse` command handler
//!
//! Runs a single [`StreamWorker`] over the input with the log type fixed,
//! so the output matches what the daemon would write for the same file.
//! Events are printed as JSON lines in batch order; the summary goes to stderr.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use tokio::io::BufReader;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::info;

use logtide_log_pipeline::stats::ErrorSample;
use logtide_log_pipeline::{
    Batch, ChannelSink, FixedClassifier, LineSource, LogTypeRegistry, PipelineConfig,
    PipelineConfigBuilder, PipelineStats, RecordSource, StreamWorker, logtypes,
};

use crate::cli::ParseArgs;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Batches buffered between the worker and stdout.
const BATCH_CHANNEL_CAPACITY: usize = 16;

/// Execute the `parse` command.
pub async fn execute(args: ParseArgs, writer: &OutputWriter) -> Result<(), CliError> {
    let registry = Arc::new(logtypes::builtin_registry()?);
    let config = PipelineConfigBuilder::new()
        .max_record_size(args.max_record_size)
        .build()?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    let stats = if args.file == Path::new("-") {
        let source = LineSource::new(
            "stdin",
            BufReader::new(tokio::io::stdin()),
            config.max_record_size,
        );
        normalize_stream(source, &args.log_type, registry, &config, &mut out).await?
    } else {
        let source = LineSource::open(&args.file, config.max_record_size).await?;
        normalize_stream(source, &args.log_type, registry, &config, &mut out).await?
    };
    out.flush()?;

    let summary = ParseSummary::new(&args.log_type, &args.file.display().to_string(), &stats);
    writer.render_to(&mut std::io::stderr().lock(), &summary)?;

    if args.strict && summary.dropped > 0 {
        return Err(CliError::RecordsDropped(summary.dropped));
    }
    Ok(())
}

/// Normalize every record of `source` as `log_type` and write events to `out`.
pub async fn normalize_stream<S>(
    source: S,
    log_type: &str,
    registry: Arc<LogTypeRegistry>,
    config: &PipelineConfig,
    out: &mut dyn Write,
) -> Result<PipelineStats, CliError>
where
    S: RecordSource + 'static,
{
    let classifier = Arc::new(FixedClassifier::new(log_type, &registry)?);

    let (sink, mut batches) = ChannelSink::channel(BATCH_CHANNEL_CAPACITY);
    let worker = StreamWorker::new(registry, Arc::new(sink), config, CancellationToken::new());
    let task = tokio::spawn(worker.run(source, classifier));

    let written = write_batches(&mut batches, out).await;
    // stop the worker if stdout failed; its sends now fail and it drains quickly
    drop(batches);
    let stats = task
        .await
        .map_err(|e| CliError::Command(format!("parse worker failed: {e}")))?;
    let events = written?;

    info!(events, records = stats.records_read, "input normalized");
    Ok(stats)
}

async fn write_batches(
    batches: &mut mpsc::Receiver<Batch>,
    out: &mut dyn Write,
) -> Result<u64, CliError> {
    let mut events = 0u64;
    while let Some(batch) = batches.recv().await {
        for event in batch.events() {
            serde_json::to_writer(&mut *out, event)?;
            writeln!(out)?;
            events += 1;
        }
    }
    Ok(events)
}

/// Summary of one `parse` run.
#[derive(Debug, Serialize)]
pub struct ParseSummary {
    pub log_type: String,
    pub source: String,
    pub records_read: u64,
    pub events_emitted: u64,
    pub degraded_fields: u64,
    pub dropped: u64,
    /// Dropped record count per error kind.
    pub errors: BTreeMap<String, u64>,
    /// First few dropped records per error kind.
    pub samples: Vec<ErrorSample>,
}

impl ParseSummary {
    pub fn new(log_type: &str, source: &str, stats: &PipelineStats) -> Self {
        let mut errors = BTreeMap::new();
        let mut samples = Vec::new();
        let mut degraded_fields = 0;

        let tallies = stats
            .per_log_type
            .values()
            .inspect(|per_type| degraded_fields += per_type.degraded_fields)
            .flat_map(|per_type| per_type.errors.iter())
            .chain(stats.unclassified.iter());
        for (kind, tally) in tallies {
            *errors.entry(kind.to_string()).or_insert(0) += tally.count;
            samples.extend(tally.samples.iter().cloned());
        }
        samples.sort_by_key(|s| s.offset);

        Self {
            log_type: log_type.to_owned(),
            source: source.to_owned(),
            records_read: stats.records_read,
            events_emitted: stats.events_emitted,
            degraded_fields,
            dropped: stats.total_errors(),
            errors,
            samples,
        }
    }
}

impl Render for ParseSummary {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(w, "Parsed {} as {}", self.source.bold(), self.log_type.cyan())?;
        writeln!(w, "  Records read:    {}", self.records_read)?;
        writeln!(w, "  Events emitted:  {}", self.events_emitted.to_string().green())?;
        if self.degraded_fields > 0 {
            writeln!(w, "  Degraded fields: {}", self.degraded_fields.to_string().yellow())?;
        }
        if self.dropped == 0 {
            return Ok(());
        }

        writeln!(w, "  Dropped:         {}", self.dropped.to_string().red())?;
        for (kind, count) in &self.errors {
            writeln!(w, "    {kind}: {count}")?;
        }
        for sample in &self.samples {
            writeln!(w, "    line {}: {}", sample.offset, sample.message.red())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use logtide_log_pipeline::MemorySource;

    const DNS_LINE: &str = r#"{"ts":1700000000.5,"uid":"C1","id.orig_h":"10.0.0.5","id.orig_p":53124,"id.resp_h":"10.0.0.1","id.resp_p":53,"proto":"udp","query":"example.com"}"#;

    async fn run(lines: Vec<&'static str>, log_type: &str) -> (Vec<String>, PipelineStats) {
        let registry = Arc::new(logtypes::builtin_registry().expect("registry"));
        let mut out = Vec::new();
        let stats = normalize_stream(
            MemorySource::new("dns.log", lines),
            log_type,
            registry,
            &PipelineConfig::default(),
            &mut out,
        )
        .await
        .expect("normalize");
        let text = String::from_utf8(out).expect("utf-8");
        (text.lines().map(str::to_owned).collect(), stats)
    }

    #[tokio::test]
    async fn writes_one_json_line_per_event() {
        let (lines, stats) = run(vec![DNS_LINE, DNS_LINE], "Zeek.DNS").await;
        assert_eq!(lines.len(), 2);
        assert_eq!(stats.events_emitted, 2);

        let event: serde_json::Value = serde_json::from_str(&lines[0]).expect("json line");
        assert_eq!(event["query"], "example.com");
        assert_eq!(event["p_log_type"], "Zeek.DNS");
        assert_eq!(event["p_source_offset"], 1);
        assert_ne!(lines[0], lines[1], "row ids differ per offset");
    }

    #[tokio::test]
    async fn summary_reports_dropped_records() {
        let (lines, stats) = run(vec![DNS_LINE, "{broken", DNS_LINE], "Zeek.DNS").await;
        assert_eq!(lines.len(), 2);

        let summary = ParseSummary::new("Zeek.DNS", "dns.log", &stats);
        assert_eq!(summary.records_read, 3);
        assert_eq!(summary.dropped, 1);
        assert_eq!(summary.errors.values().sum::<u64>(), 1);
        assert_eq!(summary.samples.len(), 1);
        assert_eq!(summary.samples[0].offset, 2);
    }

    #[tokio::test]
    async fn unknown_log_type_is_rejected_before_reading() {
        let registry = Arc::new(logtypes::builtin_registry().expect("registry"));
        let mut out = Vec::new();
        let err = normalize_stream(
            MemorySource::new("dns.log", [DNS_LINE]),
            "Nope.Missing",
            registry,
            &PipelineConfig::default(),
            &mut out,
        )
        .await
        .expect_err("unknown type");
        assert_eq!(err.exit_code(), 3);
        assert!(out.is_empty());
    }

    #[test]
    fn summary_text_lists_error_kinds() {
        colored::control::set_override(false);
        let mut stats = PipelineStats::default();
        stats.records_read = 2;
        stats.record_error(
            Some("Zeek.DNS"),
            logtide_log_pipeline::RecordErrorKind::Parse,
            ErrorSample {
                source_id: "dns.log".to_owned(),
                offset: 2,
                message: "expected value".to_owned(),
            },
        );

        let mut buf = Vec::new();
        ParseSummary::new("Zeek.DNS", "dns.log", &stats)
            .render_text(&mut buf)
            .expect("render");
        let text = String::from_utf8(buf).expect("utf-8");
        assert!(text.contains("Dropped:         1"));
        assert!(text.contains("line 2: expected value"));
    }
}
