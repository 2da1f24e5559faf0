//! `logtide config` command handler

use std::io::Write;
use std::path::Path;

use serde::Serialize;
use tracing::info;

use logtide_core::config::LogtideConfig;
use logtide_log_pipeline::classify::RuleClassifier;
use logtide_log_pipeline::{PipelineConfig, logtypes};

use crate::cli::{ConfigAction, ConfigArgs};
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

const SECTIONS: &[&str] = &["general", "pipeline", "output", "metrics"];

/// Execute the `config` command.
pub async fn execute(
    args: ConfigArgs,
    config_path: &Path,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    match args.action {
        ConfigAction::Validate => execute_validate(config_path, writer).await,
        ConfigAction::Show { section } => execute_show(config_path, section, writer).await,
    }
}

/// Load the file and run every check the daemon runs before startup.
async fn execute_validate(config_path: &Path, writer: &OutputWriter) -> Result<(), CliError> {
    info!(path = %config_path.display(), "validating configuration");

    let report = validate(config_path).await;
    writer.render(&report)?;

    if !report.valid {
        return Err(CliError::Config("configuration is invalid".to_owned()));
    }
    Ok(())
}

/// Build a validation report. Stops at the first failing stage.
pub async fn validate(config_path: &Path) -> ConfigValidationReport {
    let source = config_path.display().to_string();
    let invalid = |error: String| ConfigValidationReport {
        source: source.clone(),
        valid: false,
        errors: vec![error],
        log_types: 0,
        inputs: 0,
        rules: 0,
    };

    let config = match LogtideConfig::load(config_path).await {
        Ok(config) => config,
        Err(e) => return invalid(e.to_string()),
    };
    let registry = match logtypes::builtin_registry() {
        Ok(registry) => registry,
        Err(e) => return invalid(e.to_string()),
    };
    let pipeline = match PipelineConfig::from_core(&config).and_then(|p| p.validate().map(|()| p))
    {
        Ok(pipeline) => pipeline,
        Err(e) => return invalid(e.to_string()),
    };
    if let Err(e) = RuleClassifier::from_config(&pipeline.classification, &registry) {
        return invalid(e.to_string());
    }

    let unknown_inputs: Vec<String> = pipeline
        .inputs
        .iter()
        .enumerate()
        .filter_map(|(idx, input)| {
            let name = input.log_type.as_deref()?;
            (!registry.contains(name))
                .then(|| format!("pipeline.inputs[{idx}].log_type: unknown log type '{name}'"))
        })
        .collect();
    if !unknown_inputs.is_empty() {
        return ConfigValidationReport {
            errors: unknown_inputs,
            ..invalid(String::new())
        };
    }

    ConfigValidationReport {
        source,
        valid: true,
        errors: Vec::new(),
        log_types: registry.len(),
        inputs: pipeline.inputs.len(),
        rules: pipeline.classification.len(),
    }
}

/// Show the effective configuration (file + env overrides + defaults).
async fn execute_show(
    config_path: &Path,
    section: Option<String>,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    info!(path = %config_path.display(), "loading configuration");

    let config = LogtideConfig::load(config_path).await?;
    let report = show_report(&config, &config_path.display().to_string(), section)?;
    writer.render(&report)
}

fn show_report(
    config: &LogtideConfig,
    source: &str,
    section: Option<String>,
) -> Result<ConfigReport, CliError> {
    let rendered = match section.as_deref() {
        None => toml::to_string_pretty(config),
        Some("general") => toml::to_string_pretty(&config.general),
        Some("pipeline") => toml::to_string_pretty(&config.pipeline),
        Some("output") => toml::to_string_pretty(&config.output),
        Some("metrics") => toml::to_string_pretty(&config.metrics),
        Some(other) => {
            return Err(CliError::Command(format!(
                "unknown section: {} (expected: {})",
                other,
                SECTIONS.join(", ")
            )));
        }
    };

    let config_toml =
        rendered.map_err(|e| CliError::Command(format!("failed to serialize config: {e}")))?;
    let value = toml::from_str::<toml::Table>(&config_toml)
        .map_err(|e| CliError::Command(format!("failed to re-read config: {e}")))?;

    Ok(ConfigReport {
        source: source.to_owned(),
        section,
        config: value,
        config_toml,
    })
}

/// Effective configuration, as TOML for text output and as a table for JSON.
#[derive(Serialize)]
pub struct ConfigReport {
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    pub config: toml::Table,
    #[serde(skip)]
    pub config_toml: String,
}

impl Render for ConfigReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        match &self.section {
            Some(section) => writeln!(
                w,
                "Configuration {} (source: {})",
                format!("[{section}]").bold(),
                self.source
            )?,
            None => writeln!(w, "Configuration (source: {})", self.source.bold())?,
        }
        writeln!(w)?;
        write!(w, "{}", self.config_toml)
    }
}

/// Result of `config validate`.
#[derive(Serialize)]
pub struct ConfigValidationReport {
    pub source: String,
    pub valid: bool,
    pub errors: Vec<String>,
    pub log_types: usize,
    pub inputs: usize,
    pub rules: usize,
}

impl Render for ConfigValidationReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(w, "Config Validation: {}", self.source.bold())?;
        if self.valid {
            writeln!(w, "  Result: {}", "VALID".green().bold())?;
            writeln!(
                w,
                "  {} log types, {} inputs, {} classification rules",
                self.log_types, self.inputs, self.rules
            )?;
        } else {
            writeln!(w, "  Result: {}", "INVALID".red().bold())?;
            for err in &self.errors {
                writeln!(w, "  Error: {}", err.red())?;
            }
        }
        Ok(())
    }
}
