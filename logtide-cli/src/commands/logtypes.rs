//! `logtide logtypes` command handler

use std::io::Write;

use serde::Serialize;

use logtide_log_pipeline::catalog::{self, LogTypeDescription};
use logtide_log_pipeline::{LogTypeRegistry, logtypes};

use crate::cli::{LogtypesAction, LogtypesArgs};
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `logtypes` command.
pub fn execute(args: LogtypesArgs, writer: &OutputWriter) -> Result<(), CliError> {
    let registry = logtypes::builtin_registry()?;
    match args.action {
        LogtypesAction::List => writer.render(&list_report(&registry)),
        LogtypesAction::Show { name } => writer.render(&show_report(&registry, &name)?),
    }
}

fn list_report(registry: &LogTypeRegistry) -> LogTypeListReport {
    LogTypeListReport {
        total: registry.len(),
        log_types: registry
            .all()
            .map(|log_type| LogTypeEntry {
                name: log_type.name().to_owned(),
                table: log_type.table_name(),
                fields: log_type.schema().fields().len(),
                description: log_type.description().to_owned(),
            })
            .collect(),
    }
}

fn show_report(registry: &LogTypeRegistry, name: &str) -> Result<LogTypeDetailReport, CliError> {
    let log_type = registry.lookup(name)?;
    Ok(LogTypeDetailReport(catalog::describe(log_type)))
}

/// `logtypes list` output.
#[derive(Serialize)]
pub struct LogTypeListReport {
    pub total: usize,
    pub log_types: Vec<LogTypeEntry>,
}

#[derive(Serialize)]
pub struct LogTypeEntry {
    pub name: String,
    pub table: String,
    pub fields: usize,
    pub description: String,
}

impl Render for LogTypeListReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(w, "Log Types ({} registered)", self.total.to_string().bold())?;
        writeln!(
            w,
            "{:<20} {:<20} {:>6}  {}",
            "NAME", "TABLE", "FIELDS", "DESCRIPTION"
        )?;
        writeln!(w, "{}", "-".repeat(80))?;
        for entry in &self.log_types {
            writeln!(
                w,
                "{:<20} {:<20} {:>6}  {}",
                entry.name.cyan(),
                entry.table,
                entry.fields,
                entry.description
            )?;
        }
        Ok(())
    }
}

/// `logtypes show` output: the catalog description of one log type.
#[derive(Serialize)]
#[serde(transparent)]
pub struct LogTypeDetailReport(pub LogTypeDescription);

impl Render for LogTypeDetailReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        let desc = &self.0;
        writeln!(w, "{} (table: {})", desc.name.bold(), desc.table)?;
        writeln!(w, "  {}", desc.description)?;
        writeln!(w, "  Reference: {}", desc.reference_url.underline())?;
        writeln!(w)?;

        let name_width = desc
            .columns
            .iter()
            .map(|c| c.name.len())
            .max()
            .unwrap_or(4)
            .max(4);
        writeln!(w, "  {:<name_width$}  {:<12} {:<8}  DESCRIPTION", "NAME", "TYPE", "NULL")?;
        for col in &desc.columns {
            let nullable = if col.nullable { "yes" } else { "no" };
            // struct types are long; print them on their own line
            if col.data_type.len() > 12 {
                writeln!(
                    w,
                    "  {:<name_width$}  {:<12} {:<8}  {}",
                    col.name, "", nullable, col.description
                )?;
                writeln!(w, "  {:<name_width$}    {}", "", col.data_type.dimmed())?;
            } else {
                writeln!(
                    w,
                    "  {:<name_width$}  {:<12} {:<8}  {}",
                    col.name, col.data_type, nullable, col.description
                )?;
            }
        }
        Ok(())
    }
}
