//! `lxcward config` command handler

use std::io::Write;
use std::path::Path;

use serde::Serialize;
use tracing::info;

use crate::cli::{ConfigAction, ConfigArgs};
use crate::commands::load_config;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

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

/// Execute the config validate subcommand.
///
/// The report is rendered for both outcomes; an invalid configuration
/// then returns `CliError::Config` (exit code 2).
async fn execute_validate(config_path: &Path, writer: &OutputWriter) -> Result<(), CliError> {
    info!(path = %config_path.display(), "validating configuration");

    let report = match load_config(config_path).await {
        Ok(_) => ConfigValidationReport {
            source: config_path.display().to_string(),
            valid: true,
            errors: Vec::new(),
        },
        Err(e) => ConfigValidationReport {
            source: config_path.display().to_string(),
            valid: false,
            errors: vec![e.to_string()],
        },
    };

    writer.render(&report)?;

    if !report.valid {
        return Err(CliError::Config("configuration is invalid".to_owned()));
    }

    Ok(())
}

/// Execute the config show subcommand.
///
/// Displays the effective configuration (file + env overrides + defaults).
async fn execute_show(
    config_path: &Path,
    section: Option<String>,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    info!(path = %config_path.display(), "loading configuration");

    let config = load_config(config_path).await?;
    let source = config_path.display().to_string();

    let config_toml = match section.as_deref() {
        None => toml::to_string_pretty(&config),
        Some("general") => toml::to_string_pretty(&config.general),
        Some("platform") => toml::to_string_pretty(&config.platform),
        Some("retry") => toml::to_string_pretty(&config.retry),
        Some("privilege") => toml::to_string_pretty(&config.privilege),
        Some(other) => {
            return Err(CliError::InvalidArgument(format!(
                "unknown section: {other} (expected: general, platform, retry, privilege)"
            )));
        }
    }
    .unwrap_or_else(|e| format!("(serialization error: {e})"));

    writer.render(&ConfigReport {
        source,
        section,
        config_toml,
    })?;

    Ok(())
}

/// Configuration display report.
///
/// `config_toml` is only used for text rendering.
#[derive(Serialize)]
pub struct ConfigReport {
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    #[serde(skip)]
    pub config_toml: String,
}

impl Render for ConfigReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        if let Some(ref section) = self.section {
            let section_label = format!("[{section}]");
            writeln!(
                w,
                "Configuration {} (source: {})",
                section_label.bold(),
                self.source
            )?;
        } else {
            writeln!(w, "Configuration (source: {})", self.source.bold())?;
        }

        writeln!(w)?;
        write!(w, "{}", self.config_toml)?;

        Ok(())
    }
}

/// Configuration validation report.
#[derive(Serialize)]
pub struct ConfigValidationReport {
    pub source: String,
    pub valid: bool,
    /// Empty when valid
    pub errors: Vec<String>,
}

impl Render for ConfigValidationReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(w, "Config Validation: {}", self.source.bold())?;

        if self.valid {
            writeln!(w, "  Result: {}", "VALID".green().bold())?;
        } else {
            writeln!(w, "  Result: {}", "INVALID".red().bold())?;
            for err in &self.errors {
                writeln!(w, "  Error: {}", err.red())?;
            }
        }

        Ok(())
    }
}
