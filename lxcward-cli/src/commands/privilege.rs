//! `lxcward make-privileged` command handler

use std::io::Write;

use serde::Serialize;

use lxcward_core::types::ContainerId;
use lxcward_reconciler::{Platform, PrivilegeOutcome, Reconciler};

use crate::cli::ContainerArgs;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `make-privileged` command.
///
/// A policy skip is a successful outcome (exit code 0).
pub async fn execute<P: Platform>(
    args: ContainerArgs,
    reconciler: &Reconciler<P>,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let id = ContainerId::parse(&args.container_id)?;
    let outcome = reconciler.make_privileged(id).await?;

    writer.render(&PrivilegeReport {
        container_id: id,
        outcome,
    })?;
    Ok(())
}

/// Privilege change report.
#[derive(Serialize)]
pub struct PrivilegeReport {
    pub container_id: ContainerId,
    #[serde(flatten)]
    pub outcome: PrivilegeOutcome,
}

impl Render for PrivilegeReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        match &self.outcome {
            PrivilegeOutcome::Skipped { reason } => {
                writeln!(w, "{} Container {} skipped", "-".yellow(), self.container_id)?;
                writeln!(w, "  Reason: {reason}")?;
            }
            PrivilegeOutcome::Applied {
                config_changed,
                advisory,
            } => {
                writeln!(
                    w,
                    "{} Container {} is privileged",
                    "✓".green(),
                    self.container_id
                )?;
                let change = if *config_changed {
                    "updated"
                } else {
                    "already up to date"
                };
                writeln!(w, "  Config: {change}")?;
                if let Some(advisory) = advisory {
                    writeln!(w, "  {} {}", "Advisory:".yellow().bold(), advisory)?;
                }
            }
        }
        Ok(())
    }
}
