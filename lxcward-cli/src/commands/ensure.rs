//! `lxcward ensure-running` command handler

use std::io::Write;

use serde::Serialize;
use tracing::info;

use lxcward_core::types::ContainerId;
use lxcward_reconciler::{Convergence, Platform, Reconciler};

use crate::cli::EnsureArgs;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `ensure-running` command.
pub async fn execute<P: Platform>(
    args: EnsureArgs,
    reconciler: &Reconciler<P>,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let id = ContainerId::parse(&args.container_id)?;

    let convergence = if args.responsive {
        reconciler.ensure_responsive(id).await?
    } else {
        reconciler.ensure_running(id).await?
    };
    info!(container_id = %id, %convergence, "container converged");

    writer.render(&EnsureReport {
        container_id: id,
        convergence,
        responsive_checked: args.responsive,
    })?;
    Ok(())
}

/// Convergence report.
#[derive(Serialize)]
pub struct EnsureReport {
    pub container_id: ContainerId,
    pub convergence: Convergence,
    pub responsive_checked: bool,
}

impl Render for EnsureReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        let state = if self.responsive_checked {
            "running and responsive"
        } else {
            "running"
        };
        writeln!(
            w,
            "{} Container {} is {} ({})",
            "✓".green(),
            self.container_id,
            state,
            self.convergence
        )
    }
}
