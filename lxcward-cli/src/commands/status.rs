//! `lxcward status` command handler

use std::io::Write;

use serde::Serialize;

use lxcward_core::types::{ContainerId, ContainerStatus};
use lxcward_reconciler::{Platform, Reconciler};

use crate::cli::ContainerArgs;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `status` command.
///
/// Probing never fails: an unreachable platform reports `unknown`.
pub async fn execute<P: Platform>(
    args: ContainerArgs,
    reconciler: &Reconciler<P>,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let id = ContainerId::parse(&args.container_id)?;
    let status = reconciler.status(id).await;

    writer.render(&StatusReport {
        container_id: id,
        status,
    })?;
    Ok(())
}

/// Container status report.
#[derive(Serialize)]
pub struct StatusReport {
    pub container_id: ContainerId,
    pub status: ContainerStatus,
}

impl Render for StatusReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        let status = match self.status {
            ContainerStatus::Running => "running".green().bold(),
            ContainerStatus::Stopped => "stopped".yellow().bold(),
            ContainerStatus::Unknown => "unknown".red().bold(),
        };
        writeln!(w, "Container {}: {}", self.container_id, status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(status: ContainerStatus) -> StatusReport {
        StatusReport {
            container_id: ContainerId::new(101).expect("valid id"),
            status,
        }
    }

    #[test]
    fn test_status_report_render_text() {
        colored::control::set_override(false);
        let mut buffer = Vec::new();
        report(ContainerStatus::Running)
            .render_text(&mut buffer)
            .expect("text rendering should succeed");

        let output = String::from_utf8(buffer).expect("valid UTF-8");
        assert_eq!(output, "Container 101: running\n");
    }

    #[test]
    fn test_status_report_json_serialization() {
        let json = serde_json::to_string(&report(ContainerStatus::Unknown))
            .expect("JSON serialization should succeed");
        let parsed: serde_json::Value = serde_json::from_str(&json).expect("should parse JSON");

        assert_eq!(parsed["container_id"].as_u64(), Some(101));
        assert_eq!(parsed["status"].as_str(), Some("unknown"));
    }
}
