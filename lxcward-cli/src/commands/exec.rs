//! `lxcward exec` command handler

use std::io::Write;

use serde::Serialize;

use lxcward_core::types::{CommandLine, ContainerId};
use lxcward_reconciler::{ExecOutput, Platform, Reconciler};

use crate::cli::ExecArgs;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `exec` command.
///
/// With `--once` the output is reported whatever the exit code, and a
/// non-zero exit becomes a command error after rendering.
pub async fn execute<P: Platform>(
    args: ExecArgs,
    reconciler: &Reconciler<P>,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let id = ContainerId::parse(&args.container_id)?;
    let command = CommandLine::new(args.command)?;

    let output = if args.once {
        reconciler.exec_once(id, &command).await?
    } else {
        reconciler.exec_with_retry(id, &command).await?
    };

    let report = ExecReport {
        container_id: id,
        command: command.args().to_vec(),
        output,
    };
    writer.render(&report)?;

    if !report.output.success() {
        return Err(CliError::Command(format!(
            "'{command}' exited with status {} in container {id}",
            report.output.exit_code
        )));
    }
    Ok(())
}

/// Command execution report.
#[derive(Serialize)]
pub struct ExecReport {
    pub container_id: ContainerId,
    pub command: Vec<String>,
    #[serde(flatten)]
    pub output: ExecOutput,
}

impl Render for ExecReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        write!(w, "{}", self.output.stdout)?;
        if !self.output.stderr.is_empty() {
            write!(w, "{}", self.output.stderr.dimmed())?;
        }
        if !self.output.success() {
            writeln!(
                w,
                "{} exit code {}",
                "✗".red(),
                self.output.exit_code
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(exit_code: i32, stdout: &str) -> ExecReport {
        ExecReport {
            container_id: ContainerId::new(120).expect("valid id"),
            command: vec!["hostname".to_owned()],
            output: ExecOutput {
                exit_code,
                stdout: stdout.to_owned(),
                stderr: String::new(),
            },
        }
    }

    #[test]
    fn test_exec_report_text_passes_stdout_through() {
        colored::control::set_override(false);
        let mut buffer = Vec::new();
        report(0, "agent-01\n")
            .render_text(&mut buffer)
            .expect("text rendering should succeed");

        let output = String::from_utf8(buffer).expect("valid UTF-8");
        assert_eq!(output, "agent-01\n");
    }

    #[test]
    fn test_exec_report_text_shows_failure_code() {
        colored::control::set_override(false);
        let mut buffer = Vec::new();
        report(3, "")
            .render_text(&mut buffer)
            .expect("text rendering should succeed");

        let output = String::from_utf8(buffer).expect("valid UTF-8");
        assert!(output.contains("exit code 3"));
    }

    #[test]
    fn test_exec_report_json_flattens_output() {
        let parsed =
            serde_json::to_value(report(0, "ok\n")).expect("JSON serialization should succeed");

        assert_eq!(parsed["container_id"].as_u64(), Some(120));
        assert_eq!(parsed["exit_code"].as_i64(), Some(0));
        assert_eq!(parsed["stdout"].as_str(), Some("ok\n"));
        assert_eq!(parsed["command"][0].as_str(), Some("hostname"));
    }
}
