//! `lxcward validate` command handler

use std::io::Write;

use serde::Serialize;
use tracing::info;

use lxcward_reconciler::{Platform, Reconciler, Validity};

use crate::cli::{ValidateArgs, ValidateCheck};
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `validate` command.
///
/// The report is always rendered. `Invalid` maps to exit code 4 and
/// `InvalidArgument` to exit code 3.
pub async fn execute<P: Platform>(
    args: ValidateArgs,
    reconciler: &Reconciler<P>,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let validation = reconciler.validation();

    let (check, target, validity) = match args.check {
        ValidateCheck::Exists { container_id } => {
            let validity = validation.container_exists(&container_id).await;
            ("exists", container_id, validity)
        }
        ValidateCheck::Running { container_id } => {
            let validity = validation.container_running(&container_id).await;
            ("running", container_id, validity)
        }
        ValidateCheck::Gpu { value } => {
            let validity = validation.gpu_assignment(&value);
            ("gpu", value, validity)
        }
        ValidateCheck::Path { container_id, path } => {
            let validity = validation.path_exists(&container_id, &path).await;
            ("path", format!("{container_id}:{path}"), validity)
        }
        ValidateCheck::Json { file } => {
            let validity = validation.json_syntax(&file).await;
            ("json", file.display().to_string(), validity)
        }
        ValidateCheck::Schema { file, schema } => {
            let validity = validation.json_schema(&file, &schema).await;
            (
                "schema",
                format!("{} against {}", file.display(), schema.display()),
                validity,
            )
        }
    };

    info!(check, target = %target, %validity, "validation finished");

    let report = ValidationReport {
        check: check.to_owned(),
        target,
        validity,
    };
    writer.render(&report)?;

    match report.validity {
        Validity::Valid => Ok(()),
        Validity::Invalid(reason) => Err(CliError::ValidationFailed(reason)),
        Validity::InvalidArgument(reason) => Err(CliError::InvalidArgument(reason)),
    }
}

/// Validation check report.
#[derive(Serialize)]
pub struct ValidationReport {
    pub check: String,
    pub target: String,
    #[serde(flatten)]
    pub validity: Validity,
}

impl Render for ValidationReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(w, "Validate {}: {}", self.check, self.target.bold())?;
        match &self.validity {
            Validity::Valid => writeln!(w, "  Result: {}", "VALID".green().bold())?,
            Validity::Invalid(reason) => {
                writeln!(w, "  Result: {}", "INVALID".red().bold())?;
                writeln!(w, "  Reason: {}", reason.red())?;
            }
            Validity::InvalidArgument(reason) => {
                writeln!(w, "  Result: {}", "INVALID ARGUMENT".red().bold())?;
                writeln!(w, "  Reason: {}", reason.red())?;
            }
        }
        Ok(())
    }
}
