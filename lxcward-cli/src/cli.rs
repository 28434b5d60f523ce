//! CLI argument parsing using clap derive API
//!
//! This module defines the command-line interface structure using clap's derive macros.
//! It is purely declarative with no side effects or I/O.
//!
//! Container identifiers are accepted as raw strings so that an empty or
//! malformed identifier surfaces as an invalid-argument error (exit code 3)
//! rather than a clap usage error.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Default configuration path. Missing only this file falls back to built-in defaults.
pub const DEFAULT_CONFIG_PATH: &str = "lxcward.toml";

/// lxcward -- reconcile Proxmox LXC containers and run commands in them reliably.
///
/// Use `lxcward <COMMAND> --help` for subcommand details.
#[derive(Parser, Debug)]
#[command(name = "lxcward", version, about, long_about = None)]
pub struct Cli {
    /// Path to the lxcward.toml configuration file.
    #[arg(short, long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Output format.
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Supported output formats.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    Text,
    /// Machine-readable JSON.
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show the current status of a container.
    Status(ContainerArgs),

    /// Make sure a container is running (starting it if needed).
    EnsureRunning(EnsureArgs),

    /// Run a command inside a container with retries.
    Exec(ExecArgs),

    /// Switch a container to privileged mode (stop, edit config, start, verify).
    MakePrivileged(ContainerArgs),

    /// Run a single validation check.
    Validate(ValidateArgs),

    /// Manage configuration.
    Config(ConfigArgs),
}

impl Commands {
    /// Short name used as a span field.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Status(_) => "status",
            Self::EnsureRunning(_) => "ensure-running",
            Self::Exec(_) => "exec",
            Self::MakePrivileged(_) => "make-privileged",
            Self::Validate(_) => "validate",
            Self::Config(_) => "config",
        }
    }
}

// ---- status / make-privileged ----

/// Target a single container.
#[derive(Args, Debug)]
pub struct ContainerArgs {
    /// Container identifier (e.g. 101).
    pub container_id: String,
}

// ---- ensure-running ----

/// Converge a container to running.
#[derive(Args, Debug)]
pub struct EnsureArgs {
    /// Container identifier (e.g. 101).
    pub container_id: String,

    /// Also run the no-op command once to confirm the container responds.
    #[arg(long)]
    pub responsive: bool,
}

// ---- exec ----

/// Run a command inside a container.
#[derive(Args, Debug)]
pub struct ExecArgs {
    /// Container identifier (e.g. 101).
    pub container_id: String,

    /// Run exactly one attempt and report the exit code instead of retrying.
    #[arg(long)]
    pub once: bool,

    /// Command and arguments, after `--`.
    #[arg(last = true, required = true)]
    pub command: Vec<String>,
}

// ---- validate ----

/// Run a validation check.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    #[command(subcommand)]
    pub check: ValidateCheck,
}

#[derive(Subcommand, Debug)]
pub enum ValidateCheck {
    /// Container exists on this host.
    Exists {
        /// Container identifier.
        container_id: String,
    },
    /// Container is running.
    Running {
        /// Container identifier.
        container_id: String,
    },
    /// GPU assignment string is well formed (none, all, 0,1,...).
    Gpu {
        /// GPU assignment value.
        value: String,
    },
    /// Path exists inside the container.
    Path {
        /// Container identifier.
        container_id: String,
        /// Absolute path inside the container.
        path: String,
    },
    /// File is syntactically valid JSON.
    Json {
        /// JSON file to check.
        file: PathBuf,
    },
    /// JSON file conforms to a JSON schema.
    Schema {
        /// JSON document to check.
        file: PathBuf,
        /// JSON schema file.
        schema: PathBuf,
    },
}

// ---- config ----

/// Manage lxcward configuration.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Validate the configuration file and report errors.
    Validate,
    /// Show the effective configuration (file + env overrides + defaults).
    Show {
        /// Show only a specific section (general, platform, retry, privilege).
        #[arg(long)]
        section: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_parse_status() {
        let cli = Cli::try_parse_from(["lxcward", "status", "101"]).expect("parse succeeded");
        match cli.command {
            Commands::Status(args) => assert_eq!(args.container_id, "101"),
            _ => panic!("expected Status command"),
        }
    }

    #[test]
    fn test_cli_parse_status_requires_id() {
        let args = Cli::try_parse_from(["lxcward", "status"]);
        assert!(args.is_err(), "status without id should fail");
    }

    #[test]
    fn test_cli_parse_ensure_running_defaults() {
        let cli =
            Cli::try_parse_from(["lxcward", "ensure-running", "120"]).expect("parse succeeded");
        match cli.command {
            Commands::EnsureRunning(args) => {
                assert_eq!(args.container_id, "120");
                assert!(!args.responsive, "responsive should default to false");
            }
            _ => panic!("expected EnsureRunning command"),
        }
    }

    #[test]
    fn test_cli_parse_ensure_running_responsive() {
        let cli = Cli::try_parse_from(["lxcward", "ensure-running", "120", "--responsive"])
            .expect("parse succeeded");
        match cli.command {
            Commands::EnsureRunning(args) => assert!(args.responsive),
            _ => panic!("expected EnsureRunning command"),
        }
    }

    #[test]
    fn test_cli_parse_exec_trailing_command() {
        let cli = Cli::try_parse_from([
            "lxcward",
            "exec",
            "120",
            "--",
            "systemctl",
            "is-active",
            "--quiet",
            "app",
        ])
        .expect("parse succeeded");
        match cli.command {
            Commands::Exec(args) => {
                assert_eq!(args.container_id, "120");
                assert!(!args.once);
                assert_eq!(args.command, vec!["systemctl", "is-active", "--quiet", "app"]);
            }
            _ => panic!("expected Exec command"),
        }
    }

    #[test]
    fn test_cli_parse_exec_once() {
        let cli = Cli::try_parse_from(["lxcward", "exec", "120", "--once", "--", "true"])
            .expect("parse succeeded");
        match cli.command {
            Commands::Exec(args) => assert!(args.once),
            _ => panic!("expected Exec command"),
        }
    }

    #[test]
    fn test_cli_parse_exec_requires_command() {
        let args = Cli::try_parse_from(["lxcward", "exec", "120"]);
        assert!(args.is_err(), "exec without command should fail");
    }

    #[test]
    fn test_cli_parse_make_privileged() {
        let cli =
            Cli::try_parse_from(["lxcward", "make-privileged", "901"]).expect("parse succeeded");
        match cli.command {
            Commands::MakePrivileged(args) => assert_eq!(args.container_id, "901"),
            _ => panic!("expected MakePrivileged command"),
        }
    }

    #[test]
    fn test_cli_parse_validate_gpu() {
        let cli = Cli::try_parse_from(["lxcward", "validate", "gpu", "0,1"])
            .expect("parse succeeded");
        match cli.command {
            Commands::Validate(args) => match args.check {
                ValidateCheck::Gpu { value } => assert_eq!(value, "0,1"),
                _ => panic!("expected Gpu check"),
            },
            _ => panic!("expected Validate command"),
        }
    }

    #[test]
    fn test_cli_parse_validate_path() {
        let cli = Cli::try_parse_from(["lxcward", "validate", "path", "101", "/opt/app"])
            .expect("parse succeeded");
        match cli.command {
            Commands::Validate(args) => match args.check {
                ValidateCheck::Path { container_id, path } => {
                    assert_eq!(container_id, "101");
                    assert_eq!(path, "/opt/app");
                }
                _ => panic!("expected Path check"),
            },
            _ => panic!("expected Validate command"),
        }
    }

    #[test]
    fn test_cli_parse_validate_schema() {
        let cli = Cli::try_parse_from([
            "lxcward",
            "validate",
            "schema",
            "agent.json",
            "agent.schema.json",
        ])
        .expect("parse succeeded");
        match cli.command {
            Commands::Validate(args) => match args.check {
                ValidateCheck::Schema { file, schema } => {
                    assert_eq!(file, PathBuf::from("agent.json"));
                    assert_eq!(schema, PathBuf::from("agent.schema.json"));
                }
                _ => panic!("expected Schema check"),
            },
            _ => panic!("expected Validate command"),
        }
    }

    #[test]
    fn test_cli_parse_config_show_section() {
        let cli = Cli::try_parse_from(["lxcward", "config", "show", "--section", "retry"])
            .expect("parse succeeded");
        match cli.command {
            Commands::Config(args) => match args.action {
                ConfigAction::Show { section } => assert_eq!(section, Some("retry".to_owned())),
                _ => panic!("expected Show action"),
            },
            _ => panic!("expected Config command"),
        }
    }

    #[test]
    fn test_cli_parse_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "lxcward",
            "status",
            "101",
            "-c",
            "/etc/lxcward/lxcward.toml",
            "--output",
            "json",
            "--log-level",
            "debug",
        ])
        .expect("parse succeeded");
        assert_eq!(cli.config, PathBuf::from("/etc/lxcward/lxcward.toml"));
        assert!(matches!(cli.output, OutputFormat::Json));
        assert_eq!(cli.log_level, Some("debug".to_owned()));
    }

    #[test]
    fn test_cli_parse_default_config_path() {
        let cli = Cli::try_parse_from(["lxcward", "config", "validate"]).expect("parse succeeded");
        assert_eq!(cli.config, PathBuf::from(DEFAULT_CONFIG_PATH));
        assert!(matches!(cli.output, OutputFormat::Text));
    }

    #[test]
    fn test_cli_parse_missing_command_fails() {
        let args = Cli::try_parse_from(["lxcward"]);
        assert!(args.is_err(), "should fail when no command provided");
    }

    #[test]
    fn test_cli_verify_command_structure() {
        let cmd = Cli::command();
        assert_eq!(cmd.get_name(), "lxcward");

        let subcommands: Vec<_> = cmd.get_subcommands().map(|s| s.get_name()).collect();
        for expected in [
            "status",
            "ensure-running",
            "exec",
            "make-privileged",
            "validate",
            "config",
        ] {
            assert!(
                subcommands.contains(&expected),
                "should have '{expected}' subcommand"
            );
        }
        cmd.debug_assert();
    }
}
