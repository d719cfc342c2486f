use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "octofhir-upload")]
#[command(about = "Upload FHIR terminology resources (NamingSystem, CodeSystem, ValueSet, ConceptMap) in dependency order")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// FHIR base URL (overrides config and OCTOFHIR_URL env var)
    #[arg(short, long, global = true, env = "OCTOFHIR_URL")]
    pub server: Option<String>,

    /// Config profile name
    #[arg(short, long, global = true, env = "OCTOFHIR_PROFILE", default_value = "default")]
    pub profile: String,

    /// Log level or filter directive (RUST_LOG takes precedence)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Write logs to this file instead of stderr
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Upload terminology resources
    Upload(UploadArgs),
    /// Append a suffix to the id of resource files, in place
    RewriteId(RewriteIdArgs),
    /// Manage CLI configuration
    Config(ConfigArgs),
}

#[derive(Clone, Copy, ValueEnum, Default)]
pub enum OutputFormat {
    /// Human-readable table
    #[default]
    Table,
    /// Machine-readable JSON summary
    Json,
}

/// Fixed answer used instead of the interactive prompt.
#[derive(Clone, Copy, ValueEnum)]
pub enum NonInteractive {
    /// Give up on a resource at its first failure
    Ignore,
    /// Resubmit unchanged until the attempt limit
    Retry,
}

#[derive(Clone, Copy, ValueEnum, Default)]
pub enum AuthType {
    #[default]
    Bearer,
    Basic,
}

#[derive(clap::Args)]
pub struct UploadArgs {
    /// Resource files to upload
    pub files: Vec<PathBuf>,
    /// Upload every file in this directory as well
    #[arg(short, long)]
    pub input_directory: Option<PathBuf>,
    /// Directory for patch files of edited resources
    #[arg(long)]
    pub patch_dir: Option<PathBuf>,
    /// Editor command (defaults to config, then $VISUAL, then $EDITOR)
    #[arg(long)]
    pub editor: Option<String>,
    /// Attempts per resource before giving up
    #[arg(long)]
    pub max_attempts: Option<u32>,
    /// Per-request timeout in seconds
    #[arg(long)]
    pub timeout_secs: Option<u64>,
    /// Authentication credential (token for Bearer, user:password for Basic)
    #[arg(long, env = "OCTOFHIR_CREDENTIAL", hide_env_values = true)]
    pub credential: Option<String>,
    /// How to send the credential
    #[arg(long, default_value = "bearer")]
    pub auth_type: AuthType,
    /// Answer every failure the same way instead of prompting
    #[arg(long)]
    pub non_interactive: Option<NonInteractive>,
    /// Summary format
    #[arg(short, long, default_value = "table")]
    pub format: OutputFormat,
}

#[derive(clap::Args)]
pub struct RewriteIdArgs {
    /// Suffix appended as `<id>_<suffix>`
    pub suffix: String,
    /// Resource files to rewrite
    #[arg(required = true)]
    pub files: Vec<PathBuf>,
}

#[derive(clap::Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show current config
    Show,
    /// Set config value
    Set(ConfigSetArgs),
}

#[derive(clap::Args)]
pub struct ConfigSetArgs {
    /// Key to set (server, patch_dir, editor, max_attempts, timeout_secs, log_level)
    pub key: String,
    /// Value
    pub value: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_upload_arguments() {
        let cli = Cli::try_parse_from([
            "octofhir-upload",
            "--server",
            "http://localhost:8080/fhir",
            "upload",
            "cs.json",
            "vs.json",
            "--patch-dir",
            "patches",
            "--non-interactive",
            "retry",
            "--max-attempts",
            "3",
        ])
        .unwrap();

        assert_eq!(cli.server.as_deref(), Some("http://localhost:8080/fhir"));
        let Commands::Upload(args) = cli.command else {
            panic!("expected upload command");
        };
        assert_eq!(args.files, vec![PathBuf::from("cs.json"), PathBuf::from("vs.json")]);
        assert_eq!(args.patch_dir, Some(PathBuf::from("patches")));
        assert_eq!(args.max_attempts, Some(3));
        assert!(matches!(args.non_interactive, Some(NonInteractive::Retry)));
    }

    #[test]
    fn test_rewrite_id_requires_files() {
        assert!(Cli::try_parse_from(["octofhir-upload", "rewrite-id", "dev"]).is_err());
    }
}
