use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use colored::Colorize;
use octofhir_upload::{
    BatchOrchestrator, DEFAULT_MAX_ATTEMPTS, DecisionMaker, ExternalEditor, FhirClient,
    FixedPolicy, PatchWriter, Summary, UploadDriver, client::DEFAULT_TIMEOUT, load_resources,
};

use crate::auth;
use crate::cli::{NonInteractive, UploadArgs};
use crate::config::{self, ProfileConfig};
use crate::output::{print_progress, print_summary};
use crate::prompt::InteractivePrompt;

pub async fn upload(
    args: &UploadArgs,
    server: &str,
    cfg: &ProfileConfig,
    profile: &str,
) -> Result<Summary> {
    let files = discover_files(&args.files, args.input_directory.as_deref())?;
    let resources = load_resources(&files);
    print_progress(
        args.format,
        &format!(
            "Found {} terminology resource(s) in {} file(s)",
            resources.len().to_string().cyan(),
            files.len()
        ),
    );

    let auth = auth::resolve_auth(&args.credential, args.auth_type, profile)?;
    let timeout = args
        .timeout_secs
        .or(cfg.timeout_secs)
        .map(Duration::from_secs)
        .unwrap_or(DEFAULT_TIMEOUT);
    let client = FhirClient::new(server, auth, timeout)
        .with_context(|| format!("Cannot use endpoint {server}"))?;
    print_progress(
        args.format,
        &format!("Uploading resources to {}", client.base_url().cyan()),
    );

    let editor_command = config::resolve_editor(&args.editor, cfg);
    let mut decisions: Box<dyn DecisionMaker> = match args.non_interactive {
        Some(NonInteractive::Ignore) => Box::new(FixedPolicy::AlwaysIgnore),
        Some(NonInteractive::Retry) => Box::new(FixedPolicy::AlwaysRetry),
        None => Box::new(InteractivePrompt::new(editor_command.clone())),
    };
    let mut editor = ExternalEditor::new(editor_command);

    let max_attempts = args
        .max_attempts
        .or(cfg.max_attempts)
        .unwrap_or(DEFAULT_MAX_ATTEMPTS);
    let mut driver = UploadDriver::new(&client, decisions.as_mut(), &mut editor)
        .with_max_attempts(max_attempts);
    if let Some(dir) = args.patch_dir.as_ref().or(cfg.patch_dir.as_ref()) {
        let writer = PatchWriter::open(dir)
            .with_context(|| format!("Cannot use patch directory {}", dir.display()))?;
        driver = driver.with_patch_writer(writer);
    }

    let summary = BatchOrchestrator::new(driver).run(resources).await?;
    print_summary(&summary, args.format)?;
    Ok(summary)
}

/// Explicit files first, then the regular files of `input_directory` sorted
/// by name. A path listed twice is uploaded once.
pub fn discover_files(files: &[PathBuf], input_directory: Option<&Path>) -> Result<Vec<PathBuf>> {
    let mut found: Vec<PathBuf> = Vec::new();
    for file in files {
        if !found.contains(file) {
            found.push(file.clone());
        }
    }

    if let Some(dir) = input_directory {
        tracing::info!(directory = %dir.display(), "Using resources from input directory");
        let mut entries: Vec<PathBuf> = fs::read_dir(dir)
            .with_context(|| format!("Cannot read input directory {}", dir.display()))?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .collect();
        entries.sort();
        for entry in entries {
            if !found.contains(&entry) {
                found.push(entry);
            }
        }
    }
    Ok(found)
}
