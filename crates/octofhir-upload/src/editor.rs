//! External editor invocation.

use std::fs;
use std::io::Write;
use std::process::Command;

use crate::resource::Resource;

/// Produces edited resource content. `None` means no edit was made.
pub trait Editor {
    fn edit(&mut self, resource: &Resource, content: &str) -> Option<String>;
}

/// Runs an external program on a temporary copy of the content.
///
/// The command string is split on whitespace and the temporary file path is
/// appended as the last argument (`code --wait` works as well as `vim`).
#[derive(Debug, Clone)]
pub struct ExternalEditor {
    command: String,
}

impl ExternalEditor {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }

    pub fn command(&self) -> &str {
        &self.command
    }
}

impl Editor for ExternalEditor {
    fn edit(&mut self, resource: &Resource, content: &str) -> Option<String> {
        let mut parts = self.command.split_whitespace();
        let Some(program) = parts.next() else {
            tracing::warn!("No editor command configured");
            return None;
        };

        // Removed when dropped, on every path out of this function
        let mut file = match tempfile::Builder::new()
            .prefix(&format!("{}-", resource.file_name()))
            .suffix(".json")
            .tempfile()
        {
            Ok(file) => file,
            Err(e) => {
                tracing::error!(error = %e, "Could not create a temporary file for editing");
                return None;
            }
        };
        if let Err(e) = file
            .write_all(content.as_bytes())
            .and_then(|_| file.flush())
        {
            tracing::error!(error = %e, "Could not write the temporary file for editing");
            return None;
        }

        tracing::info!(path = %file.path().display(), "Opening {} in {program}", resource.label());
        match Command::new(program).args(parts).arg(file.path()).status() {
            Ok(status) if status.success() => match fs::read_to_string(file.path()) {
                Ok(edited) => Some(edited),
                Err(e) => {
                    tracing::warn!(error = %e, "Edited file could not be read back");
                    None
                }
            },
            Ok(status) => {
                tracing::warn!(%status, "Editor exited unsuccessfully, keeping content unchanged");
                None
            }
            Err(e) => {
                tracing::warn!(error = %e, "Could not start editor \"{program}\"");
                None
            }
        }
    }
}
