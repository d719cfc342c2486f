use colored::Colorize;
use inquire::{Select, Text};
use octofhir_upload::{Decision, DecisionContext, DecisionMaker, Resource};

const IGNORE: &str = "Ignore (continue with the next resource)";
const EDIT: &str = "Edit (using your editor)";
const RETRY: &str = "Retry (because you have changed something else)";

/// Asks the operator on the terminal.
pub struct InteractivePrompt {
    editor: String,
}

impl InteractivePrompt {
    pub fn new(editor: impl Into<String>) -> Self {
        Self {
            editor: editor.into(),
        }
    }
}

impl DecisionMaker for InteractivePrompt {
    fn decide(&mut self, context: &DecisionContext<'_>) -> Decision {
        let attempt = context.attempt;
        eprintln!();
        eprintln!(
            "{} {} failed (try {}/{}): {}",
            "✗".red(),
            context.resource.label().cyan(),
            attempt.attempt_number,
            context.max_attempts,
            attempt.status.to_string().red()
        );
        for issue in &attempt.issues {
            let line = issue.to_string();
            if issue.is_error() {
                eprintln!("  {} {}", "-!".red(), line);
            } else {
                eprintln!("  {} {}", "- ".yellow(), line);
            }
        }
        if let Some(audit) = attempt.audit.as_ref().filter(|a| !a.is_valid) {
            eprintln!(
                "  {} expansion has {} concept(s); code systems without concepts: {}",
                "-!".red(),
                audit.contained_concept_count,
                display_set(&audit.missing_code_systems)
            );
        }

        let edit = format!("{EDIT} [{}]", self.editor);
        let options = vec![IGNORE, edit.as_str(), RETRY];
        match Select::new("What should we do?", options).prompt() {
            Ok(choice) if choice == IGNORE => Decision::Ignore,
            Ok(choice) if choice == RETRY => Decision::Retry,
            Ok(_) => Decision::Edit,
            Err(e) => {
                tracing::warn!(error = %e, "No answer from the prompt, ignoring the resource");
                Decision::Ignore
            }
        }
    }

    fn assign_id(&mut self, resource: &Resource) -> Option<String> {
        eprintln!(
            "{} {} has no id. Give one now, or leave empty to let the server assign it.",
            "?".yellow(),
            resource.label().cyan()
        );
        match Text::new("ID?").prompt() {
            Ok(id) if !id.trim().is_empty() => Some(id.trim().to_string()),
            Ok(_) => None,
            Err(e) => {
                tracing::warn!(error = %e, "No answer from the prompt, the server will assign an id");
                None
            }
        }
    }
}

fn display_set(set: &std::collections::BTreeSet<String>) -> String {
    if set.is_empty() {
        "(none)".to_string()
    } else {
        set.iter().cloned().collect::<Vec<_>>().join(", ")
    }
}
