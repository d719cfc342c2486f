//! Per-resource upload state machine.
//!
//! ```text
//! Submitting -> Evaluating -> Succeeded
//!                          -> AwaitingDecision -> Exhausted        (attempt >= max)
//!                                              -> Ignored
//!                                              -> Submitting       (retry)
//!                                              -> Editing -> Submitting
//! ```
//!
//! A ValueSet whose expansion fails the coverage audit is treated like a
//! server-reported error even though the HTTP status was a success.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

use crate::audit::{self, ExpansionAuditResult};
use crate::client::{AttemptStatus, TerminologyServer};
use crate::decision::{Decision, DecisionContext, DecisionMaker};
use crate::editor::Editor;
use crate::outcome::{self, OutcomeIssue};
use crate::patch::{PatchRecord, PatchWriter};
use crate::resource::{Resource, ResourceKind};

/// Default bound on attempts per resource.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;

/// One submission of a resource and what came back.
#[derive(Debug, Clone)]
pub struct UploadAttempt {
    pub attempt_number: u32,
    pub status: AttemptStatus,
    pub issues: Vec<OutcomeIssue>,
    pub audit: Option<ExpansionAuditResult>,
}

impl UploadAttempt {
    /// 2xx and, for ValueSets, a valid expansion.
    pub fn is_success(&self) -> bool {
        self.status.is_success() && self.audit.as_ref().is_none_or(|a| a.is_valid)
    }
}

/// Terminal outcome of one resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Outcome {
    Succeeded,
    Ignored,
    /// Attempts exhausted
    Failed,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Succeeded => f.write_str("succeeded"),
            Self::Ignored => f.write_str("ignored"),
            Self::Failed => f.write_str("failed"),
        }
    }
}

/// Result of driving one resource to a terminal state.
#[derive(Debug, Clone, Serialize)]
pub struct ResourceReport {
    pub source_path: PathBuf,
    pub kind: ResourceKind,
    pub label: String,
    pub outcome: Outcome,
    /// Number of the last attempt made
    pub attempts: u32,
    pub patches: Vec<PatchRecord>,
    /// Audit of the last expansion received (ValueSets only)
    pub expansion_audit: Option<ExpansionAuditResult>,
    /// Issues the server reported on the last attempt
    pub issues: Vec<OutcomeIssue>,
}

#[derive(Debug)]
enum State {
    Submitting,
    Evaluating(UploadAttempt),
    AwaitingDecision(UploadAttempt),
    Editing,
    Done(Outcome),
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Submitting => f.write_str("Submitting"),
            Self::Evaluating(_) => f.write_str("Evaluating"),
            Self::AwaitingDecision(_) => f.write_str("AwaitingDecision"),
            Self::Editing => f.write_str("Editing"),
            Self::Done(Outcome::Succeeded) => f.write_str("Succeeded"),
            Self::Done(Outcome::Ignored) => f.write_str("Ignored"),
            Self::Done(Outcome::Failed) => f.write_str("Exhausted"),
        }
    }
}

/// Drives resources through submit/evaluate/decide, one at a time.
pub struct UploadDriver<'a> {
    server: &'a dyn TerminologyServer,
    decisions: &'a mut dyn DecisionMaker,
    editor: &'a mut dyn Editor,
    patch_writer: Option<PatchWriter>,
    max_attempts: u32,
}

impl<'a> UploadDriver<'a> {
    pub fn new(
        server: &'a dyn TerminologyServer,
        decisions: &'a mut dyn DecisionMaker,
        editor: &'a mut dyn Editor,
    ) -> Self {
        Self {
            server,
            decisions,
            editor,
            patch_writer: None,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    /// Record edits into this patch directory. Without one, edits are still
    /// applied but leave no artifacts.
    pub fn with_patch_writer(mut self, writer: PatchWriter) -> Self {
        self.patch_writer = Some(writer);
        self
    }

    /// Values below 1 are raised to 1.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub(crate) async fn probe(&self) -> crate::Result<()> {
        self.server.probe().await
    }

    /// Upload one resource until it succeeds, is ignored or runs out of
    /// attempts.
    pub async fn upload(&mut self, mut resource: Resource) -> ResourceReport {
        tracing::info!(path = %resource.source_path.display(), "Uploading {}", resource.label());
        self.ensure_id(&mut resource);

        let mut attempt_number = 1;
        let mut patches: Vec<PatchRecord> = Vec::new();
        let mut last_audit = None;
        let mut last_issues = Vec::new();
        let mut state = State::Submitting;

        let outcome = loop {
            tracing::debug!(attempt = attempt_number, "{} -> {state}", resource.label());
            state = match state {
                State::Submitting => {
                    let attempt = self.submit(&mut resource, attempt_number).await;
                    if attempt.audit.is_some() {
                        last_audit = attempt.audit.clone();
                    }
                    last_issues = attempt.issues.clone();
                    State::Evaluating(attempt)
                }
                State::Evaluating(attempt) => {
                    if attempt.is_success() {
                        tracing::info!(status = %attempt.status, "+ {} uploaded", resource.label());
                        if let Some(last) = patches.last_mut() {
                            last.is_final = true;
                        }
                        State::Done(Outcome::Succeeded)
                    } else {
                        State::AwaitingDecision(attempt)
                    }
                }
                State::AwaitingDecision(attempt) => {
                    if attempt.attempt_number >= self.max_attempts {
                        tracing::error!(
                            attempts = attempt.attempt_number,
                            "! {} failed after {} attempt(s), giving up",
                            resource.label(),
                            attempt.attempt_number
                        );
                        State::Done(Outcome::Failed)
                    } else {
                        let context = DecisionContext {
                            resource: &resource,
                            attempt: &attempt,
                            max_attempts: self.max_attempts,
                        };
                        let decision = self.decisions.decide(&context);
                        tracing::info!(
                            attempt = attempt.attempt_number,
                            "Chose {decision} for {}",
                            resource.label()
                        );
                        match decision {
                            Decision::Ignore => {
                                tracing::info!("{} ignored, continuing with the next resource", resource.label());
                                State::Done(Outcome::Ignored)
                            }
                            Decision::Retry => {
                                attempt_number += 1;
                                State::Submitting
                            }
                            Decision::Edit => State::Editing,
                        }
                    }
                }
                State::Editing => {
                    if let Some(record) = self.apply_edit(&mut resource) {
                        patches.push(record);
                    }
                    attempt_number += 1;
                    State::Submitting
                }
                State::Done(outcome) => break outcome,
            };
        };

        ResourceReport {
            source_path: resource.source_path.clone(),
            kind: resource.kind,
            label: resource.label(),
            outcome,
            attempts: attempt_number,
            patches,
            expansion_audit: last_audit,
            issues: last_issues,
        }
    }

    fn ensure_id(&mut self, resource: &mut Resource) {
        if resource.id.is_some() {
            return;
        }
        match self.decisions.assign_id(resource) {
            Some(id) => {
                if let Err(e) = resource.assign_id(&id) {
                    tracing::warn!(error = %e, "Could not set id \"{id}\", the server will assign one");
                }
            }
            None => {
                tracing::info!("{} has no id, the server will assign one", resource.label());
            }
        }
    }

    async fn submit(&self, resource: &mut Resource, attempt_number: u32) -> UploadAttempt {
        tracing::info!(
            attempt = attempt_number,
            max = self.max_attempts,
            "- uploading (try #{attempt_number}/{})",
            self.max_attempts
        );
        let response = self.server.submit(resource).await;
        let issues = outcome::parse_issues(response.body.as_ref());

        match &response.status {
            AttemptStatus::Http(code) => tracing::info!(status = code, "- received status code {code}"),
            AttemptStatus::Transport { message } => {
                tracing::error!(attempt = attempt_number, "! {message}")
            }
        }
        log_issues(&issues);
        if let Some(id) = response.assigned_id.as_deref().filter(|_| resource.id.is_none()) {
            match resource.assign_id(id) {
                Ok(()) => tracing::info!("Server assigned id \"{id}\", later attempts update it"),
                Err(e) => tracing::warn!(error = %e, "Could not record server-assigned id \"{id}\""),
            }
        }
        if !response.status.is_success() && issues.is_empty() && !response.raw_body.is_empty() {
            tracing::warn!("Response was not an OperationOutcome, raw body: {}", response.raw_body);
        }

        let audit = (resource.kind == ResourceKind::ValueSet && response.status.is_success())
            .then(|| {
                let expansion = response.expansion.clone().unwrap_or_default();
                let result = audit::audit_content(&resource.content, &expansion);
                if !result.is_valid {
                    tracing::warn!(
                        concepts = result.contained_concept_count,
                        missing = ?result.missing_code_systems,
                        "! Expansion of {} is incomplete",
                        resource.label()
                    );
                }
                result
            });

        UploadAttempt {
            attempt_number,
            status: response.status,
            issues,
            audit,
        }
    }

    /// Run the editor and adopt its result. Patch-write failures are logged
    /// and do not undo the edit.
    fn apply_edit(&mut self, resource: &mut Resource) -> Option<PatchRecord> {
        let Some(edited) = self.editor.edit(resource, &resource.content) else {
            tracing::warn!("No edit made to {}, resubmitting unchanged", resource.label());
            return None;
        };
        if edited == resource.content {
            tracing::warn!("Content of {} unchanged, resubmitting", resource.label());
            return None;
        }
        if let Err(e) = serde_json::from_str::<serde_json::Value>(&edited) {
            tracing::warn!(error = %e, "Edited content is not valid JSON, discarding the edit");
            return None;
        }

        let record = match self.patch_writer.as_mut() {
            Some(writer) => {
                match writer.write_patch(&resource.source_path, &resource.content, &edited) {
                    Ok(record) => Some(record),
                    Err(e) => {
                        tracing::error!(error = %e, "Could not write patch for {}", resource.label());
                        None
                    }
                }
            }
            None => None,
        };

        if let Err(e) = resource.replace_content(edited) {
            tracing::warn!(error = %e, "Edited content could not be applied");
        }
        record
    }
}

fn log_issues(issues: &[OutcomeIssue]) {
    for issue in issues {
        if issue.is_error() {
            tracing::error!(severity = %issue.severity, code = %issue.code, " -! {}", issue.details);
        } else {
            tracing::warn!(severity = %issue.severity, code = %issue.code, " -  {}", issue.details);
        }
    }
}
