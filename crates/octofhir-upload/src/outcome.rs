//! Best-effort extraction of OperationOutcome issues from server responses.
//!
//! Servers are not guaranteed to return a well-formed OperationOutcome, so
//! every accessor here degrades to "no issues" instead of failing.

use std::fmt;

use serde::Serialize;
use serde_json::Value;

/// One `OperationOutcome.issue` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutcomeIssue {
    pub severity: String,
    pub code: String,
    pub details: String,
}

impl OutcomeIssue {
    /// `fatal` and `error` issues.
    pub fn is_error(&self) -> bool {
        matches!(self.severity.as_str(), "fatal" | "error")
    }
}

impl fmt::Display for OutcomeIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}/{}] {}", self.severity, self.code, self.details)
    }
}

/// Extract the ordered issue list from a response body.
///
/// Only a top-level OperationOutcome is recognized; anything else yields an
/// empty list.
pub fn parse_issues(body: Option<&Value>) -> Vec<OutcomeIssue> {
    let Some(body) = body else {
        return Vec::new();
    };
    if body.get("resourceType").and_then(|v| v.as_str()) != Some("OperationOutcome") {
        return Vec::new();
    }
    body.get("issue")
        .and_then(|v| v.as_array())
        .map(|issues| issues.iter().map(parse_issue).collect())
        .unwrap_or_default()
}

fn parse_issue(issue: &Value) -> OutcomeIssue {
    let text = |key: &str| {
        issue
            .get(key)
            .and_then(|v| v.as_str())
            .unwrap_or("unknown")
            .to_string()
    };
    OutcomeIssue {
        severity: text("severity"),
        code: text("code"),
        details: issue_details(issue),
    }
}

/// `details.text`, else the codings of `details`, else `diagnostics`.
fn issue_details(issue: &Value) -> String {
    let details = issue.get("details");
    if let Some(text) = details.and_then(|d| d.get("text")).and_then(|v| v.as_str()) {
        return text.to_string();
    }
    let codings: Vec<&str> = details
        .and_then(|d| d.get("coding"))
        .and_then(|v| v.as_array())
        .map(|codings| {
            codings
                .iter()
                .filter_map(|c| {
                    c.get("display")
                        .or_else(|| c.get("code"))
                        .and_then(|v| v.as_str())
                })
                .collect()
        })
        .unwrap_or_default();
    if !codings.is_empty() {
        return codings.join("; ");
    }
    issue
        .get("diagnostics")
        .and_then(|v| v.as_str())
        .unwrap_or("(no details)")
        .to_string()
}
