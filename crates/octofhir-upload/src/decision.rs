//! Operator decisions after a failed attempt.
//!
//! The upload driver never talks to a terminal itself. It asks a
//! [`DecisionMaker`]; the CLI plugs in an interactive prompt, CI runs plug in
//! a [`FixedPolicy`].

use std::fmt;

use crate::driver::UploadAttempt;
use crate::resource::Resource;

/// What to do with a resource whose attempt failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Open the content in the editor, then resubmit
    Edit,
    /// Give up on this resource and continue with the next one
    Ignore,
    /// Resubmit unchanged, e.g. after fixing a dependency out-of-band
    Retry,
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Edit => f.write_str("edit"),
            Self::Ignore => f.write_str("ignore"),
            Self::Retry => f.write_str("retry"),
        }
    }
}

/// Everything a decision maker may want to show the operator.
pub struct DecisionContext<'a> {
    pub resource: &'a Resource,
    pub attempt: &'a UploadAttempt,
    pub max_attempts: u32,
}

pub trait DecisionMaker {
    fn decide(&mut self, context: &DecisionContext<'_>) -> Decision;

    /// Called once for a resource without an `id`. Returning `None` lets the
    /// server assign one (POST instead of PUT).
    fn assign_id(&mut self, _resource: &Resource) -> Option<String> {
        None
    }
}

/// Non-interactive policy: the same answer every time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixedPolicy {
    AlwaysIgnore,
    AlwaysRetry,
}

impl DecisionMaker for FixedPolicy {
    fn decide(&mut self, _context: &DecisionContext<'_>) -> Decision {
        match self {
            Self::AlwaysIgnore => Decision::Ignore,
            Self::AlwaysRetry => Decision::Retry,
        }
    }
}
