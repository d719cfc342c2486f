//! Ordered, interactive upload of FHIR terminology resources.
//!
//! NamingSystems, CodeSystems, ValueSets and ConceptMaps are uploaded to a
//! FHIR server in dependency order. Rejected resources are handed to a
//! [`DecisionMaker`] (edit, ignore or retry, with a bounded number of
//! attempts); operator edits leave a patch trail on disk, and ValueSet
//! expansions are checked for code systems that contributed no concepts.

pub mod audit;
pub mod client;
pub mod decision;
pub mod driver;
pub mod editor;
pub mod error;
pub mod id;
pub mod orchestrator;
pub mod outcome;
pub mod patch;
pub mod resource;

pub use audit::{ExpansionAuditResult, audit};
pub use client::{AttemptStatus, AuthHeader, FhirClient, SubmitResponse, TerminologyServer};
pub use decision::{Decision, DecisionContext, DecisionMaker, FixedPolicy};
pub use driver::{DEFAULT_MAX_ATTEMPTS, Outcome, ResourceReport, UploadAttempt, UploadDriver};
pub use editor::{Editor, ExternalEditor};
pub use error::{IdRewriteError, PatchError, Result, UploadError};
pub use orchestrator::{BatchOrchestrator, InvalidExpansion, Summary};
pub use outcome::OutcomeIssue;
pub use patch::{PatchRecord, PatchWriter};
pub use resource::{Classification, Resource, ResourceKind, classify, load_resources};
