//! Batch upload in dependency order.

use std::path::PathBuf;

use serde::Serialize;

use crate::audit::ExpansionAuditResult;
use crate::driver::{Outcome, ResourceReport, UploadDriver};
use crate::error::Result;
use crate::patch::PatchRecord;
use crate::resource::{Resource, ResourceKind};

/// A ValueSet whose last expansion failed the coverage audit.
#[derive(Debug, Clone, Serialize)]
pub struct InvalidExpansion {
    pub source_path: PathBuf,
    pub label: String,
    pub audit: ExpansionAuditResult,
}

/// Aggregate result of a run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Summary {
    pub succeeded: usize,
    pub ignored: usize,
    pub failed: usize,
    pub patches: Vec<PatchRecord>,
    pub invalid_expansions: Vec<InvalidExpansion>,
    /// One entry per processed resource, in processing order
    pub reports: Vec<ResourceReport>,
}

impl Summary {
    pub fn total(&self) -> usize {
        self.reports.len()
    }

    /// True when every resource succeeded.
    pub fn all_succeeded(&self) -> bool {
        self.succeeded == self.total()
    }

    fn record(&mut self, report: ResourceReport) {
        match report.outcome {
            Outcome::Succeeded => self.succeeded += 1,
            Outcome::Ignored => self.ignored += 1,
            Outcome::Failed => self.failed += 1,
        }
        self.patches.extend(report.patches.iter().cloned());
        if let Some(audit) = report.expansion_audit.as_ref().filter(|a| !a.is_valid) {
            self.invalid_expansions.push(InvalidExpansion {
                source_path: report.source_path.clone(),
                label: report.label.clone(),
                audit: audit.clone(),
            });
        }
        self.reports.push(report);
    }
}

/// Runs a set of resources through an [`UploadDriver`], NamingSystems first,
/// then CodeSystems, ValueSets and ConceptMaps.
///
/// Buckets are processed strictly one after the other; later kinds reference
/// earlier ones and rely on them being on the server already.
pub struct BatchOrchestrator<'a> {
    driver: UploadDriver<'a>,
}

impl<'a> BatchOrchestrator<'a> {
    pub fn new(driver: UploadDriver<'a>) -> Self {
        Self { driver }
    }

    /// Upload all resources. Only an unreachable server stops the run, and
    /// only before anything was submitted.
    pub async fn run(&mut self, resources: Vec<Resource>) -> Result<Summary> {
        let mut summary = Summary::default();
        if resources.is_empty() {
            tracing::warn!("No terminology resources to upload");
            return Ok(summary);
        }

        self.driver.probe().await?;

        let buckets = partition(resources);
        for (kind, bucket) in ResourceKind::UPLOAD_ORDER.iter().zip(buckets) {
            if bucket.is_empty() {
                continue;
            }
            tracing::info!(kind = %kind, count = bucket.len(), "Uploading {kind} resources");
            for resource in bucket {
                let report = self.driver.upload(resource).await;
                summary.record(report);
            }
        }

        tracing::info!(
            succeeded = summary.succeeded,
            ignored = summary.ignored,
            failed = summary.failed,
            patches = summary.patches.len(),
            invalid_expansions = summary.invalid_expansions.len(),
            "Upload finished"
        );
        Ok(summary)
    }
}

/// Split into per-kind buckets indexed by tier, keeping input order.
fn partition(resources: Vec<Resource>) -> [Vec<Resource>; 4] {
    let mut buckets: [Vec<Resource>; 4] = Default::default();
    for resource in resources {
        buckets[resource.kind.tier()].push(resource);
    }
    buckets
}
