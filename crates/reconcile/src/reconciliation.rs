#![forbid(unsafe_code)]

use crate::annotate::{annotate_parents, referenced_names};
use crate::classify::{FileOutcome, ScanContext, classify};
use crate::domain::{ClassificationResult, ImageFile};
use crate::flatten::FlattenPlan;
use crate::stores::{BaseAnnotations, KnowledgeBase};
use rayon::prelude::*;
use tracing::debug;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciliation {
    pub results: Vec<ClassificationResult>,
    pub bases: BaseAnnotations,
    pub flatten: FlattenPlan,
}

/// Classify `files` (in scan order), then run the parent annotation pass.
///
/// With `parallel` set the files are classified on the rayon pool. Outcomes
/// are folded in scan order either way, so both modes give the same result.
pub fn reconcile(
    files: &[ImageFile],
    kb: &KnowledgeBase,
    ctx: &ScanContext<'_>,
    parallel: bool,
) -> Reconciliation {
    let outcomes: Vec<FileOutcome> = if parallel {
        files.par_iter().map(|file| classify(file, kb, ctx)).collect()
    } else {
        files.iter().map(|file| classify(file, kb, ctx)).collect()
    };

    let mut reconciliation = Reconciliation {
        results: Vec::with_capacity(outcomes.len()),
        ..Default::default()
    };
    for outcome in outcomes {
        if let Some((base, snapshot_type)) = outcome.base {
            reconciliation.bases.record(base, snapshot_type);
        }
        if let Some(candidate) = outcome.flatten {
            reconciliation.flatten.push(candidate);
        }
        reconciliation.results.push(outcome.result);
    }

    // Runs only once every file is classified.
    let referenced = referenced_names(files);
    let labelled = annotate_parents(
        &mut reconciliation.results,
        &reconciliation.bases,
        &referenced,
    );
    debug!(
        files = files.len(),
        bases = reconciliation.bases.len(),
        labelled,
        flatten = reconciliation.flatten.len(),
        "reconciliation finished"
    );
    reconciliation
}
