#![forbid(unsafe_code)]

use crate::domain::{ImageFile, ImageId};
use serde::Serialize;
use std::path::PathBuf;

/// Prefix of a flattened copy's filename. A suffix would normalize back to
/// the snapshot's own id; the prefix makes the copy a foreign file instead.
pub const FLATTEN_PREFIX: &str = "flat-";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FlattenReason {
    /// The base is on disk but the control plane does not know it.
    BaseUnknown,
    /// Neither the snapshot nor its base is known to the control plane.
    BothUnknown,
}

/// A snapshot proposed for flattening. Nothing is ever executed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlattenCandidate {
    pub snapshot: ImageId,
    pub source: PathBuf,
    pub target: PathBuf,
    pub base: ImageId,
    pub reason: FlattenReason,
}

impl FlattenCandidate {
    /// Propose `flat-<file>` next to the snapshot as the standalone copy.
    pub fn propose(file: &ImageFile, base: ImageId, reason: FlattenReason) -> Self {
        let target = file
            .path
            .with_file_name(format!("{FLATTEN_PREFIX}{}", file.file_name));
        Self {
            snapshot: file.id.clone(),
            source: file.path.clone(),
            target,
            base,
            reason,
        }
    }
}

/// Flatten candidates in scan order.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FlattenPlan {
    candidates: Vec<FlattenCandidate>,
}

impl FlattenPlan {
    pub fn push(&mut self, candidate: FlattenCandidate) {
        self.candidates.push(candidate);
    }

    pub fn candidates(&self) -> &[FlattenCandidate] {
        &self.candidates
    }

    pub fn contains(&self, snapshot: &ImageId) -> bool {
        self.candidates.iter().any(|c| &c.snapshot == snapshot)
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}
