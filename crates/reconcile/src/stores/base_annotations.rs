#![forbid(unsafe_code)]

use crate::domain::{ImageId, TypeCode};
use std::collections::BTreeMap;

/// Base identifier -> type of the last snapshot that resolved against it.
///
/// When several snapshots share a base the last one recorded wins, so the
/// outcome depends on recording order. Callers record in scan order.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BaseAnnotations {
    bases: BTreeMap<ImageId, TypeCode>,
}

impl BaseAnnotations {
    pub fn record(&mut self, base: ImageId, snapshot_type: TypeCode) {
        self.bases.insert(base, snapshot_type);
    }

    /// Fold a later partial map into this one; its entries override ours.
    pub fn merge(&mut self, later: BaseAnnotations) {
        self.bases.extend(later.bases);
    }

    pub fn get(&self, base: &ImageId) -> Option<TypeCode> {
        self.bases.get(base).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ImageId, TypeCode)> {
        self.bases.iter().map(|(id, code)| (id, *code))
    }

    pub fn len(&self) -> usize {
        self.bases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bases.is_empty()
    }
}
