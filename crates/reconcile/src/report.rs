#![forbid(unsafe_code)]

use crate::domain::{ClassificationResult, ForeignFile, PoolRef, TypeCode};
use crate::flatten::FlattenPlan;
use serde::Serialize;
use std::{collections::BTreeMap, fmt, path::PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FactSource {
    Volumes,
    Templates,
    Placements,
    Domains,
    Pool,
}

impl FactSource {
    pub fn as_str(self) -> &'static str {
        match self {
            FactSource::Volumes => "volumes",
            FactSource::Templates => "templates",
            FactSource::Placements => "template placements",
            FactSource::Domains => "hypervisor domains",
            FactSource::Pool => "storage pool",
        }
    }
}

impl fmt::Display for FactSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fact source that could not be read; the audit went on without it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Degraded {
    pub source: FactSource,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub files_scanned: usize,
    pub well_formed: usize,
    pub foreign: usize,
    pub uninspected: usize,
    pub flatten_candidates: usize,
    pub by_type: BTreeMap<TypeCode, usize>,
}

impl Summary {
    pub fn count(&self, type_code: TypeCode) -> usize {
        self.by_type.get(&type_code).copied().unwrap_or(0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditReport {
    pub directory: PathBuf,
    pub pool: PoolRef,
    pub results: Vec<ClassificationResult>,
    pub foreign: Vec<ForeignFile>,
    pub flatten: FlattenPlan,
    pub summary: Summary,
    pub degraded: Vec<Degraded>,
}

impl AuditReport {
    pub fn is_degraded(&self) -> bool {
        !self.degraded.is_empty()
    }
}
