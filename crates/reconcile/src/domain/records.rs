#![forbid(unsafe_code)]

use super::ImageId;
use serde::Serialize;
use std::{fmt, path::Path};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum VolumeKind {
    Root,
    DataDisk,
    Template,
    Other(String),
}

impl VolumeKind {
    pub fn parse(kind: &str) -> Self {
        match kind.trim().to_ascii_uppercase().as_str() {
            "ROOT" => VolumeKind::Root,
            "DATADISK" => VolumeKind::DataDisk,
            "TEMPLATE" => VolumeKind::Template,
            _ => VolumeKind::Other(kind.trim().to_owned()),
        }
    }
}

/// A live volume as recorded by the control plane.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeRecord {
    pub id: ImageId,
    pub kind: VolumeKind,
    pub state: Option<String>,
    pub vm_display_name: Option<String>,
    pub vm_instance_name: Option<String>,
    pub vm_state: Option<String>,
    pub account: Option<String>,
    pub domain: Option<String>,
    pub pool_name: Option<String>,
    pub pool_id: Option<u64>,
}

impl VolumeRecord {
    pub fn new(id: impl Into<ImageId>, kind: VolumeKind) -> Self {
        Self {
            id: id.into(),
            kind,
            state: None,
            vm_display_name: None,
            vm_instance_name: None,
            vm_state: None,
            account: None,
            domain: None,
            pool_name: None,
            pool_id: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateRecord {
    pub id: ImageId,
    pub name: Option<String>,
    pub kind: Option<String>,
    pub format: Option<String>,
    pub state: Option<String>,
    pub account: Option<String>,
    pub domain: Option<String>,
}

impl TemplateRecord {
    pub fn new(id: impl Into<ImageId>) -> Self {
        Self {
            id: id.into(),
            name: None,
            kind: None,
            format: None,
            state: None,
            account: None,
            domain: None,
        }
    }
}

/// One `Ready` copy of a template on a storage pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacementRow {
    pub template: String,
    pub pool_id: u64,
}

/// A hypervisor domain and the disks it currently has attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainDisks {
    pub name: String,
    pub state: String,
    pub disks: Vec<String>,
}

/// What the knowledge base keeps per attached disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainRef {
    pub name: String,
    pub state: String,
}

/// Storage pool the scanned directory belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PoolRef {
    pub id: Option<u64>,
    pub name: String,
}

impl PoolRef {
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        Self {
            id: Some(id),
            name: name.into(),
        }
    }

    /// A pool the control plane does not know, named after the directory.
    pub fn synthetic(directory: &Path) -> Self {
        let name = directory
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| directory.display().to_string());
        Self { id: None, name }
    }
}

impl fmt::Display for PoolRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.id {
            Some(id) => write!(f, "{} (id {id})", self.name),
            None => write!(f, "{} (unregistered)", self.name),
        }
    }
}
