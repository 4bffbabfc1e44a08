#![forbid(unsafe_code)]

use super::ImageId;
use itertools::Itertools;
use serde::{Serialize, Serializer};
use std::fmt;

/// Type column of the report.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TypeCode {
    /// `R`: ROOT volume.
    Root,
    /// `D`: DATADISK volume.
    DataDisk,
    /// `T`: template, either as a volume kind or a template record.
    Template,
    /// `I`: volume of another kind.
    Image,
    /// `S`: snapshot whose base is on disk.
    Snapshot,
    /// `S!`: snapshot whose base is not in the scanned directory.
    SnapshotBaseMissing,
    /// `S?`: snapshot unknown to the control plane.
    SnapshotUnknown,
    /// `I?`: unregistered qcow2 or unrecognised image.
    ImageUnknown,
    /// `R?`: unregistered raw image.
    RawUnknown,
}

impl TypeCode {
    pub fn code(self) -> &'static str {
        match self {
            TypeCode::Root => "R",
            TypeCode::DataDisk => "D",
            TypeCode::Template => "T",
            TypeCode::Image => "I",
            TypeCode::Snapshot => "S",
            TypeCode::SnapshotBaseMissing => "S!",
            TypeCode::SnapshotUnknown => "S?",
            TypeCode::ImageUnknown => "I?",
            TypeCode::RawUnknown => "R?",
        }
    }

    pub fn is_snapshot(self) -> bool {
        matches!(
            self,
            TypeCode::Snapshot | TypeCode::SnapshotBaseMissing | TypeCode::SnapshotUnknown
        )
    }
}

impl fmt::Debug for TypeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl fmt::Display for TypeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.code())
    }
}

impl Serialize for TypeCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.code())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum StatusCategory {
    Running,
    Stopped,
    IdleKnown,
    IdleUnknown,
    Missing,
}

impl StatusCategory {
    /// Map a VM power state onto a status category.
    ///
    /// ```
    /// # use reconcile::domain::StatusCategory;
    /// assert_eq!(StatusCategory::from_vm_state("Running"), StatusCategory::Running);
    /// assert_eq!(StatusCategory::from_vm_state("shut off"), StatusCategory::Stopped);
    /// assert_eq!(StatusCategory::from_vm_state("Migrating"), StatusCategory::IdleKnown);
    /// ```
    pub fn from_vm_state(state: &str) -> Self {
        let state = state.trim().to_ascii_lowercase();
        if state == "running" {
            StatusCategory::Running
        } else if state.contains("stop") || state.contains("shut") {
            StatusCategory::Stopped
        } else {
            StatusCategory::IdleKnown
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            StatusCategory::Running => "running",
            StatusCategory::Stopped => "stopped",
            StatusCategory::IdleKnown => "idle-known",
            StatusCategory::IdleUnknown => "idle-unknown",
            StatusCategory::Missing => "missing",
        }
    }
}

impl fmt::Display for StatusCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Label written into a base image's row by the parent annotation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParentLabel {
    Parent,
    ParentMissing,
    ParentUnknown,
}

impl ParentLabel {
    /// Label for a base whose snapshot resolved to `code`. Non-snapshot codes
    /// have no label.
    pub fn for_snapshot(code: TypeCode) -> Option<Self> {
        match code {
            TypeCode::Snapshot => Some(ParentLabel::Parent),
            TypeCode::SnapshotBaseMissing => Some(ParentLabel::ParentMissing),
            TypeCode::SnapshotUnknown => Some(ParentLabel::ParentUnknown),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ParentLabel::Parent => "Parent",
            ParentLabel::ParentMissing => "Parent (missing)",
            ParentLabel::ParentUnknown => "Parent (unknown)",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassificationResult {
    pub id: ImageId,
    pub file_name: String,
    pub type_code: TypeCode,
    pub name: String,
    pub status: StatusCategory,
    pub notes: Vec<String>,
    pub size_bytes: Option<u64>,
    pub size_display: String,
    pub format: Option<String>,
    pub base: Option<ImageId>,
    pub base_display: String,
    pub flatten_candidate: bool,
}

impl ClassificationResult {
    pub fn notes_display(&self) -> String {
        self.notes.iter().join(", ")
    }
}

const BASE_DISPLAY_MAX: usize = 17;
const BASE_DISPLAY_PREFIX: usize = 12;
const BASE_DISPLAY_SUFFIX: usize = 4;

/// Basename of a backing reference, elided in the middle when too wide.
///
/// ```
/// # use reconcile::domain::base_display;
/// assert_eq!(base_display(None), "-");
/// assert_eq!(base_display(Some("/pool/short.qcow2")), "short.qcow2");
/// assert_eq!(
///     base_display(Some("/pool/0c9d6bd2-8c9b-4b7e-9a4e-3f8b5a0d1e27")),
///     "0c9d6bd2-8c9…1e27"
/// );
/// ```
pub fn base_display(backing: Option<&str>) -> String {
    let Some(backing) = backing else {
        return "-".to_owned();
    };
    let name = backing
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or(backing);
    let chars: Vec<char> = name.chars().collect();
    if chars.len() <= BASE_DISPLAY_MAX {
        return name.to_owned();
    }
    let prefix: String = chars[..BASE_DISPLAY_PREFIX].iter().collect();
    let suffix: String = chars[chars.len() - BASE_DISPLAY_SUFFIX..].iter().collect();
    format!("{prefix}…{suffix}")
}

pub fn size_display(size_bytes: Option<u64>) -> String {
    match size_bytes {
        Some(bytes) => humansize::format_size(bytes, humansize::BINARY),
        None => "-".to_owned(),
    }
}
