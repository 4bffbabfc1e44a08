#![forbid(unsafe_code)]

use super::ImageId;
use serde::Serialize;
use std::path::PathBuf;

/// A regular file found directly inside the scanned directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListedFile {
    pub path: PathBuf,
    pub file_name: String,
    pub len: u64,
}

/// What the image inspector could tell about a file.
///
/// Every field is optional; an empty inspection means the tool was missing,
/// timed out or did not recognise the file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Inspection {
    pub size_bytes: Option<u64>,
    pub format: Option<String>,
    pub backing: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageFile {
    pub id: ImageId,
    pub file_name: String,
    pub path: PathBuf,
    pub size_bytes: Option<u64>,
    pub format: Option<String>,
    pub backing: Option<String>,
}

impl ImageFile {
    pub fn new(listed: ListedFile, inspection: Inspection) -> Self {
        Self {
            id: ImageId::new(&listed.file_name),
            file_name: listed.file_name,
            path: listed.path,
            size_bytes: inspection.size_bytes,
            format: inspection.format,
            backing: inspection.backing.filter(|backing| !backing.trim().is_empty()),
        }
    }

    pub fn is_qcow2(&self) -> bool {
        self.format
            .as_deref()
            .is_some_and(|format| format.eq_ignore_ascii_case("qcow2"))
    }

    pub fn is_raw(&self) -> bool {
        self.format
            .as_deref()
            .is_some_and(|format| format.eq_ignore_ascii_case("raw"))
    }
}

/// A file whose name is not an image identifier. Listed, never classified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ForeignFile {
    pub file_name: String,
    pub path: PathBuf,
    pub len: u64,
}

impl From<ListedFile> for ForeignFile {
    fn from(listed: ListedFile) -> Self {
        Self {
            file_name: listed.file_name,
            path: listed.path,
            len: listed.len,
        }
    }
}
