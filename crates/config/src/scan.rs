#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Scan {
    /// Directory holding the hypervisor's image files.
    pub directory: Option<PathBuf>,

    /// Host name used to resolve the storage pool. Detected when unset.
    pub host: Option<String>,

    /// Show files whose names are not image identifiers.
    pub show_foreign: bool,

    /// Classify files on the rayon thread pool.
    pub parallel: bool,
}

impl Default for Scan {
    fn default() -> Self {
        Self {
            directory: None,
            host: None,
            show_foreign: false,
            parallel: true,
        }
    }
}
