#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};
use serde_with::serde_as;
use std::{path::PathBuf, time::Duration};

const MAX_CONCURRENCY: usize = 64;

#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Inspector {
    /// `qemu-img` executable.
    pub qemu_img: PathBuf,

    /// Pass `-U` so images held open by running domains can be inspected.
    pub force_share: bool,

    /// Number of inspections in flight (clamped to 1..=64).
    pub concurrency: usize,

    /// Upper bound on a single inspection.
    #[serde_as(as = "serde_with::DurationSeconds")]
    pub timeout: Duration,
}

impl Default for Inspector {
    fn default() -> Self {
        Self {
            qemu_img: PathBuf::from("qemu-img"),
            force_share: true,
            concurrency: 8,
            timeout: Duration::from_secs(10),
        }
    }
}

impl Inspector {
    pub fn clamp(self) -> Self {
        Self {
            concurrency: self.concurrency.clamp(1, MAX_CONCURRENCY),
            ..self
        }
    }
}
