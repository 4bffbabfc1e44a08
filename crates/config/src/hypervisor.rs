#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};
use serde_with::serde_as;
use std::{path::PathBuf, time::Duration};

#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Hypervisor {
    /// Query libvirt for domain disks.
    pub enabled: bool,

    /// `virsh` executable.
    pub virsh: PathBuf,

    /// Optional libvirt connection URI passed as `virsh -c`.
    pub uri: Option<String>,

    /// Upper bound on collecting the whole domain mapping. Domains not
    /// listed by then are left out of the mapping.
    #[serde_as(as = "serde_with::DurationSeconds")]
    pub timeout: Duration,

    /// Upper bound on a single `virsh domblklist`.
    #[serde_as(as = "serde_with::DurationSeconds")]
    pub command_timeout: Duration,

    /// Number of `virsh domblklist` calls allowed in flight.
    pub concurrency: usize,
}

impl Default for Hypervisor {
    fn default() -> Self {
        Self {
            enabled: true,
            virsh: PathBuf::from("virsh"),
            uri: None,
            timeout: Duration::from_secs(30),
            command_timeout: Duration::from_secs(5),
            concurrency: 8,
        }
    }
}
