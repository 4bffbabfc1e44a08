#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};
use serde_with::serde_as;
use std::time::Duration;

#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ControlPlane {
    /// Database URL, e.g. `mysql://cloud:secret@db/cloud`.
    ///
    /// Unset means no control plane: every image classifies as unknown.
    pub url: Option<String>,

    /// Upper bound on connecting to the database.
    #[serde_as(as = "serde_with::DurationSeconds")]
    pub connect_timeout: Duration,

    /// Upper bound on each fact query.
    #[serde_as(as = "serde_with::DurationSeconds")]
    pub query_timeout: Duration,
}

impl Default for ControlPlane {
    fn default() -> Self {
        Self {
            url: None,
            connect_timeout: Duration::from_secs(5),
            query_timeout: Duration::from_secs(30),
        }
    }
}

impl ControlPlane {
    pub fn is_configured(&self) -> bool {
        self.url.as_deref().is_some_and(|url| !url.trim().is_empty())
    }
}
