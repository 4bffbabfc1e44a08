#![forbid(unsafe_code)]

//! Which storage pool a scanned directory belongs to.

use reconcile::domain::PoolRef;
use std::path::Path;
use tracing::debug;

/// A storage pool as the control plane knows it, joined with one host that
/// can reach it.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct PoolCandidate {
    pub id: u64,
    pub name: Option<String>,
    pub uuid: Option<String>,
    pub path: Option<String>,
    pub host: Option<String>,
}

impl PoolCandidate {
    fn to_ref(&self) -> PoolRef {
        let name = self
            .name
            .clone()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| format!("pool-{}", self.id));
        PoolRef::new(self.id, name)
    }

    fn on_host(&self, host: &str) -> bool {
        self.host.as_deref().is_some_and(|candidate| same_host(candidate, host))
    }

    /// The pool's own path, or the `/mnt/<uuid>` mount point KVM agents use
    /// for network pools.
    fn serves(&self, dir: &Path) -> bool {
        let dir = dir.to_string_lossy();
        let dir = dir.trim_end_matches('/');
        let by_path = self
            .path
            .as_deref()
            .is_some_and(|path| !path.is_empty() && path.trim_end_matches('/') == dir);
        let by_uuid = self.uuid.as_deref().is_some_and(|uuid| {
            !uuid.is_empty() && dir.rsplit('/').next().is_some_and(|last| last == uuid)
        });
        by_path || by_uuid
    }
}

/// Host names match case-insensitively, and a short name matches its FQDN.
fn same_host(a: &str, b: &str) -> bool {
    let short = |name: &str| name.split('.').next().unwrap_or(name).to_ascii_lowercase();
    a.eq_ignore_ascii_case(b) || short(a) == short(b)
}

/// Pick the pool for `dir` on `host`.
///
/// Tries, in order: a pool on this host serving this directory, a pool on
/// this host, a pool serving this directory from any host, any pool. With no
/// candidates at all, a synthetic pool named after the directory is returned.
/// Candidates are expected in ascending id order so the pick is stable.
pub fn resolve_pool(candidates: &[PoolCandidate], host: Option<&str>, dir: &Path) -> PoolRef {
    let on_host = |c: &&PoolCandidate| host.is_some_and(|host| c.on_host(host));
    let pick = candidates
        .iter()
        .find(|c| on_host(c) && c.serves(dir))
        .map(|c| ("host and path", c))
        .or_else(|| candidates.iter().find(on_host).map(|c| ("host", c)))
        .or_else(|| candidates.iter().find(|c| c.serves(dir)).map(|c| ("path", c)))
        .or_else(|| candidates.first().map(|c| ("first available", c)));

    match pick {
        Some((matched, candidate)) => {
            let pool = candidate.to_ref();
            debug!(%pool, matched, "resolved storage pool");
            pool
        }
        None => PoolRef::synthetic(dir),
    }
}
