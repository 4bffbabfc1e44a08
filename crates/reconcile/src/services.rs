#![forbid(unsafe_code)]

//! Collaborators the audit engine gathers its facts from.

use crate::domain::{
    DomainDisks, Inspection, ListedFile, PlacementRow, PoolRef, TemplateRecord, VolumeRecord,
};
use crate::error::Error;
use async_trait::async_trait;
use std::path::Path;

pub trait DirectoryLister: Send + Sync {
    /// Regular files directly inside `dir`, sorted by name.
    fn list(&self, dir: &Path) -> Result<Vec<ListedFile>, Error>;
}

#[async_trait]
pub trait ImageInspector: Send + Sync {
    /// Inspect one file. Failures are reported as an empty inspection.
    async fn inspect(&self, path: &Path) -> Inspection;
}

#[async_trait]
pub trait FactLoader: Send + Sync {
    /// Live volumes.
    async fn volumes(&self) -> Result<Vec<VolumeRecord>, Error>;
    /// Templates that are not removed.
    async fn templates(&self) -> Result<Vec<TemplateRecord>, Error>;
    /// Template copies in `Ready` state on primary storage.
    async fn placements(&self) -> Result<Vec<PlacementRow>, Error>;
}

#[async_trait]
pub trait DomainMapper: Send + Sync {
    /// Every defined domain with its power state and attached disks.
    async fn domains(&self) -> Result<Vec<DomainDisks>, Error>;
}

#[async_trait]
pub trait PoolResolver: Send + Sync {
    /// Best-effort pool of `dir` on `host`.
    async fn resolve(&self, host: Option<&str>, dir: &Path) -> Result<PoolRef, Error>;
}

/// Stand-in for every fact source when nothing is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoFacts;

#[async_trait]
impl ImageInspector for NoFacts {
    async fn inspect(&self, _path: &Path) -> Inspection {
        Inspection::default()
    }
}

#[async_trait]
impl FactLoader for NoFacts {
    async fn volumes(&self) -> Result<Vec<VolumeRecord>, Error> {
        Ok(Vec::new())
    }

    async fn templates(&self) -> Result<Vec<TemplateRecord>, Error> {
        Ok(Vec::new())
    }

    async fn placements(&self) -> Result<Vec<PlacementRow>, Error> {
        Ok(Vec::new())
    }
}

#[async_trait]
impl DomainMapper for NoFacts {
    async fn domains(&self) -> Result<Vec<DomainDisks>, Error> {
        Ok(Vec::new())
    }
}

#[async_trait]
impl PoolResolver for NoFacts {
    async fn resolve(&self, _host: Option<&str>, dir: &Path) -> Result<PoolRef, Error> {
        Ok(PoolRef::synthetic(dir))
    }
}
