#![forbid(unsafe_code)]

use crate::classify::ScanContext;
use crate::domain::{ForeignFile, ImageFile, ImageId, Inspection, ListedFile, PoolRef};
use crate::error::Error;
use crate::reconciliation::reconcile;
use crate::report::{AuditReport, Degraded, FactSource, Summary};
use crate::services::{DirectoryLister, DomainMapper, FactLoader, ImageInspector, PoolResolver};
use crate::stores::{Facts, KnowledgeBase};
use config::Config;
use std::collections::{BTreeMap, HashSet};
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

pub struct Services {
    pub lister: Box<dyn DirectoryLister + Send + Sync>,
    pub inspector: Arc<dyn ImageInspector + Send + Sync>,
    pub facts: Box<dyn FactLoader + Send + Sync>,
    pub domains: Box<dyn DomainMapper + Send + Sync>,
    pub pools: Box<dyn PoolResolver + Send + Sync>,
}

pub struct AuditEngine {
    config: Config,
    services: Services,
}

impl AuditEngine {
    pub fn new(config: Config, services: Services) -> Self {
        Self { config, services }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Audit one directory: list, inspect, gather facts, reconcile.
    ///
    /// Only an unreadable directory is an error. Fact sources that fail or
    /// time out are recorded in [`AuditReport::degraded`] and treated as
    /// empty.
    pub async fn run(&self, dir: &Path) -> Result<AuditReport, Error> {
        if !dir.is_dir() {
            return Err(Error::NotADirectory(dir.to_owned()));
        }
        let listed = self.services.lister.list(dir)?;
        let files_scanned = listed.len();
        info!(dir = %dir.display(), files = files_scanned, "auditing image directory");

        let present: HashSet<ImageId> = listed
            .iter()
            .map(|file| ImageId::new(&file.file_name))
            .collect();
        let (images, foreign): (Vec<ListedFile>, Vec<ListedFile>) = listed
            .into_iter()
            .partition(|file| ImageId::new(&file.file_name).is_well_formed());
        let foreign: Vec<ForeignFile> = foreign.into_iter().map(ForeignFile::from).collect();

        let ((facts, mut degraded), (pool, pool_degraded), images) = tokio::join!(
            self.gather_facts(),
            self.resolve_pool(dir),
            self.inspect_all(images),
        );
        degraded.extend(pool_degraded);
        let uninspected = images
            .iter()
            .filter(|image| image.format.is_none() && image.size_bytes.is_none())
            .count();

        let kb = KnowledgeBase::from_facts(facts);
        if kb.is_empty() {
            warn!("control plane knows no volumes or templates, every image will be unknown");
        }
        let ctx = ScanContext {
            present: &present,
            pool: Some(&pool),
        };
        let reconciliation = reconcile(&images, &kb, &ctx, self.config.scan.parallel);

        let mut by_type = BTreeMap::new();
        for result in &reconciliation.results {
            *by_type.entry(result.type_code).or_insert(0) += 1;
        }
        let summary = Summary {
            files_scanned,
            well_formed: images.len(),
            foreign: foreign.len(),
            uninspected,
            flatten_candidates: reconciliation.flatten.len(),
            by_type,
        };
        info!(
            well_formed = summary.well_formed,
            foreign = summary.foreign,
            flatten = summary.flatten_candidates,
            degraded = degraded.len(),
            "audit finished"
        );

        Ok(AuditReport {
            directory: dir.to_owned(),
            pool,
            results: reconciliation.results,
            foreign,
            flatten: reconciliation.flatten,
            summary,
            degraded,
        })
    }

    async fn gather_facts(&self) -> (Facts, Vec<Degraded>) {
        let query_timeout = self.config.control_plane.query_timeout;
        let (volumes, templates, placements, domains) = tokio::join!(
            bounded(
                FactSource::Volumes,
                query_timeout,
                self.services.facts.volumes()
            ),
            bounded(
                FactSource::Templates,
                query_timeout,
                self.services.facts.templates()
            ),
            bounded(
                FactSource::Placements,
                query_timeout,
                self.services.facts.placements()
            ),
            bounded(
                FactSource::Domains,
                self.config.hypervisor.timeout,
                self.services.domains.domains()
            ),
        );

        let mut degraded = Vec::new();
        let facts = Facts {
            volumes: or_degraded(FactSource::Volumes, volumes, &mut degraded),
            templates: or_degraded(FactSource::Templates, templates, &mut degraded),
            placements: or_degraded(FactSource::Placements, placements, &mut degraded),
            domains: or_degraded(FactSource::Domains, domains, &mut degraded),
        };
        (facts, degraded)
    }

    async fn resolve_pool(&self, dir: &Path) -> (PoolRef, Option<Degraded>) {
        let host = self.config.scan.host.as_deref();
        let resolved = bounded(
            FactSource::Pool,
            self.config.control_plane.query_timeout,
            self.services.pools.resolve(host, dir),
        )
        .await;
        match resolved {
            Ok(pool) => {
                debug!(%pool, "storage pool resolved");
                (pool, None)
            }
            Err(err) => {
                warn!(%err, "cannot resolve storage pool, using directory name");
                let degraded = Degraded {
                    source: FactSource::Pool,
                    reason: err.to_string(),
                };
                (PoolRef::synthetic(dir), Some(degraded))
            }
        }
    }

    /// Inspect every file with bounded concurrency. Output keeps input order.
    async fn inspect_all(&self, listed: Vec<ListedFile>) -> Vec<ImageFile> {
        let semaphore = Arc::new(Semaphore::new(self.config.inspector.concurrency.max(1)));
        let timeout = self.config.inspector.timeout;
        let mut inspections = vec![Inspection::default(); listed.len()];
        let mut tasks = JoinSet::new();

        for (index, file) in listed.iter().enumerate() {
            let inspector = Arc::clone(&self.services.inspector);
            let semaphore = Arc::clone(&semaphore);
            let path = file.path.clone();
            tasks.spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return (index, Inspection::default());
                };
                match tokio::time::timeout(timeout, inspector.inspect(&path)).await {
                    Ok(inspection) => (index, inspection),
                    Err(_) => {
                        warn!(path = %path.display(), ?timeout, "inspection timed out");
                        (index, Inspection::default())
                    }
                }
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, inspection)) => inspections[index] = inspection,
                Err(err) => warn!(%err, "inspection task join failed"),
            }
        }

        listed
            .into_iter()
            .zip(inspections)
            .map(|(file, inspection)| ImageFile::new(file, inspection))
            .collect()
    }
}

async fn bounded<T>(
    source: FactSource,
    after: Duration,
    fut: impl Future<Output = Result<T, Error>>,
) -> Result<T, Error> {
    tokio::time::timeout(after, fut)
        .await
        .map_err(|_| Error::Timeout {
            what: source.as_str(),
            after,
        })?
}

fn or_degraded<T: Default>(
    source: FactSource,
    result: Result<T, Error>,
    degraded: &mut Vec<Degraded>,
) -> T {
    match result {
        Ok(value) => value,
        Err(err) => {
            warn!(%err, %source, "fact source unavailable, continuing without it");
            degraded.push(Degraded {
                source,
                reason: err.to_string(),
            });
            T::default()
        }
    }
}
