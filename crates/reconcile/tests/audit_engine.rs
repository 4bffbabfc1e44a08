#![forbid(unsafe_code)]

mod common;

use async_trait::async_trait;
use common::uuid;
use config::Config;
use pretty_assertions::assert_eq;
use reconcile::domain::{
    DomainDisks, Inspection, ListedFile, PlacementRow, PoolRef, StatusCategory, TemplateRecord,
    TypeCode, VolumeKind, VolumeRecord,
};
use reconcile::report::FactSource;
use reconcile::services::{
    DirectoryLister, DomainMapper, FactLoader, ImageInspector, NoFacts, PoolResolver,
};
use reconcile::{AuditEngine, Error, Services};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

struct FixedLister(Vec<String>);

impl DirectoryLister for FixedLister {
    fn list(&self, dir: &Path) -> Result<Vec<ListedFile>, Error> {
        Ok(self
            .0
            .iter()
            .map(|name| ListedFile {
                path: dir.join(name),
                file_name: name.clone(),
                len: 4096,
            })
            .collect())
    }
}

#[derive(Default)]
struct MapInspector {
    by_name: HashMap<String, Inspection>,
    slow: Option<String>,
}

#[async_trait]
impl ImageInspector for MapInspector {
    async fn inspect(&self, path: &Path) -> Inspection {
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        if self.slow.as_deref() == Some(name.as_str()) {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        self.by_name.get(&name).cloned().unwrap_or_default()
    }
}

struct StaticFacts {
    volumes: Option<Vec<VolumeRecord>>,
    templates: Vec<TemplateRecord>,
}

#[async_trait]
impl FactLoader for StaticFacts {
    async fn volumes(&self) -> Result<Vec<VolumeRecord>, Error> {
        self.volumes
            .clone()
            .ok_or_else(|| Error::Source("connection refused".into()))
    }

    async fn templates(&self) -> Result<Vec<TemplateRecord>, Error> {
        Ok(self.templates.clone())
    }

    async fn placements(&self) -> Result<Vec<PlacementRow>, Error> {
        Ok(Vec::new())
    }
}

struct StaticDomains(Vec<DomainDisks>);

#[async_trait]
impl DomainMapper for StaticDomains {
    async fn domains(&self) -> Result<Vec<DomainDisks>, Error> {
        Ok(self.0.clone())
    }
}

struct FixedPool;

#[async_trait]
impl PoolResolver for FixedPool {
    async fn resolve(&self, _host: Option<&str>, _dir: &Path) -> Result<PoolRef, Error> {
        Ok(PoolRef::new(1, "primary-1"))
    }
}

fn qcow2(backing: Option<String>) -> Inspection {
    Inspection {
        size_bytes: Some(10 << 30),
        format: Some("qcow2".into()),
        backing,
    }
}

#[tokio::test]
async fn audit_classifies_and_separates_foreign_files() {
    let dir = tempfile::tempdir().unwrap();
    let root = uuid(1);
    let template = uuid(2);
    let orphan = uuid(3);

    let inspector = MapInspector {
        by_name: HashMap::from([
            (root.clone(), qcow2(Some(format!("{}/{template}", dir.path().display())))),
            (template.clone(), qcow2(None)),
            (orphan.clone(), qcow2(Some(template.clone()))),
        ]),
        slow: None,
    };
    let services = Services {
        lister: Box::new(FixedLister(vec![
            root.clone(),
            template.clone(),
            orphan.clone(),
            "lost+found.txt".to_owned(),
        ])),
        inspector: Arc::new(inspector),
        facts: Box::new(StaticFacts {
            volumes: Some(vec![VolumeRecord {
                vm_display_name: Some("db-01".into()),
                vm_state: Some("Running".into()),
                account: Some("admin".into()),
                ..VolumeRecord::new(root.as_str(), VolumeKind::Root)
            }]),
            templates: vec![TemplateRecord::new(template.as_str())],
        }),
        domains: Box::new(StaticDomains(Vec::new())),
        pools: Box::new(FixedPool),
    };
    let engine = AuditEngine::new(Config::default(), services);

    let report = engine.run(dir.path()).await.unwrap();

    assert_eq!(report.pool, PoolRef::new(1, "primary-1"));
    assert!(!report.is_degraded());
    assert_eq!(report.summary.files_scanned, 4);
    assert_eq!(report.summary.well_formed, 3);
    assert_eq!(report.summary.foreign, 1);
    assert_eq!(report.foreign[0].file_name, "lost+found.txt");

    let types: Vec<TypeCode> = report.results.iter().map(|r| r.type_code).collect();
    assert_eq!(
        types,
        vec![TypeCode::Snapshot, TypeCode::Template, TypeCode::Snapshot]
    );
    assert_eq!(report.results[0].name, "db-01 (admin)");
    assert_eq!(report.results[0].status, StatusCategory::Running);
    assert_eq!(report.results[1].base_display, "Parent");
    // Base is registered, so neither snapshot is proposed.
    assert!(report.flatten.is_empty());
    assert_eq!(report.summary.count(TypeCode::Snapshot), 2);
}

#[tokio::test]
async fn unavailable_sources_degrade_instead_of_failing() {
    let dir = tempfile::tempdir().unwrap();
    let base = uuid(4);
    let snap = uuid(5);

    let services = Services {
        lister: Box::new(FixedLister(vec![base.clone(), snap.clone()])),
        inspector: Arc::new(MapInspector {
            by_name: HashMap::from([
                (base.clone(), qcow2(None)),
                (snap.clone(), qcow2(Some(base.clone()))),
            ]),
            slow: None,
        }),
        facts: Box::new(StaticFacts {
            volumes: None,
            templates: Vec::new(),
        }),
        domains: Box::new(NoFacts),
        pools: Box::new(NoFacts),
    };
    let engine = AuditEngine::new(Config::default(), services);

    let report = engine.run(dir.path()).await.unwrap();

    assert_eq!(report.degraded.len(), 1);
    assert_eq!(report.degraded[0].source, FactSource::Volumes);
    assert_eq!(report.pool.id, None);
    assert_eq!(report.results[1].type_code, TypeCode::SnapshotUnknown);
    assert_eq!(report.results[0].base_display, "Parent (unknown)");
    assert_eq!(report.summary.flatten_candidates, 1);
    assert_eq!(report.flatten.candidates()[0].source, dir.path().join(&snap));
}

#[tokio::test(start_paused = true)]
async fn slow_inspection_times_out_to_unknown() {
    let dir = tempfile::tempdir().unwrap();
    let fast = uuid(6);
    let slow = uuid(7);

    let mut config = Config::default();
    config.inspector.timeout = Duration::from_secs(2);
    config.inspector.concurrency = 1;

    let services = Services {
        lister: Box::new(FixedLister(vec![fast.clone(), slow.clone()])),
        inspector: Arc::new(MapInspector {
            by_name: HashMap::from([
                (fast.clone(), Inspection {
                    format: Some("raw".into()),
                    ..Inspection::default()
                }),
                (slow.clone(), Inspection {
                    format: Some("raw".into()),
                    ..Inspection::default()
                }),
            ]),
            slow: Some(slow.clone()),
        }),
        facts: Box::new(NoFacts),
        domains: Box::new(NoFacts),
        pools: Box::new(NoFacts),
    };
    let engine = AuditEngine::new(config, services);

    let report = engine.run(dir.path()).await.unwrap();

    assert_eq!(report.results[0].type_code, TypeCode::RawUnknown);
    assert_eq!(report.results[1].type_code, TypeCode::ImageUnknown);
    assert_eq!(report.summary.uninspected, 1);
}

#[tokio::test]
async fn missing_directory_is_fatal() {
    let services = Services {
        lister: Box::new(FixedLister(Vec::new())),
        inspector: Arc::new(NoFacts),
        facts: Box::new(NoFacts),
        domains: Box::new(NoFacts),
        pools: Box::new(NoFacts),
    };
    let engine = AuditEngine::new(Config::default(), services);

    let missing = PathBuf::from("/nonexistent/storaudit/pool");
    assert!(matches!(
        engine.run(&missing).await,
        Err(Error::NotADirectory(path)) if path == missing
    ));
}
