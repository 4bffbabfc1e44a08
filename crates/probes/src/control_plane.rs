#![forbid(unsafe_code)]

//! Facts from the orchestration control plane's database.

use crate::Error;
use crate::pool::{PoolCandidate, resolve_pool};
use async_trait::async_trait;
use itertools::Itertools;
use reconcile::domain::{
    ImageId, PlacementRow, PoolRef, TemplateRecord, VolumeKind, VolumeRecord,
};
use reconcile::services::{FactLoader, PoolResolver};
use sqlx::MySqlPool;
use sqlx::mysql::MySqlPoolOptions;
use std::path::Path;
use tracing::debug;

const VOLUMES: &str = "\
SELECT v.path AS path, v.volume_type AS volume_type, v.state AS state,
       vm.display_name AS vm_display_name, vm.instance_name AS vm_instance_name,
       vm.state AS vm_state, a.account_name AS account, d.name AS domain,
       sp.name AS pool_name, sp.id AS pool_id
FROM volumes v
LEFT JOIN vm_instance vm ON vm.id = v.instance_id AND vm.removed IS NULL
LEFT JOIN account a ON a.id = v.account_id
LEFT JOIN domain d ON d.id = v.domain_id
LEFT JOIN storage_pool sp ON sp.id = v.pool_id
WHERE v.removed IS NULL
ORDER BY v.id";

const TEMPLATES: &str = "\
SELECT t.uuid AS uuid, tsr.install_path AS install_path, t.name AS name,
       t.type AS kind, t.format AS format, t.state AS state,
       a.account_name AS account, d.name AS domain
FROM vm_template t
LEFT JOIN template_spool_ref tsr ON tsr.template_id = t.id
LEFT JOIN account a ON a.id = t.account_id
LEFT JOIN domain d ON d.id = t.domain_id
WHERE t.removed IS NULL
ORDER BY t.id";

const PLACEMENTS: &str = "\
SELECT t.uuid AS uuid, tsr.install_path AS install_path, tsr.pool_id AS pool_id
FROM template_spool_ref tsr
JOIN vm_template t ON t.id = tsr.template_id
WHERE tsr.state = 'Ready' AND t.removed IS NULL
ORDER BY tsr.id";

const POOLS: &str = "\
SELECT sp.id AS id, sp.name AS name, sp.uuid AS uuid, sp.path AS path, h.name AS host
FROM storage_pool sp
LEFT JOIN storage_pool_host_ref r ON r.pool_id = sp.id
LEFT JOIN host h ON h.id = r.host_id AND h.removed IS NULL
WHERE sp.removed IS NULL
ORDER BY sp.id, h.id";

fn nonblank(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}

#[derive(Debug, Clone, Default, sqlx::FromRow)]
pub struct VolumeRow {
    pub path: Option<String>,
    pub volume_type: Option<String>,
    pub state: Option<String>,
    pub vm_display_name: Option<String>,
    pub vm_instance_name: Option<String>,
    pub vm_state: Option<String>,
    pub account: Option<String>,
    pub domain: Option<String>,
    pub pool_name: Option<String>,
    pub pool_id: Option<u64>,
}

impl VolumeRow {
    /// The record keyed by the volume's on-disk name, or `None` for volumes
    /// that were never written to primary storage.
    pub fn into_record(self) -> Option<VolumeRecord> {
        let id = ImageId::new(&nonblank(self.path)?);
        if id.is_empty() {
            return None;
        }
        let kind = VolumeKind::parse(self.volume_type.as_deref().unwrap_or_default());
        Some(VolumeRecord {
            state: nonblank(self.state),
            vm_display_name: nonblank(self.vm_display_name),
            vm_instance_name: nonblank(self.vm_instance_name),
            vm_state: nonblank(self.vm_state),
            account: nonblank(self.account),
            domain: nonblank(self.domain),
            pool_name: nonblank(self.pool_name),
            pool_id: self.pool_id,
            ..VolumeRecord::new(id, kind)
        })
    }
}

#[derive(Debug, Clone, Default, sqlx::FromRow)]
pub struct TemplateRow {
    pub uuid: Option<String>,
    pub install_path: Option<String>,
    pub name: Option<String>,
    pub kind: Option<String>,
    pub format: Option<String>,
    pub state: Option<String>,
    pub account: Option<String>,
    pub domain: Option<String>,
}

/// A template is known by its UUID and, once copied to primary storage, by
/// the file name of each copy.
fn template_keys(uuid: Option<&str>, install_path: Option<&str>) -> Vec<ImageId> {
    [uuid, install_path]
        .into_iter()
        .flatten()
        .map(ImageId::new)
        .filter(|id| !id.is_empty())
        .unique()
        .collect()
}

impl TemplateRow {
    pub fn into_records(self) -> Vec<TemplateRecord> {
        let keys = template_keys(self.uuid.as_deref(), self.install_path.as_deref());
        keys.into_iter()
            .map(|id| TemplateRecord {
                name: nonblank(self.name.clone()),
                kind: nonblank(self.kind.clone()),
                format: nonblank(self.format.clone()),
                state: nonblank(self.state.clone()),
                account: nonblank(self.account.clone()),
                domain: nonblank(self.domain.clone()),
                ..TemplateRecord::new(id)
            })
            .collect()
    }
}

#[derive(Debug, Clone, Default, sqlx::FromRow)]
pub struct PlacementDbRow {
    pub uuid: Option<String>,
    pub install_path: Option<String>,
    pub pool_id: u64,
}

impl PlacementDbRow {
    pub fn into_rows(self) -> Vec<PlacementRow> {
        template_keys(self.uuid.as_deref(), self.install_path.as_deref())
            .into_iter()
            .map(|id| PlacementRow {
                template: id.as_str().to_owned(),
                pool_id: self.pool_id,
            })
            .collect()
    }
}

/// Reads volumes, templates and storage pools from the control plane's
/// MySQL database.
#[derive(Debug, Clone)]
pub struct ControlPlaneDb {
    pool: MySqlPool,
}

impl ControlPlaneDb {
    /// Prepare a connection pool. Nothing is dialled until the first query.
    pub fn connect(config: &config::ControlPlane) -> Result<Self, Error> {
        let url = config
            .url
            .as_deref()
            .filter(|_| config.is_configured())
            .ok_or(Error::NotConfigured)?;
        let pool = MySqlPoolOptions::new()
            .max_connections(4)
            .acquire_timeout(config.connect_timeout)
            .connect_lazy(url)?;
        Ok(Self { pool })
    }

    async fn load_volumes(&self) -> Result<Vec<VolumeRecord>, Error> {
        let rows: Vec<VolumeRow> = sqlx::query_as(VOLUMES).fetch_all(&self.pool).await?;
        let total = rows.len();
        let volumes: Vec<_> = rows.into_iter().filter_map(VolumeRow::into_record).collect();
        debug!(total, kept = volumes.len(), "loaded volumes");
        Ok(volumes)
    }

    async fn load_templates(&self) -> Result<Vec<TemplateRecord>, Error> {
        let rows: Vec<TemplateRow> = sqlx::query_as(TEMPLATES).fetch_all(&self.pool).await?;
        let templates: Vec<_> = rows.into_iter().flat_map(TemplateRow::into_records).collect();
        debug!(count = templates.len(), "loaded templates");
        Ok(templates)
    }

    async fn load_placements(&self) -> Result<Vec<PlacementRow>, Error> {
        let rows: Vec<PlacementDbRow> = sqlx::query_as(PLACEMENTS).fetch_all(&self.pool).await?;
        Ok(rows.into_iter().flat_map(PlacementDbRow::into_rows).collect())
    }

    async fn load_pools(&self) -> Result<Vec<PoolCandidate>, Error> {
        Ok(sqlx::query_as(POOLS).fetch_all(&self.pool).await?)
    }
}

#[async_trait]
impl FactLoader for ControlPlaneDb {
    async fn volumes(&self) -> Result<Vec<VolumeRecord>, reconcile::Error> {
        Ok(self.load_volumes().await?)
    }

    async fn templates(&self) -> Result<Vec<TemplateRecord>, reconcile::Error> {
        Ok(self.load_templates().await?)
    }

    async fn placements(&self) -> Result<Vec<PlacementRow>, reconcile::Error> {
        Ok(self.load_placements().await?)
    }
}

#[async_trait]
impl PoolResolver for ControlPlaneDb {
    async fn resolve(&self, host: Option<&str>, dir: &Path) -> Result<PoolRef, reconcile::Error> {
        let candidates = self.load_pools().await?;
        Ok(resolve_pool(&candidates, host, dir))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const ROOT: &str = "5d1b6b4e-2a6e-4f0b-9a51-0c2f3e1d7a10";
    const TEMPLATE: &str = "7f3a9c2d-1b4e-4d6f-8a0b-3c5e7d9f1a2b";
    const COPY: &str = "a1b2c3d4-e5f6-4a7b-8c9d-0e1f2a3b4c5d";

    #[test]
    fn volume_row_maps_to_record() {
        let row = VolumeRow {
            path: Some(format!("{ROOT}.qcow2")),
            volume_type: Some("ROOT".into()),
            state: Some("Ready".into()),
            vm_display_name: Some("web01".into()),
            vm_instance_name: Some("i-2-10-VM".into()),
            vm_state: Some("Running".into()),
            account: Some("admin".into()),
            domain: Some(String::new()),
            pool_name: Some("nfs-a".into()),
            pool_id: Some(3),
        };
        let record = row.into_record().unwrap();
        assert_eq!(record.id.as_str(), ROOT);
        assert_eq!(record.kind, VolumeKind::Root);
        assert_eq!(record.vm_state.as_deref(), Some("Running"));
        assert_eq!(record.domain, None);
        assert_eq!(record.pool_id, Some(3));
    }

    #[test]
    fn volume_without_path_is_dropped() {
        assert!(VolumeRow::default().into_record().is_none());
        let blank = VolumeRow {
            path: Some("  ".into()),
            ..VolumeRow::default()
        };
        assert!(blank.into_record().is_none());
    }

    #[test]
    fn template_is_keyed_by_uuid_and_copy() {
        let row = TemplateRow {
            uuid: Some(TEMPLATE.into()),
            install_path: Some(COPY.into()),
            name: Some("CentOS 7".into()),
            format: Some("QCOW2".into()),
            ..TemplateRow::default()
        };
        let ids: Vec<_> = row
            .into_records()
            .into_iter()
            .map(|t| (t.id.as_str().to_owned(), t.name))
            .collect();
        assert_eq!(
            ids,
            vec![
                (TEMPLATE.to_owned(), Some("CentOS 7".to_owned())),
                (COPY.to_owned(), Some("CentOS 7".to_owned())),
            ]
        );
    }

    #[test]
    fn template_without_copy_has_one_key() {
        let row = TemplateRow {
            uuid: Some(TEMPLATE.into()),
            install_path: Some(format!("/mnt/pool/{TEMPLATE}")),
            ..TemplateRow::default()
        };
        assert_eq!(row.into_records().len(), 1);
        assert!(TemplateRow::default().into_records().is_empty());
    }

    #[test]
    fn placement_rows_follow_template_keys() {
        let row = PlacementDbRow {
            uuid: Some(TEMPLATE.into()),
            install_path: Some(COPY.into()),
            pool_id: 3,
        };
        assert_eq!(
            row.into_rows(),
            vec![
                PlacementRow {
                    template: TEMPLATE.into(),
                    pool_id: 3
                },
                PlacementRow {
                    template: COPY.into(),
                    pool_id: 3
                },
            ]
        );
    }

    #[test]
    fn unconfigured_url_is_rejected() {
        let config = config::ControlPlane::default();
        assert!(matches!(
            ControlPlaneDb::connect(&config),
            Err(Error::NotConfigured)
        ));
    }
}
