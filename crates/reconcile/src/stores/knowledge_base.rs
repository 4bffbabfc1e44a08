#![forbid(unsafe_code)]

use crate::domain::{
    DomainDisks, DomainRef, ImageId, PlacementRow, TemplateRecord, VolumeRecord,
};
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

/// Control-plane and hypervisor facts keyed by canonical identifier.
///
/// Built once before classification and only read afterwards. All lookups
/// answer `None` (or an empty set) for unknown identifiers.
#[derive(Debug, Default)]
pub struct KnowledgeBase {
    volumes: HashMap<ImageId, VolumeRecord>,
    templates: HashMap<ImageId, TemplateRecord>,
    placements: HashMap<ImageId, BTreeSet<u64>>,
    domains: HashMap<ImageId, DomainRef>,
}

/// The raw fact streams a knowledge base is built from.
#[derive(Debug, Default, Clone)]
pub struct Facts {
    pub volumes: Vec<VolumeRecord>,
    pub templates: Vec<TemplateRecord>,
    pub placements: Vec<PlacementRow>,
    pub domains: Vec<DomainDisks>,
}

impl KnowledgeBase {
    pub fn from_facts(facts: Facts) -> Self {
        let mut kb = Self::default();
        for volume in facts.volumes {
            kb.insert_volume(volume);
        }
        for template in facts.templates {
            kb.insert_template(template);
        }
        for placement in facts.placements {
            kb.insert_placement(placement);
        }
        for domain in facts.domains {
            kb.insert_domain(domain);
        }
        debug!(
            volumes = kb.volumes.len(),
            templates = kb.templates.len(),
            placements = kb.placements.len(),
            disks = kb.domains.len(),
            "knowledge base built"
        );
        kb
    }

    /// Insert a volume. A later record for the same identifier replaces the
    /// earlier one; returns `false` for rows without an identifier.
    pub fn insert_volume(&mut self, volume: VolumeRecord) -> bool {
        if volume.id.is_empty() {
            return false;
        }
        if let Some(previous) = self.volumes.insert(volume.id.clone(), volume) {
            debug!(id = %previous.id, "duplicate live volume, keeping the last one");
        }
        true
    }

    pub fn insert_template(&mut self, template: TemplateRecord) -> bool {
        if template.id.is_empty() {
            return false;
        }
        if let Some(previous) = self.templates.insert(template.id.clone(), template) {
            debug!(id = %previous.id, "duplicate template, keeping the last one");
        }
        true
    }

    pub fn insert_placement(&mut self, placement: PlacementRow) -> bool {
        let id = ImageId::new(&placement.template);
        if id.is_empty() {
            return false;
        }
        self.placements
            .entry(id)
            .or_default()
            .insert(placement.pool_id);
        true
    }

    /// Register every disk of a domain. A disk attached to several domains
    /// keeps the last one seen.
    pub fn insert_domain(&mut self, domain: DomainDisks) {
        for disk in &domain.disks {
            let id = ImageId::new(disk);
            if id.is_empty() {
                continue;
            }
            self.domains.insert(
                id,
                DomainRef {
                    name: domain.name.clone(),
                    state: domain.state.clone(),
                },
            );
        }
    }

    pub fn lookup_volume(&self, id: &ImageId) -> Option<&VolumeRecord> {
        self.volumes.get(id)
    }

    pub fn lookup_template(&self, id: &ImageId) -> Option<&TemplateRecord> {
        self.templates.get(id)
    }

    /// Pools on which the template is `Ready`.
    pub fn template_pool_placements(&self, id: &ImageId) -> Option<&BTreeSet<u64>> {
        self.placements.get(id)
    }

    pub fn domain_for(&self, id: &ImageId) -> Option<&DomainRef> {
        self.domains.get(id)
    }

    /// Known to the control plane as either a volume or a template.
    pub fn is_registered(&self, id: &ImageId) -> bool {
        self.volumes.contains_key(id) || self.templates.contains_key(id)
    }

    pub fn is_empty(&self) -> bool {
        self.volumes.is_empty() && self.templates.is_empty()
    }
}
