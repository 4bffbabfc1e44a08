#![forbid(unsafe_code)]

//! Per-file decision table.
//!
//! A file is first checked for a backing chain (snapshot detection), then
//! matched against the knowledge base: volume first, then template, then
//! nothing. The two halves are combined in [`classify`].

use crate::domain::{
    ClassificationResult, ImageFile, ImageId, PoolRef, StatusCategory, TypeCode, VolumeKind,
    VolumeRecord, base_display, size_display,
};
use crate::flatten::{FlattenCandidate, FlattenReason};
use crate::stores::KnowledgeBase;
use std::collections::HashSet;

pub const NOTE_BASE_MISSING: &str = "Snapshot base missing (FS)";
pub const NOTE_BOTH_UNKNOWN: &str =
    "snapshot and base both unknown to control plane (flatten candidate)";
pub const NOTE_BASE_UNKNOWN: &str = "snapshot of an unknown base (flatten candidate)";
pub const NOTE_SNAPSHOT_UNKNOWN: &str = "snapshot, unknown to control plane";
pub const NOTE_NOT_IN_POOL: &str = "not registered in this pool";

/// Facts about the scan as a whole that a single file is judged against.
#[derive(Debug, Clone, Copy)]
pub struct ScanContext<'a> {
    /// Canonical identifiers of every file in the directory, foreign ones
    /// included.
    pub present: &'a HashSet<ImageId>,
    pub pool: Option<&'a PoolRef>,
}

/// Everything classification produced for one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileOutcome {
    pub result: ClassificationResult,
    /// Base identifier and the snapshot type resolved against it.
    pub base: Option<(ImageId, TypeCode)>,
    pub flatten: Option<FlattenCandidate>,
}

#[derive(Debug)]
struct SnapshotResolution {
    base: ImageId,
    type_code: TypeCode,
    note: Option<&'static str>,
    flatten: Option<FlattenReason>,
}

#[derive(Debug)]
struct Primary {
    type_code: TypeCode,
    name: String,
    status: StatusCategory,
    notes: Vec<String>,
}

pub fn classify(file: &ImageFile, kb: &KnowledgeBase, ctx: &ScanContext<'_>) -> FileOutcome {
    let snapshot = file
        .backing
        .as_deref()
        .and_then(|backing| resolve_snapshot(file, backing, kb, ctx));
    let primary = classify_primary(file, kb, ctx, snapshot.is_some());

    // Precedence rule: a type resolved from the backing chain (S, S!, S?)
    // replaces the type derived from the volume kind, template record or
    // container format. A registered ROOT volume that is also a snapshot is
    // shown as a snapshot.
    let type_code = snapshot
        .as_ref()
        .map_or(primary.type_code, |snapshot| snapshot.type_code);

    let status = if type_code == TypeCode::SnapshotBaseMissing
        && primary.status == StatusCategory::IdleUnknown
    {
        StatusCategory::Missing
    } else {
        primary.status
    };

    let mut notes = Vec::with_capacity(primary.notes.len() + 1);
    if let Some(note) = snapshot.as_ref().and_then(|snapshot| snapshot.note) {
        notes.push(note.to_owned());
    }
    notes.extend(primary.notes);

    let flatten = snapshot.as_ref().and_then(|snapshot| {
        snapshot
            .flatten
            .map(|reason| FlattenCandidate::propose(file, snapshot.base.clone(), reason))
    });

    let result = ClassificationResult {
        id: file.id.clone(),
        file_name: file.file_name.clone(),
        type_code,
        name: primary.name,
        status,
        notes,
        size_bytes: file.size_bytes,
        size_display: size_display(file.size_bytes),
        format: file.format.clone(),
        base: snapshot.as_ref().map(|snapshot| snapshot.base.clone()),
        base_display: base_display(file.backing.as_deref()),
        flatten_candidate: flatten.is_some(),
    };

    FileOutcome {
        result,
        base: snapshot.map(|snapshot| (snapshot.base, snapshot.type_code)),
        flatten,
    }
}

/// Resolve the base of a snapshot. `None` when the backing reference does
/// not name anything.
fn resolve_snapshot(
    file: &ImageFile,
    backing: &str,
    kb: &KnowledgeBase,
    ctx: &ScanContext<'_>,
) -> Option<SnapshotResolution> {
    let base = ImageId::new(backing);
    if base.is_empty() {
        return None;
    }

    if !ctx.present.contains(&base) {
        return Some(SnapshotResolution {
            base,
            type_code: TypeCode::SnapshotBaseMissing,
            note: Some(NOTE_BASE_MISSING),
            flatten: None,
        });
    }

    let base_known = kb.is_registered(&base);
    let snapshot_known = kb.is_registered(&file.id);
    let resolution = match (base_known, snapshot_known) {
        (false, false) => SnapshotResolution {
            base,
            type_code: TypeCode::SnapshotUnknown,
            note: Some(NOTE_BOTH_UNKNOWN),
            flatten: Some(FlattenReason::BothUnknown),
        },
        (false, true) => SnapshotResolution {
            base,
            type_code: TypeCode::Snapshot,
            note: Some(NOTE_BASE_UNKNOWN),
            flatten: Some(FlattenReason::BaseUnknown),
        },
        (true, _) => SnapshotResolution {
            base,
            type_code: TypeCode::Snapshot,
            note: None,
            flatten: None,
        },
    };
    Some(resolution)
}

fn classify_primary(
    file: &ImageFile,
    kb: &KnowledgeBase,
    ctx: &ScanContext<'_>,
    is_snapshot: bool,
) -> Primary {
    // Volume before template: an identifier present in both is treated as
    // a volume.
    if let Some(volume) = kb.lookup_volume(&file.id) {
        return classify_volume(file, volume, kb, ctx);
    }

    if let Some(template) = kb.lookup_template(&file.id) {
        let mut notes = vec![format!(
            "{} [{}]",
            template.format.as_deref().unwrap_or("-"),
            template.state.as_deref().unwrap_or("-")
        )];
        if let Some(pool_id) = ctx.pool.and_then(|pool| pool.id)
            && let Some(placements) = kb.template_pool_placements(&file.id)
            && !placements.is_empty()
            && !placements.contains(&pool_id)
        {
            notes.push(NOTE_NOT_IN_POOL.to_owned());
        }
        return Primary {
            type_code: TypeCode::Template,
            name: with_account(template.name.as_deref(), template.account.as_deref()),
            status: StatusCategory::IdleKnown,
            notes,
        };
    }

    let name = kb
        .domain_for(&file.id)
        .map_or_else(|| "-".to_owned(), |domain| domain.name.clone());
    let mut notes = Vec::new();
    let type_code = if file.is_qcow2() && file.backing.is_some() {
        if !is_snapshot {
            notes.push(NOTE_SNAPSHOT_UNKNOWN.to_owned());
        }
        TypeCode::SnapshotUnknown
    } else if file.is_raw() {
        TypeCode::RawUnknown
    } else {
        TypeCode::ImageUnknown
    };
    Primary {
        type_code,
        name,
        status: StatusCategory::IdleUnknown,
        notes,
    }
}

fn classify_volume(
    file: &ImageFile,
    volume: &VolumeRecord,
    kb: &KnowledgeBase,
    ctx: &ScanContext<'_>,
) -> Primary {
    let type_code = match volume.kind {
        VolumeKind::Root => TypeCode::Root,
        VolumeKind::DataDisk => TypeCode::DataDisk,
        VolumeKind::Template => TypeCode::Template,
        VolumeKind::Other(_) => TypeCode::Image,
    };

    let domain = kb.domain_for(&file.id);
    let display = non_empty(volume.vm_display_name.as_deref())
        .or(non_empty(volume.vm_instance_name.as_deref()))
        .or(domain.map(|domain| domain.name.as_str()));

    // The hypervisor only ever fills in the name, never the status.
    let status = non_empty(volume.vm_state.as_deref())
        .map_or(StatusCategory::IdleKnown, StatusCategory::from_vm_state);

    let mut notes = Vec::new();
    if let Some(state) = non_empty(volume.state.as_deref())
        && !state.eq_ignore_ascii_case("ready")
    {
        notes.push(format!("volume {state}"));
    }
    if let Some(current) = ctx.pool.and_then(|pool| pool.id)
        && let Some(registered) = volume.pool_id
        && registered != current
    {
        let pool = volume
            .pool_name
            .clone()
            .unwrap_or_else(|| registered.to_string());
        notes.push(format!("registered in pool {pool}"));
    }

    Primary {
        type_code,
        name: with_account(display, volume.account.as_deref()),
        status,
        notes,
    }
}

fn with_account(name: Option<&str>, account: Option<&str>) -> String {
    let name = non_empty(name).unwrap_or("-");
    match non_empty(account) {
        Some(account) => format!("{name} ({account})"),
        None => name.to_owned(),
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}
