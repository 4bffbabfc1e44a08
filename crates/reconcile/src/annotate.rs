#![forbid(unsafe_code)]

use crate::domain::{ClassificationResult, ImageFile, ImageId, ParentLabel};
use crate::stores::BaseAnnotations;
use std::collections::{HashMap, HashSet};
use tracing::{debug, trace};

/// File names that some snapshot's backing reference points at.
pub fn referenced_names(files: &[ImageFile]) -> HashSet<&str> {
    files
        .iter()
        .filter_map(|file| file.backing.as_deref())
        .filter_map(|backing| backing.trim_end_matches('/').rsplit('/').next())
        .filter(|name| !name.is_empty())
        .collect()
}

/// Rows that stand for `base`. Several files may share one canonical id
/// (`U` and a stray `U.bak`); the file a snapshot names wins, then the file
/// named exactly after the id, and only then every row with that id.
fn parent_rows(
    rows: &[usize],
    results: &[ClassificationResult],
    base: &ImageId,
    referenced: &HashSet<&str>,
) -> Vec<usize> {
    if rows.len() < 2 {
        return rows.to_vec();
    }
    let pick = |keep: fn(&ClassificationResult, &ImageId, &HashSet<&str>) -> bool| -> Vec<usize> {
        rows.iter()
            .copied()
            .filter(|&index| keep(&results[index], base, referenced))
            .collect()
    };
    let named = pick(|row, _, referenced| referenced.contains(row.file_name.as_str()));
    if !named.is_empty() {
        return named;
    }
    let exact = pick(|row, base, _| row.file_name == base.as_str());
    if !exact.is_empty() {
        return exact;
    }
    rows.to_vec()
}

/// Write a parent label into the base-image column of every row referenced
/// as a snapshot's base. Only that column changes.
///
/// Bases without a row (outside the directory, or filtered out) are skipped.
/// Returns the number of rows labelled.
pub fn annotate_parents(
    results: &mut [ClassificationResult],
    bases: &BaseAnnotations,
    referenced: &HashSet<&str>,
) -> usize {
    let mut rows: HashMap<ImageId, Vec<usize>> = HashMap::new();
    for (index, result) in results.iter().enumerate() {
        rows.entry(result.id.clone()).or_default().push(index);
    }

    let mut labelled = 0;
    for (base, snapshot_type) in bases.iter() {
        let Some(label) = ParentLabel::for_snapshot(snapshot_type) else {
            continue;
        };
        let Some(candidates) = rows.get(base) else {
            debug!(%base, "no row for snapshot base, annotation dropped");
            continue;
        };
        for index in parent_rows(candidates, results, base, referenced) {
            trace!(%base, file = %results[index].file_name, label = label.as_str(), "annotating parent");
            results[index].base_display = label.as_str().to_owned();
            labelled += 1;
        }
    }
    labelled
}
