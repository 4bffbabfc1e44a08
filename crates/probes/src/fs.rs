#![forbid(unsafe_code)]

use reconcile::domain::ListedFile;
use reconcile::services::DirectoryLister;
use std::fs;
use std::path::Path;
use tracing::{trace, warn};

/// Lists regular files directly inside a directory.
///
/// Subdirectories, symlinks and other special files are skipped. The result
/// is sorted by file name so reports are reproducible.
#[derive(Debug, Default, Clone, Copy)]
pub struct ReadDirLister;

impl DirectoryLister for ReadDirLister {
    fn list(&self, dir: &Path) -> Result<Vec<ListedFile>, reconcile::Error> {
        let entries = fs::read_dir(dir).map_err(|source| reconcile::Error::Directory {
            path: dir.to_owned(),
            source,
        })?;

        let mut files = Vec::new();
        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    warn!(dir = %dir.display(), %err, "skipping unreadable directory entry");
                    continue;
                }
            };
            // `DirEntry::file_type` does not follow symlinks.
            let is_file = entry.file_type().is_ok_and(|kind| kind.is_file());
            if !is_file {
                trace!(path = ?entry.path(), "not a regular file");
                continue;
            }
            let len = entry.metadata().map(|meta| meta.len()).unwrap_or(0);
            files.push(ListedFile {
                path: entry.path(),
                file_name: entry.file_name().to_string_lossy().into_owned(),
                len,
            });
        }

        files.sort_by(|a, b| a.file_name.cmp(&b.file_name));
        Ok(files)
    }
}
