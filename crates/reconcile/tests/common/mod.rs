#![allow(dead_code)]

use reconcile::domain::{ImageFile, ImageId, Inspection, ListedFile, PoolRef};
use std::collections::HashSet;
use std::path::PathBuf;

pub const POOL_DIR: &str = "/mnt/0f1e2d3c-4b5a-6978-8a9b-0c1d2e3f4a5b";

pub fn uuid(n: u8) -> String {
    format!("{n:08x}-0000-4000-8000-{n:012x}")
}

pub fn image(name: &str, format: Option<&str>, backing: Option<&str>) -> ImageFile {
    ImageFile::new(
        ListedFile {
            path: PathBuf::from(POOL_DIR).join(name),
            file_name: name.to_owned(),
            len: 1 << 20,
        },
        Inspection {
            size_bytes: Some(1 << 30),
            format: format.map(str::to_owned),
            backing: backing.map(str::to_owned),
        },
    )
}

pub fn present(files: &[ImageFile]) -> HashSet<ImageId> {
    files.iter().map(|file| file.id.clone()).collect()
}

pub fn pool(id: u64) -> PoolRef {
    PoolRef::new(id, "primary-1")
}
