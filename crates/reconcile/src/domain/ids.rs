#![forbid(unsafe_code)]

use serde::Serialize;
use std::{borrow::Borrow, fmt};

/// Length of a hyphenated UUID, the shape image files are named after.
const UUID_LEN: usize = 36;

/// Canonical identifier of an image.
///
/// Every construction goes through [`normalize`], so `abc.qcow2`,
/// `/mnt/pool/abc` and `abc` are the same key no matter whether the string
/// came from a filename, a volume `path` column, a template UUID or a
/// hypervisor disk source.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ImageId(String);

impl ImageId {
    pub fn new(path_like: impl AsRef<str>) -> Self {
        Self(normalize(path_like.as_ref()).to_owned())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the identifier has the 8-4-4-4-12 hexadecimal UUID shape.
    pub fn is_well_formed(&self) -> bool {
        self.0.len() == UUID_LEN && uuid::Uuid::try_parse(&self.0).is_ok()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for ImageId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ImageId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl Borrow<str> for ImageId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ImageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ImageId").field(&self.0).finish()
    }
}

impl fmt::Display for ImageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Reduce a path-like string to its canonical identifier.
///
/// Takes the last path segment and cuts it at the first `.`. A segment with
/// nothing before its first dot (e.g. `.lock`) is returned whole.
///
/// ```
/// # use reconcile::domain::normalize;
/// assert_eq!(normalize("/mnt/pool/abc-123.qcow2"), "abc-123");
/// assert_eq!(normalize("abc-123"), "abc-123");
/// assert_eq!(normalize(".lock"), ".lock");
/// ```
pub fn normalize(path_like: &str) -> &str {
    let segment = path_like
        .trim()
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default();
    match segment.split_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => segment,
    }
}
