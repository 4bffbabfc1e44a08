#![forbid(unsafe_code)]

use crate::{Error, command};
use async_trait::async_trait;
use reconcile::domain::Inspection;
use reconcile::services::ImageInspector;
use serde::Deserialize;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Subset of `qemu-img info --output=json`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct ImageInfo {
    format: Option<String>,
    virtual_size: Option<u64>,
    actual_size: Option<u64>,
    backing_filename: Option<String>,
    full_backing_filename: Option<String>,
}

/// Parse the JSON report of `qemu-img info`.
///
/// Size is the space used on disk, falling back to the virtual size. The
/// backing reference prefers the resolved (full) name.
pub fn parse_info(json: &str) -> Result<Inspection, Error> {
    let info: ImageInfo = serde_json::from_str(json)?;
    Ok(Inspection {
        size_bytes: info.actual_size.or(info.virtual_size),
        format: info.format,
        backing: info.full_backing_filename.or(info.backing_filename),
    })
}

#[derive(Debug, Clone)]
pub struct QemuImgInspector {
    program: PathBuf,
    force_share: bool,
}

impl QemuImgInspector {
    pub fn new(config: &config::Inspector) -> Self {
        Self {
            program: config.qemu_img.clone(),
            force_share: config.force_share,
        }
    }

    async fn info(&self, path: &Path) -> Result<Inspection, Error> {
        let mut args: Vec<&OsStr> = vec!["info".as_ref(), "--output=json".as_ref()];
        if self.force_share {
            args.push("-U".as_ref());
        }
        args.push(path.as_os_str());
        let stdout = command::run(&self.program, args).await?;
        parse_info(&stdout)
    }
}

#[async_trait]
impl ImageInspector for QemuImgInspector {
    async fn inspect(&self, path: &Path) -> Inspection {
        match self.info(path).await {
            Ok(inspection) => inspection,
            Err(err) => {
                debug!(path = %path.display(), %err, "cannot inspect image");
                Inspection::default()
            }
        }
    }
}
