#![forbid(unsafe_code)]

use clap::Parser;
use clap_verbosity_flag::{Verbosity, WarnLevel};
use config::Config;
use std::path::{Path, PathBuf};

/// storaudit: audit a hypervisor's image directory against the control plane
///
/// Every file in the directory is classified as a root or data volume,
/// template, snapshot or unknown image. Snapshots whose base the control
/// plane does not know are proposed for flattening. Nothing is modified.
#[derive(Debug, Parser, Clone)]
#[command(about, long_about, version)]
pub struct Cli {
    /// Directory of disk images to audit.
    ///
    /// Defaults to `scan.directory` from the configuration.
    pub directory: Option<PathBuf>,

    /// Path to configuration file.
    #[arg(short, long, value_parser = validate_file)]
    pub conffile: Option<PathBuf>,

    /// Control-plane database URL, e.g. `mysql://cloud:secret@db/cloud`.
    #[arg(long)]
    pub db_url: Option<String>,

    /// Host name used to find the storage pool. Detected when unset.
    #[arg(long)]
    pub host: Option<String>,

    /// Do not ask libvirt which domains use which disks.
    #[arg(long)]
    pub no_hypervisor: bool,

    /// Also list files whose names are not image identifiers.
    #[arg(long)]
    pub show_foreign: bool,

    /// Classify on a single thread.
    #[arg(long)]
    pub sequential: bool,

    /// Print the report as JSON.
    #[arg(long)]
    pub json: bool,

    /// Print the effective configuration as TOML and exit.
    #[arg(long)]
    pub dump_config: bool,

    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,
}

impl Cli {
    /// Overlay command-line flags onto the loaded configuration.
    pub fn apply(&self, config: &mut Config) {
        if let Some(directory) = &self.directory {
            config.scan.directory = Some(directory.clone());
        }
        if let Some(host) = &self.host {
            config.scan.host = Some(host.clone());
        }
        if let Some(url) = &self.db_url {
            config.control_plane.url = Some(url.clone());
        }
        if self.no_hypervisor {
            config.hypervisor.enabled = false;
        }
        if self.show_foreign {
            config.scan.show_foreign = true;
        }
        if self.sequential {
            config.scan.parallel = false;
        }
    }
}

/// Check if the file exists.
#[inline(always)]
fn validate_file(file: &str) -> Result<PathBuf, String> {
    let path = Path::new(file);
    if path.is_file() {
        Ok(path.to_owned())
    } else {
        Err(format!("File not found: {:?}", path))
    }
}
