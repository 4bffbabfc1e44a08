#![forbid(unsafe_code)]

use anyhow::Context;
use clap::Parser;
use config::Config;
use probes::{ControlPlaneDb, QemuImgInspector, ReadDirLister, VirshDomainMapper};
use reconcile::services::{DomainMapper, FactLoader, NoFacts, PoolResolver};
use reconcile::{AuditEngine, Services};
use std::io::Write;
use std::sync::Arc;
use storaudit::{cli::Cli, error::Error, render, signals::wait_for_signal};
use tracing::{debug, info, warn};
use tracing_log::AsTrace;

#[cfg(feature = "jemalloc")]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

/// Wire the configured fact sources. Missing ones classify as unknown.
fn services(config: &Config) -> anyhow::Result<Services> {
    type Facts = Box<dyn FactLoader + Send + Sync>;
    type Pools = Box<dyn PoolResolver + Send + Sync>;

    let (facts, pools): (Facts, Pools) = if config.control_plane.is_configured() {
        let db = ControlPlaneDb::connect(&config.control_plane)
            .context("invalid control plane database URL")?;
        (Box::new(db.clone()), Box::new(db))
    } else {
        warn!("no control plane database configured, every image will be unknown");
        (Box::new(NoFacts), Box::new(NoFacts))
    };
    let domains: Box<dyn DomainMapper + Send + Sync> = if config.hypervisor.enabled {
        Box::new(VirshDomainMapper::new(&config.hypervisor))
    } else {
        Box::new(NoFacts)
    };

    Ok(Services {
        lister: Box::new(ReadDirLister),
        inspector: Arc::new(QemuImgInspector::new(&config.inspector)),
        facts,
        domains,
        pools,
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_max_level(cli.verbosity.log_level_filter().as_trace())
        .with_writer(std::io::stderr)
        .with_level(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    debug!(config = ?cli);

    let mut config = match &cli.conffile {
        Some(path) => Config::load(path)?,
        _ => Config::new()?,
    };
    cli.apply(&mut config);
    if config.scan.host.is_none() {
        config.scan.host = probes::host_name();
    }

    if cli.dump_config {
        let mut shown = config.clone();
        shown.control_plane.url = shown.control_plane.url.as_deref().map(render::redact_url);
        std::io::stdout().lock().write_all(shown.to_toml()?.as_bytes())?;
        return Ok(());
    }

    let directory = config.scan.directory.clone().ok_or(Error::NoDirectory)?;
    let show_foreign = config.scan.show_foreign;
    let services = services(&config)?;
    let engine = AuditEngine::new(config, services);

    // Dropping the audit kills in-flight qemu-img and virsh children.
    let report = tokio::select! {
        res = engine.run(&directory) => res?,
        sig = wait_for_signal() => {
            let event = sig?;
            info!(?event, "Received signal, aborting audit");
            return Err(Error::Interrupted(event).into());
        }
    };

    let mut stdout = std::io::stdout().lock();
    if cli.json {
        render::write_json(&mut stdout, &report).map_err(Error::Json)?;
        writeln!(stdout).map_err(Error::Write)?;
    } else {
        render::write_text(&mut stdout, &report, show_foreign).map_err(Error::Write)?;
    }
    Ok(())
}
