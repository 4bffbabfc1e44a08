#![forbid(unsafe_code)]

use crate::{Error, command};
use async_trait::async_trait;
use reconcile::domain::DomainDisks;
use reconcile::services::DomainMapper;
use std::ffi::OsString;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, warn};

/// A row of `virsh list --all`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainRow {
    pub name: String,
    pub state: String,
}

/// Parse the table printed by `virsh list --all`.
///
/// ```text
///  Id   Name        State
/// -----------------------------
///  1    i-2-10-VM   running
///  -    i-2-11-VM   shut off
/// ```
pub fn parse_domain_list(output: &str) -> Vec<DomainRow> {
    table_rows(output)
        .filter_map(|columns| match columns.as_slice() {
            [_id, name, state @ ..] if !state.is_empty() => Some(DomainRow {
                name: (*name).to_owned(),
                state: state.join(" "),
            }),
            _ => None,
        })
        .collect()
}

/// Parse the table printed by `virsh domblklist --details`, keeping the
/// sources of `disk` devices.
///
/// ```text
///  Type   Device   Target   Source
/// ------------------------------------------------
///  file   disk     vda      /mnt/7c1e/5d1b...
///  file   cdrom    hdc      -
/// ```
pub fn parse_block_list(output: &str) -> Vec<String> {
    table_rows(output)
        .filter_map(|columns| match columns.as_slice() {
            [_kind, device, _target, source @ ..] if *device == "disk" && !source.is_empty() => {
                let source = source.join(" ");
                (source != "-").then_some(source)
            }
            _ => None,
        })
        .collect()
}

/// Body rows of a virsh table, split on whitespace. The header and the dashed
/// separator are skipped.
fn table_rows(output: &str) -> impl Iterator<Item = Vec<&str>> {
    output
        .lines()
        .skip_while(|line| !line.trim_start().starts_with('-'))
        .skip(1)
        .map(|line| line.split_whitespace().collect::<Vec<_>>())
        .filter(|columns| !columns.is_empty())
}

/// Maps libvirt domains to the disks they have attached, by running `virsh`.
#[derive(Debug, Clone)]
pub struct VirshDomainMapper {
    program: PathBuf,
    uri: Option<String>,
    timeout: Duration,
    command_timeout: Duration,
    concurrency: usize,
}

impl VirshDomainMapper {
    pub fn new(config: &config::Hypervisor) -> Self {
        Self {
            program: config.virsh.clone(),
            uri: config.uri.clone(),
            timeout: config.timeout,
            command_timeout: config.command_timeout,
            concurrency: config.concurrency,
        }
    }

    async fn virsh(&self, args: &[&str]) -> Result<String, Error> {
        let mut argv: Vec<OsString> = Vec::with_capacity(args.len() + 2);
        if let Some(uri) = &self.uri {
            argv.push("-c".into());
            argv.push(uri.into());
        }
        argv.extend(args.iter().map(OsString::from));
        command::run(&self.program, argv).await
    }

    /// Disks of one domain. `None` when it cannot be listed in time; a domain
    /// may also vanish between `list` and `domblklist`.
    async fn block_list(&self, name: &str) -> Option<Vec<String>> {
        let args = ["domblklist", name, "--details"];
        let listed = self.virsh(&args);
        match tokio::time::timeout(self.command_timeout, listed).await {
            Ok(Ok(output)) => Some(parse_block_list(&output)),
            Ok(Err(err)) => {
                warn!(domain = %name, %err, "cannot list domain disks");
                None
            }
            Err(_) => {
                warn!(domain = %name, timeout = ?self.command_timeout, "listing domain disks timed out");
                None
            }
        }
    }

    /// List every domain, then its disks with bounded concurrency. Domains
    /// whose disks are not listed by the deadline are left out. Output keeps
    /// `virsh list` order.
    async fn load(&self) -> Result<Vec<DomainDisks>, Error> {
        // Stop short of the caller's bound on the whole mapping so the
        // partial result still reaches it.
        let deadline = Instant::now() + self.timeout * 9 / 10;
        let rows = parse_domain_list(&self.virsh(&["list", "--all"]).await?);
        debug!(count = rows.len(), "libvirt domains");

        let semaphore = Arc::new(Semaphore::new(self.concurrency.max(1)));
        let mut disks: Vec<Option<Vec<String>>> = vec![None; rows.len()];
        let mut tasks = JoinSet::new();
        for (index, row) in rows.iter().enumerate() {
            let mapper = self.clone();
            let semaphore = Arc::clone(&semaphore);
            let name = row.name.clone();
            tasks.spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return (index, None);
                };
                (index, mapper.block_list(&name).await)
            });
        }

        loop {
            match tokio::time::timeout_at(deadline, tasks.join_next()).await {
                Ok(Some(Ok((index, listed)))) => disks[index] = listed,
                Ok(Some(Err(err))) => warn!(%err, "disk listing task join failed"),
                Ok(None) => break,
                Err(_) => {
                    warn!(pending = tasks.len(), "deadline reached, keeping the domains listed so far");
                    // Aborted tasks drop their children, which kills them.
                    tasks.abort_all();
                    break;
                }
            }
        }

        Ok(rows
            .into_iter()
            .zip(disks)
            .filter_map(|(DomainRow { name, state }, disks)| {
                disks.map(|disks| DomainDisks { name, state, disks })
            })
            .collect())
    }
}

#[async_trait]
impl DomainMapper for VirshDomainMapper {
    async fn domains(&self) -> Result<Vec<DomainDisks>, reconcile::Error> {
        Ok(self.load().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn domain_list_with_multi_word_state() {
        let output = " Id   Name        State\n\
                      -----------------------------\n \
                      1    i-2-10-VM   running\n \
                      -    i-2-11-VM   shut off\n\n";
        assert_eq!(
            parse_domain_list(output),
            vec![
                DomainRow {
                    name: "i-2-10-VM".into(),
                    state: "running".into()
                },
                DomainRow {
                    name: "i-2-11-VM".into(),
                    state: "shut off".into()
                },
            ]
        );
    }

    #[test]
    fn empty_domain_list() {
        let output = " Id   Name   State\n--------------------\n\n";
        assert!(parse_domain_list(output).is_empty());
        assert!(parse_domain_list("").is_empty());
    }

    #[test]
    fn block_list_keeps_disks_with_sources() {
        let output = " Type   Device   Target   Source\n\
                      ------------------------------------------------\n \
                      file   disk     vda      /mnt/7c1e/5d1b6b4e-2a6e-4f0b-9a51-0c2f3e1d7a10\n \
                      file   disk     vdb      /mnt/7c1e/my disk.qcow2\n \
                      file   cdrom    hdc      -\n \
                      block  disk     vdc      -\n";
        assert_eq!(
            parse_block_list(output),
            vec![
                "/mnt/7c1e/5d1b6b4e-2a6e-4f0b-9a51-0c2f3e1d7a10".to_owned(),
                "/mnt/7c1e/my disk.qcow2".to_owned(),
            ]
        );
    }

    /// A stand-in `virsh` with four domains: `web` and `db` answer, `gone`
    /// fails and `stuck` never answers.
    const FAKE_VIRSH: &str = r#"#!/bin/sh
if [ "$1" = list ]; then
    printf ' Id   Name    State\n------------------------\n'
    printf ' 1    web     running\n 2    stuck   running\n -    gone    shut off\n 3    db      paused\n'
    exit 0
fi
case "$2" in
    stuck) exec sleep 30 ;;
    gone) echo "error: failed to get domain '$2'" >&2; exit 1 ;;
esac
printf ' Type   Device   Target   Source\n----------------------------------\n'
printf ' file   disk     vda      /mnt/pool/%s-root\n' "$2"
"#;

    fn fake_virsh(dir: &tempfile::TempDir) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;
        let path = dir.path().join("virsh");
        std::fs::write(&path, FAKE_VIRSH).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    fn names(domains: &[DomainDisks]) -> Vec<&str> {
        domains.iter().map(|d| d.name.as_str()).collect()
    }

    #[tokio::test]
    async fn slow_and_failing_domains_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let mapper = VirshDomainMapper::new(&config::Hypervisor {
            virsh: fake_virsh(&dir),
            timeout: Duration::from_secs(20),
            command_timeout: Duration::from_secs(1),
            concurrency: 2,
            ..Default::default()
        });

        let started = std::time::Instant::now();
        let domains = mapper.load().await.unwrap();
        assert!(started.elapsed() < Duration::from_secs(10));
        assert_eq!(names(&domains), ["web", "db"]);
        assert_eq!(domains[1].state, "paused");
        assert_eq!(domains[1].disks, ["/mnt/pool/db-root"]);
    }

    #[tokio::test]
    async fn deadline_keeps_domains_listed_so_far() {
        let dir = tempfile::tempdir().unwrap();
        let mapper = VirshDomainMapper::new(&config::Hypervisor {
            virsh: fake_virsh(&dir),
            timeout: Duration::from_secs(3),
            command_timeout: Duration::from_secs(60),
            concurrency: 4,
            ..Default::default()
        });

        let started = std::time::Instant::now();
        let domains = mapper.load().await.unwrap();
        assert!(started.elapsed() < Duration::from_secs(10));
        assert_eq!(names(&domains), ["web", "db"]);
    }

    #[tokio::test]
    async fn missing_virsh_is_an_error() {
        let mapper = VirshDomainMapper::new(&config::Hypervisor {
            virsh: PathBuf::from("/nonexistent/virsh"),
            uri: Some("qemu:///system".into()),
            ..Default::default()
        });
        assert!(matches!(
            mapper.domains().await,
            Err(reconcile::Error::Source(_))
        ));
    }
}
