//! File-backed host-name resolution.

use anyhow::{Context, Result};
use fleet::{HostResolver, HostsUpdate, patch_hosts};
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use crate::sudo::SudoContext;

/// Patches a hosts file in place, escalating with sudo only when needed.
pub struct FileHosts {
    path: PathBuf,
}

impl FileHosts {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn read(&self) -> Result<String> {
        match fs::read_to_string(&self.path) {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(String::new()),
            Err(e) => Err(e).with_context(|| format!("Could not read {}", self.path.display())),
        }
    }
}

impl HostResolver for FileHosts {
    fn plan(&self, hostnames: &[String]) -> Result<HostsUpdate> {
        Ok(patch_hosts(&self.read()?, hostnames))
    }

    fn write(&self, update: &HostsUpdate) -> Result<()> {
        match fs::write(&self.path, &update.content) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::PermissionDenied => {
                log::debug!("{} is not writable; retrying with sudo", self.path.display());
                let sudo = SudoContext::acquire(&format!(
                    "update {} with site hostnames",
                    self.path.display()
                ))?;
                sudo.write_file(&self.path, &update.content)
            }
            Err(e) => Err(e).with_context(|| format!("Could not write {}", self.path.display())),
        }
    }
}
