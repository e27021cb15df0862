//! Host-name resolution: make every site hostname resolve to loopback.
//!
//! The engine only decides *what* the hosts file should contain; writing it
//! (and any privilege escalation that needs) belongs to a [`HostResolver`].

use anyhow::Result;

pub const BLOCK_BEGIN: &str = "# berth-begin";
pub const BLOCK_END: &str = "# berth-end";

/// Planned hosts-file change
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostsUpdate {
    pub needs_update: bool,
    /// Full file content after the change
    pub content: String,
}

/// Hostnames in, updated-file-or-no-op out.
///
/// Failures are the collaborator's own (permissions, privilege prompts), so
/// they travel as [`anyhow::Error`].
pub trait HostResolver: Send + Sync {
    fn plan(&self, hostnames: &[String]) -> Result<HostsUpdate>;

    fn write(&self, update: &HostsUpdate) -> Result<()>;
}

/// Replace (or append) the managed block in `existing` so it maps exactly
/// `hostnames` to 127.0.0.1. Lines outside the block are left untouched.
pub fn patch_hosts(existing: &str, hostnames: &[String]) -> HostsUpdate {
    let mut outside = Vec::new();
    let mut in_block = false;
    for line in existing.lines() {
        match line.trim() {
            BLOCK_BEGIN => in_block = true,
            BLOCK_END => in_block = false,
            _ if !in_block => outside.push(line),
            _ => {}
        }
    }
    while outside.last().is_some_and(|l| l.trim().is_empty()) {
        outside.pop();
    }

    let mut content = outside.join("\n");
    if !hostnames.is_empty() {
        if !content.is_empty() {
            content.push_str("\n\n");
        }
        content.push_str(BLOCK_BEGIN);
        content.push('\n');
        for hostname in hostnames {
            content.push_str(&format!("127.0.0.1 {hostname}\n"));
        }
        content.push_str(BLOCK_END);
    }
    if !content.is_empty() {
        content.push('\n');
    }

    HostsUpdate {
        needs_update: content != existing,
        content,
    }
}
