//! Scoped sudo context
//!
//! Sudo is never requested for the entire process. Instead:
//! 1. Changes are computed first (no sudo needed)
//! 2. Sudo is acquired once, only if a plain write is refused
//! 3. Sudo is released when the context drops

use anyhow::{Context, Result, bail};
use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};

/// Scoped sudo context - automatically invalidates on drop
pub struct SudoContext {
    validated: bool,
}

impl SudoContext {
    /// Acquire sudo privileges with a reason shown to user
    pub fn acquire(reason: &str) -> Result<Self> {
        eprintln!();
        eprintln!("  Sudo required: {reason}");
        eprintln!();

        let status = Command::new("sudo")
            .args(["-v"])
            .status()
            .context("Failed to execute sudo")?;

        if !status.success() {
            bail!("Failed to acquire sudo privileges");
        }

        Ok(Self { validated: true })
    }

    /// Replace `path` with `content` via `sudo tee`
    pub fn write_file(&self, path: &Path, content: &str) -> Result<()> {
        if !self.validated {
            bail!("Sudo context not validated");
        }

        let mut child = Command::new("sudo")
            .arg("tee")
            .arg(path)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("Failed to execute: sudo tee {}", path.display()))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(content.as_bytes())?;
        }

        let output = child.wait_with_output()?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!("Command failed: {}", stderr.trim());
        }
        Ok(())
    }
}

impl Drop for SudoContext {
    fn drop(&mut self) {
        // Invalidate sudo timestamp to release privileges
        let _ = Command::new("sudo").args(["-k"]).status();
    }
}
