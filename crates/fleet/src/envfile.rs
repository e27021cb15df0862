//! Minimal `.env` file reader for custom containers.

use crate::error::{Error, Result};
use std::fs;
use std::io;
use std::path::Path;

/// Read `KEY=VALUE` pairs from `path`.
///
/// A missing file is [`Error::EnvFileMissing`]; it is never treated as an
/// empty environment.
pub fn read(path: &Path) -> Result<Vec<(String, String)>> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(parse(&content)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Err(Error::EnvFileMissing {
            path: path.to_path_buf(),
        }),
        Err(e) => Err(Error::Runtime(dockerkit::Error::Io(e))),
    }
}

/// Parse env file content. Blank lines, `#` comments and lines without `=`
/// are skipped; an `export ` prefix and matching outer quotes are stripped.
pub fn parse(content: &str) -> Vec<(String, String)> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| {
            let line = line.strip_prefix("export ").unwrap_or(line);
            let (key, value) = line.split_once('=')?;
            let key = key.trim();
            if key.is_empty() {
                return None;
            }
            Some((key.to_string(), unquote(value.trim()).to_string()))
        })
        .collect()
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}
