//! `.env` file loading.
//!
//! Lines are `KEY=VALUE`, optionally prefixed with `export`. Blank lines and
//! `#` comments are ignored, and one layer of matching quotes is stripped.
//! Variables already present in the environment are never overridden.

use crate::errors::SettingsError;
use std::io::ErrorKind;
use std::path::Path;
use tracing::debug;

/// Parses `.env` text into key/value pairs, in file order.
#[must_use]
pub fn parse_env(text: &str) -> Vec<(String, String)> {
    text.lines()
        .filter_map(|line| {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                return None;
            }
            let line = line.strip_prefix("export ").unwrap_or(line);
            let (key, value) = line.split_once('=')?;
            let key = key.trim();
            if key.is_empty() || key.contains(char::is_whitespace) {
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
    // Unquoted values may carry a trailing comment.
    value.split(" #").next().unwrap_or(value).trim_end()
}

/// Applies a `.env` file to the process environment.
///
/// Returns how many variables were set. A missing file sets nothing.
///
/// # Errors
///
/// Returns `SettingsError::Read` if the file exists but cannot be read.
pub fn load_env_file(path: impl AsRef<Path>) -> Result<usize, SettingsError> {
    let path = path.as_ref();
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!(path = %path.display(), "No env file found");
            return Ok(0);
        }
        Err(source) => {
            return Err(SettingsError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    let mut applied = 0;
    for (key, value) in parse_env(&text) {
        if std::env::var_os(&key).is_none() {
            std::env::set_var(&key, value);
            applied += 1;
        }
    }

    debug!(path = %path.display(), applied, "Loaded env file");
    Ok(applied)
}
