//! Client-side session identifier, created once and reused across runs.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use uuid::Uuid;

/// Where the CLI keeps its session identifier.
pub fn session_file() -> Option<PathBuf> {
    crate::config::data_dir().map(|dir| dir.join("session_id"))
}

pub fn new_session_id() -> String {
    Uuid::new_v4().to_string()
}

/// Read the identifier stored at `path`, creating and persisting a new one
/// when the file is missing or blank.
pub fn load_or_create(path: &Path) -> Result<String> {
    if let Ok(existing) = fs::read_to_string(path) {
        let existing = existing.trim();
        if !existing.is_empty() {
            return Ok(existing.to_string());
        }
    }

    let id = new_session_id();
    store(path, &id)?;
    Ok(id)
}

/// Persist `id` at `path`, replacing what was there.
pub fn store(path: &Path, id: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    fs::write(path, id).with_context(|| format!("failed to write {}", path.display()))
}
