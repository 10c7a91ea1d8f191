use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::config_dir;

/// Non-secret session metadata stored in ~/.config/inbox_digest/session.json
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionFile {
    pub backend_url: String,
    pub logged_in_at_epoch: i64,
}

pub fn session_path() -> Result<PathBuf> {
    let mut p = config_dir()?;
    fs::create_dir_all(&p)?;
    p.push("session.json");
    Ok(p)
}

pub fn save_session_meta_at(path: &Path, meta: &SessionFile) -> Result<()> {
    let s = serde_json::to_string_pretty(meta)?;
    fs::write(path, s)?;
    Ok(())
}

pub fn load_session_meta_at(path: &Path) -> Result<Option<SessionFile>> {
    if !path.exists() {
        return Ok(None);
    }
    let s = fs::read_to_string(path)?;
    Ok(Some(serde_json::from_str(&s)?))
}

pub fn clear_session_meta_at(path: &Path) -> Result<()> {
    if path.exists() {
        fs::remove_file(path)?;
    }
    Ok(())
}

pub fn save_session_meta(meta: &SessionFile) -> Result<()> {
    save_session_meta_at(&session_path()?, meta)
}

pub fn load_session_meta() -> Result<Option<SessionFile>> {
    load_session_meta_at(&session_path()?)
}

pub fn clear_session_meta() -> Result<()> {
    clear_session_meta_at(&session_path()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_load_clear() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");

        assert_eq!(load_session_meta_at(&path).unwrap(), None);

        let meta = SessionFile {
            backend_url: "http://localhost:5000".into(),
            logged_in_at_epoch: 1_790_000_000,
        };
        save_session_meta_at(&path, &meta).unwrap();
        assert_eq!(load_session_meta_at(&path).unwrap(), Some(meta));

        clear_session_meta_at(&path).unwrap();
        clear_session_meta_at(&path).unwrap();
        assert!(!path.exists());
    }
}
