//! Persisted admin session.
//!
//! The session survives restarts under the fixed `adminToken` /
//! `adminUsername` keys; wizard progress is intentionally never persisted.

use std::fs;
use std::path::{Path, PathBuf};

use portal_core::AdminSession;
use portal_engine::AtomicFileWriter;
use portal_logging::{portal_error, portal_info, portal_warn};
use serde::{Deserialize, Serialize};

const SESSION_FILENAME: &str = ".portal_session.ron";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct PersistedSession {
    #[serde(rename = "adminToken")]
    admin_token: Option<String>,
    #[serde(rename = "adminUsername")]
    admin_username: Option<String>,
}

pub(crate) struct SessionStore {
    dir: PathBuf,
}

impl SessionStore {
    pub(crate) fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    fn path(&self) -> PathBuf {
        self.dir.join(SESSION_FILENAME)
    }

    pub(crate) fn load(&self) -> Option<AdminSession> {
        let path = self.path();
        let content = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return None;
            }
            Err(err) => {
                portal_warn!("Failed to read persisted session from {:?}: {}", path, err);
                return None;
            }
        };

        let persisted: PersistedSession = match ron::from_str(&content) {
            Ok(session) => session,
            Err(err) => {
                portal_warn!("Failed to parse persisted session from {:?}: {}", path, err);
                return None;
            }
        };

        let session = match (persisted.admin_token, persisted.admin_username) {
            (Some(token), Some(username)) => AdminSession { username, token },
            _ => return None,
        };
        portal_info!("Restored persisted session from {:?}", path);
        Some(session)
    }

    pub(crate) fn save(&self, session: &AdminSession) {
        let persisted = PersistedSession {
            admin_token: Some(session.token.clone()),
            admin_username: Some(session.username.clone()),
        };

        let pretty = ron::ser::PrettyConfig::new();
        let content = match ron::ser::to_string_pretty(&persisted, pretty) {
            Ok(text) => text,
            Err(err) => {
                portal_error!("Failed to serialize session: {}", err);
                return;
            }
        };

        let writer = AtomicFileWriter::new(self.dir.clone());
        if let Err(err) = writer.write(SESSION_FILENAME, content.as_bytes()) {
            portal_error!("Failed to write session to {:?}: {}", self.dir, err);
        }
    }

    pub(crate) fn clear(&self) {
        let path = self.path();
        match fs::remove_file(&path) {
            Ok(()) => {}
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => portal_warn!("Failed to remove session at {:?}: {}", path, err),
        }
    }
}

pub(crate) fn default_state_dir() -> PathBuf {
    std::env::current_dir()
        .unwrap_or_else(|_| Path::new(".").to_path_buf())
        .join(".portal")
}
