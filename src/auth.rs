//! Persisted bearer token
//!
//! The authentication flow (outside this crate) stores the session token in
//! a file under the XDG data directory (`~/.local/share/crmdata/auth_token`
//! on Linux). The router reads it on every outbound request so a token
//! refreshed by another process is picked up without restarting.

use directories::ProjectDirs;
use std::fs;
use std::path::PathBuf;

/// File name of the stored token
const TOKEN_FILE: &str = "auth_token";

/// Reads and writes the persisted auth token
#[derive(Debug, Clone, Default)]
pub struct TokenStore {
    /// Token file location; `None` means no token is ever available
    path: Option<PathBuf>,
}

impl TokenStore {
    /// Creates a TokenStore in the XDG-compliant data directory
    ///
    /// Falls back to an anonymous store if the directory cannot be
    /// determined (e.g., no home directory).
    pub fn new() -> Self {
        let path = ProjectDirs::from("", "", "crmdata")
            .map(|dirs| dirs.data_dir().join(TOKEN_FILE));
        Self { path }
    }

    /// Creates a TokenStore backed by a specific file
    pub fn with_path(path: PathBuf) -> Self {
        Self { path: Some(path) }
    }

    /// A store that never yields a token
    pub fn anonymous() -> Self {
        Self { path: None }
    }

    pub fn path(&self) -> Option<&PathBuf> {
        self.path.as_ref()
    }

    /// Returns the current token, if one is stored and non-blank
    pub fn read(&self) -> Option<String> {
        let path = self.path.as_ref()?;
        let content = fs::read_to_string(path).ok()?;
        let token = content.trim();
        if token.is_empty() {
            None
        } else {
            Some(token.to_string())
        }
    }

    /// Stores `token`, creating parent directories as needed
    pub fn write(&self, token: &str) -> std::io::Result<()> {
        let path = self.require_path()?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, token.trim())
    }

    /// Removes the stored token; clearing an absent token is not an error
    pub fn clear(&self) -> std::io::Result<()> {
        let path = self.require_path()?;
        match fs::remove_file(path) {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }

    fn require_path(&self) -> std::io::Result<&PathBuf> {
        self.path.as_ref().ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "no data directory available for the auth token",
            )
        })
    }
}
