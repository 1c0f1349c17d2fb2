//! Secure token storage
//!
//! The client persists exactly two opaque strings (access and refresh
//! token) through the `TokenStore` contract. App shells back it with the
//! platform keychain; this crate ships an in-memory store for tests and
//! ephemeral sessions, and a file store for desktop and dev builds. The
//! file store keeps one JSON object on disk and writes atomically
//! (temp file + rename) with 0600 permissions so a crash never leaves a
//! corrupt or world-readable token file.

use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;

use tokio::sync::Mutex;
use tracing::debug;

use crate::error::{Error, Result};

/// Store key for the bearer access token.
pub const ACCESS_TOKEN_KEY: &str = "auth.access_token";
/// Store key for the refresh token.
pub const REFRESH_TOKEN_KEY: &str = "auth.refresh_token";

/// Secure key-value string store, the platform keychain contract.
///
/// Every operation is awaited before in-memory session state is treated as
/// authoritative. Uses `Pin<Box<dyn Future>>` return types for
/// dyn-compatibility (`Arc<dyn TokenStore>`).
pub trait TokenStore: Send + Sync {
    /// Read a value, `None` when the key was never set or was cleared.
    fn get<'a>(
        &'a self,
        key: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<String>>> + Send + 'a>>;

    /// Write a value, replacing any previous one.
    fn set<'a>(
        &'a self,
        key: &'a str,
        value: String,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;

    /// Remove a value; clearing a missing key is a no-op.
    fn clear<'a>(&'a self, key: &'a str) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;
}

/// In-memory store for tests and sessions that should not outlive the
/// process.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TokenStore for MemoryTokenStore {
    fn get<'a>(
        &'a self,
        key: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<String>>> + Send + 'a>> {
        Box::pin(async move {
            let entries = self.entries.lock().await;
            Ok(entries.get(key).cloned())
        })
    }

    fn set<'a>(
        &'a self,
        key: &'a str,
        value: String,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            let mut entries = self.entries.lock().await;
            entries.insert(key.to_owned(), value);
            Ok(())
        })
    }

    fn clear<'a>(&'a self, key: &'a str) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            let mut entries = self.entries.lock().await;
            entries.remove(key);
            Ok(())
        })
    }
}

/// File-backed store: one JSON object mapping keys to values.
///
/// The Mutex serializes writes from refresh, login, and logout paths. Reads
/// clone the in-memory map, hydrated once at load.
#[derive(Debug)]
pub struct FileTokenStore {
    path: PathBuf,
    entries: Mutex<HashMap<String, String>>,
}

impl FileTokenStore {
    /// Load the store from the given file path.
    ///
    /// A missing file is an empty store; the file is created on the first
    /// write so fresh installs don't touch disk before holding a token.
    pub async fn load(path: PathBuf) -> Result<Self> {
        let entries = if path.exists() {
            let contents = tokio::fs::read_to_string(&path)
                .await
                .map_err(|e| Error::Io(format!("reading token file: {e}")))?;
            let entries: HashMap<String, String> = serde_json::from_str(&contents)
                .map_err(|e| Error::Parse(format!("parsing token file: {e}")))?;
            debug!(path = %path.display(), entries = entries.len(), "loaded token store");
            entries
        } else {
            debug!(path = %path.display(), "token file not found, starting empty");
            HashMap::new()
        };

        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }
}

impl TokenStore for FileTokenStore {
    fn get<'a>(
        &'a self,
        key: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<String>>> + Send + 'a>> {
        Box::pin(async move {
            let entries = self.entries.lock().await;
            Ok(entries.get(key).cloned())
        })
    }

    fn set<'a>(
        &'a self,
        key: &'a str,
        value: String,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            let mut entries = self.entries.lock().await;
            entries.insert(key.to_owned(), value);
            write_atomic(&self.path, &entries).await
        })
    }

    fn clear<'a>(&'a self, key: &'a str) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            let mut entries = self.entries.lock().await;
            if entries.remove(key).is_some() {
                write_atomic(&self.path, &entries).await?;
            }
            Ok(())
        })
    }
}

/// Write the token map atomically.
///
/// Writes to a temporary file in the same directory, sets 0600 permissions
/// (unix only), then renames it over the target so a crash mid-write never
/// corrupts the stored tokens.
async fn write_atomic(path: &Path, entries: &HashMap<String, String>) -> Result<()> {
    let json = serde_json::to_string_pretty(entries)
        .map_err(|e| Error::Parse(format!("serializing token file: {e}")))?;

    let dir = path
        .parent()
        .ok_or_else(|| Error::Io("token file path has no parent directory".into()))?;

    let tmp_path = dir.join(format!(".tokens.tmp.{}", std::process::id()));

    tokio::fs::write(&tmp_path, json.as_bytes())
        .await
        .map_err(|e| Error::Io(format!("writing temp token file: {e}")))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        tokio::fs::set_permissions(&tmp_path, perms)
            .await
            .map_err(|e| Error::Io(format!("setting token file permissions: {e}")))?;
    }

    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| Error::Io(format!("renaming temp token file: {e}")))?;

    debug!(path = %path.display(), "persisted tokens");
    Ok(())
}
