use std::io::ErrorKind;
use std::path::PathBuf;

use anyhow::Context;
use async_trait::async_trait;

/// Durable single-slot "remember the last user" store, injected into the
/// session controller so it stays testable without a real backend.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    async fn load(&self) -> anyhow::Result<Option<String>>;
    async fn store(&self, name: &str) -> anyhow::Result<()>;
    async fn clear(&self) -> anyhow::Result<()>;
}

/// File-backed slot: the whole file is the remembered name.
pub struct FileIdentityStore {
    path: PathBuf,
}

impl FileIdentityStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl IdentityStore for FileIdentityStore {
    async fn load(&self) -> anyhow::Result<Option<String>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => {
                let name = contents.trim();
                if name.is_empty() {
                    Ok(None)
                } else {
                    Ok(Some(name.to_string()))
                }
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).context("read identity file"),
        }
    }

    async fn store(&self, name: &str) -> anyhow::Result<()> {
        tokio::fs::write(&self.path, name)
            .await
            .context("write identity file")
    }

    async fn clear(&self) -> anyhow::Result<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).context("remove identity file"),
        }
    }
}

#[cfg(test)]
mod identity_tests {
    use super::*;

    #[tokio::test]
    async fn round_trips_a_name() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileIdentityStore::new(dir.path().join("user"));

        assert_eq!(store.load().await.unwrap(), None);
        store.store("Ana").await.unwrap();
        assert_eq!(store.load().await.unwrap(), Some("Ana".to_string()));
        store.clear().await.unwrap();
        assert_eq!(store.load().await.unwrap(), None);
    }

    #[tokio::test]
    async fn clear_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileIdentityStore::new(dir.path().join("user"));
        store.clear().await.unwrap();
        store.clear().await.unwrap();
    }

    #[tokio::test]
    async fn whitespace_only_slot_is_absent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("user");
        tokio::fs::write(&path, "  \n").await.unwrap();
        let store = FileIdentityStore::new(path);
        assert_eq!(store.load().await.unwrap(), None);
    }
}
