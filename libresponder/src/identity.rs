//! The responder's identity, as persisted by the login flow
use crate::error::Result;
use async_trait::async_trait;
use std::{
    collections::{BTreeMap, HashMap},
    path::{Path, PathBuf},
    sync::{Mutex, MutexGuard, PoisonError},
};
use tokio::{
    fs::{self, File},
    io::AsyncWriteExt,
};
use tracing::debug;

/// Key under which the responder's display name is stored
pub const USERNAME_KEY: &str = "usernameSP";
/// Key under which the responder's user id is stored
pub const USER_ID_KEY: &str = "userId";

/// Who the responder is. The marker titled `username` is the responder's own marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub username: String,
    pub user_id: String,
}

impl Identity {
    pub fn new(username: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            user_id: user_id.into(),
        }
    }

    /// Read the identity from the given store. Returns `None` unless both the username and the
    /// user id are present and non-empty.
    pub async fn load(store: &dyn IdentityStore) -> Result<Option<Self>> {
        let username = store.get_item(USERNAME_KEY).await?;
        let user_id = store.get_item(USER_ID_KEY).await?;
        Ok(match (username, user_id) {
            (Some(username), Some(user_id)) if !username.is_empty() && !user_id.is_empty() => {
                Some(Self { username, user_id })
            }
            _ => None,
        })
    }

    pub async fn save(&self, store: &dyn IdentityStore) -> Result<()> {
        store.set_item(USERNAME_KEY, &self.username).await?;
        store.set_item(USER_ID_KEY, &self.user_id).await
    }
}

/// Persistent string key-value storage that survives restarts
#[async_trait]
pub trait IdentityStore: Send + Sync {
    async fn get_item(&self, key: &str) -> Result<Option<String>>;
    async fn set_item(&self, key: &str, value: &str) -> Result<()>;
    /// Remove every stored entry
    async fn clear(&self) -> Result<()>;
}

/// An [IdentityStore] kept as a small JSON object in a file that only the owner can read
#[derive(Debug, Clone)]
pub struct FileIdentityStore {
    path: PathBuf,
}

impl FileIdentityStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_all(&self) -> Result<BTreeMap<String, String>> {
        match fs::read_to_string(&self.path).await {
            Ok(contents) => Ok(serde_json::from_str(&contents)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn write_all(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        debug!(path = ?self.path, "Saving identity");
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let mut file = File::create(&self.path).await?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = file.metadata().await?.permissions();
            perms.set_mode(0o600);
            fs::set_permissions(&self.path, perms).await?;
        }
        let serialized = serde_json::to_string_pretty(entries)?;
        file.write_all(serialized.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}

#[async_trait]
impl IdentityStore for FileIdentityStore {
    async fn get_item(&self, key: &str) -> Result<Option<String>> {
        Ok(self.read_all().await?.remove(key))
    }

    async fn set_item(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.read_all().await?;
        entries.insert(key.to_string(), value.to_string());
        self.write_all(&entries).await
    }

    async fn clear(&self) -> Result<()> {
        fs::remove_file(&self.path).await.or_else(|e| match e.kind() {
            std::io::ErrorKind::NotFound => Ok(()),
            _ => Err(e.into()),
        })
    }
}

/// An [IdentityStore] that lives only as long as the process
#[derive(Debug, Default)]
pub struct MemoryIdentityStore(Mutex<HashMap<String, String>>);

impl MemoryIdentityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_identity(identity: &Identity) -> Self {
        let store = Self::new();
        {
            let mut entries = store.lock();
            entries.insert(USERNAME_KEY.to_string(), identity.username.clone());
            entries.insert(USER_ID_KEY.to_string(), identity.user_id.clone());
        }
        store
    }

    // every write is a single insert or clear, so a poisoned map is still consistent
    fn lock(&self) -> MutexGuard<'_, HashMap<String, String>> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl IdentityStore for MemoryIdentityStore {
    async fn get_item(&self, key: &str) -> Result<Option<String>> {
        Ok(self.lock().get(key).cloned())
    }

    async fn set_item(&self, key: &str, value: &str) -> Result<()> {
        self.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.lock().clear();
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use test_log::test;

    #[test(tokio::test)]
    async fn file_store_round_trip() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let store = FileIdentityStore::new(dir.path().join("nested").join("identity.json"));
        assert_eq!(Identity::load(&store).await.unwrap(), None);

        let identity = Identity::new("juan", "42");
        identity.save(&store).await.expect("Failed to save identity");
        assert_eq!(Identity::load(&store).await.unwrap(), Some(identity));

        // the file uses the keys the login flow writes
        let contents = std::fs::read_to_string(store.path()).unwrap();
        let raw: HashMap<String, String> = serde_json::from_str(&contents).unwrap();
        assert_eq!(raw[USERNAME_KEY], "juan");
        assert_eq!(raw[USER_ID_KEY], "42");

        store.clear().await.expect("Failed to clear");
        assert_eq!(Identity::load(&store).await.unwrap(), None);
        // clearing twice is fine
        store.clear().await.expect("Failed to clear again");
    }

    #[test(tokio::test)]
    async fn partial_identity_is_absent() {
        let store = MemoryIdentityStore::new();
        store.set_item(USERNAME_KEY, "juan").await.unwrap();
        assert_eq!(Identity::load(&store).await.unwrap(), None);
        store.set_item(USER_ID_KEY, "").await.unwrap();
        assert_eq!(Identity::load(&store).await.unwrap(), None);
        store.set_item(USER_ID_KEY, "7").await.unwrap();
        assert_eq!(
            Identity::load(&store).await.unwrap(),
            Some(Identity::new("juan", "7"))
        );
    }

    #[test(tokio::test)]
    async fn memory_store_survives_poisoned_lock() {
        let store = MemoryIdentityStore::with_identity(&Identity::new("juan", "7"));
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _entries = store.0.lock().unwrap();
            panic!("panic while holding the identity lock");
        }));
        assert!(result.is_err());
        assert!(store.0.is_poisoned());

        assert_eq!(
            Identity::load(&store).await.unwrap(),
            Some(Identity::new("juan", "7"))
        );
        store.set_item(USER_ID_KEY, "8").await.unwrap();
        assert_eq!(
            Identity::load(&store).await.unwrap(),
            Some(Identity::new("juan", "8"))
        );
        store.clear().await.unwrap();
        assert_eq!(Identity::load(&store).await.unwrap(), None);
    }

    #[test(tokio::test)]
    async fn corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("identity.json");
        std::fs::write(&path, "not json").unwrap();
        let store = FileIdentityStore::new(&path);
        assert!(Identity::load(&store).await.is_err());
    }
}
