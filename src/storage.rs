//! File Store - Persistent Key/Value File Table
//!
//! Files are flat `path -> content` records; users are `username ->
//! password hash` records in a separate table. The shell never sees storage
//! errors: failures are logged here and reported as `false` / `None`.

use anyhow::{Context, Result};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::path::Path;

/// Storage collaborator used by the dispatcher and the mini-apps.
pub trait FileStore: Send + Sync {
    /// Create or overwrite a file.
    fn write_file(&self, path: &str, content: &str) -> bool;

    fn read_file(&self, path: &str) -> Option<String>;

    /// `false` when the file did not exist.
    fn delete_file(&self, path: &str) -> bool;

    /// All paths, lexicographically ordered.
    fn list_files(&self) -> Vec<String>;

    /// Add a user record. `false` when the name is taken.
    fn create_user(&self, username: &str, password_hash: &str) -> bool;

    fn password_hash(&self, username: &str) -> Option<String>;

    fn user_count(&self) -> usize;
}

const FILES_TREE: &str = "files";
const USERS_TREE: &str = "users";

/// sled-backed store
pub struct SledStore {
    db: sled::Db,
    files: sled::Tree,
    users: sled::Tree,
}

impl SledStore {
    pub fn open(db_path: &Path) -> Result<Self> {
        log::info!("Opening file store at {}", db_path.display());

        let db = sled::open(db_path).context("Failed to open sled database")?;
        let files = db
            .open_tree(FILES_TREE)
            .context("Failed to open files tree")?;
        let users = db
            .open_tree(USERS_TREE)
            .context("Failed to open users tree")?;

        log::info!(
            "File store ready ({} files, {} users)",
            files.len(),
            users.len()
        );
        Ok(Self { db, files, users })
    }

    fn try_write(&self, path: &str, content: &str) -> Result<()> {
        self.files
            .insert(path.as_bytes(), content.as_bytes())
            .context("Failed to insert into database")?;
        self.files.flush().context("Failed to flush database")?;
        Ok(())
    }

    fn try_read(&self, path: &str) -> Result<Option<String>> {
        let value = self
            .files
            .get(path.as_bytes())
            .context("Failed to read from database")?;

        Ok(value.map(|bytes| String::from_utf8_lossy(&bytes).into_owned()))
    }

    fn try_delete(&self, path: &str) -> Result<bool> {
        let removed = self
            .files
            .remove(path.as_bytes())
            .context("Failed to delete from database")?;
        self.files.flush().context("Failed to flush database")?;
        Ok(removed.is_some())
    }

    fn try_list(&self) -> Result<Vec<String>> {
        let mut paths = Vec::new();
        for key in self.files.iter().keys() {
            let key = key.context("Failed to iterate database")?;
            paths.push(String::from_utf8_lossy(&key).into_owned());
        }
        Ok(paths)
    }

    fn try_create_user(&self, username: &str, password_hash: &str) -> Result<bool> {
        let swapped = self
            .users
            .compare_and_swap(
                username.as_bytes(),
                None as Option<&[u8]>,
                Some(password_hash.as_bytes()),
            )
            .context("Failed to insert user")?;
        self.users.flush().context("Failed to flush database")?;
        Ok(swapped.is_ok())
    }

    fn try_password_hash(&self, username: &str) -> Result<Option<String>> {
        let value = self
            .users
            .get(username.as_bytes())
            .context("Failed to read user")?;

        Ok(value.map(|bytes| String::from_utf8_lossy(&bytes).into_owned()))
    }
}

impl FileStore for SledStore {
    fn write_file(&self, path: &str, content: &str) -> bool {
        match self.try_write(path, content) {
            Ok(()) => true,
            Err(e) => {
                log::warn!("write_file({path}) failed: {e:#}");
                false
            }
        }
    }

    fn read_file(&self, path: &str) -> Option<String> {
        self.try_read(path).unwrap_or_else(|e| {
            log::warn!("read_file({path}) failed: {e:#}");
            None
        })
    }

    fn delete_file(&self, path: &str) -> bool {
        self.try_delete(path).unwrap_or_else(|e| {
            log::warn!("delete_file({path}) failed: {e:#}");
            false
        })
    }

    fn list_files(&self) -> Vec<String> {
        self.try_list().unwrap_or_else(|e| {
            log::warn!("list_files failed: {e:#}");
            Vec::new()
        })
    }

    fn create_user(&self, username: &str, password_hash: &str) -> bool {
        self.try_create_user(username, password_hash)
            .unwrap_or_else(|e| {
                log::warn!("create_user({username}) failed: {e:#}");
                false
            })
    }

    fn password_hash(&self, username: &str) -> Option<String> {
        self.try_password_hash(username).unwrap_or_else(|e| {
            log::warn!("password_hash({username}) failed: {e:#}");
            None
        })
    }

    fn user_count(&self) -> usize {
        self.users.len()
    }
}

impl Drop for SledStore {
    fn drop(&mut self) {
        if let Err(e) = self.db.flush() {
            log::warn!("Failed to flush file store on drop: {e}");
        }
    }
}

/// In-memory store for tests and ephemeral sessions
#[derive(Default)]
pub struct MemoryStore {
    files: RwLock<BTreeMap<String, String>>,
    users: RwLock<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FileStore for MemoryStore {
    fn write_file(&self, path: &str, content: &str) -> bool {
        self.files.write().insert(path.to_string(), content.to_string());
        true
    }

    fn read_file(&self, path: &str) -> Option<String> {
        self.files.read().get(path).cloned()
    }

    fn delete_file(&self, path: &str) -> bool {
        self.files.write().remove(path).is_some()
    }

    fn list_files(&self) -> Vec<String> {
        self.files.read().keys().cloned().collect()
    }

    fn create_user(&self, username: &str, password_hash: &str) -> bool {
        let mut users = self.users.write();
        if users.contains_key(username) {
            return false;
        }
        users.insert(username.to_string(), password_hash.to_string());
        true
    }

    fn password_hash(&self, username: &str) -> Option<String> {
        self.users.read().get(username).cloned()
    }

    fn user_count(&self) -> usize {
        self.users.read().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn exercise(store: &dyn FileStore) {
        assert!(store.list_files().is_empty());

        assert!(store.write_file("b.txt", "bee"));
        assert!(store.write_file("a.txt", "ay"));
        assert_eq!(store.read_file("a.txt").as_deref(), Some("ay"));
        assert_eq!(store.list_files(), vec!["a.txt", "b.txt"]);

        assert!(store.write_file("a.txt", "overwritten"));
        assert_eq!(store.read_file("a.txt").as_deref(), Some("overwritten"));

        assert!(store.delete_file("a.txt"));
        assert!(!store.delete_file("a.txt"));
        assert_eq!(store.read_file("a.txt"), None);
        assert_eq!(store.list_files(), vec!["b.txt"]);

        assert_eq!(store.user_count(), 0);
        assert!(store.create_user("ada", "h1"));
        assert!(!store.create_user("ada", "h2"));
        assert_eq!(store.password_hash("ada").as_deref(), Some("h1"));
        assert_eq!(store.password_hash("bob"), None);
        assert_eq!(store.user_count(), 1);
        assert_eq!(store.list_files(), vec!["b.txt"]);
    }

    #[test]
    fn test_memory_store() {
        exercise(&MemoryStore::new());
    }

    #[test]
    fn test_sled_store() {
        let dir = TempDir::new().unwrap();
        let store = SledStore::open(&dir.path().join("db")).unwrap();
        exercise(&store);
    }

    #[test]
    fn test_sled_store_persists() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("db");

        {
            let store = SledStore::open(&path).unwrap();
            assert!(store.write_file("todo.txt", "ship it"));
            assert!(store.create_user("ada", "hash"));
        }

        let store = SledStore::open(&path).unwrap();
        assert_eq!(store.read_file("todo.txt").as_deref(), Some("ship it"));
        assert_eq!(store.password_hash("ada").as_deref(), Some("hash"));
        assert_eq!(store.list_files(), vec!["todo.txt"]);
    }

    #[test]
    fn test_empty_content() {
        let store = MemoryStore::new();
        assert!(store.write_file("empty", ""));
        assert_eq!(store.read_file("empty").as_deref(), Some(""));
    }
}
