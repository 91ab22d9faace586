//! Credential persistence using a local JSON file.
//!
//! The file maps service name to profile name to [`Credential`], so several
//! services and several signed-in accounts can share one cache:
//!
//! ```json
//! { "msgraph": { "default": { "accessToken": "...", ... } } }
//! ```
//!
//! Every mutation is a whole-file read-modify-write guarded by an advisory
//! lock on a sidecar `.lock` file, so concurrent invocations cannot clobber
//! each other's writes. A file that exists but fails to parse is a hard
//! error; silently starting over would drop refresh tokens.

mod credential;

pub use credential::Credential;

use std::collections::BTreeMap;
use std::env;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use tracing::debug;

use crate::error::StoreError;

/// Credentials file name inside the config directory.
const CREDENTIALS_FILE: &str = "credentials.json";

/// Service name to profile name to credential.
type CredentialMap = BTreeMap<String, BTreeMap<String, Credential>>;

/// File-based credential store at `~/.config/mgraph/credentials.json`.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    /// Create a store at the default location.
    ///
    /// `MGRAPH_CREDENTIALS_PATH` overrides the location when set.
    pub fn new() -> Result<Self, StoreError> {
        let path = match env::var_os("MGRAPH_CREDENTIALS_PATH") {
            Some(p) => PathBuf::from(p),
            None => ProjectDirs::from("", "", "mgraph")
                .ok_or(StoreError::NoConfigDir)?
                .config_dir()
                .join(CREDENTIALS_FILE),
        };
        Ok(Self { path })
    }

    /// Create a store at a specific path (useful for testing).
    pub fn with_path(path: PathBuf) -> Self {
        Self { path }
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Look up the credential for a service/profile pair.
    pub fn get(&self, service: &str, profile: &str) -> Result<Option<Credential>, StoreError> {
        if !self.path.exists() {
            return Ok(None);
        }

        let mut lock = self.open_lock()?;
        let _guard = lock.read().map_err(|e| self.lock_failed(e))?;

        let map = self.read_map()?;
        Ok(map
            .get(service)
            .and_then(|profiles| profiles.get(profile))
            .cloned())
    }

    /// Insert or replace the credential for a service/profile pair.
    pub fn set(
        &self,
        service: &str,
        profile: &str,
        credential: &Credential,
    ) -> Result<(), StoreError> {
        let mut lock = self.open_lock()?;
        let _guard = lock.write().map_err(|e| self.lock_failed(e))?;

        let mut map = self.read_map()?;
        map.entry(service.to_string())
            .or_default()
            .insert(profile.to_string(), credential.clone());
        self.write_map(&map)?;

        debug!("Saved credential for {}/{} to {:?}", service, profile, self.path);
        Ok(())
    }

    /// Remove the credential for a service/profile pair.
    ///
    /// Returns whether a credential was removed; removing a profile that
    /// does not exist is not an error.
    pub fn delete(&self, service: &str, profile: &str) -> Result<bool, StoreError> {
        if !self.path.exists() {
            return Ok(false);
        }

        let mut lock = self.open_lock()?;
        let _guard = lock.write().map_err(|e| self.lock_failed(e))?;

        let mut map = self.read_map()?;
        let removed = map
            .get_mut(service)
            .and_then(|profiles| profiles.remove(profile))
            .is_some();
        if map.get(service).is_some_and(|profiles| profiles.is_empty()) {
            map.remove(service);
        }

        if removed {
            self.write_map(&map)?;
            debug!("Deleted credential for {}/{}", service, profile);
        }
        Ok(removed)
    }

    /// Profile names stored under a service, sorted.
    pub fn list_profiles(&self, service: &str) -> Result<Vec<String>, StoreError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let mut lock = self.open_lock()?;
        let _guard = lock.read().map_err(|e| self.lock_failed(e))?;

        let map = self.read_map()?;
        Ok(map
            .get(service)
            .map(|profiles| profiles.keys().cloned().collect())
            .unwrap_or_default())
    }

    /// Open the sidecar lock file, creating parent directories as needed.
    fn open_lock(&self) -> Result<fd_lock::RwLock<File>, StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| StoreError::WriteFailed {
                path: self.path.clone(),
                source: e,
            })?;
        }

        let lock_path = self.path.with_extension("lock");
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(&lock_path)
            .map_err(|e| self.lock_failed(e))?;
        Ok(fd_lock::RwLock::new(file))
    }

    fn lock_failed(&self, source: io::Error) -> StoreError {
        StoreError::LockFailed {
            path: self.path.clone(),
            source,
        }
    }

    fn read_map(&self) -> Result<CredentialMap, StoreError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(CredentialMap::new()),
            Err(e) => {
                return Err(StoreError::ReadFailed {
                    path: self.path.clone(),
                    source: e,
                })
            }
        };

        serde_json::from_str(&content).map_err(|e| StoreError::Malformed {
            path: self.path.clone(),
            source: e,
        })
    }

    fn write_map(&self, map: &CredentialMap) -> Result<(), StoreError> {
        let content = serde_json::to_string_pretty(map).map_err(|e| StoreError::WriteFailed {
            path: self.path.clone(),
            source: io::Error::new(io::ErrorKind::InvalidData, e),
        })?;

        fs::write(&self.path, content).map_err(|e| StoreError::WriteFailed {
            path: self.path.clone(),
            source: e,
        })?;

        // Tokens are secrets; keep the file owner-only on Unix.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&self.path, fs::Permissions::from_mode(0o600)).map_err(|e| {
                StoreError::WriteFailed {
                    path: self.path.clone(),
                    source: e,
                }
            })?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use tempfile::TempDir;

    fn test_store() -> (TempDir, CredentialStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = CredentialStore::with_path(dir.path().join("credentials.json"));
        (dir, store)
    }

    fn test_credential(account: &str) -> Credential {
        Credential {
            access_token: format!("at-{account}"),
            refresh_token: Some(format!("rt-{account}")),
            expires_at: Utc::now() + Duration::hours(1),
            account: account.into(),
            scopes: vec!["Mail.Read".into()],
            client_id: None,
            tenant_id: None,
        }
    }

    #[test]
    fn test_set_get_roundtrip() {
        let (_dir, store) = test_store();
        let cred = test_credential("user@example.com");

        store.set("msgraph", "default", &cred).unwrap();
        let loaded = store.get("msgraph", "default").unwrap();
        assert_eq!(loaded, Some(cred));
    }

    #[test]
    fn test_get_missing_file_is_none() {
        let (_dir, store) = test_store();
        assert_eq!(store.get("msgraph", "default").unwrap(), None);
    }

    #[test]
    fn test_get_unknown_profile_is_none() {
        let (_dir, store) = test_store();
        store
            .set("msgraph", "work", &test_credential("a@example.com"))
            .unwrap();

        assert_eq!(store.get("msgraph", "default").unwrap(), None);
        assert_eq!(store.get("other-service", "work").unwrap(), None);
    }

    #[test]
    fn test_profiles_are_independent() {
        let (_dir, store) = test_store();
        let work = test_credential("work@example.com");
        let home = test_credential("home@example.com");

        store.set("msgraph", "work", &work).unwrap();
        store.set("msgraph", "home", &home).unwrap();

        assert_eq!(store.get("msgraph", "work").unwrap(), Some(work));
        assert_eq!(store.get("msgraph", "home").unwrap(), Some(home));
        assert_eq!(
            store.list_profiles("msgraph").unwrap(),
            vec!["home".to_string(), "work".to_string()]
        );
    }

    #[test]
    fn test_set_replaces_existing() {
        let (_dir, store) = test_store();
        store
            .set("msgraph", "default", &test_credential("old@example.com"))
            .unwrap();

        let newer = test_credential("new@example.com");
        store.set("msgraph", "default", &newer).unwrap();

        assert_eq!(store.get("msgraph", "default").unwrap(), Some(newer));
        assert_eq!(store.list_profiles("msgraph").unwrap().len(), 1);
    }

    #[test]
    fn test_delete_missing_reports_not_found() {
        let (_dir, store) = test_store();
        // No file at all.
        assert!(!store.delete("msgraph", "default").unwrap());

        // File exists, profile does not.
        store
            .set("msgraph", "work", &test_credential("a@example.com"))
            .unwrap();
        assert!(!store.delete("msgraph", "nope").unwrap());
        assert_eq!(store.list_profiles("msgraph").unwrap(), vec!["work"]);
    }

    #[test]
    fn test_delete_removes_profile() {
        let (_dir, store) = test_store();
        store
            .set("msgraph", "work", &test_credential("a@example.com"))
            .unwrap();
        store
            .set("msgraph", "home", &test_credential("b@example.com"))
            .unwrap();

        assert!(store.delete("msgraph", "work").unwrap());
        assert_eq!(store.get("msgraph", "work").unwrap(), None);
        assert_eq!(store.list_profiles("msgraph").unwrap(), vec!["home"]);
    }

    #[test]
    fn test_malformed_file_is_hard_error() {
        let (_dir, store) = test_store();
        fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        fs::write(store.path(), "{ not json").unwrap();

        assert!(matches!(
            store.get("msgraph", "default"),
            Err(StoreError::Malformed { .. })
        ));
        assert!(matches!(
            store.set("msgraph", "default", &test_credential("x@example.com")),
            Err(StoreError::Malformed { .. })
        ));
        assert!(matches!(
            store.list_profiles("msgraph"),
            Err(StoreError::Malformed { .. })
        ));
    }

    #[test]
    fn test_file_shape_nests_service_then_profile() {
        let (_dir, store) = test_store();
        store
            .set("msgraph", "default", &test_credential("u@example.com"))
            .unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(store.path()).unwrap()).unwrap();
        assert!(raw["msgraph"]["default"]["accessToken"].is_string());
    }

    #[cfg(unix)]
    #[test]
    fn test_file_permissions_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let (_dir, store) = test_store();
        store
            .set("msgraph", "default", &test_credential("u@example.com"))
            .unwrap();

        let mode = fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
