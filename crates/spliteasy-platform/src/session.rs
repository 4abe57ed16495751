use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use spliteasy_core::{AuthSession, HouseholdId, Role, UserId};
use tracing::{debug, info, warn};

const TOKEN_KEY: &str = "session.token";
const ROLE_KEY: &str = "session.role";
const USER_KEY: &str = "session.user_id";
const HOUSEHOLD_KEY: &str = "session.active_household_id";
const SESSION_PREFIX: &str = "session.";
const PREFERENCE_PREFIX: &str = "prefs.";

/// Small key-value file kept on the device. Reads see the last write; a
/// missing file is an empty store.
#[derive(Debug, Clone)]
pub struct LocalStore {
    path: PathBuf,
    entries: BTreeMap<String, Value>,
}

impl LocalStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let entries = match fs::read(&path) {
            Ok(bytes) if bytes.is_empty() => BTreeMap::new(),
            Ok(bytes) => serde_json::from_slice(&bytes)
                .with_context(|| format!("{} is not a valid state file", path.display()))?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(err) => {
                return Err(err).with_context(|| format!("failed to read {}", path.display()));
            }
        };
        debug!(path = %path.display(), keys = entries.len(), "local store opened");
        Ok(Self { path, entries })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A value of the wrong shape reads as absent and is logged.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.entries.get(key)?;
        match serde_json::from_value(value.clone()) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!(
                    key,
                    path = %self.path.display(),
                    "stored value has unexpected shape: {err}"
                );
                None
            }
        }
    }

    pub fn set<T: Serialize>(&mut self, key: &str, value: &T) -> Result<()> {
        self.put(key, value)?;
        self.flush()
    }

    fn put<T: Serialize>(&mut self, key: &str, value: &T) -> Result<()> {
        let value = serde_json::to_value(value).with_context(|| format!("cannot store {key}"))?;
        self.entries.insert(key.to_string(), value);
        Ok(())
    }

    pub fn remove(&mut self, key: &str) -> Result<bool> {
        let removed = self.entries.remove(key).is_some();
        if removed {
            self.flush()?;
        }
        Ok(removed)
    }

    pub fn keys_with_prefix<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.entries
            .range(prefix.to_string()..)
            .take_while(move |(key, _)| key.starts_with(prefix))
            .map(|(key, _)| key.as_str())
    }

    /// In memory only; returns whether anything was dropped.
    fn drop_prefix(&mut self, prefix: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|key, _| !key.starts_with(prefix));
        self.entries.len() != before
    }

    fn flush(&self) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let serialized = serde_json::to_vec_pretty(&self.entries)?;
        let staging = self.path.with_extension("json.tmp");
        fs::write(&staging, serialized)
            .with_context(|| format!("failed to write {}", staging.display()))?;
        fs::rename(&staging, &self.path)
            .with_context(|| format!("failed to replace {}", self.path.display()))?;
        Ok(())
    }

    pub fn preference(&self, name: &str) -> Option<String> {
        self.get(&format!("{PREFERENCE_PREFIX}{name}"))
    }

    pub fn set_preference(&mut self, name: &str, value: &str) -> Result<()> {
        self.set(&format!("{PREFERENCE_PREFIX}{name}"), &value)
    }

    pub fn remove_preference(&mut self, name: &str) -> Result<bool> {
        self.remove(&format!("{PREFERENCE_PREFIX}{name}"))
    }

    pub fn preferences(&self) -> Vec<(String, String)> {
        self.keys_with_prefix(PREFERENCE_PREFIX)
            .filter_map(|key| {
                let value: String = self.get(key)?;
                Some((key.trim_start_matches(PREFERENCE_PREFIX).to_string(), value))
            })
            .collect()
    }
}

/// Signed-in state. Owned by whoever drives a flow and handed to the parts
/// that need it; it lives from login until logout.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub token: Option<String>,
    pub role: Option<Role>,
    pub user_id: Option<UserId>,
    pub active_household_id: Option<HouseholdId>,
}

impl Session {
    pub fn sign_in(auth: &AuthSession) -> Self {
        Self {
            token: Some(auth.token.clone()),
            role: Some(auth.role),
            user_id: Some(auth.user_id),
            active_household_id: None,
        }
    }

    pub fn load(store: &LocalStore) -> Self {
        Self {
            token: store.get(TOKEN_KEY),
            role: store.get(ROLE_KEY),
            user_id: store.get(USER_KEY),
            active_household_id: store.get(HOUSEHOLD_KEY),
        }
    }

    /// Replaces every session key and writes the file once.
    pub fn save(&self, store: &mut LocalStore) -> Result<()> {
        let mut staged = store.clone();
        staged.drop_prefix(SESSION_PREFIX);
        if let Some(token) = &self.token {
            staged.put(TOKEN_KEY, token)?;
        }
        if let Some(role) = self.role {
            staged.put(ROLE_KEY, &role)?;
        }
        if let Some(user_id) = self.user_id {
            staged.put(USER_KEY, &user_id)?;
        }
        if let Some(household_id) = self.active_household_id {
            staged.put(HOUSEHOLD_KEY, &household_id)?;
        }
        staged.flush()?;
        *store = staged;
        info!(user_id = ?self.user_id, "session saved");
        Ok(())
    }

    /// Logout: drops the session keys and keeps preferences.
    pub fn clear(store: &mut LocalStore) -> Result<()> {
        if store.drop_prefix(SESSION_PREFIX) {
            store.flush()?;
        }
        info!("session cleared");
        Ok(())
    }

    pub fn is_signed_in(&self) -> bool {
        self.token.is_some() && self.user_id.is_some()
    }

    pub fn is_representative(&self) -> bool {
        self.role == Some(Role::Representative)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn auth() -> AuthSession {
        AuthSession {
            token: "t0k3n".to_string(),
            role: Role::Representative,
            user_id: UserId(3),
        }
    }

    #[test]
    fn missing_file_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::open(dir.path().join("state.json")).unwrap();
        assert_eq!(Session::load(&store), Session::default());
    }

    #[test]
    fn session_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("state.json");
        let mut store = LocalStore::open(&path).unwrap();
        let mut session = Session::sign_in(&auth());
        session.active_household_id = Some(HouseholdId(9));
        session.save(&mut store).unwrap();

        let reopened = LocalStore::open(&path).unwrap();
        let loaded = Session::load(&reopened);
        assert_eq!(loaded, session);
        assert!(loaded.is_signed_in());
        assert!(loaded.is_representative());
    }

    #[test]
    fn logout_keeps_preferences() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        let mut store = LocalStore::open(&path).unwrap();
        Session::sign_in(&auth()).save(&mut store).unwrap();
        store.set_preference("language", "es").unwrap();

        Session::clear(&mut store).unwrap();

        let reopened = LocalStore::open(&path).unwrap();
        assert!(!Session::load(&reopened).is_signed_in());
        assert_eq!(reopened.preference("language").as_deref(), Some("es"));
        assert_eq!(
            reopened.preferences(),
            vec![("language".to_string(), "es".to_string())]
        );
    }

    #[test]
    fn removed_preference_stays_removed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        let mut store = LocalStore::open(&path).unwrap();
        store.set_preference("theme", "dark").unwrap();

        assert!(store.remove_preference("theme").unwrap());
        assert!(!store.remove_preference("theme").unwrap());
        assert_eq!(LocalStore::open(&path).unwrap().preference("theme"), None);
    }

    #[test]
    fn saving_a_smaller_session_drops_stale_keys() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = LocalStore::open(dir.path().join("state.json")).unwrap();
        let mut session = Session::sign_in(&auth());
        session.active_household_id = Some(HouseholdId(1));
        session.save(&mut store).unwrap();

        session.active_household_id = None;
        session.save(&mut store).unwrap();
        assert_eq!(Session::load(&store).active_household_id, None);
    }

    #[test]
    fn failed_save_leaves_the_previous_session() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        let mut store = LocalStore::open(&path).unwrap();
        Session::sign_in(&auth()).save(&mut store).unwrap();

        // A directory where the staging file goes makes the write fail.
        fs::create_dir(path.with_extension("json.tmp")).unwrap();
        let mut other = Session::sign_in(&auth());
        other.user_id = Some(UserId(8));
        other.active_household_id = Some(HouseholdId(2));
        assert!(other.save(&mut store).is_err());

        assert_eq!(Session::load(&store), Session::sign_in(&auth()));
        let reopened = LocalStore::open(&path).unwrap();
        assert_eq!(Session::load(&reopened), Session::sign_in(&auth()));
    }

    #[test]
    fn saved_session_is_written_whole() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        let mut store = LocalStore::open(&path).unwrap();
        let mut session = Session::sign_in(&auth());
        session.active_household_id = Some(HouseholdId(9));
        session.save(&mut store).unwrap();

        let on_disk: BTreeMap<String, Value> =
            serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
        let keys: Vec<&str> = on_disk.keys().map(String::as_str).collect();
        assert_eq!(keys, vec![HOUSEHOLD_KEY, ROLE_KEY, TOKEN_KEY, USER_KEY]);
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn value_of_the_wrong_shape_reads_as_absent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        fs::write(
            &path,
            br#"{"session.token":"t0k3n","session.role":5,"session.user_id":"three"}"#,
        )
        .unwrap();
        let store = LocalStore::open(&path).unwrap();

        let session = Session::load(&store);
        assert_eq!(session.token.as_deref(), Some("t0k3n"));
        assert_eq!(session.role, None);
        assert_eq!(session.user_id, None);
        assert!(!session.is_signed_in());
    }

    #[test]
    fn corrupt_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, b"{not json").unwrap();
        let err = LocalStore::open(&path).unwrap_err();
        assert!(err.to_string().contains("not a valid state file"));
    }
}
