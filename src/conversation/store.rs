//! Tracks which log is active for each user.
//!
//! Logs live under `<dir>/<user>/chat-<dd-mm-yy-HH-MM-SS>.txt`. Starting a new
//! conversation abandons the previous file but never deletes it.

use super::log::{ConversationLog, FillerFilter};
use crate::config::Config;
use crate::error::{RelayError, Result};
use crate::user::UserKey;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use std::time::SystemTime;

const TIMESTAMP_FORMAT: &str = "%d-%m-%y-%H-%M-%S";
const MAX_NAME_ATTEMPTS: u32 = 100;

pub struct ConversationStore {
    dir: PathBuf,
    filter: FillerFilter,
    active: Mutex<HashMap<UserKey, PathBuf>>,
}

impl ConversationStore {
    pub fn new(dir: PathBuf, filter: FillerFilter) -> Self {
        Self {
            dir,
            filter,
            active: Mutex::new(HashMap::new()),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let filter = FillerFilter::new(config.conversation.filler_phrases.iter().cloned());
        Self::new(config.storage.chats_dir(), filter)
    }

    fn user_dir(&self, user: &UserKey) -> PathBuf {
        self.dir.join(user.as_str())
    }

    /// Create a fresh log for `user` and make it the active one.
    pub fn start(&self, user: &UserKey) -> Result<ConversationLog> {
        let user_dir = self.user_dir(user);
        std::fs::create_dir_all(&user_dir).map_err(|e| RelayError::storage(&user_dir, e))?;

        let stamp = chrono::Local::now().format(TIMESTAMP_FORMAT).to_string();
        let log = self.create_unique(&user_dir, &stamp)?;

        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(user.clone(), log.path().to_path_buf());

        tracing::info!("New chat log for {}: {}", user, log.path().display());
        Ok(log)
    }

    fn create_unique(&self, user_dir: &Path, stamp: &str) -> Result<ConversationLog> {
        let mut last_err = None;
        for attempt in 0..MAX_NAME_ATTEMPTS {
            let name = if attempt == 0 {
                format!("chat-{}.txt", stamp)
            } else {
                format!("chat-{}-{}.txt", stamp, attempt)
            };
            match ConversationLog::create(user_dir.join(name), self.filter.clone()) {
                Ok(log) => return Ok(log),
                Err(RelayError::Storage { path, source })
                    if source.kind() == std::io::ErrorKind::AlreadyExists =>
                {
                    last_err = Some(RelayError::Storage { path, source });
                }
                Err(e) => return Err(e),
            }
        }
        Err(last_err.unwrap_or_else(|| {
            RelayError::storage(user_dir, std::io::Error::other("no free log file name"))
        }))
    }

    /// The user's active log, if any.
    ///
    /// Falls back to the most recently modified log on disk so conversations
    /// survive a restart.
    pub fn active(&self, user: &UserKey) -> Option<ConversationLog> {
        let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(path) = active.get(user) {
            if path.is_file() {
                return Some(ConversationLog::open(path.clone(), self.filter.clone()));
            }
            tracing::warn!("Active chat log {} disappeared", path.display());
            active.remove(user);
        }

        let path = self.latest_on_disk(user)?;
        tracing::debug!("Resuming chat log for {}: {}", user, path.display());
        active.insert(user.clone(), path.clone());
        Some(ConversationLog::open(path, self.filter.clone()))
    }

    fn latest_on_disk(&self, user: &UserKey) -> Option<PathBuf> {
        let entries = std::fs::read_dir(self.user_dir(user)).ok()?;
        entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| {
                let name = entry.file_name();
                let name = name.to_string_lossy();
                name.starts_with("chat-") && name.ends_with(".txt")
            })
            .filter_map(|entry| {
                let meta = entry.metadata().ok()?;
                if !meta.is_file() {
                    return None;
                }
                let modified = meta.modified().unwrap_or(SystemTime::UNIX_EPOCH);
                Some((modified, entry.path()))
            })
            .max()
            .map(|(_, path)| path)
    }

    /// Every log file kept for `user`, oldest name first.
    pub fn list(&self, user: &UserKey) -> Vec<PathBuf> {
        let Ok(entries) = std::fs::read_dir(self.user_dir(user)) else {
            return Vec::new();
        };
        let mut paths: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().is_some_and(|ext| ext == "txt"))
            .collect();
        paths.sort();
        paths
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::Turn;
    use tempfile::TempDir;

    fn store(dir: &TempDir) -> ConversationStore {
        ConversationStore::new(dir.path().join("chats"), FillerFilter::default())
    }

    #[test]
    fn test_no_active_conversation_initially() {
        let dir = TempDir::new().unwrap();
        assert!(store(&dir).active(&UserKey::new("alice")).is_none());
    }

    #[test]
    fn test_start_makes_log_active() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let user = UserKey::new("alice");

        let log = store.start(&user).unwrap();
        let active = store.active(&user).unwrap();
        assert_eq!(active.path(), log.path());

        let name = log.path().file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("chat-"));
        assert!(name.ends_with(".txt"));
        assert!(log.path().starts_with(dir.path().join("chats").join("alice")));
    }

    #[test]
    fn test_new_chat_abandons_but_keeps_old_log() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let user = UserKey::new("alice");

        let first = store.start(&user).unwrap();
        first.append(&Turn::user("old")).unwrap();
        let second = store.start(&user).unwrap();

        assert_ne!(first.path(), second.path());
        assert!(first.path().exists());
        let active = store.active(&user).unwrap();
        assert_eq!(active.path(), second.path());
        assert!(active.reconstruct().unwrap().is_empty());
        assert_eq!(store.list(&user).len(), 2);
    }

    #[test]
    fn test_users_get_separate_logs() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let alice = UserKey::new("alice");
        let bob = UserKey::new("bob");

        store.start(&alice).unwrap().append(&Turn::user("from alice")).unwrap();
        assert!(store.active(&bob).is_none());

        store.start(&bob).unwrap();
        assert!(store.active(&bob).unwrap().reconstruct().unwrap().is_empty());
        assert_eq!(store.active(&alice).unwrap().reconstruct().unwrap().len(), 1);
    }

    #[test]
    fn test_resume_after_restart() {
        let dir = TempDir::new().unwrap();
        let user = UserKey::new("alice");
        let path = {
            let store = store(&dir);
            let log = store.start(&user).unwrap();
            log.append(&Turn::user("remember me")).unwrap();
            log.path().to_path_buf()
        };

        let reopened = store(&dir);
        let active = reopened.active(&user).unwrap();
        assert_eq!(active.path(), path);
        assert_eq!(active.reconstruct().unwrap(), vec![Turn::user("remember me")]);
    }

    #[test]
    fn test_deleted_active_log_is_forgotten() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let user = UserKey::new("alice");

        let log = store.start(&user).unwrap();
        std::fs::remove_file(log.path()).unwrap();
        assert!(store.active(&user).is_none());
    }
}
