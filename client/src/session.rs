use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use common::User;

use crate::api::ApiClient;

/// What survives between runs for a signed-in user.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Session {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub user: Option<User>,
    #[serde(default)]
    pub has_seen_language_selector: bool,
}

impl Session {
    pub fn is_authenticated(&self) -> bool {
        self.token.is_some() && self.user.is_some()
    }
}

pub trait SessionStore: Send + Sync {
    fn load(&self) -> Result<Session>;
    fn save(&self, session: &Session) -> Result<()>;
    fn clear(&self) -> Result<()>;
}

/// Session kept as a JSON document on disk.
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self) -> Result<Session> {
        if !self.path.exists() {
            return Ok(Session::default());
        }
        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read session file: {:?}", self.path))?;
        let session = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse session file: {:?}", self.path))?;
        Ok(session)
    }

    fn save(&self, session: &Session) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create session directory: {:?}", parent))?;
            }
        }
        let content = serde_json::to_string_pretty(session)?;
        fs::write(&self.path, content)
            .with_context(|| format!("Failed to write session file: {:?}", self.path))?;
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        if self.path.exists() {
            fs::remove_file(&self.path)
                .with_context(|| format!("Failed to remove session file: {:?}", self.path))?;
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct MemorySessionStore {
    session: Mutex<Session>,
}

impl SessionStore for MemorySessionStore {
    fn load(&self) -> Result<Session> {
        Ok(self.session.lock().map_err(|_| anyhow::anyhow!("session lock poisoned"))?.clone())
    }

    fn save(&self, session: &Session) -> Result<()> {
        *self.session.lock().map_err(|_| anyhow::anyhow!("session lock poisoned"))? = session.clone();
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self.session.lock().map_err(|_| anyhow::anyhow!("session lock poisoned"))? = Session::default();
        Ok(())
    }
}

/// Reads the stored session, treating an unreadable one as signed out.
fn load_readable(store: &dyn SessionStore) -> Option<Session> {
    match store.load() {
        Ok(session) => Some(session),
        Err(e) => {
            log::warn!("Ignoring unreadable session: {:#}", e);
            None
        }
    }
}

/// Stores the credentials and starts sending the token.
pub fn login(store: &dyn SessionStore, api: &mut ApiClient, token: String, user: User) -> Result<Session> {
    let mut session = load_readable(store).unwrap_or_default();
    session.token = Some(token.clone());
    session.user = Some(user);
    store.save(&session)?;
    api.set_token(Some(token));
    log::info!("Signed in; session saved");
    Ok(session)
}

/// Forgets the credentials but keeps device preferences. An unreadable
/// session is removed outright.
pub fn logout(store: &dyn SessionStore, api: &mut ApiClient) -> Result<()> {
    match load_readable(store) {
        Some(mut session) => {
            session.token = None;
            session.user = None;
            store.save(&session)?;
        }
        None => store.clear()?,
    }
    api.set_token(None);
    log::info!("Signed out");
    Ok(())
}

/// Reapplies a stored token to the client. Half-written and unreadable
/// sessions are ignored.
pub fn restore(store: &dyn SessionStore, api: &mut ApiClient) -> Result<Session> {
    let session = load_readable(store).unwrap_or_default();
    if session.is_authenticated() {
        api.set_token(session.token.clone());
    } else if session.token.is_some() {
        log::warn!("Stored session has a token but no user, ignoring it");
    }
    Ok(session)
}
