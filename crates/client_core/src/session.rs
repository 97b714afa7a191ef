//! Signed-in state, constructed explicitly and shared by reference with
//! whatever needs the current user or bearer token.

use std::{
    fs,
    path::{Path, PathBuf},
    sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use anyhow::{Context, Result};
use shared::{domain::User, error::ApiException, protocol::Credentials};
use tracing::{debug, info, warn};
use zeroize::Zeroize;

use crate::AuthApi;

const LOGIN_FAILED: &str = "Login failed";

/// Where the access token survives between runs.
pub trait TokenStore: Send + Sync {
    fn load(&self) -> Result<Option<String>>;
    fn save(&self, token: &str) -> Result<()>;
    fn clear(&self) -> Result<()>;
}

pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> Result<Option<String>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read token file '{}'", self.path.display()))?;
        let token = raw.trim();
        Ok((!token.is_empty()).then(|| token.to_string()))
    }

    fn save(&self, token: &str) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).with_context(|| {
                format!("failed to create token directory '{}'", parent.display())
            })?;
        }
        fs::write(&self.path, token)
            .with_context(|| format!("failed to write token file '{}'", self.path.display()))
    }

    fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err)
                .with_context(|| format!("failed to remove token file '{}'", self.path.display())),
        }
    }
}

#[derive(Default)]
pub struct MemoryTokenStore {
    token: Mutex<Option<String>>,
}

impl MemoryTokenStore {
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Mutex::new(Some(token.into())),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> Result<Option<String>> {
        Ok(self
            .token
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn save(&self, token: &str) -> Result<()> {
        *self.token.lock().unwrap_or_else(PoisonError::into_inner) = Some(token.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        if let Some(mut token) = self
            .token
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            token.zeroize();
        }
        Ok(())
    }
}

#[derive(Default)]
struct SessionState {
    token: Option<String>,
    user: Option<User>,
    last_error: Option<String>,
}

impl SessionState {
    fn sign_out(&mut self) {
        if let Some(mut token) = self.token.take() {
            token.zeroize();
        }
        self.user = None;
    }
}

pub struct Session {
    auth: Arc<dyn AuthApi>,
    store: Box<dyn TokenStore>,
    state: RwLock<SessionState>,
}

impl Session {
    pub fn new(auth: Arc<dyn AuthApi>, store: Box<dyn TokenStore>) -> Self {
        Self {
            auth,
            store,
            state: RwLock::new(SessionState::default()),
        }
    }

    /// Restores a previous sign-in from the token store. A stored token the
    /// backend no longer accepts is discarded.
    pub async fn init(&self) -> bool {
        let stored = match self.store.load() {
            Ok(stored) => stored,
            Err(err) => {
                warn!("session: failed to read stored token: {err:#}");
                None
            }
        };
        let Some(token) = stored else {
            debug!("session: no stored token");
            return false;
        };

        match self.auth.current_user(&token).await {
            Ok(user) => {
                info!(user_id = user.id.0, username = %user.username, "session: restored");
                let mut state = self.write();
                state.token = Some(token);
                state.user = Some(user);
                state.last_error = None;
                true
            }
            Err(err) => {
                warn!("session: stored token rejected: {err:#}");
                if let Err(err) = self.store.clear() {
                    warn!("session: failed to clear stored token: {err:#}");
                }
                self.write().sign_out();
                false
            }
        }
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<User> {
        self.write().last_error = None;
        let credentials = Credentials {
            username: username.to_string(),
            password: password.to_string(),
        };

        let result = async {
            let tokens = self.auth.obtain_token(&credentials).await?;
            let user = self.auth.current_user(&tokens.access).await?;
            self.store.save(&tokens.access)?;
            Ok::<_, anyhow::Error>((tokens.access, user))
        }
        .await;

        match result {
            Ok((token, user)) => {
                info!(user_id = user.id.0, username = %user.username, "session: signed in");
                let mut state = self.write();
                state.token = Some(token);
                state.user = Some(user.clone());
                Ok(user)
            }
            Err(err) => {
                let message = err
                    .downcast_ref::<ApiException>()
                    .map(|api| api.message.clone())
                    .unwrap_or_else(|| LOGIN_FAILED.to_string());
                warn!(username, "session: login failed: {err:#}");
                self.write().last_error = Some(message);
                Err(err)
            }
        }
    }

    /// Tokens are stateless on the backend, so signing out only forgets
    /// them locally. Always leaves the session signed out.
    pub fn logout(&self) {
        if let Err(err) = self.store.clear() {
            warn!("session: failed to clear stored token: {err:#}");
        }
        let mut state = self.write();
        state.sign_out();
        state.last_error = None;
        info!("session: signed out");
    }

    pub fn is_authenticated(&self) -> bool {
        let state = self.read();
        state.token.is_some() && state.user.is_some()
    }

    pub fn user(&self) -> Option<User> {
        self.read().user.clone()
    }

    pub fn token(&self) -> Option<String> {
        self.read().token.clone()
    }

    pub fn last_error(&self) -> Option<String> {
        self.read().last_error.clone()
    }

    fn read(&self) -> RwLockReadGuard<'_, SessionState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, SessionState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
