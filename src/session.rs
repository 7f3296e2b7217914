//! The authentication gate, and the ways to persist its credential

use std::fmt::{Debug, Formatter};
use std::path::{Path, PathBuf};
use std::error::Error as StdError;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::traits::{AuthService, SessionStore};

/// The message shown to users whose login has been refused
pub const LOGIN_REJECTED_MESSAGE: &str = "Invalid credentials. Please try again.";

/// A bearer token
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    token: String,
}

impl Credential {
    pub fn new<S: ToString>(token: S) -> Self {
        Self { token: token.to_string() }
    }

    pub fn token(&self) -> &str {
        &self.token
    }
}

impl Debug for Credential {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Credential(<redacted>)")
    }
}


/// A [`SessionStore`] that does not outlive the process
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    credential: Mutex<Option<Credential>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_credential(credential: Credential) -> Self {
        Self { credential: Mutex::new(Some(credential)) }
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self) -> Option<Credential> {
        self.credential.lock().unwrap().clone()
    }

    fn set(&self, credential: &Credential) -> Result<()> {
        *self.credential.lock().unwrap() = Some(credential.clone());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self.credential.lock().unwrap() = None;
        Ok(())
    }
}


/// A [`SessionStore`] that keeps its credential in a JSON file
#[derive(Debug)]
pub struct FileSessionStore {
    backing_file: PathBuf,
    credential: Mutex<Option<Credential>>,
}

impl FileSessionStore {
    /// Initialize a store from the content of its backing file.
    ///
    /// A missing file means there is no credential yet. A file that cannot be read or parsed is an error.
    pub fn from_file(path: &Path) -> std::result::Result<Self, Box<dyn StdError>> {
        let credential = match std::fs::File::open(path) {
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => None,
            Err(err) => {
                return Err(format!("Unable to open file {:?}: {}", path, err).into());
            },
            Ok(file) => Some(serde_json::from_reader(file)?),
        };

        Ok(Self {
            backing_file: PathBuf::from(path),
            credential: Mutex::new(credential),
        })
    }

    /// Initialize an empty store. Nothing is written until a credential is set
    pub fn new(path: &Path) -> Self {
        Self {
            backing_file: PathBuf::from(path),
            credential: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.backing_file
    }

    fn save_to_file(&self, credential: &Credential) -> Result<()> {
        if let Some(parent) = self.backing_file.parent() {
            if parent.as_os_str().is_empty() == false {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = std::fs::File::create(&self.backing_file)?;
        serde_json::to_writer(file, credential)
            .map_err(|err| Error::Session(format!("Unable to serialize: {}", err)))
    }
}

impl SessionStore for FileSessionStore {
    fn get(&self) -> Option<Credential> {
        self.credential.lock().unwrap().clone()
    }

    fn set(&self, credential: &Credential) -> Result<()> {
        self.save_to_file(credential)?;
        *self.credential.lock().unwrap() = Some(credential.clone());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self.credential.lock().unwrap() = None;
        match std::fs::remove_file(&self.backing_file) {
            Err(err) if err.kind() != std::io::ErrorKind::NotFound => Err(err.into()),
            _ => Ok(()),
        }
    }
}



/// Whether we hold a credential
#[derive(Clone, Debug, PartialEq)]
pub enum AuthState {
    Anonymous,
    Authenticated(Credential),
}

/// The authentication gate.
///
/// Its state is loaded from its [`SessionStore`] at creation, and every transition is written back to it.
pub struct Session {
    store: Box<dyn SessionStore>,
    state: Mutex<AuthState>,
}

impl Debug for Session {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session").field("state", &self.state()).finish()
    }
}

impl Session {
    pub fn new(store: Box<dyn SessionStore>) -> Self {
        let state = match store.get() {
            Some(credential) => {
                log::debug!("Resuming a previous session");
                AuthState::Authenticated(credential)
            },
            None => AuthState::Anonymous,
        };
        Self { store, state: Mutex::new(state) }
    }

    /// A session that starts logged out, and keeps its credential in memory only
    pub fn anonymous() -> Self {
        Self::new(Box::new(MemorySessionStore::new()))
    }

    pub fn state(&self) -> AuthState {
        self.state.lock().unwrap().clone()
    }

    pub fn credential(&self) -> Option<Credential> {
        match &*self.state.lock().unwrap() {
            AuthState::Authenticated(credential) => Some(credential.clone()),
            AuthState::Anonymous => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.credential().is_some()
    }

    /// Exchange an email and password for a credential.
    ///
    /// In case the service refuses them, this returns an [`Error::Auth`] with a message that can be shown as is.
    pub async fn login<A>(&self, auth: &A, email: &str, password: &str) -> Result<()>
    where
        A: AuthService + ?Sized,
    {
        let credential = match auth.login(email, password).await {
            Ok(credential) => credential,
            Err(Error::Auth(reason)) => {
                log::info!("Login refused for {}: {}", email, reason);
                return Err(Error::Auth(LOGIN_REJECTED_MESSAGE.to_string()));
            },
            Err(err) => {
                log::warn!("Unable to log in: {}", err);
                return Err(err);
            },
        };

        self.store.set(&credential)?;
        *self.state.lock().unwrap() = AuthState::Authenticated(credential);
        log::info!("Logged in as {}", email);
        Ok(())
    }

    /// Create an account. The session state is not changed
    pub async fn register<A>(&self, auth: &A, email: &str, password: &str) -> Result<()>
    where
        A: AuthService + ?Sized,
    {
        auth.register(email, password).await?;
        log::info!("Registered {}", email);
        Ok(())
    }

    pub fn logout(&self) -> Result<()> {
        *self.state.lock().unwrap() = AuthState::Anonymous;
        self.store.clear()?;
        log::info!("Logged out");
        Ok(())
    }

    /// Forget the credential because the store rejected it
    pub fn invalidate(&self, reason: &str) {
        let was_authenticated = {
            let mut state = self.state.lock().unwrap();
            let was = *state != AuthState::Anonymous;
            *state = AuthState::Anonymous;
            was
        };
        if was_authenticated {
            log::warn!("Credential rejected ({}), logging out", reason);
        }
        if let Err(err) = self.store.clear() {
            log::error!("Unable to clear the stored credential: {}", err);
        }
    }
}
