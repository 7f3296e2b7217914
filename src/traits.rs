//! The seams between a [`TaskSyncClient`](crate::TaskSyncClient) and the outside world

use async_trait::async_trait;

use crate::error::Result;
use crate::session::Credential;
use crate::task::{Task, TaskDraft, TaskId};

/// A remote collection of tasks, which is the source of truth for their content.
///
/// Every call may be attached a credential. Implementors must return [`Error::Auth`](crate::Error::Auth) whenever this credential (or its absence) is rejected.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Returns every task of the collection, in the order the store keeps them
    async fn list(&self, credential: Option<&Credential>) -> Result<Vec<Task>>;
    /// Creates a new task. The returned task has an ID assigned by the store.
    async fn create(&self, draft: &TaskDraft, credential: Option<&Credential>) -> Result<Task>;
    /// Replaces a whole task. The returned value is how the store actually saved it
    async fn replace(&self, task: &Task, credential: Option<&Credential>) -> Result<Task>;
    async fn delete(&self, id: &TaskId, credential: Option<&Credential>) -> Result<()>;
}

/// A service that exchanges user credentials for a bearer token
#[async_trait]
pub trait AuthService: Send + Sync {
    async fn login(&self, email: &str, password: &str) -> Result<Credential>;
    /// Create an account. This does not log in.
    async fn register(&self, email: &str, password: &str) -> Result<()>;
}

/// Somewhere to keep the credential between runs
pub trait SessionStore: Send + Sync {
    fn get(&self) -> Option<Credential>;
    fn set(&self, credential: &Credential) -> Result<()>;
    fn clear(&self) -> Result<()>;
}
