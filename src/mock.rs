//! An in-memory task store, that behaves like a remote one.
//!
//! This is mainly useful for tests (its failures can be tweaked with a [`MockBehaviour`]), but also to try this crate without a server.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::mock_behaviour::MockBehaviour;
use crate::session::Credential;
use crate::task::{Task, TaskDraft, TaskId};
use crate::traits::{AuthService, TaskStore};


/// How many calls each method of a [`MockStore`] has received
#[derive(Debug, Default)]
pub struct CallCounts {
    list: AtomicUsize,
    create: AtomicUsize,
    replace: AtomicUsize,
    delete: AtomicUsize,
}

impl CallCounts {
    pub fn list(&self) -> usize    { self.list.load(Ordering::SeqCst) }
    pub fn create(&self) -> usize  { self.create.load(Ordering::SeqCst) }
    pub fn replace(&self) -> usize { self.replace.load(Ordering::SeqCst) }
    pub fn delete(&self) -> usize  { self.delete.load(Ordering::SeqCst) }
    pub fn total(&self) -> usize {
        self.list() + self.create() + self.replace() + self.delete()
    }
}


/// A [`TaskStore`] and [`AuthService`] that keeps everything in memory
#[derive(Debug, Default)]
pub struct MockStore {
    tasks: Mutex<Vec<Task>>,
    users: Mutex<HashMap<String, String>>,
    tokens: Mutex<HashSet<String>>,
    requires_auth: bool,
    latency: Option<Duration>,
    behaviour: Mutex<MockBehaviour>,
    calls: CallCounts,
}

impl MockStore {
    /// A store that accepts anonymous requests
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that rejects every task request that has no valid token
    pub fn requiring_auth() -> Self {
        Self { requires_auth: true, ..Self::default() }
    }

    /// Every call will wait this long before being processed
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn with_behaviour(self, behaviour: MockBehaviour) -> Self {
        *self.behaviour.lock().unwrap() = behaviour;
        self
    }

    pub fn set_behaviour(&self, behaviour: MockBehaviour) {
        *self.behaviour.lock().unwrap() = behaviour;
    }

    pub fn calls(&self) -> &CallCounts {
        &self.calls
    }

    pub fn add_user(&self, email: &str, password: &str) {
        self.users.lock().unwrap().insert(email.to_string(), password.to_string());
    }

    /// Make every token issued so far invalid, as if they had expired
    pub fn revoke_tokens(&self) {
        self.tokens.lock().unwrap().clear();
    }

    /// Add a task directly into the store, as another client would. Returns the stored task
    pub fn insert_remote(&self, draft: TaskDraft) -> Task {
        let task = Task::from_draft(TaskId::random(), normalize_draft(draft));
        self.tasks.lock().unwrap().push(task.clone());
        task
    }

    /// Overwrite a task directly in the store, as another client would
    pub fn replace_remote(&self, task: Task) {
        let mut tasks = self.tasks.lock().unwrap();
        match tasks.iter_mut().find(|t| t.id() == task.id()) {
            Some(stored) => *stored = task,
            None => tasks.push(task),
        }
    }

    /// Remove a task directly from the store, as another client would
    pub fn remove_remote(&self, id: &TaskId) {
        self.tasks.lock().unwrap().retain(|t| t.id() != id);
    }

    pub fn remote_tasks(&self) -> Vec<Task> {
        self.tasks.lock().unwrap().clone()
    }

    pub fn remote_task(&self, id: &TaskId) -> Option<Task> {
        self.tasks.lock().unwrap().iter().find(|t| t.id() == id).cloned()
    }

    async fn simulate_latency(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }

    fn check_credential(&self, credential: Option<&Credential>) -> Result<()> {
        if self.requires_auth == false {
            return Ok(());
        }
        match credential {
            None => Err(Error::Auth("No token provided".to_string())),
            Some(cred) => {
                if self.tokens.lock().unwrap().contains(cred.token()) {
                    Ok(())
                } else {
                    Err(Error::Auth("Invalid token".to_string()))
                }
            },
        }
    }
}

/// The store trims whitespace around texts, so what it saves may differ from what it has been sent
fn normalize_draft(mut draft: TaskDraft) -> TaskDraft {
    draft.text = draft.text.trim().to_string();
    draft
}

fn normalize_task(task: &Task) -> Task {
    Task::new_with_parameters(task.id().clone(), task.text().trim().to_string(),
        task.completed(), task.is_important(), task.due_date(), task.scheduled_date())
}

fn not_found(id: &TaskId) -> Error {
    Error::Server{ status: 404, message: format!("Todo {} not found", id) }
}

#[async_trait]
impl TaskStore for MockStore {
    async fn list(&self, credential: Option<&Credential>) -> Result<Vec<Task>> {
        self.calls.list.fetch_add(1, Ordering::SeqCst);
        self.simulate_latency().await;
        self.behaviour.lock().unwrap().can_list()?;
        self.check_credential(credential)?;

        Ok(self.tasks.lock().unwrap().clone())
    }

    async fn create(&self, draft: &TaskDraft, credential: Option<&Credential>) -> Result<Task> {
        self.calls.create.fetch_add(1, Ordering::SeqCst);
        self.simulate_latency().await;
        self.behaviour.lock().unwrap().can_create()?;
        self.check_credential(credential)?;

        if draft.text.trim().is_empty() {
            return Err(Error::Server{ status: 400, message: "Text is required".to_string() });
        }
        Ok(self.insert_remote(draft.clone()))
    }

    async fn replace(&self, task: &Task, credential: Option<&Credential>) -> Result<Task> {
        self.calls.replace.fetch_add(1, Ordering::SeqCst);
        self.simulate_latency().await;
        self.behaviour.lock().unwrap().can_replace()?;
        self.check_credential(credential)?;

        let mut tasks = self.tasks.lock().unwrap();
        match tasks.iter_mut().find(|t| t.id() == task.id()) {
            None => Err(not_found(task.id())),
            Some(stored) => {
                *stored = normalize_task(task);
                Ok(stored.clone())
            },
        }
    }

    async fn delete(&self, id: &TaskId, credential: Option<&Credential>) -> Result<()> {
        self.calls.delete.fetch_add(1, Ordering::SeqCst);
        self.simulate_latency().await;
        self.behaviour.lock().unwrap().can_delete()?;
        self.check_credential(credential)?;

        let mut tasks = self.tasks.lock().unwrap();
        let len_before = tasks.len();
        tasks.retain(|t| t.id() != id);
        if tasks.len() == len_before {
            return Err(not_found(id));
        }
        Ok(())
    }
}

#[async_trait]
impl AuthService for MockStore {
    async fn login(&self, email: &str, password: &str) -> Result<Credential> {
        self.simulate_latency().await;
        self.behaviour.lock().unwrap().can_login()?;

        let known = self.users.lock().unwrap().get(email).map(|p| p == password);
        match known {
            Some(true) => {
                let token = uuid::Uuid::new_v4().to_simple().to_string();
                self.tokens.lock().unwrap().insert(token.clone());
                Ok(Credential::new(token))
            },
            _ => Err(Error::Auth("Invalid email or password".to_string())),
        }
    }

    async fn register(&self, email: &str, password: &str) -> Result<()> {
        self.simulate_latency().await;
        let mut users = self.users.lock().unwrap();
        if users.contains_key(email) {
            return Err(Error::Server{ status: 409, message: "User already exists".to_string() });
        }
        users.insert(email.to_string(), password.to_string());
        Ok(())
    }
}
