//! This module keeps a local copy of a task store, and applies changes to both
//!
//! Changes are never applied locally before the store has confirmed them.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::NaiveDate;

use crate::config::{AuthPolicy, Config};
use crate::error::{Error, Operation, Result};
use crate::progress::{FeedbackSender, Progress, SyncEvent};
use crate::session::{Credential, Session};
use crate::task::{EditBuffer, Task, TaskDraft, TaskId, TaskPatch};
use crate::traits::{AuthService, TaskStore};
use crate::validation::DatePolicy;

type InFlightKey = (Operation, Option<TaskId>);

/// Removes its key from the in-flight set when dropped
struct InFlightGuard<'a> {
    set: &'a Mutex<HashSet<InFlightKey>>,
    key: InFlightKey,
}

impl<'a> Drop for InFlightGuard<'a> {
    fn drop(&mut self) {
        self.set.lock().unwrap().remove(&self.key);
    }
}

/// Raises a flag for as long as it lives, even if the future that holds it is dropped
struct FlagGuard<'a>(&'a AtomicBool);

impl<'a> FlagGuard<'a> {
    fn raise(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::SeqCst);
        Self(flag)
    }
}

impl<'a> Drop for FlagGuard<'a> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

fn local_today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

/// A local mirror of a [`TaskStore`].
///
/// Every method takes `&self`, so that independent operations can run concurrently (e.g. with `tokio::join!`).
/// Updates to the same task are sent one after the other, so that a change is never computed from a stale copy of a task that is being updated already.
pub struct TaskSyncClient<S>
where
    S: TaskStore,
{
    store: S,
    session: Arc<Session>,
    auth_policy: AuthPolicy,
    date_policy: DatePolicy,
    today: fn() -> NaiveDate,

    tasks: Mutex<Vec<Task>>,
    pending_edit: Mutex<Option<EditBuffer>>,
    loading: AtomicBool,

    in_flight: Mutex<HashSet<InFlightKey>>,
    update_queues: Mutex<HashMap<TaskId, Arc<tokio::sync::Mutex<()>>>>,
    progress: Progress,
}

impl<S> TaskSyncClient<S>
where
    S: TaskStore,
{
    /// Create a client with an anonymous, in-memory session, that does not require authentication
    pub fn new(store: S) -> Self {
        Self {
            store,
            session: Arc::new(Session::anonymous()),
            auth_policy: AuthPolicy::Optional,
            date_policy: DatePolicy::default(),
            today: local_today,
            tasks: Mutex::new(Vec::new()),
            pending_edit: Mutex::new(None),
            loading: AtomicBool::new(false),
            in_flight: Mutex::new(HashSet::new()),
            update_queues: Mutex::new(HashMap::new()),
            progress: Progress::new(),
        }
    }

    /// Create a client that follows the policies of `config`
    pub fn from_config(store: S, config: &Config, session: Arc<Session>) -> Self {
        Self::new(store)
            .with_session(session)
            .with_auth_policy(config.auth_policy)
            .with_date_policy(config.date_policy)
    }

    pub fn with_session(mut self, session: Arc<Session>) -> Self {
        self.session = session;
        self
    }

    pub fn with_auth_policy(mut self, policy: AuthPolicy) -> Self {
        self.auth_policy = policy;
        self
    }

    pub fn with_date_policy(mut self, policy: DatePolicy) -> Self {
        self.date_policy = policy;
        self
    }

    /// Send every event of this client to a feedback channel (see [`feedback_channel`](crate::progress::feedback_channel))
    pub fn with_feedback(mut self, sender: FeedbackSender) -> Self {
        self.progress = Progress::new_with_feedback_channel(sender);
        self
    }

    /// Change how the current day is computed (used by [`DatePolicy::DefaultToToday`])
    pub fn with_clock(mut self, today: fn() -> NaiveDate) -> Self {
        self.today = today;
        self
    }

    pub fn store(&self) -> &S { &self.store }
    pub fn session(&self) -> &Session { &self.session }
    pub fn date_policy(&self) -> DatePolicy { self.date_policy }

    /// A copy of the local tasks, in order
    pub fn tasks(&self) -> Vec<Task> {
        self.tasks.lock().unwrap().clone()
    }

    pub fn get(&self, id: &TaskId) -> Option<Task> {
        self.tasks.lock().unwrap().iter().find(|t| t.id() == id).cloned()
    }

    pub fn len(&self) -> usize {
        self.tasks.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the task list is being fetched
    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst)
    }

    /// Tasks marked as important, in order
    pub fn important(&self) -> Vec<Task> {
        self.filtered(|t| t.is_important())
    }

    /// Tasks that are not completed yet, in order
    pub fn pending(&self) -> Vec<Task> {
        self.filtered(|t| t.completed() == false)
    }

    pub fn completed(&self) -> Vec<Task> {
        self.filtered(|t| t.completed())
    }

    fn filtered<F: Fn(&Task) -> bool>(&self, predicate: F) -> Vec<Task> {
        self.tasks.lock().unwrap().iter()
            .filter(|t| predicate(t))
            .cloned()
            .collect()
    }

    /// Log in, using the given service. See [`Session::login`]
    pub async fn login<A>(&self, auth: &A, email: &str, password: &str) -> Result<()>
    where
        A: AuthService + ?Sized,
    {
        let result = self.session.login(auth, email, password).await;
        if let Err(err) = &result {
            self.progress.failed(Operation::Login, &err.to_string());
        }
        result
    }

    /// Create an account, using the given service. See [`Session::register`]
    pub async fn register<A>(&self, auth: &A, email: &str, password: &str) -> Result<()>
    where
        A: AuthService + ?Sized,
    {
        let result = self.session.register(auth, email, password).await;
        if let Err(err) = &result {
            self.progress.failed(Operation::Register, &err.to_string());
        }
        result
    }

    pub fn logout(&self) -> Result<()> {
        self.session.logout()
    }

    /// Fetch every task from the store, and replace the local ones with them.
    ///
    /// In case of an error, local tasks are left untouched.
    /// Returns a copy of the new local tasks.
    pub async fn load_all(&self) -> Result<Vec<Task>> {
        let operation = Operation::LoadAll;
        let _guard = self.begin(operation, None)?;
        let credential = self.report(operation, self.credential())?;

        let result = {
            let _loading = FlagGuard::raise(&self.loading);
            self.progress.feedback(SyncEvent::Loading);
            self.store.list(credential.as_ref()).await
        };

        let tasks = self.report(operation, result)?;
        warn_about_duplicates(&tasks);

        let count = tasks.len();
        *self.tasks.lock().unwrap() = tasks.clone();
        log::info!("{} tasks loaded", count);
        self.progress.feedback(SyncEvent::Loaded{ count });
        Ok(tasks)
    }

    /// Create a task in the store, then append it to the local tasks.
    ///
    /// The draft is checked against the date policy first. Nothing is sent if it is invalid.
    pub async fn create(&self, draft: TaskDraft) -> Result<Task> {
        let operation = Operation::Create;
        let draft = self.report(operation, self.date_policy.check_draft(draft, (self.today)()).map_err(Error::from))?;
        let credential = self.report(operation, self.credential())?;

        let result = self.store.create(&draft, credential.as_ref()).await;
        let created = self.report(operation, result)?;

        {
            let mut tasks = self.tasks.lock().unwrap();
            // A concurrent `load_all` may have fetched it already
            match tasks.iter_mut().find(|t| t.id() == created.id()) {
                Some(existing) => *existing = created.clone(),
                None => tasks.push(created.clone()),
            }
        }
        self.progress.applied(operation, created.id());
        Ok(created)
    }

    /// Apply `patch` over the local copy of a task, and send the result to the store.
    ///
    /// The local copy is then replaced with what the store replied.
    pub async fn update(&self, id: &TaskId, patch: TaskPatch) -> Result<Task> {
        self.update_with(id, move |_| patch).await
    }

    /// Flip the `completed` flag of a task
    pub async fn toggle_completed(&self, id: &TaskId) -> Result<Task> {
        self.update_with(id, |task| TaskPatch::new().completed(task.completed() == false)).await
    }

    /// Flip the `isImportant` flag of a task
    pub async fn toggle_important(&self, id: &TaskId) -> Result<Task> {
        self.update_with(id, |task| TaskPatch::new().important(task.is_important() == false)).await
    }

    pub async fn set_completed(&self, id: &TaskId, completed: bool) -> Result<Task> {
        self.update(id, TaskPatch::new().completed(completed)).await
    }

    /// Delete a task from the store, then from the local tasks.
    ///
    /// If a deletion of the same task is already in progress, this returns [`Error::InFlight`] and nothing is sent.
    pub async fn remove(&self, id: &TaskId) -> Result<()> {
        let operation = Operation::Delete;
        let _guard = self.begin(operation, Some(id))?;
        let credential = self.report(operation, self.credential())?;

        let result = self.store.delete(id, credential.as_ref()).await;
        self.report(operation, result)?;

        self.tasks.lock().unwrap().retain(|t| t.id() != id);
        {
            let mut pending = self.pending_edit.lock().unwrap();
            if pending.as_ref().map(|buf| buf.id() == id).unwrap_or(false) {
                *pending = None;
            }
        }
        self.progress.applied(operation, id);
        Ok(())
    }

    /// Stage the current values of a task into an edit buffer. Nothing is sent to the store.
    ///
    /// This replaces any edit that was pending.
    pub fn begin_edit(&self, id: &TaskId) -> Result<EditBuffer> {
        let task = self.get(id).ok_or_else(|| Error::UnknownTask(id.clone()))?;
        let buffer = EditBuffer::from_task(&task);
        *self.pending_edit.lock().unwrap() = Some(buffer.clone());
        Ok(buffer)
    }

    pub fn cancel_edit(&self) {
        *self.pending_edit.lock().unwrap() = None;
    }

    pub fn pending_edit(&self) -> Option<EditBuffer> {
        self.pending_edit.lock().unwrap().clone()
    }

    /// Modify the pending edit buffer. Returns false if there is no pending edit
    pub fn modify_edit<F: FnOnce(&mut EditBuffer)>(&self, f: F) -> bool {
        match self.pending_edit.lock().unwrap().as_mut() {
            None => false,
            Some(buffer) => {
                f(buffer);
                true
            }
        }
    }

    /// Send the pending edit to the store.
    ///
    /// The buffer is checked like a new task would be. It is cleared once the store has accepted the change, and kept otherwise.
    pub async fn submit_edit(&self) -> Result<Task> {
        let buffer = self.pending_edit().ok_or(Error::NoPendingEdit)?;
        let draft = self.report(Operation::Update, self.date_policy.check_draft(buffer.as_draft(), (self.today)()).map_err(Error::from))?;

        let saved = self.update(buffer.id(), TaskPatch::from_draft(draft)).await?;

        let mut pending = self.pending_edit.lock().unwrap();
        // The user may have started editing something else in the meantime
        if pending.as_ref().map(|buf| buf.id() == buffer.id()).unwrap_or(false) {
            *pending = None;
        }
        Ok(saved)
    }

    async fn update_with<F>(&self, id: &TaskId, make_patch: F) -> Result<Task>
    where
        F: FnOnce(&Task) -> TaskPatch + Send,
    {
        let operation = Operation::Update;
        let queue = self.update_queue(id);
        let result = {
            let _turn = queue.lock().await;
            self.update_in_turn(id, make_patch).await
        };
        self.release_update_queue(id, queue);

        let saved = self.report(operation, result)?;
        self.progress.applied(operation, saved.id());
        Ok(saved)
    }

    /// Must be called while holding the update queue of `id`, so that the local copy cannot be stale
    async fn update_in_turn<F>(&self, id: &TaskId, make_patch: F) -> Result<Task>
    where
        F: FnOnce(&Task) -> TaskPatch,
    {
        let snapshot = self.get(id).ok_or_else(|| Error::UnknownTask(id.clone()))?;
        let patch = make_patch(&snapshot);
        self.date_policy.check_patch(&patch)?;
        let credential = self.credential()?;

        let merged = snapshot.merged_with(&patch);
        let saved = self.store.replace(&merged, credential.as_ref()).await?;

        let mut tasks = self.tasks.lock().unwrap();
        match tasks.iter_mut().find(|t| t.id() == id) {
            Some(local) => *local = saved.clone(),
            None => log::debug!("{} has been removed while it was being updated, not adding it back", id),
        }
        Ok(saved)
    }

    fn update_queue(&self, id: &TaskId) -> Arc<tokio::sync::Mutex<()>> {
        self.update_queues.lock().unwrap()
            .entry(id.clone())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }

    fn release_update_queue(&self, id: &TaskId, queue: Arc<tokio::sync::Mutex<()>>) {
        let mut queues = self.update_queues.lock().unwrap();
        drop(queue);
        let unused = queues.get(id).map(|q| Arc::strong_count(q) == 1).unwrap_or(false);
        if unused {
            queues.remove(id);
        }
    }

    /// Mark an operation as in progress, or fail if it is already
    fn begin(&self, operation: Operation, id: Option<&TaskId>) -> Result<InFlightGuard<'_>> {
        let key = (operation, id.cloned());
        let inserted = self.in_flight.lock().unwrap().insert(key.clone());
        if inserted == false {
            log::debug!("Ignoring a duplicate request to {} {:?}", operation, id);
            return Err(Error::InFlight{ operation, id: id.cloned() });
        }
        Ok(InFlightGuard{ set: &self.in_flight, key })
    }

    /// The credential to attach to requests, if any
    fn credential(&self) -> Result<Option<Credential>> {
        match (self.session.credential(), self.auth_policy) {
            (None, AuthPolicy::Required) => Err(Error::NotAuthenticated),
            (credential, _) => Ok(credential),
        }
    }

    /// Log errors and tell the listener about them.
    /// This also closes the session in case the store has rejected our credential
    fn report<T>(&self, operation: Operation, result: Result<T>) -> Result<T> {
        if let Err(err) = &result {
            self.progress.failed(operation, &err.to_string());
            if let Error::Auth(reason) = err {
                self.session.invalidate(reason);
                self.progress.feedback(SyncEvent::SignedOut);
            }
        }
        result
    }
}

fn warn_about_duplicates(tasks: &[Task]) {
    let mut seen = HashSet::new();
    for task in tasks {
        if seen.insert(task.id()) == false {
            log::warn!("The store has returned {} more than once", task.id());
        }
    }
}
