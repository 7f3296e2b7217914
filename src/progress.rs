//! Utilities to report what a client is doing, e.g. to drive a loading indicator or to display inline errors

use std::fmt::{Display, Error, Formatter};

use crate::error::Operation;
use crate::task::TaskId;

/// An event that happens in a [`TaskSyncClient`](crate::TaskSyncClient)
#[derive(Clone, Debug, PartialEq)]
pub enum SyncEvent {
    /// Nothing has happened yet
    Idle,
    /// The task list is being fetched
    Loading,
    /// The task list has been fetched
    Loaded{ count: usize },
    /// A change has been confirmed by the store and applied locally
    Applied{ operation: Operation, id: TaskId },
    /// An operation has failed. Local data has not been changed
    Failed{ operation: Operation, message: String },
    /// The store has rejected our credential, the user must log in again
    SignedOut,
}

impl Display for SyncEvent {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        match self {
            SyncEvent::Idle => write!(f, "Idle"),
            SyncEvent::Loading => write!(f, "Loading..."),
            SyncEvent::Loaded{count} => write!(f, "{} tasks loaded", count),
            SyncEvent::Applied{operation, id} => write!(f, "[{}] {} done", id, operation),
            SyncEvent::Failed{operation, message} => write!(f, "Unable to {}: {}", operation, message),
            SyncEvent::SignedOut => write!(f, "Session expired, please log in again"),
        }
    }
}

impl Default for SyncEvent {
    fn default() -> Self {
        Self::Idle
    }
}



/// See [`feedback_channel`]
pub type FeedbackSender = tokio::sync::watch::Sender<SyncEvent>;
/// See [`feedback_channel`]
pub type FeedbackReceiver = tokio::sync::watch::Receiver<SyncEvent>;

/// Create a feeback channel, that can be used to follow the operations of a client
pub fn feedback_channel() -> (FeedbackSender, FeedbackReceiver) {
    tokio::sync::watch::channel(SyncEvent::default())
}



/// Logs what happens, and forwards it to the feedback channel (if any)
#[derive(Debug, Default)]
pub(crate) struct Progress {
    feedback_channel: Option<FeedbackSender>,
}

impl Progress {
    pub fn new() -> Self {
        Self { feedback_channel: None }
    }
    pub fn new_with_feedback_channel(channel: FeedbackSender) -> Self {
        Self { feedback_channel: Some(channel) }
    }

    /// Log an error, and tell the listener
    pub fn failed(&self, operation: Operation, text: &str) {
        log::warn!("Unable to {}: {}", operation, text);
        self.feedback(SyncEvent::Failed{ operation, message: text.to_string() });
    }
    /// Log a success, and tell the listener
    pub fn applied(&self, operation: Operation, id: &TaskId) {
        log::info!("{} {}: done", operation, id);
        self.feedback(SyncEvent::Applied{ operation, id: id.clone() });
    }
    /// Send an event as a feedback to the listener (if any).
    pub fn feedback(&self, event: SyncEvent) {
        if let Some(sender) = &self.feedback_channel {
            // Having no receiver left is not an error
            let _ = sender.send(event);
        }
    }
}
