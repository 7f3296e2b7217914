//! Errors returned by this crate

use std::fmt::{Display, Formatter};

use thiserror::Error;

use crate::task::TaskId;

/// A convenience alias for results returned by this crate
pub type Result<T> = std::result::Result<T, Error>;

/// A draft or an edit has been rejected before anything was sent to the store
#[derive(Error, Clone, Debug, PartialEq)]
pub enum ValidationError {
    #[error("The task text must not be empty")]
    EmptyText,
    #[error("A due date is required")]
    MissingDueDate,
    #[error("A scheduled date is required")]
    MissingScheduledDate,
}

/// The operations a [`TaskSyncClient`](crate::TaskSyncClient) can perform against a store
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    LoadAll,
    Create,
    Update,
    Delete,
    Login,
    Register,
}

impl Display for Operation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Operation::LoadAll => write!(f, "load tasks"),
            Operation::Create => write!(f, "create task"),
            Operation::Update => write!(f, "update task"),
            Operation::Delete => write!(f, "delete task"),
            Operation::Login => write!(f, "log in"),
            Operation::Register => write!(f, "register"),
        }
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid task: {0}")]
    Validation(#[from] ValidationError),

    /// The store could not be reached, or its reply could not be read
    #[error("Transport error: {0}")]
    Transport(String),

    /// The store replied with a non-success status (other than 401)
    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },

    /// The store rejected our credential (or the lack thereof)
    #[error("Authentication rejected: {0}")]
    Auth(String),

    #[error("Not logged in")]
    NotAuthenticated,

    #[error("No such task: {0}")]
    UnknownTask(TaskId),

    #[error("No task is being edited")]
    NoPendingEdit,

    /// An identical request is already on its way, this one has not been sent
    #[error("A request to {operation} {} is already in progress", .id.as_ref().map(|id| id.as_str()).unwrap_or("(all)"))]
    InFlight { operation: Operation, id: Option<TaskId> },

    #[error("Session storage error: {0}")]
    Session(String),
}

impl Error {
    pub fn is_auth(&self) -> bool {
        matches!(self, Error::Auth(_))
    }

    /// Whether this error has been raised before anything was sent to the store
    pub fn is_local(&self) -> bool {
        matches!(self,
            Error::Validation(_) | Error::NotAuthenticated | Error::UnknownTask(_) | Error::NoPendingEdit | Error::InFlight{..}
        )
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Transport(err.to_string())
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Error::Transport(format!("Invalid URL: {}", err))
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Session(err.to_string())
    }
}
