//! This crate keeps a local copy of a remote to-do list.
//!
//! It provides an HTTP client for task stores in the [`client`] module, that can be used as a stand-alone module.
//!
//! A [`TaskSyncClient`] mirrors such a store (or any other [`TaskStore`](traits::TaskStore)) in memory, so that an app can display tasks quickly. \
//! It only applies a change locally once the store has confirmed it, and always keeps what the store replied. \
//! It can also require users to log in (see the [`session`] module).

pub mod traits;

mod task;
pub use task::{EditBuffer, Task, TaskDraft, TaskId, TaskPatch};
pub mod error;
pub use error::{Error, Result};
pub mod sync_client;
pub use sync_client::TaskSyncClient;
pub mod session;
pub use session::{AuthState, Credential, Session};
pub mod validation;
pub use validation::DatePolicy;
pub mod progress;

pub mod client;
pub mod mock;
pub mod mock_behaviour;

pub mod config;
pub mod utils;
