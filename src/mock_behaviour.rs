//! This module provides ways to tweak mocked stores, so that they can return errors on some tests

use crate::error::{Error, Result};

/// The kind of error a mocked call returns when it has been told to fail
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum MockFailure {
    /// As if the store could not be reached
    Transport,
    /// As if the store replied with this HTTP status code
    Server(u16),
    /// As if the store rejected the credential
    Unauthorized,
}

impl Default for MockFailure {
    fn default() -> Self {
        MockFailure::Transport
    }
}

/// This stores some behaviour tweaks, that describe how a mocked instance will behave during a given test
///
/// So that a functions fails _n_ times after _m_ initial successes, set `(m, n)` for the suited parameter
#[derive(Default, Clone, Debug)]
pub struct MockBehaviour {
    /// If this is true, every action will be allowed
    pub is_suspended: bool,
    /// What failing calls return
    pub failure: MockFailure,

    // From the TaskStore trait
    pub list_behaviour: (u32, u32),
    pub create_behaviour: (u32, u32),
    pub replace_behaviour: (u32, u32),
    pub delete_behaviour: (u32, u32),

    // From the AuthService trait
    pub login_behaviour: (u32, u32),
}

impl MockBehaviour {
    pub fn new() -> Self {
        Self::default()
    }

    /// All calls will fail at once, for `n_fails` times
    pub fn fail_now(n_fails: u32) -> Self {
        Self {
            is_suspended: false,
            failure: MockFailure::default(),
            list_behaviour: (0, n_fails),
            create_behaviour: (0, n_fails),
            replace_behaviour: (0, n_fails),
            delete_behaviour: (0, n_fails),
            login_behaviour: (0, n_fails),
        }
    }

    /// Change the kind of error failing calls return
    pub fn with_failure(mut self, failure: MockFailure) -> Self {
        self.failure = failure;
        self
    }

    /// Suspend this mock behaviour until you call `resume`
    pub fn suspend(&mut self) {
        self.is_suspended = true;
    }
    /// Make this behaviour active again
    pub fn resume(&mut self) {
        self.is_suspended = false;
    }

    pub fn can_list(&mut self) -> Result<()> {
        if self.is_suspended { return Ok(()) }
        decrement(&mut self.list_behaviour, "list", self.failure)
    }
    pub fn can_create(&mut self) -> Result<()> {
        if self.is_suspended { return Ok(()) }
        decrement(&mut self.create_behaviour, "create", self.failure)
    }
    pub fn can_replace(&mut self) -> Result<()> {
        if self.is_suspended { return Ok(()) }
        decrement(&mut self.replace_behaviour, "replace", self.failure)
    }
    pub fn can_delete(&mut self) -> Result<()> {
        if self.is_suspended { return Ok(()) }
        decrement(&mut self.delete_behaviour, "delete", self.failure)
    }
    pub fn can_login(&mut self) -> Result<()> {
        if self.is_suspended { return Ok(()) }
        decrement(&mut self.login_behaviour, "login", self.failure)
    }
}


/// Return Ok(()) in case the value is `(1+, _)` or `(_, 0)`, or return Err and decrement otherwise
fn decrement(value: &mut (u32, u32), descr: &str, failure: MockFailure) -> Result<()> {
    let remaining_successes = value.0;
    let remaining_failures = value.1;

    if remaining_successes > 0 {
        value.0 -= 1;
        log::debug!("Mock behaviour: allowing a {} ({:?})", descr, value);
        Ok(())
    } else if remaining_failures > 0 {
        value.1 -= 1;
        log::debug!("Mock behaviour: failing a {} ({:?})", descr, value);
        let text = format!("Mocked behaviour requires this {} to fail this time. ({:?})", descr, value);
        Err(match failure {
            MockFailure::Transport => Error::Transport(text),
            MockFailure::Server(status) => Error::Server{ status, message: text },
            MockFailure::Unauthorized => Error::Auth(text),
        })
    } else {
        log::debug!("Mock behaviour: allowing a {} ({:?})", descr, value);
        Ok(())
    }
}
