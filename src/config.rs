//! Support for library configuration options

use std::env;
use std::error::Error;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use once_cell::sync::Lazy;
use url::Url;

use crate::validation::DatePolicy;

/// Name of the product, sent in the `User-Agent` header of every request.
/// Feel free to override it when initing this library.
pub static PRODUCT_NAME: Lazy<Arc<Mutex<String>>> = Lazy::new(|| Arc::new(Mutex::new("tasksync".to_string())));

/// Version of the product, sent in the `User-Agent` header of every request.
/// Feel free to override it when initing this library.
pub static PRODUCT_VERSION: Lazy<Arc<Mutex<String>>> = Lazy::new(|| Arc::new(Mutex::new(env!("CARGO_PKG_VERSION").to_string())));

/// The value of the `User-Agent` header
pub fn user_agent() -> String {
    let name = PRODUCT_NAME.lock().unwrap().clone();
    let version = PRODUCT_VERSION.lock().unwrap().clone();
    format!("{}/{}", name, version)
}

pub const DEFAULT_URL: &str = "http://localhost:5000/";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_SESSION_FILE: &str = ".tasksync/session.json";

/// Whether operations need a credential
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AuthPolicy {
    /// A credential is attached when there is one, requests are sent anonymously otherwise
    Optional,
    /// Every operation is refused while logged out
    Required,
}

impl FromStr for AuthPolicy {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "optional" | "off" | "none" => Ok(AuthPolicy::Optional),
            "required" | "on" => Ok(AuthPolicy::Required),
            other => Err(format!("Invalid auth policy {:?} (expected \"optional\" or \"required\")", other)),
        }
    }
}


/// How to reach the task store, and how strict the client is
#[derive(Clone, Debug)]
pub struct Config {
    /// The root of the service. `todos` and `auth/login` are resolved against it.
    pub base_url: Url,
    pub auth_policy: AuthPolicy,
    pub date_policy: DatePolicy,
    pub request_timeout: Duration,
    /// Where [`FileSessionStore`](crate::session::FileSessionStore) keeps the credential
    pub session_file: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: Url::parse(DEFAULT_URL).unwrap(/* this is a valid constant URL */),
            auth_policy: AuthPolicy::Optional,
            date_policy: DatePolicy::default(),
            request_timeout: DEFAULT_TIMEOUT,
            session_file: PathBuf::from(DEFAULT_SESSION_FILE),
        }
    }
}

impl Config {
    /// Create a config for a given service root, with default values for everything else
    pub fn new<S: AsRef<str>>(base_url: S) -> Result<Self, url::ParseError> {
        let mut config = Self::default();
        config.base_url = parse_base_url(base_url.as_ref())?;
        Ok(config)
    }

    /// Build a config from the following environment variables. Unset variables keep their default value.
    ///
    /// * `TASKSYNC_URL`: root of the service
    /// * `TASKSYNC_AUTH`: `optional` or `required`
    /// * `TASKSYNC_DATE_POLICY`: `required`, `optional` or `today`
    /// * `TASKSYNC_TIMEOUT_SECS`: request timeout, in seconds
    /// * `TASKSYNC_SESSION_FILE`: path to the file that stores the credential
    pub fn from_env() -> Result<Self, Box<dyn Error>> {
        let mut config = Self::default();

        if let Ok(url) = env::var("TASKSYNC_URL") {
            config.base_url = parse_base_url(&url)?;
        }
        if let Ok(auth) = env::var("TASKSYNC_AUTH") {
            config.auth_policy = auth.parse()?;
        }
        if let Ok(policy) = env::var("TASKSYNC_DATE_POLICY") {
            config.date_policy = policy.parse()?;
        }
        if let Ok(secs) = env::var("TASKSYNC_TIMEOUT_SECS") {
            let secs: u64 = secs.parse()
                .map_err(|err| format!("Invalid TASKSYNC_TIMEOUT_SECS {:?}: {}", secs, err))?;
            config.request_timeout = Duration::from_secs(secs);
        }
        if let Ok(path) = env::var("TASKSYNC_SESSION_FILE") {
            config.session_file = PathBuf::from(path);
        }

        log::debug!("Using config {:?}", config);
        Ok(config)
    }

    pub fn with_auth_policy(mut self, policy: AuthPolicy) -> Self {
        self.auth_policy = policy;
        self
    }

    pub fn with_date_policy(mut self, policy: DatePolicy) -> Self {
        self.date_policy = policy;
        self
    }
}

/// Relative URLs are joined to the last path segment only if it ends with a slash, so make sure it does
fn parse_base_url(s: &str) -> Result<Url, url::ParseError> {
    let mut url = Url::parse(s)?;
    if url.path().ends_with('/') == false {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_gets_a_trailing_slash() {
        let config = Config::new("http://example.com/api").unwrap();
        assert_eq!(config.base_url.as_str(), "http://example.com/api/");
        assert_eq!(config.base_url.join("todos").unwrap().as_str(), "http://example.com/api/todos");

        let config = Config::new("http://example.com").unwrap();
        assert_eq!(config.base_url.join("todos").unwrap().as_str(), "http://example.com/todos");
    }

    #[test]
    fn parse_policies() {
        assert_eq!("Required".parse::<AuthPolicy>(), Ok(AuthPolicy::Required));
        assert_eq!("optional".parse::<AuthPolicy>(), Ok(AuthPolicy::Optional));
        assert!("sometimes".parse::<AuthPolicy>().is_err());
    }

    #[test]
    fn user_agent_follows_product_name() {
        assert!(user_agent().contains('/'));
    }
}
