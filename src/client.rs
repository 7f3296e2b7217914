//! This module provides a client to connect to a task store over HTTP

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::session::Credential;
use crate::task::{Task, TaskDraft, TaskId};
use crate::traits::{AuthService, TaskStore};


#[derive(Serialize)]
struct LoginBody<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct LoginReply {
    token: String,
}

/// The shapes of error bodies we know how to read
#[derive(Deserialize)]
struct ErrorReply {
    message: Option<String>,
    error: Option<String>,
}


/// A task store (and auth service) reached over HTTP.
///
/// Tasks are found under `{base_url}/todos`, authentication under `{base_url}/auth`.
#[derive(Debug, Clone)]
pub struct HttpClient {
    base_url: Url,
    http: reqwest::Client,
}

impl HttpClient {
    /// Create a client with default settings. This does not start a connection
    pub fn new<S: AsRef<str>>(url: S) -> Result<Self> {
        let config = Config::new(url)?;
        Self::from_config(&config)
    }

    /// Create a client. This does not start a connection
    pub fn from_config(config: &Config) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(crate::config::user_agent())
            .build()?;

        Ok(Self {
            base_url: config.base_url.clone(),
            http,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn todos_url(&self) -> Result<Url> {
        Ok(self.base_url.join("todos")?)
    }

    fn todo_url(&self, id: &TaskId) -> Result<Url> {
        let mut url = self.todos_url()?;
        url.path_segments_mut()
            .map_err(|_| Error::Transport(format!("{} cannot be used as a base URL", self.base_url)))?
            .pop_if_empty()
            .push(id.as_str());
        Ok(url)
    }

    fn request(&self, method: Method, url: Url, credential: Option<&Credential>) -> RequestBuilder {
        log::debug!("{} {}", method, url);
        let builder = self.http.request(method, url);
        match credential {
            Some(cred) => builder.bearer_auth(cred.token()),
            None => builder,
        }
    }
}

/// Turn non-success replies into errors
async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = error_message(status, &body);
    log::debug!("Unexpected HTTP status code {:?}: {}", status, message);

    if status == StatusCode::UNAUTHORIZED {
        Err(Error::Auth(message))
    } else {
        Err(Error::Server{ status: status.as_u16(), message })
    }
}

/// Extract a human-readable message from an error reply
fn error_message(status: StatusCode, body: &str) -> String {
    if let Ok(reply) = serde_json::from_str::<ErrorReply>(body) {
        if let Some(msg) = reply.message.or(reply.error) {
            return msg;
        }
    }
    let body = body.trim();
    if body.is_empty() == false && body.starts_with('{') == false {
        return body.to_string();
    }
    status.canonical_reason()
        .map(|r| r.to_string())
        .unwrap_or_else(|| format!("HTTP status {}", status.as_u16()))
}

async fn parse_json<T: serde::de::DeserializeOwned>(response: Response) -> Result<T> {
    let text = response.text().await?;
    serde_json::from_str(&text)
        .map_err(|err| Error::Transport(format!("Unable to parse the store reply ({}): {}", err, text)))
}

#[async_trait]
impl TaskStore for HttpClient {
    async fn list(&self, credential: Option<&Credential>) -> Result<Vec<Task>> {
        let response = self.request(Method::GET, self.todos_url()?, credential)
            .send()
            .await?;
        let response = check_status(response).await?;
        parse_json(response).await
    }

    async fn create(&self, draft: &TaskDraft, credential: Option<&Credential>) -> Result<Task> {
        let response = self.request(Method::POST, self.todos_url()?, credential)
            .json(draft)
            .send()
            .await?;
        let response = check_status(response).await?;
        parse_json(response).await
    }

    async fn replace(&self, task: &Task, credential: Option<&Credential>) -> Result<Task> {
        let response = self.request(Method::PUT, self.todo_url(task.id())?, credential)
            .json(task)
            .send()
            .await?;
        let response = check_status(response).await?;
        parse_json(response).await
    }

    async fn delete(&self, id: &TaskId, credential: Option<&Credential>) -> Result<()> {
        let response = self.request(Method::DELETE, self.todo_url(id)?, credential)
            .send()
            .await?;
        check_status(response).await?;
        Ok(())
    }
}

#[async_trait]
impl AuthService for HttpClient {
    async fn login(&self, email: &str, password: &str) -> Result<Credential> {
        let response = self.request(Method::POST, self.base_url.join("auth/login")?, None)
            .json(&LoginBody{ email, password })
            .send()
            .await?;

        // Services tend to use any 4xx to refuse a login
        let response = match check_status(response).await {
            Err(Error::Server{ status, message }) if status == 400 || status == 403 || status == 404 => {
                return Err(Error::Auth(message));
            },
            other => other?,
        };
        let reply: LoginReply = parse_json(response).await?;
        Ok(Credential::new(reply.token))
    }

    async fn register(&self, email: &str, password: &str) -> Result<()> {
        let response = self.request(Method::POST, self.base_url.join("auth/register")?, None)
            .json(&LoginBody{ email, password })
            .send()
            .await?;
        check_status(response).await?;
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urls() {
        let client = HttpClient::new("http://localhost:5000/api").unwrap();
        assert_eq!(client.todos_url().unwrap().as_str(), "http://localhost:5000/api/todos");
        assert_eq!(client.todo_url(&TaskId::from("abc123")).unwrap().as_str(), "http://localhost:5000/api/todos/abc123");
        // IDs are opaque, they must be escaped
        assert_eq!(client.todo_url(&TaskId::from("a/b c")).unwrap().as_str(), "http://localhost:5000/api/todos/a%2Fb%20c");
    }

    #[test]
    fn error_messages() {
        assert_eq!(error_message(StatusCode::BAD_REQUEST, r#"{"message": "Text is required"}"#), "Text is required");
        assert_eq!(error_message(StatusCode::UNAUTHORIZED, r#"{"error": "Token expired"}"#), "Token expired");
        assert_eq!(error_message(StatusCode::INTERNAL_SERVER_ERROR, "Something broke\n"), "Something broke");
        assert_eq!(error_message(StatusCode::NOT_FOUND, ""), "Not Found");
        assert_eq!(error_message(StatusCode::NOT_FOUND, "{}"), "Not Found");
    }
}
