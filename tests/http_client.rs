//! Tests of the HTTP client, against a small task server that runs in-process

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;

use tasksync::client::HttpClient;
use tasksync::config::{AuthPolicy, Config};
use tasksync::error::Error;
use tasksync::session::{AuthState, Session, LOGIN_REJECTED_MESSAGE};
use tasksync::traits::{AuthService, TaskStore};
use tasksync::{Task, TaskDraft, TaskId, TaskPatch, TaskSyncClient};


const EMAIL: &str = "me@example.com";
const PASSWORD: &str = "hunter2";
const TOKEN: &str = "valid-token";

/// What the fake server keeps
#[derive(Default)]
struct ServerState {
    tasks: Mutex<Vec<Task>>,
    /// Whether task routes check the bearer token
    requires_auth: bool,
    /// Set to make the next requests fail with this status
    fail_with: Mutex<Option<StatusCode>>,
}

type Shared = Arc<ServerState>;

#[derive(Deserialize)]
struct LoginBody {
    email: String,
    password: String,
}

fn check(state: &ServerState, headers: &HeaderMap) -> Result<(), Response> {
    if let Some(status) = *state.fail_with.lock().unwrap() {
        return Err((status, Json(json!({ "message": "Something went wrong" }))).into_response());
    }
    if state.requires_auth == false {
        return Ok(());
    }
    let expected = format!("Bearer {}", TOKEN);
    match headers.get("authorization").and_then(|v| v.to_str().ok()) {
        Some(value) if value == expected => Ok(()),
        _ => Err((StatusCode::UNAUTHORIZED, Json(json!({ "error": "Token expired" }))).into_response()),
    }
}

async fn list_todos(State(state): State<Shared>, headers: HeaderMap) -> Response {
    if let Err(resp) = check(&state, &headers) { return resp; }
    let tasks = state.tasks.lock().unwrap().clone();
    Json(tasks).into_response()
}

async fn create_todo(State(state): State<Shared>, headers: HeaderMap, Json(draft): Json<TaskDraft>) -> Response {
    if let Err(resp) = check(&state, &headers) { return resp; }
    if draft.text.trim().is_empty() {
        return (StatusCode::BAD_REQUEST, Json(json!({ "message": "Text is required" }))).into_response();
    }
    let task = Task::from_draft(TaskId::random(), draft);
    state.tasks.lock().unwrap().push(task.clone());
    (StatusCode::CREATED, Json(task)).into_response()
}

async fn replace_todo(State(state): State<Shared>, headers: HeaderMap, Path(id): Path<String>, Json(task): Json<Task>) -> Response {
    if let Err(resp) = check(&state, &headers) { return resp; }
    let mut tasks = state.tasks.lock().unwrap();
    match tasks.iter_mut().find(|t| t.id().as_str() == id) {
        None => (StatusCode::NOT_FOUND, "Todo not found").into_response(),
        Some(stored) => {
            *stored = task;
            Json(stored.clone()).into_response()
        },
    }
}

async fn delete_todo(State(state): State<Shared>, headers: HeaderMap, Path(id): Path<String>) -> Response {
    if let Err(resp) = check(&state, &headers) { return resp; }
    let mut tasks = state.tasks.lock().unwrap();
    let len_before = tasks.len();
    tasks.retain(|t| t.id().as_str() != id);
    if tasks.len() == len_before {
        return (StatusCode::NOT_FOUND, "Todo not found").into_response();
    }
    StatusCode::NO_CONTENT.into_response()
}

async fn login(Json(body): Json<LoginBody>) -> Response {
    if body.email == EMAIL && body.password == PASSWORD {
        Json(json!({ "token": TOKEN })).into_response()
    } else {
        (StatusCode::BAD_REQUEST, Json(json!({ "message": "Wrong password" }))).into_response()
    }
}

async fn register(Json(body): Json<LoginBody>) -> Response {
    if body.email == EMAIL {
        return (StatusCode::CONFLICT, Json(json!({ "message": "User already exists" }))).into_response();
    }
    StatusCode::CREATED.into_response()
}

/// Start a server on a random port. Returns its URL and its state
async fn start_server(requires_auth: bool) -> (String, Shared) {
    let state = Arc::new(ServerState{ requires_auth, ..ServerState::default() });
    let app = Router::new()
        .route("/api/todos", get(list_todos).post(create_todo))
        .route("/api/todos/:id", put(replace_todo).delete(delete_todo))
        .route("/api/auth/login", post(login))
        .route("/api/auth/register", post(register))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}/api", addr), state)
}

fn date(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 12, d).unwrap()
}



#[tokio::test]
async fn test_store_calls() {
    let _ = env_logger::builder().is_test(true).try_init();
    let (url, state) = start_server(false).await;
    let http = HttpClient::new(&url).unwrap();

    assert!(http.list(None).await.unwrap().is_empty());

    let draft = TaskDraft::new("Buy milk").due(date(15)).scheduled(date(6));
    let created = http.create(&draft, None).await.unwrap();
    assert_eq!(created.text(), "Buy milk");
    assert_eq!(created.completed(), false);
    assert_eq!(created.due_date(), Some(date(15)));
    assert_eq!(state.tasks.lock().unwrap().clone(), vec![created.clone()]);

    let done = created.merged_with(&TaskPatch::new().completed(true));
    let replaced = http.replace(&done, None).await.unwrap();
    assert_eq!(replaced, done);
    assert_eq!(http.list(None).await.unwrap(), vec![done.clone()]);

    http.delete(done.id(), None).await.unwrap();
    assert!(http.list(None).await.unwrap().is_empty());

    match http.delete(done.id(), None).await {
        Err(Error::Server{ status, message }) => {
            assert_eq!(status, 404);
            assert_eq!(message, "Todo not found");
        },
        other => panic!("Unexpected result {:?}", other),
    }
}

#[tokio::test]
async fn test_error_replies() {
    let _ = env_logger::builder().is_test(true).try_init();
    let (url, state) = start_server(false).await;
    let http = HttpClient::new(&url).unwrap();

    match http.create(&TaskDraft::new(" "), None).await {
        Err(Error::Server{ status, message }) => {
            assert_eq!(status, 400);
            assert_eq!(message, "Text is required");
        },
        other => panic!("Unexpected result {:?}", other),
    }

    *state.fail_with.lock().unwrap() = Some(StatusCode::INTERNAL_SERVER_ERROR);
    match http.list(None).await {
        Err(Error::Server{ status, .. }) => assert_eq!(status, 500),
        other => panic!("Unexpected result {:?}", other),
    }
}

#[tokio::test]
async fn test_unreachable_store() {
    let _ = env_logger::builder().is_test(true).try_init();

    // Bind then drop a listener, so that nothing listens on this port
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let http = HttpClient::new(format!("http://{}/", addr)).unwrap();
    assert!(matches!(http.list(None).await, Err(Error::Transport(_))));
}

#[tokio::test]
async fn test_login() {
    let _ = env_logger::builder().is_test(true).try_init();
    let (url, _state) = start_server(true).await;
    let http = HttpClient::new(&url).unwrap();

    assert!(http.list(None).await.unwrap_err().is_auth());

    let err = http.login(EMAIL, "wrong").await.unwrap_err();
    assert!(err.is_auth());

    let credential = http.login(EMAIL, PASSWORD).await.unwrap();
    assert_eq!(credential.token(), TOKEN);
    assert!(http.list(Some(&credential)).await.is_ok());

    http.register("new@example.com", "pw").await.unwrap();
    match http.register(EMAIL, "pw").await {
        Err(Error::Server{ status, .. }) => assert_eq!(status, 409),
        other => panic!("Unexpected result {:?}", other),
    }
}

#[tokio::test]
async fn test_sync_client_over_http() {
    let _ = env_logger::builder().is_test(true).try_init();
    let (url, state) = start_server(true).await;

    let config = Config::new(&url).unwrap().with_auth_policy(AuthPolicy::Required);
    let http = HttpClient::from_config(&config).unwrap();
    let session = Arc::new(Session::anonymous());
    let client = TaskSyncClient::from_config(http.clone(), &config, session.clone());

    assert!(matches!(client.load_all().await, Err(Error::NotAuthenticated)));

    let err = client.login(&http, EMAIL, "wrong").await.unwrap_err();
    assert_eq!(err.to_string(), format!("Authentication rejected: {}", LOGIN_REJECTED_MESSAGE));
    client.login(&http, EMAIL, PASSWORD).await.unwrap();

    let created = client.create(TaskDraft::new("Buy milk").due(date(15)).scheduled(date(6))).await.unwrap();
    assert!(created.id().as_str().is_empty() == false);
    let toggled = client.toggle_important(created.id()).await.unwrap();
    assert!(toggled.is_important());
    assert_eq!(client.load_all().await.unwrap(), vec![toggled.clone()]);

    // The server now rejects our token: the next call signs us out
    let other = state.tasks.lock().unwrap()[0].clone();
    *state.fail_with.lock().unwrap() = Some(StatusCode::UNAUTHORIZED);
    assert!(client.remove(other.id()).await.unwrap_err().is_auth());
    assert_eq!(session.state(), AuthState::Anonymous);
    assert_eq!(client.tasks(), vec![toggled]);
}
