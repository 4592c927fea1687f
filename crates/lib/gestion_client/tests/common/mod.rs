//! In-process mock of the Gestion API for integration tests.
//!
//! Issues opaque tokens (`A1`, `A2`, … / `R1`, …) and lets tests expire
//! access tokens, revoke refresh tokens and slow the refresh endpoint or
//! the project listing down.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use gestion_client::{ClientConfig, MemoryPersistence, Session};
use gestion_core::models::auth::CredentialPair;
use gestion_core::models::project::{Project, ProjectMember, ProjectRole};
use gestion_core::models::task::{Task, TaskPriority, TaskStatus};
use serde_json::{Value, json};

pub const ALICE: (i64, &str, &str) = (1, "alice", "alice-pw");
pub const BOB: (i64, &str, &str) = (2, "bob", "bob-pw");
pub const CAROL: (i64, &str, &str) = (3, "carol", "carol-pw");

/// Route-scoped record of one authenticated request.
#[derive(Debug, Clone)]
pub struct Seen {
    pub method: String,
    pub path: String,
    pub token: Option<String>,
}

#[derive(Default)]
struct Tokens {
    next_access: usize,
    next_refresh: usize,
    /// access token -> username
    access: HashMap<String, String>,
    /// refresh token -> username
    refresh: HashMap<String, String>,
}

struct MockState {
    users: Vec<(i64, String, String)>,
    tokens: Tokens,
    projects: Vec<Project>,
    tasks: Vec<Task>,
    seen: Vec<Seen>,
    reject_all: bool,
    fail_identity: bool,
    refresh_delay: Duration,
    projects_delay: Duration,
}

#[derive(Clone)]
pub struct MockApi {
    state: Arc<Mutex<MockState>>,
    refresh_calls: Arc<AtomicUsize>,
    pub addr: SocketAddr,
}

type Shared = (Arc<Mutex<MockState>>, Arc<AtomicUsize>);

impl MockApi {
    pub async fn start() -> Self {
        init_tracing();

        let state = Arc::new(Mutex::new(MockState {
            users: [ALICE, BOB, CAROL]
                .iter()
                .map(|(id, name, pw)| (*id, name.to_string(), pw.to_string()))
                .collect(),
            tokens: Tokens {
                next_access: 1,
                next_refresh: 1,
                ..Default::default()
            },
            projects: fixture_projects(),
            tasks: fixture_tasks(),
            seen: Vec::new(),
            reject_all: false,
            fail_identity: false,
            refresh_delay: Duration::ZERO,
            projects_delay: Duration::ZERO,
        }));
        let refresh_calls = Arc::new(AtomicUsize::new(0));

        let app = Router::new()
            .route("/api/users/token/", post(token))
            .route("/api/users/token/refresh/", post(refresh))
            .route("/api/users/register/", post(register))
            .route("/api/users/me/", get(me))
            .route("/api/users/", get(users))
            .route("/api/projects/", get(list_projects).post(create_project))
            .route(
                "/api/projects/{id}/",
                get(get_project).patch(update_project).delete(delete_project),
            )
            .route(
                "/api/projects/{id}/transfer_ownership/",
                post(transfer_ownership),
            )
            .route("/api/tasks/", get(list_tasks))
            .route("/api/tasks/{id}/", patch(update_task).delete(delete_task))
            .with_state((state.clone(), refresh_calls.clone()));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock api");
        let addr = listener.local_addr().expect("mock api addr");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("mock api server");
        });

        Self {
            state,
            refresh_calls,
            addr,
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}/api", self.addr)
    }

    /// Session against this server with in-memory credentials.
    pub fn session(&self) -> Session {
        self.session_with(MemoryPersistence::new())
    }

    pub fn session_with(&self, persistence: MemoryPersistence) -> Session {
        let config = ClientConfig::new(&self.base_url(), "unused.json".into()).expect("config");
        Session::new(config, persistence)
    }

    /// Session that believes it already holds `pair`, as after a restart.
    pub fn session_holding(&self, pair: CredentialPair) -> Session {
        self.session_with(MemoryPersistence::with_pair(pair))
    }

    /// Every access token issued so far stops being accepted.
    pub fn expire_access_tokens(&self) {
        self.lock().tokens.access.clear();
    }

    pub fn revoke_refresh_tokens(&self) {
        self.lock().tokens.refresh.clear();
    }

    /// Answer every authenticated request with 401, valid token or not.
    pub fn reject_all(&self, on: bool) {
        self.lock().reject_all = on;
    }

    pub fn fail_identity(&self, on: bool) {
        self.lock().fail_identity = on;
    }

    pub fn set_refresh_delay(&self, delay: Duration) {
        self.lock().refresh_delay = delay;
    }

    /// Hold `GET /projects/` before it looks at the bearer token.
    pub fn set_projects_delay(&self, delay: Duration) {
        self.lock().projects_delay = delay;
    }

    pub fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    /// Authenticated requests received, in arrival order.
    pub fn seen(&self) -> Vec<Seen> {
        self.lock().seen.clone()
    }

    pub fn seen_on(&self, method: &str, path: &str) -> Vec<Seen> {
        self.seen()
            .into_iter()
            .filter(|s| s.method == method && s.path == path)
            .collect()
    }

    pub fn project(&self, id: i64) -> Option<Project> {
        self.lock().projects.iter().find(|p| p.id == id).cloned()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().expect("mock state")
    }
}

/// An address nothing listens on.
pub async fn dead_address() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);
    format!("http://{addr}/api")
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gestion_client=debug".into()),
        )
        .with_test_writer()
        .try_init();
}

// =============================================================================
// Fixtures
// =============================================================================

fn fixture_projects() -> Vec<Project> {
    vec![
        Project {
            id: 1,
            name: "Roadmap".into(),
            description: "Quarterly planning".into(),
            owner: "alice".into(),
            members_info: vec![
                ProjectMember {
                    id: 10,
                    user: "bob".into(),
                    role: ProjectRole::Member,
                },
                ProjectMember {
                    id: 11,
                    user: "carol".into(),
                    role: ProjectRole::Manager,
                },
            ],
            created_at: None,
            updated_at: None,
        },
        Project {
            id: 2,
            name: "Ops".into(),
            description: String::new(),
            owner: "bob".into(),
            members_info: Vec::new(),
            created_at: None,
            updated_at: None,
        },
    ]
}

fn task(id: i64, project: i64, title: &str, status: TaskStatus, created_by: i64) -> Task {
    Task {
        id,
        project,
        title: title.into(),
        description: String::new(),
        status,
        priority: TaskPriority::Medium,
        created_by: Some(created_by),
        assignees_info: Vec::new(),
        due_date: None,
        completed_at: None,
    }
}

fn fixture_tasks() -> Vec<Task> {
    vec![
        task(1, 1, "Draft plan", TaskStatus::Todo, ALICE.0),
        task(2, 1, "Review plan", TaskStatus::InProgress, BOB.0),
        task(3, 1, "Kickoff", TaskStatus::Done, ALICE.0),
        task(4, 2, "Rotate keys", TaskStatus::Todo, BOB.0),
    ]
}

// =============================================================================
// Handlers
// =============================================================================

fn detail(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "detail": message }))).into_response()
}

fn unauthorized() -> Response {
    detail(
        StatusCode::UNAUTHORIZED,
        "Given token not valid for any token type",
    )
}

/// Record the request and resolve the bearer token to `(user id, username)`.
fn authorize(
    state: &Arc<Mutex<MockState>>,
    headers: &HeaderMap,
    method: &str,
    path: String,
) -> Result<(i64, String), Response> {
    let token = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_string);

    let mut s = state.lock().expect("mock state");
    s.seen.push(Seen {
        method: method.into(),
        path,
        token: token.clone(),
    });
    if s.reject_all {
        return Err(unauthorized());
    }
    let username = token
        .and_then(|t| s.tokens.access.get(&t).cloned())
        .ok_or_else(unauthorized)?;
    let id = s
        .users
        .iter()
        .find(|(_, name, _)| *name == username)
        .map(|(id, _, _)| *id)
        .ok_or_else(unauthorized)?;
    Ok((id, username))
}

async fn token(State((state, _)): State<Shared>, Json(body): Json<Value>) -> Response {
    let username = body["username"].as_str().unwrap_or_default();
    let password = body["password"].as_str().unwrap_or_default();

    let mut s = state.lock().expect("mock state");
    let known = s
        .users
        .iter()
        .any(|(_, name, pw)| name == username && pw == password);
    if !known {
        return detail(
            StatusCode::UNAUTHORIZED,
            "No active account found with the given credentials",
        );
    }
    let access = format!("A{}", s.tokens.next_access);
    let refresh = format!("R{}", s.tokens.next_refresh);
    s.tokens.next_access += 1;
    s.tokens.next_refresh += 1;
    s.tokens.access.insert(access.clone(), username.into());
    s.tokens.refresh.insert(refresh.clone(), username.into());
    Json(json!({ "access": access, "refresh": refresh })).into_response()
}

async fn refresh(State((state, calls)): State<Shared>, Json(body): Json<Value>) -> Response {
    calls.fetch_add(1, Ordering::SeqCst);
    let delay = state.lock().expect("mock state").refresh_delay;
    tokio::time::sleep(delay).await;

    let presented = body["refresh"].as_str().unwrap_or_default();
    let mut s = state.lock().expect("mock state");
    let Some(username) = s.tokens.refresh.get(presented).cloned() else {
        return detail(StatusCode::UNAUTHORIZED, "Token is invalid or expired");
    };
    let access = format!("A{}", s.tokens.next_access);
    s.tokens.next_access += 1;
    s.tokens.access.insert(access.clone(), username);
    Json(json!({ "access": access })).into_response()
}

async fn register(State((state, _)): State<Shared>, Json(body): Json<Value>) -> Response {
    let username = body["username"].as_str().unwrap_or_default().to_string();
    let password = body["password"].as_str().unwrap_or_default().to_string();
    let mut s = state.lock().expect("mock state");
    if s.users.iter().any(|(_, name, _)| *name == username) {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "username": ["A user with that username already exists."] })),
        )
            .into_response();
    }
    let id = s.users.len() as i64 + 1;
    s.users.push((id, username.clone(), password));
    (StatusCode::CREATED, Json(json!({ "id": id, "username": username }))).into_response()
}

async fn me(State((state, _)): State<Shared>, headers: HeaderMap) -> Response {
    let (id, username) = match authorize(&state, &headers, "GET", "/users/me/".into()) {
        Ok(who) => who,
        Err(resp) => return resp,
    };
    if state.lock().expect("mock state").fail_identity {
        return detail(StatusCode::INTERNAL_SERVER_ERROR, "identity lookup failed");
    }
    Json(json!({ "id": id, "username": username })).into_response()
}

async fn users(State((state, _)): State<Shared>, headers: HeaderMap) -> Response {
    if let Err(resp) = authorize(&state, &headers, "GET", "/users/".into()) {
        return resp;
    }
    let s = state.lock().expect("mock state");
    let list: Vec<Value> = s
        .users
        .iter()
        .map(|(id, name, _)| json!({ "id": id, "username": name }))
        .collect();
    Json(list).into_response()
}

fn visible(project: &Project, username: &str) -> bool {
    project.owner == username || project.membership_role(username).is_some()
}

async fn list_projects(State((state, _)): State<Shared>, headers: HeaderMap) -> Response {
    let delay = state.lock().expect("mock state").projects_delay;
    tokio::time::sleep(delay).await;

    let (_, username) = match authorize(&state, &headers, "GET", "/projects/".into()) {
        Ok(who) => who,
        Err(resp) => return resp,
    };
    let s = state.lock().expect("mock state");
    let list: Vec<&Project> = s.projects.iter().filter(|p| visible(p, &username)).collect();
    Json(list).into_response()
}

async fn get_project(
    State((state, _)): State<Shared>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> Response {
    let (_, username) = match authorize(&state, &headers, "GET", format!("/projects/{id}/")) {
        Ok(who) => who,
        Err(resp) => return resp,
    };
    let s = state.lock().expect("mock state");
    match s.projects.iter().find(|p| p.id == id && visible(p, &username)) {
        Some(p) => Json(p).into_response(),
        None => detail(StatusCode::NOT_FOUND, "Not found."),
    }
}

async fn create_project(
    State((state, _)): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let (_, username) = match authorize(&state, &headers, "POST", "/projects/".into()) {
        Ok(who) => who,
        Err(resp) => return resp,
    };
    let mut s = state.lock().expect("mock state");
    let project = Project {
        id: s.projects.iter().map(|p| p.id).max().unwrap_or(0) + 1,
        name: body["name"].as_str().unwrap_or_default().into(),
        description: body["description"].as_str().unwrap_or_default().into(),
        owner: username,
        members_info: Vec::new(),
        created_at: None,
        updated_at: None,
    };
    s.projects.push(project.clone());
    (StatusCode::CREATED, Json(project)).into_response()
}

async fn update_project(
    State((state, _)): State<Shared>,
    Path(id): Path<i64>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let (_, username) = match authorize(&state, &headers, "PATCH", format!("/projects/{id}/")) {
        Ok(who) => who,
        Err(resp) => return resp,
    };
    let mut s = state.lock().expect("mock state");
    let Some(project) = s.projects.iter_mut().find(|p| p.id == id) else {
        return detail(StatusCode::NOT_FOUND, "Not found.");
    };
    if project.owner != username {
        return detail(
            StatusCode::FORBIDDEN,
            "You do not have permission to perform this action.",
        );
    }
    if let Some(name) = body["name"].as_str() {
        project.name = name.into();
    }
    if let Some(description) = body["description"].as_str() {
        project.description = description.into();
    }
    Json(project.clone()).into_response()
}

async fn delete_project(
    State((state, _)): State<Shared>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> Response {
    let (_, username) = match authorize(&state, &headers, "DELETE", format!("/projects/{id}/")) {
        Ok(who) => who,
        Err(resp) => return resp,
    };
    let mut s = state.lock().expect("mock state");
    let Some(pos) = s.projects.iter().position(|p| p.id == id) else {
        return detail(StatusCode::NOT_FOUND, "Not found.");
    };
    if s.projects[pos].owner != username {
        return detail(
            StatusCode::FORBIDDEN,
            "You do not have permission to perform this action.",
        );
    }
    s.projects.remove(pos);
    StatusCode::NO_CONTENT.into_response()
}

async fn transfer_ownership(
    State((state, _)): State<Shared>,
    Path(id): Path<i64>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let path = format!("/projects/{id}/transfer_ownership/");
    let (_, username) = match authorize(&state, &headers, "POST", path) {
        Ok(who) => who,
        Err(resp) => return resp,
    };
    let Some(new_owner_id) = body["new_owner_id"].as_i64() else {
        return detail(StatusCode::BAD_REQUEST, "new_owner_id is required.");
    };
    let mut s = state.lock().expect("mock state");
    let Some(new_owner) = s
        .users
        .iter()
        .find(|(uid, _, _)| *uid == new_owner_id)
        .map(|(_, name, _)| name.clone())
    else {
        return detail(StatusCode::NOT_FOUND, "User not found.");
    };
    let Some(project) = s.projects.iter_mut().find(|p| p.id == id) else {
        return detail(StatusCode::NOT_FOUND, "Not found.");
    };
    if project.owner != username {
        return detail(
            StatusCode::FORBIDDEN,
            "Only the owner can transfer ownership.",
        );
    }
    project.owner = new_owner.clone();
    Json(json!({ "detail": format!("Ownership transferred to {new_owner}.") })).into_response()
}

async fn list_tasks(
    State((state, _)): State<Shared>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    let (_, username) = match authorize(&state, &headers, "GET", "/tasks/".into()) {
        Ok(who) => who,
        Err(resp) => return resp,
    };
    let s = state.lock().expect("mock state");
    let visible_projects: HashSet<i64> = s
        .projects
        .iter()
        .filter(|p| visible(p, &username))
        .map(|p| p.id)
        .collect();
    let list: Vec<&Task> = s
        .tasks
        .iter()
        .filter(|t| visible_projects.contains(&t.project))
        .filter(|t| {
            query
                .get("project_id")
                .is_none_or(|id| t.project.to_string() == *id)
        })
        .filter(|t| query.get("status").is_none_or(|st| t.status.as_str() == st.as_str()))
        .filter(|t| {
            query
                .get("priority")
                .is_none_or(|p| t.priority.as_str() == p.as_str())
        })
        .collect();
    Json(list).into_response()
}

fn may_touch_task(s: &MockState, task: &Task, user_id: i64, username: &str) -> bool {
    let owner = s
        .projects
        .iter()
        .any(|p| p.id == task.project && p.owner == username);
    owner || task.created_by == Some(user_id)
}

async fn update_task(
    State((state, _)): State<Shared>,
    Path(id): Path<i64>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let (user_id, username) = match authorize(&state, &headers, "PATCH", format!("/tasks/{id}/")) {
        Ok(who) => who,
        Err(resp) => return resp,
    };
    let mut s = state.lock().expect("mock state");
    let Some(pos) = s.tasks.iter().position(|t| t.id == id) else {
        return detail(StatusCode::NOT_FOUND, "Not found.");
    };
    if !may_touch_task(&s, &s.tasks[pos], user_id, &username) {
        return detail(
            StatusCode::FORBIDDEN,
            "You do not have permission to perform this action.",
        );
    }
    let task = &mut s.tasks[pos];
    if let Some(status) = body["status"].as_str().and_then(|v| v.parse::<TaskStatus>().ok()) {
        task.status = status;
    }
    if let Some(title) = body["title"].as_str() {
        task.title = title.into();
    }
    Json(task.clone()).into_response()
}

async fn delete_task(
    State((state, _)): State<Shared>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> Response {
    let (user_id, username) = match authorize(&state, &headers, "DELETE", format!("/tasks/{id}/")) {
        Ok(who) => who,
        Err(resp) => return resp,
    };
    let mut s = state.lock().expect("mock state");
    let Some(pos) = s.tasks.iter().position(|t| t.id == id) else {
        return detail(StatusCode::NOT_FOUND, "Not found.");
    };
    if !may_touch_task(&s, &s.tasks[pos], user_id, &username) {
        return detail(
            StatusCode::FORBIDDEN,
            "You do not have permission to perform this action.",
        );
    }
    s.tasks.remove(pos);
    StatusCode::NO_CONTENT.into_response()
}
