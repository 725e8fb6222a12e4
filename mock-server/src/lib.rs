use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, Method, StatusCode, Uri},
    response::{AppendHeaders, IntoResponse, Response},
    routing::{any, get},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::info;
use uuid::Uuid;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

#[derive(Deserialize)]
pub struct CreateUser {
    pub name: String,
    pub email: String,
}

#[derive(Deserialize)]
pub struct UpdateUser {
    pub name: Option<String>,
    pub email: Option<String>,
}

#[derive(Deserialize)]
pub struct ListParams {
    pub name: Option<String>,
    pub limit: Option<usize>,
}

/// JSON body returned with every 4xx produced by the users routes.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

/// What `/echo` saw of the incoming request.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Echo {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub headers: BTreeMap<String, String>,
    pub body: Option<Value>,
}

/// Largest body `/large/{bytes}` will build.
pub const MAX_LARGE_BYTES: usize = 64 * 1024 * 1024;

pub type Db = Arc<RwLock<HashMap<Uuid, User>>>;

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(HashMap::new()));
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route(
            "/users/{id}",
            get(get_user).put(replace_user).patch(update_user).delete(delete_user),
        )
        .route("/echo", any(echo))
        .route("/status/{code}", any(status_reply))
        .route("/text-error", any(text_error))
        .route("/malformed", get(malformed))
        .route("/me", get(me))
        .route("/large/{bytes}", get(large))
        .route("/cookies", get(cookies))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "mock server listening");
    }
    axum::serve(listener, app()).await
}

fn error(status: StatusCode, code: &str, message: &str) -> (StatusCode, Json<ErrorBody>) {
    (
        status,
        Json(ErrorBody {
            code: code.to_string(),
            message: message.to_string(),
        }),
    )
}

fn user_not_found() -> (StatusCode, Json<ErrorBody>) {
    error(StatusCode::NOT_FOUND, "USER_NOT_FOUND", "User not found")
}

async fn list_users(State(db): State<Db>, Query(params): Query<ListParams>) -> Json<Vec<User>> {
    let users = db.read().await;
    let mut matching: Vec<User> = users
        .values()
        .filter(|u| params.name.as_deref().map_or(true, |name| u.name == name))
        .cloned()
        .collect();
    matching.sort_by(|a, b| a.name.cmp(&b.name));
    if let Some(limit) = params.limit {
        matching.truncate(limit);
    }
    Json(matching)
}

async fn create_user(State(db): State<Db>, Json(input): Json<CreateUser>) -> (StatusCode, Json<User>) {
    let user = User {
        id: Uuid::new_v4(),
        name: input.name,
        email: input.email,
    };
    db.write().await.insert(user.id, user.clone());
    (StatusCode::CREATED, Json(user))
}

async fn get_user(
    State(db): State<Db>,
    Path(id): Path<Uuid>,
) -> Result<Json<User>, (StatusCode, Json<ErrorBody>)> {
    let users = db.read().await;
    users.get(&id).cloned().map(Json).ok_or_else(user_not_found)
}

async fn replace_user(
    State(db): State<Db>,
    Path(id): Path<Uuid>,
    Json(input): Json<CreateUser>,
) -> Result<Json<User>, (StatusCode, Json<ErrorBody>)> {
    let mut users = db.write().await;
    let user = users.get_mut(&id).ok_or_else(user_not_found)?;
    user.name = input.name;
    user.email = input.email;
    Ok(Json(user.clone()))
}

async fn update_user(
    State(db): State<Db>,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateUser>,
) -> Result<Json<User>, (StatusCode, Json<ErrorBody>)> {
    let mut users = db.write().await;
    let user = users.get_mut(&id).ok_or_else(user_not_found)?;
    if let Some(name) = input.name {
        user.name = name;
    }
    if let Some(email) = input.email {
        user.email = email;
    }
    Ok(Json(user.clone()))
}

async fn delete_user(
    State(db): State<Db>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, (StatusCode, Json<ErrorBody>)> {
    let mut users = db.write().await;
    users
        .remove(&id)
        .map(|_| StatusCode::NO_CONTENT)
        .ok_or_else(user_not_found)
}

async fn echo(method: Method, uri: Uri, headers: HeaderMap, body: String) -> Json<Echo> {
    let headers = headers
        .iter()
        .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.as_str().to_string(), v.to_string())))
        .collect();
    let body = if body.is_empty() {
        None
    } else {
        Some(serde_json::from_str(&body).unwrap_or(Value::String(body)))
    };
    Json(Echo {
        method: method.to_string(),
        path: uri.path().to_string(),
        query: uri.query().map(str::to_string),
        headers,
        body,
    })
}

async fn status_reply(Path(code): Path<u16>) -> Response {
    match StatusCode::from_u16(code) {
        Ok(StatusCode::NO_CONTENT) => StatusCode::NO_CONTENT.into_response(),
        Ok(status) => (status, Json(json!({ "status": code }))).into_response(),
        Err(_) => error(StatusCode::BAD_REQUEST, "BAD_STATUS", "Unknown status code").into_response(),
    }
}

async fn text_error() -> (StatusCode, &'static str) {
    (StatusCode::INTERNAL_SERVER_ERROR, "internal error")
}

async fn malformed() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "application/json")], "not json")
}

async fn me(headers: HeaderMap) -> Result<Json<Value>, (StatusCode, Json<ErrorBody>)> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));
    match token {
        Some(token) => Ok(Json(json!({ "token": token }))),
        None => Err(error(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", "Missing bearer token")),
    }
}

/// A JSON string of `bytes` ASCII characters.
async fn large(Path(bytes): Path<usize>) -> Result<Json<String>, (StatusCode, Json<ErrorBody>)> {
    if bytes > MAX_LARGE_BYTES {
        return Err(error(StatusCode::BAD_REQUEST, "TOO_LARGE", "Requested body is too large"));
    }
    Ok(Json("x".repeat(bytes)))
}

async fn cookies() -> impl IntoResponse {
    (
        AppendHeaders([(header::SET_COOKIE, "a=1"), (header::SET_COOKIE, "b=2")]),
        Json(json!({ "cookies": 2 })),
    )
}
