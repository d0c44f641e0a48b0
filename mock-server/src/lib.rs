//! In-memory stand-in for the lembaas backend.
//!
//! Serves every route the client uses under `/api/v1`, with bearer-token
//! checks and `{"error": "..."}` bodies on failure. State lives in one
//! `RwLock` and is lost when the router is dropped.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, FromRequest, Path, Request, State},
    http::{header, HeaderMap, StatusCode},
    routing::{delete, get, post},
    Json, Router,
};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::debug;
use uuid::Uuid;

pub const CLIENT_ID: &str = "test-client";
pub const CLIENT_SECRET: &str = "test-secret";
/// The only TOTP code the mock accepts.
pub const TOTP_CODE: &str = "123456";
pub const APP_ID: i64 = 1;

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TokenRequest {
    pub client_id: String,
    pub client_secret: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConfigValue {
    pub config_key: String,
    pub config_value: String,
    pub enabled: bool,
}

#[derive(Deserialize)]
pub struct SetConfigValue {
    pub config_key: String,
    pub config_value: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Role {
    pub id: i64,
    pub app_id: i64,
    pub name: String,
    pub description: String,
    pub permissions: String,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Deserialize)]
pub struct CreateRole {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub permissions: String,
    #[serde(default)]
    pub is_default: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub app_id: i64,
    pub email: String,
    pub role_id: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Deserialize)]
pub struct RegisterUser {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub role_id: i64,
    #[serde(default)]
    pub is_active: bool,
}

#[derive(Deserialize)]
pub struct UpdateUser {
    pub id: i64,
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub role_id: i64,
    #[serde(default)]
    pub is_active: bool,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct TotpLoginRequest {
    pub login_code: String,
    pub totp_code: String,
}

#[derive(Deserialize)]
pub struct TotpConfirmRequest {
    pub totp_code: String,
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

struct StoredUser {
    user: User,
    password: String,
    totp_pending: bool,
    totp_enabled: bool,
}

struct PendingLogin {
    user_id: i64,
    valid_until: DateTime<Utc>,
}

#[derive(Default)]
pub struct Backend {
    tokens: HashSet<String>,
    configs: BTreeMap<String, ConfigValue>,
    roles: BTreeMap<i64, Role>,
    users: BTreeMap<i64, StoredUser>,
    pending_logins: HashMap<String, PendingLogin>,
    next_role_id: i64,
    next_user_id: i64,
}

pub type Db = Arc<RwLock<Backend>>;

type Failure = (StatusCode, Json<Value>);
type Reply = Result<(StatusCode, Json<Value>), Failure>;

fn fail(status: StatusCode, message: &str) -> Failure {
    (status, Json(json!({ "error": message })))
}

/// `Json` whose rejections use the same `{"error": ...}` body as every
/// other failure.
struct JsonBody<T>(T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = Failure;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(JsonBody(value)),
            Err(rejection) => Err(fail(rejection.status(), &rejection.body_text())),
        }
    }
}

fn ok<T: Serialize>(status: StatusCode, body: &T) -> Reply {
    let value = serde_json::to_value(body)
        .map_err(|e| fail(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string()))?;
    Ok((status, Json(value)))
}

fn authorize(backend: &Backend, headers: &HeaderMap) -> Result<(), Failure> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(|| fail(StatusCode::UNAUTHORIZED, "missing bearer token"))?;
    if backend.tokens.contains(token) {
        Ok(())
    } else {
        Err(fail(StatusCode::UNAUTHORIZED, "invalid bearer token"))
    }
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(Backend::default()));
    let api = Router::new()
        .route("/token", post(issue_token))
        .route("/app", get(app_info))
        .route("/config/all", get(list_configs))
        .route("/config/set", post(set_config))
        .route("/config/{key}/get", get(get_config))
        .route("/config/{key}/delete", delete(delete_config))
        .route("/roles", get(list_roles))
        .route("/roles/create", post(create_role))
        .route("/roles/{id}/delete", delete(delete_role))
        .route("/users", get(list_users))
        .route("/users/register", post(register_user))
        .route("/users/update", post(update_user))
        .route("/users/login", post(login))
        .route("/users/login/totp", post(login_totp))
        .route("/users/email/{email}/get", get(get_user_by_email))
        .route("/users/{id}/get", get(get_user))
        .route("/users/{id}/delete", delete(delete_user))
        .route("/users/{id}/totp/enable", post(enable_totp))
        .route("/users/{id}/totp/enable/confirm", post(confirm_totp))
        .with_state(db);
    Router::new().nest("/api/v1", api)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

// ---------------------------------------------------------------------------
// App
// ---------------------------------------------------------------------------

async fn issue_token(State(db): State<Db>, JsonBody(input): JsonBody<TokenRequest>) -> Reply {
    if input.client_id != CLIENT_ID || input.client_secret != CLIENT_SECRET {
        return Err(fail(StatusCode::UNAUTHORIZED, "invalid client credentials"));
    }
    let token = Uuid::new_v4().simple().to_string();
    db.write().await.tokens.insert(token.clone());
    debug!("issued token for {}", input.client_id);
    ok(
        StatusCode::OK,
        &json!({ "token": token, "expires_in": 3600, "token_type": "Bearer" }),
    )
}

async fn app_info(State(db): State<Db>, headers: HeaderMap) -> Reply {
    authorize(&*db.read().await, &headers)?;
    ok(
        StatusCode::OK,
        &json!({
            "id": APP_ID,
            "name": "Mock App",
            "description": "In-memory test backend",
            "client_id": CLIENT_ID,
            "icon_url": "",
            "created_at": "2024-01-01T00:00:00Z",
        }),
    )
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

async fn list_configs(State(db): State<Db>, headers: HeaderMap) -> Reply {
    let backend = db.read().await;
    authorize(&backend, &headers)?;
    let values: Vec<&ConfigValue> = backend.configs.values().collect();
    ok(StatusCode::OK, &json!({ "count": values.len(), "config_values": values }))
}

async fn get_config(State(db): State<Db>, headers: HeaderMap, Path(key): Path<String>) -> Reply {
    let backend = db.read().await;
    authorize(&backend, &headers)?;
    match backend.configs.get(&key) {
        Some(value) => ok(StatusCode::OK, value),
        None => Err(fail(StatusCode::NOT_FOUND, "config value not found")),
    }
}

async fn set_config(
    State(db): State<Db>,
    headers: HeaderMap,
    JsonBody(input): JsonBody<SetConfigValue>,
) -> Reply {
    let mut backend = db.write().await;
    authorize(&backend, &headers)?;
    if input.config_key.is_empty() {
        return Err(fail(StatusCode::BAD_REQUEST, "config_key is required"));
    }
    let value = ConfigValue {
        config_key: input.config_key.clone(),
        config_value: input.config_value,
        enabled: true,
    };
    backend.configs.insert(input.config_key, value.clone());
    ok(StatusCode::CREATED, &value)
}

async fn delete_config(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(key): Path<String>,
) -> Result<StatusCode, Failure> {
    let mut backend = db.write().await;
    authorize(&backend, &headers)?;
    backend
        .configs
        .remove(&key)
        .map(|_| StatusCode::NO_CONTENT)
        .ok_or_else(|| fail(StatusCode::NOT_FOUND, "config value not found"))
}

// ---------------------------------------------------------------------------
// Roles
// ---------------------------------------------------------------------------

async fn list_roles(State(db): State<Db>, headers: HeaderMap) -> Reply {
    let backend = db.read().await;
    authorize(&backend, &headers)?;
    let roles: Vec<&Role> = backend.roles.values().collect();
    ok(StatusCode::OK, &json!({ "count": roles.len(), "roles": roles }))
}

async fn create_role(State(db): State<Db>, headers: HeaderMap, JsonBody(input): JsonBody<CreateRole>) -> Reply {
    let mut backend = db.write().await;
    authorize(&backend, &headers)?;
    if input.name.is_empty() {
        return Err(fail(StatusCode::BAD_REQUEST, "name is required"));
    }
    if backend.roles.values().any(|r| r.name == input.name) {
        return Err(fail(StatusCode::CONFLICT, "role already exists"));
    }
    backend.next_role_id += 1;
    let role = Role {
        id: backend.next_role_id,
        app_id: APP_ID,
        name: input.name,
        description: input.description,
        permissions: input.permissions,
        is_default: input.is_default,
        created_at: Utc::now(),
    };
    backend.roles.insert(role.id, role.clone());
    ok(StatusCode::CREATED, &role)
}

async fn delete_role(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<StatusCode, Failure> {
    let mut backend = db.write().await;
    authorize(&backend, &headers)?;
    if backend.users.values().any(|u| u.user.role_id == id) {
        return Err(fail(StatusCode::CONFLICT, "role is assigned to users"));
    }
    backend
        .roles
        .remove(&id)
        .map(|_| StatusCode::NO_CONTENT)
        .ok_or_else(|| fail(StatusCode::NOT_FOUND, "role not found"))
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

fn user_reply(status: StatusCode, user: &User) -> Reply {
    ok(status, &json!({ "user": user }))
}

async fn list_users(State(db): State<Db>, headers: HeaderMap) -> Reply {
    let backend = db.read().await;
    authorize(&backend, &headers)?;
    let users: Vec<&User> = backend.users.values().map(|s| &s.user).collect();
    ok(StatusCode::OK, &json!({ "count": users.len(), "users": users }))
}

async fn get_user(State(db): State<Db>, headers: HeaderMap, Path(id): Path<i64>) -> Reply {
    let backend = db.read().await;
    authorize(&backend, &headers)?;
    match backend.users.get(&id) {
        Some(stored) => user_reply(StatusCode::OK, &stored.user),
        None => Err(fail(StatusCode::NOT_FOUND, "user not found")),
    }
}

async fn get_user_by_email(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(email): Path<String>,
) -> Reply {
    let backend = db.read().await;
    authorize(&backend, &headers)?;
    match backend.users.values().find(|s| s.user.email == email) {
        Some(stored) => user_reply(StatusCode::OK, &stored.user),
        None => Err(fail(StatusCode::NOT_FOUND, "user not found")),
    }
}

async fn register_user(State(db): State<Db>, headers: HeaderMap, JsonBody(input): JsonBody<RegisterUser>) -> Reply {
    let mut backend = db.write().await;
    authorize(&backend, &headers)?;
    if input.email.is_empty() || input.password.is_empty() {
        return Err(fail(StatusCode::BAD_REQUEST, "email and password are required"));
    }
    if backend.users.values().any(|s| s.user.email == input.email) {
        return Err(fail(StatusCode::CONFLICT, "email already registered"));
    }
    backend.next_user_id += 1;
    let now = Utc::now();
    let user = User {
        id: backend.next_user_id,
        app_id: APP_ID,
        email: input.email,
        role_id: input.role_id,
        is_active: input.is_active,
        created_at: now,
        updated_at: now,
    };
    backend.users.insert(
        user.id,
        StoredUser {
            user: user.clone(),
            password: input.password,
            totp_pending: false,
            totp_enabled: false,
        },
    );
    user_reply(StatusCode::CREATED, &user)
}

async fn update_user(State(db): State<Db>, headers: HeaderMap, JsonBody(input): JsonBody<UpdateUser>) -> Reply {
    let mut backend = db.write().await;
    authorize(&backend, &headers)?;
    let stored = backend
        .users
        .get_mut(&input.id)
        .ok_or_else(|| fail(StatusCode::NOT_FOUND, "user not found"))?;
    stored.user.email = input.email;
    stored.user.role_id = input.role_id;
    stored.user.is_active = input.is_active;
    stored.user.updated_at = Utc::now();
    if !input.password.is_empty() {
        stored.password = input.password;
    }
    let user = stored.user.clone();
    user_reply(StatusCode::OK, &user)
}

async fn delete_user(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<StatusCode, Failure> {
    let mut backend = db.write().await;
    authorize(&backend, &headers)?;
    backend
        .users
        .remove(&id)
        .map(|_| StatusCode::NO_CONTENT)
        .ok_or_else(|| fail(StatusCode::NOT_FOUND, "user not found"))
}

async fn enable_totp(State(db): State<Db>, headers: HeaderMap, Path(id): Path<i64>) -> Reply {
    let mut backend = db.write().await;
    authorize(&backend, &headers)?;
    let stored = backend
        .users
        .get_mut(&id)
        .ok_or_else(|| fail(StatusCode::NOT_FOUND, "user not found"))?;
    stored.totp_pending = true;
    let uri = format!("otpauth://totp/mock:{}?secret=MOCKSECRET", stored.user.email);
    ok(StatusCode::OK, &json!({ "qr_code": STANDARD.encode(uri.as_bytes()) }))
}

async fn confirm_totp(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    JsonBody(input): JsonBody<TotpConfirmRequest>,
) -> Reply {
    let mut backend = db.write().await;
    authorize(&backend, &headers)?;
    let stored = backend
        .users
        .get_mut(&id)
        .ok_or_else(|| fail(StatusCode::NOT_FOUND, "user not found"))?;
    if !stored.totp_pending {
        return Err(fail(StatusCode::BAD_REQUEST, "totp enrollment not started"));
    }
    if input.totp_code != TOTP_CODE {
        return Err(fail(StatusCode::BAD_REQUEST, "invalid totp code"));
    }
    stored.totp_pending = false;
    stored.totp_enabled = true;
    ok(StatusCode::OK, &json!({ "qr_code": null }))
}

fn session(user: &User) -> Value {
    let expires_in = 3600;
    json!({
        "session_token": Uuid::new_v4().simple().to_string(),
        "user_id": user.id,
        "email": user.email,
        "role_id": user.role_id,
        "expires_at": Utc::now() + Duration::seconds(expires_in),
        "expires_in": expires_in,
    })
}

async fn login(State(db): State<Db>, headers: HeaderMap, JsonBody(input): JsonBody<LoginRequest>) -> Reply {
    let mut backend = db.write().await;
    authorize(&backend, &headers)?;
    let (user, totp_enabled) = match backend
        .users
        .values()
        .find(|s| s.user.email == input.email && s.password == input.password)
    {
        Some(stored) if stored.user.is_active => (stored.user.clone(), stored.totp_enabled),
        Some(_) => return Err(fail(StatusCode::FORBIDDEN, "user is inactive")),
        None => return Err(fail(StatusCode::UNAUTHORIZED, "invalid credentials")),
    };

    if !totp_enabled {
        return ok(StatusCode::OK, &session(&user));
    }

    let login_code = Uuid::new_v4().simple().to_string();
    let valid_until = Utc::now() + Duration::minutes(5);
    backend.pending_logins.insert(
        login_code.clone(),
        PendingLogin {
            user_id: user.id,
            valid_until,
        },
    );
    ok(
        StatusCode::OK,
        &json!({
            "user_id": user.id,
            "email": user.email,
            "role_id": user.role_id,
            "login_code": login_code,
            "login_code_valid_until": valid_until,
        }),
    )
}

async fn login_totp(State(db): State<Db>, headers: HeaderMap, JsonBody(input): JsonBody<TotpLoginRequest>) -> Reply {
    let mut backend = db.write().await;
    authorize(&backend, &headers)?;
    let pending = backend
        .pending_logins
        .remove(&input.login_code)
        .filter(|p| p.valid_until > Utc::now())
        .ok_or_else(|| fail(StatusCode::UNAUTHORIZED, "invalid or expired login code"))?;
    if input.totp_code != TOTP_CODE {
        return Err(fail(StatusCode::UNAUTHORIZED, "invalid totp code"));
    }
    let stored = backend
        .users
        .get(&pending.user_id)
        .ok_or_else(|| fail(StatusCode::NOT_FOUND, "user not found"))?;
    ok(StatusCode::OK, &session(&stored.user))
}
