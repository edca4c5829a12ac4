//! JSON lookup API over the account store.
//!
//! Every route reads the store through [`AccountProvider`], so by-name and
//! by-id lookups may trigger an on-demand directory refresh exactly as an
//! NSS lookup would.

use std::sync::Arc;

use accountd::{AccountProvider, AccountStore, Group, StoreStatus, User};
use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Serialize;

type Store = Arc<AccountStore>;

/// Build the lookup router.
pub fn router(store: Store) -> Router {
    Router::new()
        .route("/health", get(handle_health))
        .route("/users", get(handle_users))
        .route("/users/name/{name}", get(handle_user_by_name))
        .route("/users/name/{name}/keys", get(handle_authorized_keys))
        .route("/users/uid/{uid}", get(handle_user_by_uid))
        .route("/groups", get(handle_groups))
        .route("/groups/name/{name}", get(handle_group_by_name))
        .route("/groups/gid/{gid}", get(handle_group_by_gid))
        .route("/names", get(handle_names))
        .route("/names/{name}", get(handle_is_name))
        .with_state(store)
}

/// A lookup failure rendered as `{"error": message}`.
struct ApiError(accountd::Error);

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = if self.0.is_not_found() {
            StatusCode::NOT_FOUND
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        let body = ErrorBody {
            error: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

impl From<accountd::Error> for ApiError {
    fn from(err: accountd::Error) -> Self {
        ApiError(err)
    }
}

#[derive(Serialize)]
struct KnownResponse {
    known: bool,
}

async fn handle_health(State(store): State<Store>) -> Json<StoreStatus> {
    Json(store.status())
}

async fn handle_users(State(store): State<Store>) -> Json<Vec<User>> {
    Json(store.users())
}

async fn handle_user_by_name(
    State(store): State<Store>,
    Path(name): Path<String>,
) -> Result<Json<User>, ApiError> {
    Ok(Json(store.user_by_name(&name).await?))
}

async fn handle_user_by_uid(
    State(store): State<Store>,
    Path(uid): Path<u32>,
) -> Result<Json<User>, ApiError> {
    Ok(Json(store.user_by_uid(uid).await?))
}

async fn handle_authorized_keys(
    State(store): State<Store>,
    Path(name): Path<String>,
) -> Result<Json<Vec<String>>, ApiError> {
    Ok(Json(store.authorized_keys(&name).await?))
}

async fn handle_groups(State(store): State<Store>) -> Json<Vec<Group>> {
    Json(store.groups())
}

async fn handle_group_by_name(
    State(store): State<Store>,
    Path(name): Path<String>,
) -> Result<Json<Group>, ApiError> {
    Ok(Json(store.group_by_name(&name).await?))
}

async fn handle_group_by_gid(
    State(store): State<Store>,
    Path(gid): Path<u32>,
) -> Result<Json<Group>, ApiError> {
    Ok(Json(store.group_by_gid(gid).await?))
}

async fn handle_names(State(store): State<Store>) -> Json<Vec<String>> {
    let mut names = store.names();
    names.sort_unstable();
    Json(names)
}

async fn handle_is_name(
    State(store): State<Store>,
    Path(name): Path<String>,
) -> Json<KnownResponse> {
    Json(KnownResponse {
        known: store.is_name(&name),
    })
}
