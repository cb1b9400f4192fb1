use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::get,
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::{
    auth::{extractors::AdminUser, password},
    error::AppError,
    state::AppState,
    users::{
        dto::{CreateUserRequest, UpdateUserRequest, UserResponse},
        repo_types::User,
    },
    validate::{validate_email, validate_password, validate_username},
};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/Users", get(list_users).post(create_user))
        .route(
            "/Users/:id",
            get(get_user).put(update_user).delete(delete_user),
        )
}

#[instrument(skip(state, admin), fields(admin = %admin.0.username))]
pub async fn list_users(
    State(state): State<AppState>,
    admin: AdminUser,
) -> Result<Json<Vec<UserResponse>>, AppError> {
    let users = User::list(&state.db).await?;
    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}

#[instrument(skip(state, admin), fields(admin = %admin.0.username))]
pub async fn get_user(
    State(state): State<AppState>,
    admin: AdminUser,
    Path(id): Path<i32>,
) -> Result<Json<UserResponse>, AppError> {
    match User::find_by_id(&state.db, id).await? {
        Some(user) => Ok(Json(UserResponse::from(user))),
        None => {
            warn!(%id, "user not found");
            Err(AppError::NotFound("User not found.".into()))
        }
    }
}

#[instrument(skip(state, admin, payload), fields(admin = %admin.0.username))]
pub async fn create_user(
    State(state): State<AppState>,
    admin: AdminUser,
    Json(payload): Json<CreateUserRequest>,
) -> Result<(StatusCode, HeaderMap, Json<UserResponse>), AppError> {
    info!(username = %payload.username, role = %payload.role, "admin creating user");

    validate_username(&payload.username)?;
    validate_email(&payload.email)?;
    validate_password(&payload.password)?;

    if User::find_by_username(&state.db, &payload.username)
        .await?
        .is_some()
    {
        warn!(username = %payload.username, "user creation failed: username taken");
        return Err(AppError::Conflict("Username already exists.".into()));
    }
    if User::find_by_email(&state.db, &payload.email)
        .await?
        .is_some()
    {
        warn!(email = %payload.email, "user creation failed: email taken");
        return Err(AppError::Conflict("Email already exists.".into()));
    }

    let hash = password::hash_password(&payload.password)?;

    // Role comes from the caller: an admin may mint other admins.
    let user = User::insert(
        &state.db,
        &payload.username,
        &payload.email,
        &hash,
        payload.role,
    )
    .await?;

    info!(user_id = %user.id, username = %user.username, role = %user.role, "user created by admin");

    let mut headers = HeaderMap::new();
    headers.insert(
        axum::http::header::LOCATION,
        format!("/api/Users/{}", user.id).parse().unwrap(),
    );

    Ok((StatusCode::CREATED, headers, Json(UserResponse::from(user))))
}

#[instrument(skip(state, admin, payload), fields(admin = %admin.0.username))]
pub async fn update_user(
    State(state): State<AppState>,
    admin: AdminUser,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<StatusCode, AppError> {
    if id != payload.id {
        warn!(path_id = %id, body_id = %payload.id, "mismatched ids on update");
        return Err(AppError::Validation("ID mismatch.".into()));
    }

    validate_username(&payload.username)?;
    validate_email(&payload.email)?;

    // A unique-index violation here (duplicate username/email) comes
    // back as Conflict through the sqlx error mapping.
    let updated = User::update(&state.db, id, &payload.username, &payload.email, payload.role)
        .await?;
    if updated == 0 {
        warn!(%id, "user not found for update");
        return Err(AppError::NotFound("User not found.".into()));
    }

    info!(%id, "user updated by admin");
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state, admin), fields(admin = %admin.0.username))]
pub async fn delete_user(
    State(state): State<AppState>,
    admin: AdminUser,
    Path(id): Path<i32>,
) -> Result<StatusCode, AppError> {
    let deleted = User::delete(&state.db, id).await?;
    if deleted == 0 {
        warn!(%id, "user not found for deletion");
        return Err(AppError::NotFound("User not found.".into()));
    }

    info!(%id, "user deleted by admin");
    Ok(StatusCode::NO_CONTENT)
}
