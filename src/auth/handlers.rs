use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{LoginRequest, LoginResponse, RegisterRequest, RegisterResponse},
        jwt::JwtKeys,
        password,
    },
    error::AppError,
    state::AppState,
    users::repo_types::{Role, User},
    validate::{validate_email, validate_password, validate_username},
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/Auth/register", post(register))
        .route("/Auth/login", post(login))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), AppError> {
    info!(username = %payload.username, "registration attempt");

    validate_username(&payload.username)?;
    validate_email(&payload.email)?;
    validate_password(&payload.password)?;

    if User::find_by_username(&state.db, &payload.username)
        .await?
        .is_some()
    {
        warn!(username = %payload.username, "registration failed: username taken");
        return Err(AppError::Conflict("Username already exists.".into()));
    }
    if User::find_by_email(&state.db, &payload.email)
        .await?
        .is_some()
    {
        warn!(email = %payload.email, "registration failed: email taken");
        return Err(AppError::Conflict("Email already exists.".into()));
    }

    let hash = password::hash_password(&payload.password)?;

    // Self-registration always yields a regular user; the unique
    // indexes catch any racing duplicate past the checks above.
    let user = User::insert(&state.db, &payload.username, &payload.email, &hash, Role::User)
        .await?;

    info!(user_id = %user.id, username = %user.username, "user registered");
    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "User registered successfully. You can now log in.".into(),
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    info!(username = %payload.username, "login attempt");

    if payload.username.is_empty() || payload.password.is_empty() {
        return Err(AppError::Validation(
            "Username and password are required".into(),
        ));
    }

    // Unknown username and wrong password answer identically.
    let user = match User::find_by_username(&state.db, &payload.username).await? {
        Some(u) => u,
        None => {
            warn!(username = %payload.username, "invalid credentials");
            return Err(AppError::Unauthorized("Invalid credentials".into()));
        }
    };

    if !password::verify_password(&payload.password, &user.password_hash)? {
        warn!(username = %payload.username, "invalid credentials");
        return Err(AppError::Unauthorized("Invalid credentials".into()));
    }

    let keys = JwtKeys::from_ref(&state);
    let token = keys.sign(&user)?;

    info!(user_id = %user.id, username = %user.username, role = %user.role, "user logged in");
    Ok(Json(LoginResponse { token }))
}
