use axum::{routing::get, Json, Router};
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::{
    auth::extractors::AuthUser, error::AppError, state::AppState, users::repo_types::Role,
};

#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    pub message: String,
}

pub fn dashboard_routes() -> Router<AppState> {
    Router::new().route("/Dashboard", get(get_dashboard))
}

/// Role-specific greeting for any authenticated caller. The role claim
/// is re-parsed here, so a token carrying an unknown role is Forbidden
/// rather than shown a dashboard.
#[instrument(skip(claims), fields(username = %claims.username))]
pub async fn get_dashboard(
    AuthUser(claims): AuthUser,
) -> Result<Json<DashboardResponse>, AppError> {
    info!(role = %claims.role, "dashboard accessed");

    match claims.role.parse::<Role>() {
        Ok(Role::Admin) => Ok(Json(DashboardResponse {
            message: format!(
                "Welcome, {}! This is the Admin Dashboard. You have full administrative privileges.",
                claims.username
            ),
        })),
        Ok(Role::User) => Ok(Json(DashboardResponse {
            message: format!(
                "Welcome, {}! This is the User Dashboard. You have standard user access.",
                claims.username
            ),
        })),
        Err(()) => {
            warn!(role = %claims.role, "dashboard access with unrecognized role");
            Err(AppError::Forbidden("Access denied for your role.".into()))
        }
    }
}
