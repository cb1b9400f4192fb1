use std::net::SocketAddr;

use axum::{routing::get, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;
use crate::{auth, dashboard, users};

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .nest(
            "/api",
            Router::new()
                .merge(auth::router())
                .merge(users::router())
                .merge(dashboard::router())
                .route("/health", get(|| async { "ok" })),
        )
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!("http_request", %method, uri = %uri)
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     _latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        if status.is_server_error() {
                            tracing::error!(%status, "response");
                        } else {
                            tracing::info!(%status, "response");
                        }
                    },
                ),
        )
}

pub async fn serve(app: Router) -> anyhow::Result<()> {
    let addr: SocketAddr = format!(
        "{}:{}",
        std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
        std::env::var("APP_PORT").unwrap_or_else(|_| "8080".into())
    )
    .parse()?;

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

// Authorization paths reject before any handler touches the pool, so
// these run against the lazily-connecting fake state.
#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::extract::FromRef;
    use axum::http::{header, Method, Request, StatusCode};
    use jsonwebtoken::{encode, Header};
    use time::OffsetDateTime;
    use tower::ServiceExt;
    use uuid::Uuid;

    use crate::auth::jwt::{Claims, JwtKeys};
    use crate::users::repo_types::{Role, User};

    fn app() -> Router {
        build_app(AppState::fake())
    }

    fn token_for(role: Role) -> String {
        let keys = JwtKeys::from_ref(&AppState::fake());
        let user = User {
            id: 5,
            username: "tester".into(),
            email: "tester@x.com".into(),
            password_hash: "unused".into(),
            role,
            created_at: OffsetDateTime::now_utc(),
            updated_at: None,
        };
        keys.sign(&user).expect("sign")
    }

    fn token_with_role_string(role: &str) -> String {
        let keys = JwtKeys::from_ref(&AppState::fake());
        let now = OffsetDateTime::now_utc().unix_timestamp();
        let claims = Claims {
            sub: 5,
            username: "tester".into(),
            role: role.into(),
            email: "tester@x.com".into(),
            jti: Uuid::new_v4(),
            iat: now as usize,
            exp: (now + 30 * 60) as usize,
            iss: keys.issuer.clone(),
            aud: keys.audience.clone(),
        };
        encode(&Header::default(), &claims, &keys.encoding).expect("encode")
    }

    fn get_req(uri: &str, bearer: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().method(Method::GET).uri(uri);
        if let Some(token) = bearer {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        builder.body(Body::empty()).unwrap()
    }

    fn json_req(method: Method, uri: &str, bearer: Option<&str>, body: &str) -> Request<Body> {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = bearer {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    #[tokio::test]
    async fn health_is_open() {
        let response = app().oneshot(get_req("/api/health", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn dashboard_without_token_is_unauthorized() {
        let response = app().oneshot(get_req("/api/Dashboard", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn dashboard_with_garbage_token_is_unauthorized() {
        let response = app()
            .oneshot(get_req("/api/Dashboard", Some("not.a.jwt")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn dashboard_accepts_user_and_admin_roles() {
        let response = app()
            .oneshot(get_req("/api/Dashboard", Some(&token_for(Role::User))))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app()
            .oneshot(get_req("/api/Dashboard", Some(&token_for(Role::Admin))))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn dashboard_forbids_unrecognized_role_claim() {
        let response = app()
            .oneshot(get_req("/api/Dashboard", Some(&token_with_role_string("Root"))))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn admin_endpoints_reject_missing_token_as_unauthorized() {
        let response = app().oneshot(get_req("/api/Users", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn admin_endpoints_reject_user_role_as_forbidden() {
        let token = token_for(Role::User);

        let response = app()
            .oneshot(get_req("/api/Users", Some(&token)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = app()
            .oneshot(
                Request::builder()
                    .method(Method::DELETE)
                    .uri("/api/Users/1")
                    .header(header::AUTHORIZATION, format!("Bearer {token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn register_rejects_malformed_fields() {
        let response = app()
            .oneshot(json_req(
                Method::POST,
                "/api/Auth/register",
                None,
                r#"{"username":"alice","password":"secret1","email":"not-an-email"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = app()
            .oneshot(json_req(
                Method::POST,
                "/api/Auth/register",
                None,
                r#"{"username":"al","password":"secret1","email":"al@x.com"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn login_rejects_empty_credentials() {
        let response = app()
            .oneshot(json_req(
                Method::POST,
                "/api/Auth/login",
                None,
                r#"{"username":"alice","password":""}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn update_rejects_mismatched_ids_before_touching_anything() {
        let response = app()
            .oneshot(json_req(
                Method::PUT,
                "/api/Users/5",
                Some(&token_for(Role::Admin)),
                r#"{"id":6,"username":"alice","email":"alice@x.com","role":"User"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
