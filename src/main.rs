//! Blog Content Server - Main Application Entry Point
//!
//! REST backend for a small blog CMS. Anyone can read blogs and categories;
//! signed-in administrators manage users, blogs and categories through the
//! `/admin` routes using a bearer token obtained at login.
//!
//! # Architecture
//!
//! - **Web Framework**: Axum (async HTTP server)
//! - **Database**: PostgreSQL with sqlx (async queries, per-call deadline)
//! - **Authentication**: opaque base32 tokens, stored only as SHA-256 digests
//! - **Passwords**: argon2id
//! - **Format**: JSON requests/responses
//!
//! # Startup Flow
//!
//! 1. Load configuration from environment variables
//! 2. Create database connection pool
//! 3. Run database migrations
//! 4. Start the expired-token reaper (unless disabled)
//! 5. Build HTTP router with routes and middleware
//! 6. Start server on configured port

mod config;
mod db;
mod error;
mod handlers;
mod middleware;
mod models;
mod services;
mod state;

use tracing_subscriber::EnvFilter;

use axum::{
    Router,
    http::{
        HeaderValue, Method,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
    middleware as axum_middleware,
    routing::{get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{config::Config, services::token_service, state::AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging with tracing subscriber. Reads RUST_LOG environment variable (defaults to "info" level)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    // Load configuration
    let config = Config::from_env()?;
    tracing::info!("Configuration loaded");

    // Create database pool
    let pool = db::create_pool(
        &config.database_url,
        config.db_max_connections,
        config.db_timeout(),
    )
    .await?;
    tracing::info!("Database pool created");

    // Run migrations
    db::run_migrations(&pool).await?;
    tracing::info!("Database migrations complete");

    let state = AppState::new(db::Store::new(pool, config.db_timeout()), config.token_ttl());

    match config.token_reap_interval() {
        Some(every) => {
            token_service::spawn_reaper(state.tokens(), every);
        }
        None => tracing::info!("Expired token reaper disabled"),
    }

    let app = app(state).layer(cors_layer(&config)?);

    // Bind to network address and start server
    let addr = format!("0.0.0.0:{}", config.server_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Build the HTTP router: public routes plus the token-gated `/admin` group.
fn app(state: AppState) -> Router {
    // Admin routes (bearer token required)
    let admin_routes = Router::new()
        // User management
        .route("/admin/users", get(handlers::users::all_users))
        .route("/admin/users/{id}", get(handlers::users::get_user))
        .route("/admin/users/save", post(handlers::users::save_user))
        .route("/admin/users/delete", post(handlers::users::delete_user))
        .route(
            "/admin/log-user-out/{id}",
            post(handlers::users::log_user_out_and_set_inactive),
        )
        // Blog management
        .route("/admin/blogs/{id}", get(handlers::blogs::blog_by_id))
        .route("/admin/blogs/save", post(handlers::blogs::save_blog))
        .route("/admin/blogs/delete", post(handlers::blogs::delete_blog))
        // Category management
        .route(
            "/admin/categories/save",
            post(handlers::categories::save_category),
        )
        // Apply authentication middleware to all routes in this group
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::auth_middleware,
        ));

    Router::new()
        // Public routes (no authentication required)
        .route("/health", get(handlers::health::health_check))
        .route("/users/login", post(handlers::auth::login))
        .route("/users/logout", post(handlers::auth::logout))
        .route("/validate-token", post(handlers::auth::validate_token))
        .route("/api/blogs", get(handlers::blogs::all_blogs))
        .route("/api/blogs/page", get(handlers::blogs::blogs_page))
        .route("/api/blogs/{slug}", get(handlers::blogs::one_blog))
        .route("/api/categories", get(handlers::categories::all_categories))
        .route("/api/categories/{id}", get(handlers::categories::one_category))
        // Merge admin routes
        .merge(admin_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// CORS policy: any origin when `CORS_ALLOWED_ORIGINS` is unset, else the listed ones.
fn cors_layer(config: &Config) -> anyhow::Result<CorsLayer> {
    let origins = config.cors_origins();
    if origins.is_empty() {
        return Ok(CorsLayer::permissive());
    }

    let origins = origins
        .iter()
        .map(|origin| origin.parse::<HeaderValue>())
        .collect::<Result<Vec<_>, _>>()?;
    tracing::info!("CORS restricted to {} origin(s)", origins.len());

    Ok(CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
        .allow_credentials(true))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::testing::lazy_store;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn test_app() -> Router {
        app(AppState::new(lazy_store(), chrono::Duration::hours(24)))
    }

    async fn send(request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = test_app().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, body)
    }

    fn admin_request(authorization: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().method("GET").uri("/admin/users");
        if let Some(value) = authorization {
            builder = builder.header("Authorization", value);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn admin_routes_require_authorization_header() {
        let (status, body) = send(admin_request(None)).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"]["code"], "malformed_header");
    }

    #[tokio::test]
    async fn non_bearer_scheme_is_malformed_header() {
        let (status, body) = send(admin_request(Some("Basic xyz"))).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"]["code"], "malformed_header");
    }

    #[tokio::test]
    async fn short_bearer_token_is_malformed_token() {
        let (status, body) = send(admin_request(Some("Bearer ab"))).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"]["code"], "malformed_token");
    }

    #[tokio::test]
    async fn invalid_page_is_rejected_on_public_route() {
        let request = Request::builder()
            .uri("/api/blogs/page?page=0&page_size=10")
            .body(Body::empty())
            .unwrap();

        let (status, body) = send(request).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "invalid_request");
    }

    #[test]
    fn cors_accepts_listed_origins() {
        let config: Config = envy::from_iter([
            ("DATABASE_URL".to_string(), "postgres://localhost/blog".to_string()),
            (
                "CORS_ALLOWED_ORIGINS".to_string(),
                "http://localhost:3000, https://blog.example.com".to_string(),
            ),
        ])
        .unwrap();

        assert!(cors_layer(&config).is_ok());
    }

    /// Tests below need a PostgreSQL server: `DATABASE_URL=... cargo test -- --ignored`
    mod db {
        use super::*;
        use crate::{
            db::{DbPool, Store},
            models::user::UserRequest,
            services::user_service::UserService,
        };
        use serde_json::{Value, json};
        use std::time::Duration;

        struct Harness {
            app: Router,
            users: UserService,
        }

        fn harness(pool: DbPool) -> Harness {
            let store = Store::new(pool, Duration::from_secs(5));
            Harness {
                app: app(AppState::new(store.clone(), chrono::Duration::hours(24))),
                users: UserService::new(store),
            }
        }

        async fn call(
            app: &Router,
            method: &str,
            uri: &str,
            token: Option<&str>,
            body: Option<Value>,
        ) -> (StatusCode, Value) {
            let mut builder = Request::builder().method(method).uri(uri);
            if let Some(token) = token {
                builder = builder.header("Authorization", format!("Bearer {token}"));
            }
            let request = match body {
                Some(body) => builder
                    .header("Content-Type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
                None => builder.body(Body::empty()).unwrap(),
            };

            let response = app.clone().oneshot(request).await.unwrap();
            let status = response.status();
            let bytes = response.into_body().collect().await.unwrap().to_bytes();
            let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
            (status, body)
        }

        async fn seed_user(users: &UserService, email: &str, first_name: &str, active: i32) -> i32 {
            users
                .insert(&UserRequest {
                    id: 0,
                    email: email.to_string(),
                    first_name: first_name.to_string(),
                    last_name: "Smith".to_string(),
                    password: Some("password".to_string()),
                    active,
                })
                .await
                .unwrap()
        }

        async fn login(app: &Router, email: &str, password: &str) -> (StatusCode, Value) {
            call(
                app,
                "POST",
                "/users/login",
                None,
                Some(json!({ "email": email, "password": password })),
            )
            .await
        }

        async fn login_token(app: &Router, email: &str) -> String {
            let (status, body) = login(app, email, "password").await;
            assert_eq!(status, StatusCode::OK, "{body}");
            body["token"].as_str().unwrap().to_string()
        }

        async fn is_valid(app: &Router, token: &str) -> bool {
            let (status, body) = call(
                app,
                "POST",
                "/validate-token",
                None,
                Some(json!({ "token": token })),
            )
            .await;
            assert_eq!(status, StatusCode::OK);
            body["valid"].as_bool().unwrap()
        }

        #[sqlx::test(migrations = "./migrations")]
        #[ignore = "requires DATABASE_URL pointing at PostgreSQL"]
        async fn login_returns_token_and_user_and_opens_admin_routes(pool: DbPool) {
            let h = harness(pool);
            let id = seed_user(&h.users, "jack@example.com", "Jack", 1).await;

            let (status, body) = login(&h.app, "jack@example.com", "password").await;

            assert_eq!(status, StatusCode::OK);
            let token = body["token"].as_str().unwrap();
            assert_eq!(token.len(), 26);
            assert!(body["expiry"].is_string());
            assert_eq!(body["user"]["id"], id);
            assert_eq!(body["user"]["email"], "jack@example.com");
            assert!(body["user"].get("password").is_none());

            let (status, users) = call(&h.app, "GET", "/admin/users", Some(token), None).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(users.as_array().unwrap().len(), 1);
            assert!(users[0].get("password").is_none());
        }

        #[sqlx::test(migrations = "./migrations")]
        #[ignore = "requires DATABASE_URL pointing at PostgreSQL"]
        async fn unknown_email_and_wrong_password_look_the_same(pool: DbPool) {
            let h = harness(pool);
            seed_user(&h.users, "jack@example.com", "Jack", 1).await;

            let (unknown_status, unknown_body) = login(&h.app, "nobody@example.com", "password").await;
            let (wrong_status, wrong_body) = login(&h.app, "jack@example.com", "wrong").await;

            assert_eq!(unknown_status, StatusCode::UNAUTHORIZED);
            assert_eq!(wrong_status, StatusCode::UNAUTHORIZED);
            assert_eq!(unknown_body["error"]["code"], "invalid_credentials");
            assert_eq!(unknown_body, wrong_body);
        }

        #[sqlx::test(migrations = "./migrations")]
        #[ignore = "requires DATABASE_URL pointing at PostgreSQL"]
        async fn inactive_user_cannot_log_in(pool: DbPool) {
            let h = harness(pool);
            seed_user(&h.users, "jack@example.com", "Jack", 0).await;

            let (status, body) = login(&h.app, "jack@example.com", "password").await;

            assert_eq!(status, StatusCode::FORBIDDEN);
            assert_eq!(body["error"]["code"], "inactive_user");
        }

        #[sqlx::test(migrations = "./migrations")]
        #[ignore = "requires DATABASE_URL pointing at PostgreSQL"]
        async fn logout_revokes_the_token(pool: DbPool) {
            let h = harness(pool);
            seed_user(&h.users, "jack@example.com", "Jack", 1).await;
            let token = login_token(&h.app, "jack@example.com").await;
            assert!(is_valid(&h.app, &token).await);

            let (status, _) = call(
                &h.app,
                "POST",
                "/users/logout",
                None,
                Some(json!({ "token": token })),
            )
            .await;

            assert_eq!(status, StatusCode::NO_CONTENT);
            assert!(!is_valid(&h.app, &token).await);
            let (status, body) = call(&h.app, "GET", "/admin/users", Some(&token), None).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED);
            assert_eq!(body["error"]["code"], "invalid_token");
        }

        #[sqlx::test(migrations = "./migrations")]
        #[ignore = "requires DATABASE_URL pointing at PostgreSQL"]
        async fn saved_blog_is_authored_by_session_user(pool: DbPool) {
            let h = harness(pool);
            let jack = seed_user(&h.users, "jack@example.com", "Jack", 1).await;
            let token = login_token(&h.app, "jack@example.com").await;

            let (status, blog) = call(
                &h.app,
                "POST",
                "/admin/blogs/save",
                Some(&token),
                Some(json!({ "title": "My Blog", "content": "yolo content", "category_ids": [] })),
            )
            .await;

            assert_eq!(status, StatusCode::OK, "{blog}");
            assert_eq!(blog["createdby_id"], jack);
            assert_eq!(blog["created_by"]["first_name"], "Jack");
            assert_eq!(blog["slug"], "my-blog");

            let (status, public) = call(&h.app, "GET", "/api/blogs/my-blog", None, None).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(public["id"], blog["id"]);
        }

        #[sqlx::test(migrations = "./migrations")]
        #[ignore = "requires DATABASE_URL pointing at PostgreSQL"]
        async fn saving_user_as_inactive_revokes_their_tokens(pool: DbPool) {
            let h = harness(pool);
            seed_user(&h.users, "jack@example.com", "Jack", 1).await;
            let jill = seed_user(&h.users, "jill@example.com", "Jill", 1).await;
            let admin_token = login_token(&h.app, "jack@example.com").await;
            let jill_token = login_token(&h.app, "jill@example.com").await;

            let (status, saved) = call(
                &h.app,
                "POST",
                "/admin/users/save",
                Some(&admin_token),
                Some(json!({
                    "id": jill,
                    "email": "jill@example.com",
                    "first_name": "Jill",
                    "last_name": "Smith",
                    "active": 0
                })),
            )
            .await;

            assert_eq!(status, StatusCode::OK, "{saved}");
            assert_eq!(saved["active"], 0);
            assert!(!is_valid(&h.app, &jill_token).await);
            assert!(is_valid(&h.app, &admin_token).await);

            let (status, _) = login(&h.app, "jill@example.com", "password").await;
            assert_eq!(status, StatusCode::FORBIDDEN);
        }
    }
}
