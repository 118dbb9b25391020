use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::{TimeDelta, Utc};
use sea_orm::{Database, DatabaseConnection, EntityTrait};
use sea_orm_migration::MigratorTrait;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use ridelink_backend::{
    config::Config,
    db::locations::insert_location,
    entities::location,
    error::{AppError, AppResult},
    group::ActivityWindow,
    middleware::auth::IdentityGuard,
    routes::create_router,
    utils::jwt::Claims,
    AppState,
};

const PASSWORD: &str = "test123";

struct TestApp {
    router: Router,
    db: DatabaseConnection,
}

fn test_config() -> Config {
    Config {
        database_url: "sqlite::memory:".to_string(),
        jwt_secret: "test-secret".to_string(),
        jwt_expiration_hours: 1,
        server_host: "127.0.0.1".to_string(),
        server_port: 0,
        activity_window: ActivityWindow::default(),
    }
}

/// Create a fresh migrated database for each test
async fn create_test_db() -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:")
        .await
        .expect("Failed to connect to test database");

    migration::Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");

    db
}

async fn spawn_app() -> TestApp {
    let db = create_test_db().await;
    let state = AppState::new(db.clone(), test_config());
    TestApp {
        router: create_router(state),
        db,
    }
}

impl TestApp {
    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(Method::GET).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        self.send(builder.body(Body::from(body.to_string())).unwrap())
            .await
    }

    /// Register and log in, returning (user id, access token)
    async fn rider(&self, email: &str) -> (Uuid, String) {
        let (status, user) = self
            .post("/auth/register", None, json!({ "email": email, "password": PASSWORD }))
            .await;
        assert_eq!(status, StatusCode::OK);

        let (status, token) = self
            .post("/auth/login", None, json!({ "email": email, "password": PASSWORD }))
            .await;
        assert_eq!(status, StatusCode::OK);

        let id = user["id"].as_str().unwrap().parse().unwrap();
        (id, token["access_token"].as_str().unwrap().to_string())
    }

    async fn report(&self, token: &str, latitude: f64, longitude: f64) -> Value {
        let (status, body) = self
            .post(
                "/locations",
                Some(token),
                json!({ "latitude": latitude, "longitude": longitude }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body
    }
}

#[tokio::test]
async fn test_health() {
    let app = spawn_app().await;
    let (status, body) = app.get("/", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "RideLink API is running!");
}

#[tokio::test]
async fn test_register_and_duplicate() {
    let app = spawn_app().await;

    let (status, body) = app
        .post(
            "/auth/register",
            None,
            json!({ "email": "test_rider@example.com", "password": PASSWORD }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], "test_rider@example.com");
    assert!(body["id"].is_string());
    assert!(body.get("password_hash").is_none());

    let (status, body) = app
        .post(
            "/auth/register",
            None,
            json!({ "email": "test_rider@example.com", "password": PASSWORD }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Email already registered");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_registration_of_same_email() {
    let app = spawn_app().await;

    let mut handles = Vec::new();
    for _ in 0..8 {
        let router = app.router.clone();
        handles.push(tokio::spawn(async move {
            let request = Request::builder()
                .method(Method::POST)
                .uri("/auth/register")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    json!({ "email": "race@example.com", "password": PASSWORD }).to_string(),
                ))
                .unwrap();
            router.oneshot(request).await.unwrap().status()
        }));
    }

    let mut statuses = Vec::new();
    for handle in handles {
        statuses.push(handle.await.unwrap());
    }

    let created = statuses.iter().filter(|s| **s == StatusCode::OK).count();
    let rejected = statuses
        .iter()
        .filter(|s| **s == StatusCode::BAD_REQUEST)
        .count();
    assert_eq!(created, 1, "{statuses:?}");
    assert_eq!(rejected, 7, "{statuses:?}");
}

#[tokio::test]
async fn test_login() {
    let app = spawn_app().await;
    app.rider("test_rider@example.com").await;

    let (status, body) = app
        .post(
            "/auth/login",
            None,
            json!({ "email": "test_rider@example.com", "password": PASSWORD }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["token_type"], "bearer");
    assert!(body["access_token"].is_string());

    let (status, _) = app
        .post(
            "/auth/login",
            None,
            json!({ "email": "test_rider@example.com", "password": "wrongpassword" }),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_login_with_password_form() {
    let app = spawn_app().await;
    let (id, _) = app.rider("test_rider@example.com").await;

    let request = Request::builder()
        .method(Method::POST)
        .uri("/auth/login")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(format!(
            "username=test_rider%40example.com&password={}",
            PASSWORD
        )))
        .unwrap();
    let (status, body) = app.send(request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["token_type"], "bearer");

    let token = body["access_token"].as_str().unwrap();
    let (status, me) = app.get("/auth/me", Some(token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["id"], id.to_string());

    let request = Request::builder()
        .method(Method::POST)
        .uri("/auth/login")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from("username=test_rider%40example.com&password=wrong"))
        .unwrap();
    let (status, _) = app.send(request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_me_requires_token() {
    let app = spawn_app().await;
    let (id, token) = app.rider("test_rider@example.com").await;

    let (status, body) = app.get("/auth/me", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], "test_rider@example.com");
    assert_eq!(body["id"], id.to_string());

    let (status, body) = app.get("/auth/me", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthorized");

    let (status, _) = app.get("/auth/me", Some("not-a-jwt")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_post_location() {
    let app = spawn_app().await;
    let (id, token) = app.rider("test_rider@example.com").await;

    let body = app.report(&token, 48.13, 11.57).await;
    assert!(body["id"].is_number());
    assert_eq!(body["user_id"], id.to_string());
    assert_eq!(body["latitude"], 48.13);
    assert_eq!(body["longitude"], 11.57);
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn test_post_location_rejects_bad_input() {
    let app = spawn_app().await;
    let (_, token) = app.rider("test_rider@example.com").await;

    let (status, _) = app
        .post("/locations", None, json!({ "latitude": 1.0, "longitude": 1.0 }))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = app
        .post(
            "/locations",
            Some(&token),
            json!({ "latitude": 91.0, "longitude": 0.0 }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "bad_request");
}

#[tokio::test]
async fn test_rider_post_rate_limit() {
    let app = spawn_app().await;
    let (_, token) = app.rider("busy@example.com").await;

    let mut accepted = 0;
    let mut limited = None;
    for _ in 0..60 {
        let (status, body) = app
            .post(
                "/locations",
                Some(&token),
                json!({ "latitude": 48.13, "longitude": 11.57 }),
            )
            .await;
        if status == StatusCode::TOO_MANY_REQUESTS {
            limited = Some(body);
            break;
        }
        assert_eq!(status, StatusCode::CREATED);
        accepted += 1;
    }

    let body = limited.expect("rider was never rate limited");
    assert_eq!(body["error"], "rate_limited");
    assert!(accepted >= 30, "only {accepted} posts accepted before limiting");

    // Other riders keep their own quota
    let (_, other) = app.rider("calm@example.com").await;
    app.report(&other, 48.0, 11.0).await;
}

#[tokio::test]
async fn test_failed_insert_is_store_failure_and_leaves_no_row() {
    let app = spawn_app().await;

    let result = insert_location(&app.db, Uuid::new_v4(), 1.0, 1.0, Utc::now()).await;
    assert!(matches!(result, Err(AppError::StoreFailure(_))), "{result:?}");

    let rows = location::Entity::find().all(&app.db).await.unwrap();
    assert!(rows.is_empty());
}

#[tokio::test]
async fn test_post_location_for_unknown_user_is_store_failure() {
    let db = create_test_db().await;
    let mut state = AppState::new(db.clone(), test_config());
    state.guard = Arc::new(FixedGuard {
        token: "let-me-in",
        user_id: Uuid::new_v4(),
    });
    let app = TestApp {
        router: create_router(state),
        db,
    };

    let (status, body) = app
        .post(
            "/locations",
            Some("let-me-in"),
            json!({ "latitude": 1.0, "longitude": 1.0 }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "store_failure");

    let rows = location::Entity::find().all(&app.db).await.unwrap();
    assert!(rows.is_empty());
}

#[tokio::test]
async fn test_group_status_needs_two_riders() {
    let app = spawn_app().await;

    let (status, body) = app.get("/locations/group/status", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "insufficient_riders");

    // Several reports from the same rider still count once
    let (_, token) = app.rider("solo@example.com").await;
    app.report(&token, 0.0, 0.0).await;
    app.report(&token, 0.0, 1.0).await;

    let (status, body) = app.get("/locations/group/status", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "insufficient_riders");
}

#[tokio::test]
async fn test_group_status_farthest_pair() {
    let app = spawn_app().await;
    let (a, token_a) = app.rider("a@example.com").await;
    let (b, token_b) = app.rider("b@example.com").await;
    let (_, token_c) = app.rider("c@example.com").await;

    app.report(&token_a, 0.0, 0.0).await;
    app.report(&token_b, 0.0, 1.0).await;
    app.report(&token_c, 0.0, 0.5).await;

    let (status, body) = app.get("/locations/group/status", None).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["total_riders"], 3);

    let distance = body["distance_meters"].as_f64().unwrap();
    assert!((distance - 111_195.0).abs() < 1_111.95);

    let mut ends = vec![
        body["front_user"]["id"].as_str().unwrap().to_string(),
        body["last_user"]["id"].as_str().unwrap().to_string(),
    ];
    ends.sort();
    let mut expected = vec![a.to_string(), b.to_string()];
    expected.sort();
    assert_eq!(ends, expected);

    assert!(body["front_user"]["lat"].is_number());
    assert!(body["last_user"]["timestamp"].is_string());
    assert!(body["group_last_updated"].is_string());
}

#[tokio::test]
async fn test_group_status_uses_latest_report() {
    let app = spawn_app().await;
    let (_, token_a) = app.rider("a@example.com").await;
    let (_, token_b) = app.rider("b@example.com").await;

    app.report(&token_a, 0.0, 0.0).await;
    app.report(&token_b, 0.0, 5.0).await;
    // b catches up
    app.report(&token_b, 0.0, 1.0).await;

    let (status, body) = app.get("/locations/group/status", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_riders"], 2);
    let distance = body["distance_meters"].as_f64().unwrap();
    assert!(distance < 120_000.0);
}

#[tokio::test]
async fn test_group_status_ignores_stale_riders() {
    let app = spawn_app().await;
    let (_, token_a) = app.rider("a@example.com").await;
    let (_, token_b) = app.rider("b@example.com").await;
    let (stale, _) = app.rider("stale@example.com").await;

    app.report(&token_a, 0.0, 0.0).await;
    app.report(&token_b, 0.0, 0.1).await;

    let two_days_ago = Utc::now() - TimeDelta::hours(48);
    insert_location(&app.db, stale, 60.0, 60.0, two_days_ago)
        .await
        .unwrap();

    let (status, body) = app.get("/locations/group/status", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_riders"], 2);
    assert_ne!(body["front_user"]["id"], stale.to_string());
    assert_ne!(body["last_user"]["id"], stale.to_string());
}

#[tokio::test]
async fn test_group_status_is_repeatable() {
    let app = spawn_app().await;
    for (i, email) in ["a@example.com", "b@example.com", "c@example.com"]
        .iter()
        .enumerate()
    {
        let (_, token) = app.rider(email).await;
        app.report(&token, i as f64 * 0.2, i as f64 * -0.3).await;
    }

    let (_, mut first) = app.get("/locations/group/status", None).await;
    let (_, mut second) = app.get("/locations/group/status", None).await;

    // Only the computation time may differ
    first.as_object_mut().unwrap().remove("group_last_updated");
    second.as_object_mut().unwrap().remove("group_last_updated");
    assert_eq!(first, second);
}

struct FixedGuard {
    token: &'static str,
    user_id: Uuid,
}

impl IdentityGuard for FixedGuard {
    fn authenticate(&self, token: &str) -> AppResult<Claims> {
        if token != self.token {
            return Err(AppError::Unauthorized("Unknown credential".to_string()));
        }
        Ok(Claims {
            sub: self.user_id,
            email: "fixed@example.com".to_string(),
            exp: 0,
            iat: 0,
        })
    }
}

#[tokio::test]
async fn test_write_path_uses_injected_guard() {
    let db = create_test_db().await;

    // Register through the regular router so the user row exists
    let regular = TestApp {
        router: create_router(AppState::new(db.clone(), test_config())),
        db: db.clone(),
    };
    let (user_id, jwt) = regular.rider("fixed@example.com").await;

    let mut state = AppState::new(db.clone(), test_config());
    state.guard = Arc::new(FixedGuard {
        token: "let-me-in",
        user_id,
    });
    let app = TestApp {
        router: create_router(state),
        db,
    };

    let body = app.report("let-me-in", 10.0, 10.0).await;
    assert_eq!(body["user_id"], user_id.to_string());

    // The JWT is meaningless to this guard
    let (status, _) = app
        .post(
            "/locations",
            Some(&jwt),
            json!({ "latitude": 1.0, "longitude": 1.0 }),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
