use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use bolao::config::{Config, SecurityConfig};
use bolao::db::migrator::DEFAULT_API_KEY;
use chrono::{Duration, Utc};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

async fn spawn_app() -> Router {
    let mut config = Config::default();
    config.general.database_path = "sqlite::memory:".to_string();
    config.security = SecurityConfig {
        argon2_memory_cost_kib: 1024,
        argon2_time_cost: 1,
        argon2_parallelism: 1,
    };

    let state = bolao::api::create_app_state_from_config(config, None)
        .await
        .expect("Failed to create app state");
    bolao::api::router(state).await
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

fn get(uri: &str, api_key: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(key) = api_key {
        builder = builder.header("X-Api-Key", key);
    }
    builder.body(Body::empty()).unwrap()
}

fn with_json(method: &str, uri: &str, api_key: Option<&str>, body: &Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(key) = api_key {
        builder = builder.header("X-Api-Key", key);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

/// Registers and logs in a user, returning their API key.
async fn player(app: &Router, username: &str) -> String {
    let credentials = json!({ "username": username, "password": "password123" });

    let (status, _) = send(app, with_json("POST", "/api/auth/register", None, &credentials)).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(app, with_json("POST", "/api/auth/login", None, &credentials)).await;
    assert_eq!(status, StatusCode::OK);
    body["data"]["api_key"].as_str().unwrap().to_string()
}

async fn create_match(app: &Router, home: &str, away: &str, hours: i64) -> i64 {
    let kickoff = (Utc::now() + Duration::hours(hours)).to_rfc3339();
    let (status, body) = send(
        app,
        with_json(
            "POST",
            "/api/admin/matches",
            Some(DEFAULT_API_KEY),
            &json!({ "round": 1, "homeTeam": home, "awayTeam": away, "kickoff": kickoff }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["data"]["id"].as_i64().unwrap()
}

#[tokio::test]
async fn test_auth_required() {
    let app = spawn_app().await;

    let (status, _) = send(&app, get("/api/matches", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, get("/api/matches", Some("wrong-key"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(&app, get("/api/matches", Some(DEFAULT_API_KEY))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let request = Request::builder()
        .uri("/api/auth/me")
        .header("Authorization", format!("Bearer {DEFAULT_API_KEY}"))
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["username"], "admin");
    assert_eq!(body["data"]["role"], "admin");
}

#[tokio::test]
async fn test_admin_routes_forbidden_for_players() {
    let app = spawn_app().await;
    let key = player(&app, "maria").await;

    let (status, body) = send(&app, get("/api/admin/users", Some(&key))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["success"], false);

    let (status, _) = send(&app, get("/api/metrics", Some(&key))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(&app, get("/api/admin/users", Some(DEFAULT_API_KEY))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
    assert!(body["data"][0].get("api_key").is_none());
}

#[tokio::test]
async fn test_register_is_always_a_player() {
    let app = spawn_app().await;

    let (status, body) = send(
        &app,
        with_json(
            "POST",
            "/api/auth/register",
            None,
            &json!({ "username": "joao", "password": "password123", "role": "admin" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["role"], "user");
    assert_eq!(body["data"]["points"], 0);

    let (status, _) = send(
        &app,
        with_json(
            "POST",
            "/api/auth/register",
            None,
            &json!({ "username": "joao", "password": "password123" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send(
        &app,
        with_json(
            "POST",
            "/api/auth/register",
            None,
            &json!({ "username": "ana", "password": "short" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &app,
        with_json(
            "POST",
            "/api/admin/users",
            Some(DEFAULT_API_KEY),
            &json!({ "username": "referee", "password": "password123", "role": "admin" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["role"], "admin");
}

#[tokio::test]
async fn test_session_login() {
    let app = spawn_app().await;
    player(&app, "pedro").await;

    let response = app
        .clone()
        .oneshot(with_json(
            "POST",
            "/api/auth/login",
            None,
            &json!({ "username": "pedro", "password": "password123" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .expect("session cookie")
        .to_str()
        .unwrap()
        .split(';')
        .next()
        .unwrap()
        .to_string();

    let request = Request::builder()
        .uri("/api/auth/me")
        .header(header::COOKIE, cookie)
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["username"], "pedro");

    let (status, _) = send(
        &app,
        with_json(
            "POST",
            "/api/auth/login",
            None,
            &json!({ "username": "pedro", "password": "wrong-password" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_bets_and_settlement() {
    let app = spawn_app().await;
    let alice = player(&app, "alice").await;
    let bob = player(&app, "bob").await;

    let open = create_match(&app, "Flamengo", "Palmeiras", 24).await;
    let started = create_match(&app, "Santos", "Corinthians", -2).await;

    // late bet in the batch rejects the whole batch
    let (status, body) = send(
        &app,
        with_json(
            "POST",
            "/api/bets",
            Some(&alice),
            &json!([
                { "matchId": open, "homeScoreBet": 2, "awayScoreBet": 1 },
                { "matchId": started, "homeScoreBet": 0, "awayScoreBet": 0 }
            ]),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains(&started.to_string()));

    let (_, body) = send(&app, get("/api/bets", Some(&alice))).await;
    assert!(body["data"].as_array().unwrap().is_empty());

    let (status, _) = send(
        &app,
        with_json(
            "POST",
            "/api/bets",
            Some(&alice),
            &json!({ "matchId": open, "homeScoreBet": 2, "awayScoreBet": 1 }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = send(
        &app,
        with_json(
            "POST",
            "/api/bets",
            Some(&alice),
            &json!({ "matchId": open, "homeScoreBet": 0, "awayScoreBet": 0 }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send(
        &app,
        with_json(
            "POST",
            "/api/bets",
            Some(&bob),
            &json!({ "matchId": 999, "homeScoreBet": 0, "awayScoreBet": 0 }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    send(
        &app,
        with_json(
            "POST",
            "/api/bets",
            Some(&bob),
            &json!({ "matchId": open, "homeScoreBet": 1, "awayScoreBet": 1 }),
        ),
    )
    .await;

    // players cannot record results
    let result = json!({ "homeScore": 2, "awayScore": 1 });
    let uri = format!("/api/admin/matches/{open}/result");
    let (status, _) = send(&app, with_json("PUT", &uri, Some(&alice), &result)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(&app, with_json("PUT", &uri, Some(DEFAULT_API_KEY), &result)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["match"]["status"], "finished");
    assert_eq!(body["data"]["settlement"]["correct"], 1);

    let (_, body) = send(&app, with_json("PUT", &uri, Some(DEFAULT_API_KEY), &result)).await;
    assert!(body["data"]["settlement"].is_null());

    let (status, body) = send(&app, get(&format!("/api/bets/match/{open}"), Some(&alice))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["is_correct"], true);
    assert_eq!(body["data"]["points_awarded"], 1);

    let (status, body) = send(&app, get("/api/ranking", None)).await;
    assert_eq!(status, StatusCode::OK);
    let ranking = body["data"].as_array().unwrap();
    assert_eq!(ranking[0]["username"], "alice");
    assert_eq!(ranking[0]["points"], 1);
    assert_eq!(ranking[0]["position"], 1);

    let (status, _) = send(&app, get("/api/ranking?limit=0", None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_result_validation() {
    let app = spawn_app().await;
    let id = create_match(&app, "Bahia", "Vitória", 24).await;
    let uri = format!("/api/admin/matches/{id}/result");

    let (status, _) = send(
        &app,
        with_json("PUT", &uri, Some(DEFAULT_API_KEY), &json!({ "homeScore": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        with_json("PUT", &uri, Some(DEFAULT_API_KEY), &json!({ "status": "POSTPONED" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
        &app,
        with_json(
            "PUT",
            &uri,
            Some(DEFAULT_API_KEY),
            &json!({ "homeScore": 1, "awayScore": 0 }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send(
        &app,
        with_json("POST", &format!("/api/admin/matches/{id}/settle"), Some(DEFAULT_API_KEY), &json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_rounds_and_deletion() {
    let app = spawn_app().await;
    let id = create_match(&app, "Grêmio", "Internacional", 24).await;

    let key = player(&app, "carla").await;
    let (status, body) = send(&app, get("/api/matches/round/1", Some(&key))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["home_team"], "Grêmio");

    let (status, _) = send(&app, get("/api/matches/round/2", Some(&key))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let delete = |uri: String| {
        Request::builder()
            .method("DELETE")
            .uri(uri)
            .header("X-Api-Key", DEFAULT_API_KEY)
            .body(Body::empty())
            .unwrap()
    };

    let (status, _) = send(&app, delete(format!("/api/admin/matches/{id}"))).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, delete(format!("/api/admin/matches/{id}"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, delete("/api/admin/rounds/1".to_string())).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_csv_import_and_export() {
    let app = spawn_app().await;

    let csv = "home_team,away_team,kickoff\n\
               Fortaleza,Ceará,2030-03-01 19:00:00\n\
               Sport,Náutico,2030-03-01 21:00:00\n";
    let request = Request::builder()
        .method("POST")
        .uri("/api/admin/import/matches?round=4")
        .header("X-Api-Key", DEFAULT_API_KEY)
        .header(header::CONTENT_TYPE, "text/csv")
        .body(Body::from(csv))
        .unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["created"].as_array().unwrap().len(), 2);

    let response = app
        .clone()
        .oneshot(get("/api/admin/export/results/4", Some(DEFAULT_API_KEY)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "text/csv");
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let sheet = String::from_utf8(body.to_vec()).unwrap();
    assert!(sheet.starts_with("match_id,round,home_team,away_team,kickoff,home_score,away_score\n"));
    assert!(sheet.contains(",4,Fortaleza,Ceará,2030-03-01T19:00:00Z,,"));

    let bad = "home_team,away_team,kickoff\nFortaleza,Fortaleza,2030-03-01 19:00:00\n";
    let request = Request::builder()
        .method("POST")
        .uri("/api/admin/import/matches?round=4")
        .header("X-Api-Key", DEFAULT_API_KEY)
        .body(Body::from(bad))
        .unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().starts_with("Line 2"));
}

#[tokio::test]
async fn test_inactive_user_is_locked_out() {
    let app = spawn_app().await;
    let key = player(&app, "lucas").await;

    let (_, body) = send(&app, get("/api/auth/me", Some(&key))).await;
    let id = body["data"]["id"].as_i64().unwrap();

    let (status, body) = send(
        &app,
        with_json(
            "PUT",
            &format!("/api/admin/users/{id}/active"),
            Some(DEFAULT_API_KEY),
            &json!({ "isActive": false }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["is_active"], false);

    let (status, _) = send(&app, get("/api/bets", Some(&key))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_change_password() {
    let app = spawn_app().await;
    let key = player(&app, "bruna").await;

    let (status, _) = send(
        &app,
        with_json(
            "PUT",
            "/api/auth/password",
            Some(&key),
            &json!({ "currentPassword": "password123", "newPassword": "password456" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
        &app,
        with_json(
            "POST",
            "/api/auth/login",
            None,
            &json!({ "username": "bruna", "password": "password456" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}
