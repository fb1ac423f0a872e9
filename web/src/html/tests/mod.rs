use crate::{
    app,
    state::{AppState, SharedState},
    test_app,
};
use anyhow::Result;
use axum::{
    Router,
    body::Body,
    http::{
        Request, Response, StatusCode,
        header::{CONTENT_TYPE, COOKIE, LOCATION},
    },
};
use http_body_util::BodyExt;
use libbiobank::user::User;
use sqlx::{Pool, Sqlite};
use std::sync::Arc;
use test_log::test;
use tower::Service;
use tower_sessions_sqlx_store::SqliteStore;

mod sample;

const PASSWORD: &str = "topsecret123";

async fn body_text(response: Response<Body>) -> Result<String> {
    let bytes = response.into_body().collect().await?.to_bytes();
    Ok(String::from_utf8(bytes.to_vec())?)
}

fn location(response: &Response<Body>) -> Option<&str> {
    response
        .headers()
        .get(LOCATION)
        .and_then(|v| v.to_str().ok())
}

async fn get(app: &mut Router, uri: &str, cookie: Option<&str>) -> Result<Response<Body>> {
    let mut builder = Request::builder().uri(uri).method("GET");
    if let Some(cookie) = cookie {
        builder = builder.header(COOKIE, cookie);
    }
    let request = builder.body(Body::empty())?;
    Ok(app.as_service().call(request).await?)
}

async fn post_form(
    app: &mut Router,
    uri: &str,
    cookie: Option<&str>,
    params: &[(&str, &str)],
) -> Result<Response<Body>> {
    let mut builder = Request::builder()
        .uri(uri)
        .method("POST")
        .header(CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(cookie) = cookie {
        builder = builder.header(COOKIE, cookie);
    }
    let request = builder.body(Body::from(serde_urlencoded::to_string(params)?))?;
    Ok(app.as_service().call(request).await?)
}

/// The fixture users have placeholder password hashes, so give the user a
/// known password before logging in
async fn set_password(state: &AppState, username: &str) -> Result<()> {
    let mut user = User::load_by_username(username, &state.db)
        .await?
        .ok_or_else(|| anyhow::anyhow!("no user {username}"))?;
    user.change_password(PASSWORD)?;
    user.update(&state.db).await?;
    Ok(())
}

/// logs the user into the app and returns a cookie value that can be used in subsequent requests
async fn login(app: &mut Router, state: &AppState) -> Result<String> {
    set_password(state, "testuser").await?;
    let response = post_form(
        app,
        "/auth/login",
        None,
        &[
            ("username", "testuser"),
            ("password", PASSWORD),
            ("next", "/collection/list"),
        ],
    )
    .await?;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    // extract cookie
    Ok(response
        .headers()
        .get("set-cookie")
        .expect("no set-cookie header")
        .to_str()?
        .split(';')
        .next()
        .unwrap_or_default()
        .to_string())
}

#[test(sqlx::test(
    migrations = "../db/migrations/",
    fixtures(path = "../../../../db/fixtures", scripts("users"))
))]
async fn test_login(pool: Pool<Sqlite>) {
    let (mut app, state) = test_app(pool).await.expect("failed to create test app");
    let cookie = login(&mut app, &state).await.expect("Failed to log in");
    assert!(!cookie.is_empty());

    // now make sure we can't access pages that are protected without the cookie
    let response = get(&mut app, "/collection/list", None)
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        location(&response),
        Some("/auth/login?next=%2Fcollection%2Flist")
    );

    // ...but we can with the cookie
    let response = get(&mut app, "/collection/list", Some(&cookie))
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status(), StatusCode::OK);
}

#[test(sqlx::test(
    migrations = "../db/migrations/",
    fixtures(path = "../../../../db/fixtures", scripts("users"))
))]
async fn test_login_failure(pool: Pool<Sqlite>) {
    let (mut app, state) = test_app(pool).await.expect("failed to create test app");
    set_password(&state, "testuser").await.expect("failed to set password");

    let response = post_form(
        &mut app,
        "/auth/login",
        None,
        &[("username", "testuser"), ("password", "wrong-password")],
    )
    .await
    .expect("Failed to execute request");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_text(response).await.expect("failed to read body");
    assert!(body.contains("Please enter a correct username and password."));

    // the fixture user with an unusable hash can't log in either
    let response = post_form(
        &mut app,
        "/auth/login",
        None,
        &[("username", "otheruser"), ("password", PASSWORD)],
    )
    .await
    .expect("Failed to execute request");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[test(sqlx::test(
    migrations = "../db/migrations/",
    fixtures(path = "../../../../db/fixtures", scripts("users"))
))]
async fn test_login_redirects_locally(pool: Pool<Sqlite>) {
    let (mut app, state) = test_app(pool).await.expect("failed to create test app");
    set_password(&state, "testuser").await.expect("failed to set password");

    for (next, expected) in [
        ("/user/me", "/user/me"),
        ("https://evil.example.com/", "/collection/list"),
        ("//evil.example.com/", "/collection/list"),
        ("", "/collection/list"),
    ] {
        let response = post_form(
            &mut app,
            "/auth/login",
            None,
            &[("username", "testuser"), ("password", PASSWORD), ("next", next)],
        )
        .await
        .expect("Failed to execute request");
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), Some(expected), "next={next}");
    }
}

#[test(sqlx::test(
    migrations = "../db/migrations/",
    fixtures(path = "../../../../db/fixtures", scripts("users"))
))]
async fn test_logout(pool: Pool<Sqlite>) {
    let (mut app, state) = test_app(pool).await.expect("failed to create test app");
    let cookie = login(&mut app, &state).await.expect("Failed to log in");

    let response = post_form(&mut app, "/auth/logout", Some(&cookie), &[])
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), Some("/"));

    let response = get(&mut app, "/user/me", Some(&cookie))
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
}

#[test(sqlx::test(
    migrations = "../db/migrations/",
    fixtures(path = "../../../../db/fixtures", scripts("users"))
))]
async fn test_index(pool: Pool<Sqlite>) {
    let (mut app, state) = test_app(pool).await.expect("failed to create test app");
    let response = get(&mut app, "/", None)
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status(), StatusCode::OK);

    let cookie = login(&mut app, &state).await.expect("Failed to log in");
    let response = get(&mut app, "/", Some(&cookie))
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_text(response).await.expect("failed to read body");
    assert!(body.contains("testuser"));
}

#[test(sqlx::test(
    migrations = "../db/migrations/",
    fixtures(path = "../../../../db/fixtures", scripts("users"))
))]
async fn test_signup(pool: Pool<Sqlite>) {
    let (mut app, state) = test_app(pool).await.expect("failed to create test app");
    let response = get(&mut app, "/auth/signup", None)
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status(), StatusCode::OK);

    let response = post_form(
        &mut app,
        "/auth/signup",
        None,
        &[
            ("username", "newuser"),
            ("password1", "s3cret-pass"),
            ("password2", "s3cret-pass"),
        ],
    )
    .await
    .expect("Failed to execute request");
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), Some("/auth/login"));
    let cookie = response
        .headers()
        .get("set-cookie")
        .expect("no set-cookie header")
        .to_str()
        .expect("invalid header")
        .split(';')
        .next()
        .unwrap_or_default()
        .to_string();

    // the login page shows the sign-up message once
    let response = get(&mut app, "/auth/login", Some(&cookie))
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_text(response).await.expect("failed to read body");
    assert!(body.contains("was created successfully. You can now log in."));
    let response = get(&mut app, "/auth/login", Some(&cookie))
        .await
        .expect("Failed to execute request");
    let body = body_text(response).await.expect("failed to read body");
    assert!(!body.contains("was created successfully."));

    let user = User::load_by_username("newuser", &state.db)
        .await
        .expect("query failed")
        .expect("user was not created");
    assert!(user.verify_password("s3cret-pass").is_ok());

    // the new account can log in
    let response = post_form(
        &mut app,
        "/auth/login",
        None,
        &[("username", "newuser"), ("password", "s3cret-pass")],
    )
    .await
    .expect("Failed to execute request");
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
}

#[test(sqlx::test(
    migrations = "../db/migrations/",
    fixtures(path = "../../../../db/fixtures", scripts("users"))
))]
async fn test_signup_invalid(pool: Pool<Sqlite>) {
    let (mut app, state) = test_app(pool).await.expect("failed to create test app");
    let nusers = User::load_all(&state.db).await.expect("failed to load").len();

    let response = post_form(
        &mut app,
        "/auth/signup",
        None,
        &[
            ("username", "testuser"),
            ("password1", "s3cret-pass"),
            ("password2", "s3cret-pass"),
        ],
    )
    .await
    .expect("Failed to execute request");
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body_text(response).await.expect("failed to read body");
    assert!(body.contains("A user with that username already exists."));

    let response = post_form(
        &mut app,
        "/auth/signup",
        None,
        &[
            ("username", "another"),
            ("password1", "s3cret-pass"),
            ("password2", "s3cret-pazz"),
        ],
    )
    .await
    .expect("Failed to execute request");
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    assert_eq!(
        User::load_all(&state.db).await.expect("failed to load").len(),
        nusers
    );
}

#[test(sqlx::test(
    migrations = "../db/migrations/",
    fixtures(path = "../../../../db/fixtures", scripts("users"))
))]
async fn test_signup_disabled(pool: Pool<Sqlite>) {
    let mut shared = SharedState::test(pool.clone());
    shared.config.user_registration_enabled = false;
    let session_store = SqliteStore::new(pool);
    session_store.migrate().await.expect("failed to migrate");
    let mut app = app(Arc::new(shared), session_store);

    let response = get(&mut app, "/auth/signup", None)
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let response = post_form(
        &mut app,
        "/auth/signup",
        None,
        &[
            ("username", "newuser"),
            ("password1", "s3cret-pass"),
            ("password2", "s3cret-pass"),
        ],
    )
    .await
    .expect("Failed to execute request");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[test(sqlx::test(
    migrations = "../db/migrations/",
    fixtures(
        path = "../../../../db/fixtures",
        scripts("users", "collections", "samples")
    )
))]
async fn test_profile(pool: Pool<Sqlite>) {
    let (mut app, state) = test_app(pool).await.expect("failed to create test app");
    let response = get(&mut app, "/user/me", None)
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), Some("/auth/login?next=%2Fuser%2Fme"));

    let cookie = login(&mut app, &state).await.expect("Failed to log in");
    let response = get(&mut app, "/user/me", Some(&cookie))
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_text(response).await.expect("failed to read body");
    assert!(body.contains("testuser"));
    assert!(body.contains("Pediatric Asthma Cohort"));
    // owned by otheruser
    assert!(!body.contains("Inflammatory Bowel Biobank"));
}
