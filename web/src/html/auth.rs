use crate::{
    TemplateKey,
    auth::{AuthSession, Credentials},
    error::Error,
    forms::SignupForm,
    state::AppState,
    util::{
        FlashMessage, FormErrors,
        extract::{Form, Query},
        push_flash, safe_next, take_flash,
    },
};
use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect},
    routing::{get, post},
};
use libbiobank::user::User;
use minijinja::context;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::debug;

const LOGIN_FAILED: &str =
    "Please enter a correct username and password. Note that both fields may be case-sensitive.";

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/login", get(show_login).post(do_login))
        .route("/logout", post(logout))
        .route("/signup", get(show_signup).post(signup))
}

async fn show_signup(
    TemplateKey(key): TemplateKey,
    auth: AuthSession,
    State(app): State<AppState>,
) -> Result<impl IntoResponse, Error> {
    if !app.config.user_registration_enabled {
        return Err(Error::UserRegistrationDisabled);
    }
    Ok(app.render_template(
        key,
        context!(user => auth.user, errors => FormErrors::default()),
    ))
}

async fn signup(
    TemplateKey(key): TemplateKey,
    auth: AuthSession,
    session: Session,
    State(app): State<AppState>,
    Form(form): Form<SignupForm>,
) -> Result<impl IntoResponse, Error> {
    if !app.config.user_registration_enabled {
        return Err(Error::UserRegistrationDisabled);
    }
    let mut errors = match form.clean() {
        Ok(()) => FormErrors::default(),
        Err(errors) => errors,
    };
    if errors.get("username").is_none()
        && User::load_by_username(&form.username, &app.db)
            .await?
            .is_some()
    {
        errors.add("username", "A user with that username already exists.");
    }
    if !errors.is_empty() {
        debug!(%errors, "Rejected sign-up");
        return Ok((
            StatusCode::UNPROCESSABLE_ENTITY,
            app.render_template(
                key,
                context!(user => auth.user, username => form.username, errors => errors),
            ),
        )
            .into_response());
    }

    let user = auth.backend.register(form.username, &form.password1).await?;
    push_flash(
        &session,
        FlashMessage::info(format!(
            "Account '{}' was created successfully. You can now log in.",
            user.username
        )),
    )
    .await?;
    Ok(Redirect::to("/auth/login").into_response())
}

#[derive(Debug, Deserialize)]
pub(crate) struct NextUrl {
    next: Option<String>,
}

async fn show_login(
    TemplateKey(key): TemplateKey,
    auth: AuthSession,
    session: Session,
    State(app): State<AppState>,
    Query(NextUrl { next }): Query<NextUrl>,
) -> Result<impl IntoResponse, Error> {
    let messages = take_flash(&session).await?;
    Ok(app.render_template(
        key,
        context!(user => auth.user, next => next, messages => messages),
    ))
}

async fn do_login(
    TemplateKey(key): TemplateKey,
    mut auth: AuthSession,
    State(app): State<AppState>,
    Form(creds): Form<Credentials>,
) -> Result<impl IntoResponse, Error> {
    let Some(user) = auth.authenticate(creds.clone()).await? else {
        debug!(username = %creds.username, "Login failed");
        return Ok((
            StatusCode::UNAUTHORIZED,
            app.render_template(
                key,
                context!(username => creds.username, next => creds.next, error => LOGIN_FAILED),
            ),
        )
            .into_response());
    };
    auth.login(&user).await?;
    debug!("Logged in as {}", user.username);
    let dest = safe_next(creds.next.as_deref()).unwrap_or("/collection/list");
    Ok(Redirect::to(dest).into_response())
}

async fn logout(mut auth: AuthSession) -> Result<impl IntoResponse, Error> {
    auth.logout().await?;
    Ok(Redirect::to("/"))
}
