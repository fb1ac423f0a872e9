use crate::{
    TemplateKey,
    auth::AuthSession,
    error::Error,
    state::AppState,
    util::take_flash,
};
use axum::{
    Router,
    extract::{OriginalUri, Request, State},
    middleware::{self, Next},
    response::{IntoResponse, Redirect, Response},
    routing::get,
};
use minijinja::context;
use tower_sessions::Session;

pub(crate) mod auth;
mod collection;
mod sample;
#[cfg(test)]
mod tests;
mod user;

/// Sends anonymous users to the login page, remembering where they were going
async fn login_required(
    auth: AuthSession,
    OriginalUri(uri): OriginalUri,
    request: Request,
    next_layer: Next,
) -> Response {
    if auth.user.is_some() {
        return next_layer.run(request).await;
    }
    let next_params = serde_urlencoded::to_string([(
        "next",
        uri.path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or_default(),
    )])
    .unwrap_or_default();
    let mut login_url = "/auth/login".to_string();
    if !next_params.is_empty() {
        login_url.push('?');
        login_url.push_str(&next_params);
    }
    Redirect::to(&login_url).into_response()
}

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .nest("/collection", collection::router())
        .nest("/sample", sample::router())
        .nest("/user", user::router())
        /* Anything above here is only available to logged-in users */
        .route_layer(middleware::from_fn(login_required))
        .route("/", get(root))
        .route("/collection/{id}", get(collection::show_collection))
        .nest("/auth", auth::router())
}

async fn root(
    auth: AuthSession,
    session: Session,
    TemplateKey(key): TemplateKey,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, Error> {
    Ok(state.render_template(
        key,
        context!(user => auth.user, messages => take_flash(&session).await?),
    ))
}
