use crate::{
    TemplateKey, auth::SqliteUser, error::Error, state::AppState, util::take_flash,
};
use axum::{Router, extract::State, response::IntoResponse, routing::get};
use libbiobank::{
    collection::{self, Collection},
    sample::{self, Sample},
};
use minijinja::context;
use serde::Serialize;
use tower_sessions::Session;

pub(crate) fn router() -> Router<AppState> {
    Router::new().route("/me", get(show_profile))
}

#[derive(Serialize)]
struct UserStats {
    ncollections: i64,
    nsamples: i64,
}

async fn show_profile(
    user: SqliteUser,
    session: Session,
    TemplateKey(key): TemplateKey,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, Error> {
    let stats = UserStats {
        ncollections: Collection::count(Some(collection::Filter::User(user.id).into()), &state.db)
            .await?,
        nsamples: Sample::count(Some(sample::Filter::User(user.id).into()), &state.db).await?,
    };
    let collections =
        Collection::load_all(Some(collection::Filter::User(user.id).into()), &state.db).await?;
    Ok(state.render_template(
        key,
        context!(user => user,
                 userstats => stats,
                 collections => collections,
                 messages => take_flash(&session).await?),
    ))
}
