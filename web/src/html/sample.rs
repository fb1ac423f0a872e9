use crate::{
    TemplateKey,
    auth::SqliteUser,
    error::Error,
    forms::SampleForm,
    state::AppState,
    util::{FlashMessage, FormErrors, extract::Form, load_object, push_flash},
};
use axum::{
    Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect},
    routing::get,
};
use libbiobank::{collection::Collection, core::loadable::Loadable, sample::Sample};
use minijinja::context;
use time::OffsetDateTime;
use tower_sessions::Session;
use tracing::debug;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/{id}/edit", get(show_edit_sample).post(update_sample))
        .route("/{id}/delete", get(show_delete_sample).post(delete_sample))
}

fn collection_url(id: i64) -> String {
    format!("/collection/{id}")
}

pub(super) async fn show_new_sample(
    user: SqliteUser,
    TemplateKey(key): TemplateKey,
    State(state): State<AppState>,
    Path(collectionid): Path<i64>,
) -> Result<impl IntoResponse, Error> {
    let collection: Collection = load_object(collectionid, "collection", &state.db).await?;
    let today = OffsetDateTime::now_local()
        .unwrap_or_else(|_| OffsetDateTime::now_utc())
        .date();
    let form = SampleForm {
        last_updated: today.to_string(),
        ..Default::default()
    };
    Ok(state.render_template(
        key,
        context!(user => user,
                 collection => collection,
                 form => form,
                 errors => FormErrors::default()),
    ))
}

pub(super) async fn insert_sample(
    user: SqliteUser,
    session: Session,
    TemplateKey(key): TemplateKey,
    State(state): State<AppState>,
    Path(collectionid): Path<i64>,
    Form(form): Form<SampleForm>,
) -> Result<impl IntoResponse, Error> {
    // the parent always comes from the route
    let collection: Collection = load_object(collectionid, "collection", &state.db).await?;
    let clean = match form.clean() {
        Ok(clean) => clean,
        Err(errors) => {
            return Ok((
                StatusCode::UNPROCESSABLE_ENTITY,
                state.render_template(
                    key,
                    context!(user => user,
                             collection => collection,
                             form => form,
                             errors => errors),
                ),
            )
                .into_response());
        }
    };
    let mut sample = Sample::new(
        clean.donor_count,
        clean.material_type,
        clean.last_updated,
        collection.id,
        user.id,
    );
    sample.insert(&state.db).await?;
    push_flash(&session, FlashMessage::success("Sample created successfully.")).await?;
    Ok(Redirect::to(&collection_url(collection.id)).into_response())
}

async fn show_edit_sample(
    user: SqliteUser,
    TemplateKey(key): TemplateKey,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, Error> {
    let sample: Sample = load_object(id, "sample", &state.db).await?;
    let form = SampleForm {
        donor_count: sample.donor_count.to_string(),
        material_type: sample.material_type.clone(),
        last_updated: sample.last_updated.to_string(),
    };
    Ok(state.render_template(
        key,
        context!(user => user,
                 sample => sample,
                 form => form,
                 errors => FormErrors::default()),
    ))
}

async fn update_sample(
    user: SqliteUser,
    session: Session,
    TemplateKey(key): TemplateKey,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Form(form): Form<SampleForm>,
) -> Result<impl IntoResponse, Error> {
    let mut sample: Sample = load_object(id, "sample", &state.db).await?;
    let clean = match form.clean() {
        Ok(clean) => clean,
        Err(errors) => {
            return Ok((
                StatusCode::UNPROCESSABLE_ENTITY,
                state.render_template(
                    key,
                    context!(user => user,
                             sample => sample,
                             form => form,
                             errors => errors),
                ),
            )
                .into_response());
        }
    };
    sample.donor_count = clean.donor_count;
    sample.material_type = clean.material_type;
    sample.last_updated = clean.last_updated;
    sample.update(&state.db).await?;
    push_flash(&session, FlashMessage::success("Sample updated successfully.")).await?;
    Ok(Redirect::to(&collection_url(sample.collection.id())).into_response())
}

async fn show_delete_sample(
    user: SqliteUser,
    TemplateKey(key): TemplateKey,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, Error> {
    let sample: Sample = load_object(id, "sample", &state.db).await?;
    Ok(state.render_template(key, context!(user => user, sample => sample)))
}

async fn delete_sample(
    _user: SqliteUser,
    session: Session,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, Error> {
    let mut sample: Sample = load_object(id, "sample", &state.db).await?;
    let collectionid = sample.collection.id();
    sample.delete(&state.db).await?;
    debug!(id, collectionid, "Deleted sample");
    push_flash(&session, FlashMessage::success("Sample deleted successfully.")).await?;
    Ok(Redirect::to(&collection_url(collectionid)))
}
