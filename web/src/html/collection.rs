use crate::{
    TemplateKey,
    auth::{AuthSession, SqliteUser},
    error::Error,
    forms::CollectionForm,
    html::sample,
    state::AppState,
    util::{
        FlashMessage, FormErrors, current_hour,
        extract::{Form, Query},
        load_object, push_flash, take_flash,
    },
};
use axum::{
    Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect},
    routing::get,
};
use libbiobank::{
    collection::{Collection, Filter},
    core::{
        loadable::Loadable,
        query::{Cmp, CompoundFilter, Op},
    },
    empty_string_as_none,
};
use minijinja::context;
use serde::Deserialize;
use tower_sessions::Session;

const LIST_URL: &str = "/collection/list";

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/list", get(list_collections))
        .route("/new", get(show_new_collection).post(insert_collection))
        .route(
            "/{id}/edit",
            get(show_edit_collection).post(update_collection),
        )
        .route(
            "/{id}/delete",
            get(show_delete_collection).post(delete_collection),
        )
        .route(
            "/{id}/sample/new",
            get(sample::show_new_sample).post(sample::insert_sample),
        )
}

#[derive(Debug, Deserialize)]
struct ListParams {
    #[serde(default, deserialize_with = "empty_string_as_none")]
    filter: Option<String>,
}

async fn list_collections(
    auth: AuthSession,
    session: Session,
    TemplateKey(key): TemplateKey,
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<impl IntoResponse, Error> {
    let filter = params.filter.as_ref().map(|frag| {
        CompoundFilter::builder(Op::Or)
            .push(Filter::DiseaseTerm(Cmp::Like, frag.clone()))
            .push(Filter::Title(Cmp::Like, frag.clone()))
            .build()
    });
    let collections = Collection::load_all(filter, &state.db).await?;
    Ok(state.render_template(
        key,
        context!(user => auth.user,
                 collections => collections,
                 filter => params.filter,
                 current_hour => current_hour(),
                 messages => take_flash(&session).await?),
    ))
}

pub(super) async fn show_collection(
    auth: AuthSession,
    session: Session,
    TemplateKey(key): TemplateKey,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, Error> {
    let mut collection: Collection = load_object(id, "collection", &state.db).await?;
    collection.load_samples(&state.db).await?;
    Ok(state.render_template(
        key,
        context!(user => auth.user,
                 collection => collection,
                 messages => take_flash(&session).await?),
    ))
}

async fn show_new_collection(
    user: SqliteUser,
    TemplateKey(key): TemplateKey,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, Error> {
    Ok(state.render_template(
        key,
        context!(user => user,
                 form => CollectionForm::default(),
                 errors => FormErrors::default()),
    ))
}

async fn insert_collection(
    user: SqliteUser,
    session: Session,
    TemplateKey(key): TemplateKey,
    State(state): State<AppState>,
    Form(form): Form<CollectionForm>,
) -> Result<impl IntoResponse, Error> {
    let clean = match form.clean() {
        Ok(clean) => clean,
        Err(errors) => {
            return Ok((
                StatusCode::UNPROCESSABLE_ENTITY,
                state.render_template(key, context!(user => user, form => form, errors => errors)),
            )
                .into_response());
        }
    };
    let mut collection = Collection::new(clean.disease_term, clean.title, user.id);
    collection.insert(&state.db).await?;
    push_flash(&session, FlashMessage::success("Collection created successfully.")).await?;
    Ok(Redirect::to(LIST_URL).into_response())
}

async fn show_edit_collection(
    user: SqliteUser,
    TemplateKey(key): TemplateKey,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, Error> {
    let collection: Collection = load_object(id, "collection", &state.db).await?;
    let form = CollectionForm {
        disease_term: collection.disease_term.clone(),
        title: collection.title.clone(),
    };
    Ok(state.render_template(
        key,
        context!(user => user,
                 collection => collection,
                 form => form,
                 errors => FormErrors::default()),
    ))
}

async fn update_collection(
    user: SqliteUser,
    session: Session,
    TemplateKey(key): TemplateKey,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Form(form): Form<CollectionForm>,
) -> Result<impl IntoResponse, Error> {
    let mut collection: Collection = load_object(id, "collection", &state.db).await?;
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
    collection.disease_term = clean.disease_term;
    collection.title = clean.title;
    collection.update(&state.db).await?;
    push_flash(&session, FlashMessage::success("Collection updated successfully.")).await?;
    Ok(Redirect::to(LIST_URL).into_response())
}

async fn show_delete_collection(
    user: SqliteUser,
    TemplateKey(key): TemplateKey,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, Error> {
    let collection: Collection = load_object(id, "collection", &state.db).await?;
    Ok(state.render_template(key, context!(user => user, collection => collection)))
}

async fn delete_collection(
    _user: SqliteUser,
    session: Session,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, Error> {
    let mut collection: Collection = load_object(id, "collection", &state.db).await?;
    collection.delete(&state.db).await?;
    push_flash(&session, FlashMessage::success("Collection deleted successfully.")).await?;
    Ok(Redirect::to(LIST_URL))
}
