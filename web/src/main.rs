use anyhow::{Context, Result, anyhow};
use axum::{
    RequestPartsExt, Router,
    extract::{FromRequestParts, MatchedPath, State, rejection::MatchedPathRejection},
    http::{HeaderName, request::Parts},
    middleware,
    response::{IntoResponse, Response},
};
use axum_login::AuthManagerLayerBuilder;
use axum_template::engine::Engine;
use clap::Parser;
use config::EnvConfig;
use minijinja::{Environment, context};
use state::{AppState, SharedState, TemplateEngine};
use std::{
    net::SocketAddr,
    path::{Path, PathBuf},
    sync::Arc,
};
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tower_sessions::{Expiry, SessionManagerLayer, cookie::time::Duration};
use tower_sessions_sqlx_store::SqliteStore;
use tracing::{debug, info, warn};
use tracing_subscriber::filter::EnvFilter;

mod auth;
mod config;
mod error;
mod forms;
mod html;
mod state;
mod util;

/// An extractor that maps the matched route to the name of the template that
/// renders it, e.g. `/collection/{id}/edit` -> `collection_id_edit.html.j2`
pub(crate) struct TemplateKey(pub String);

impl<S> FromRequestParts<S> for TemplateKey
where
    S: Send + Sync,
{
    type Rejection = MatchedPathRejection;

    async fn from_request_parts(parts: &mut Parts, _: &S) -> Result<Self, Self::Rejection> {
        let path = parts.extract::<MatchedPath>().await?;
        Ok(TemplateKey(template_key(path.as_str())))
    }
}

fn template_key(path: &str) -> String {
    let mut key = path
        .trim_start_matches('/')
        .replace(['{', '}'], "")
        .replace('/', "_");
    if key.is_empty() {
        key = "_INDEX".to_string();
    }
    key.push_str(".html.j2");
    key
}

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    #[arg(
        short,
        long,
        default_value = "prod",
        help = "Name of the environment to load from the config file"
    )]
    env: String,
    #[arg(short, long, help = "Config file (defaults to <datadir>/config.yaml)")]
    config: Option<PathBuf>,
    #[arg(short, long, help = "Directory containing templates and configuration")]
    datadir: Option<PathBuf>,
}

pub(crate) fn template_engine<P: AsRef<Path>>(template_dir: P) -> TemplateEngine {
    let mut jinja = Environment::new();
    jinja.set_loader(minijinja::path_loader(template_dir.as_ref()));
    minijinja_contrib::add_to_environment(&mut jinja);
    Engine::from(jinja)
}

/// Renders the error page for any response that carries an [error::Error]
async fn map_error_response(State(state): State<AppState>, response: Response) -> Response {
    match response.extensions().get::<Arc<error::Error>>().cloned() {
        Some(err) => {
            let (status, message) = err.to_client_status();
            (
                status,
                state.render_template(
                    "_ERROR.html.j2",
                    context!(status => status.as_u16(), message => message),
                ),
            )
                .into_response()
        }
        None => response,
    }
}

pub(crate) fn app(state: AppState, session_store: SqliteStore) -> Router {
    let session_layer = SessionManagerLayer::new(session_store)
        .with_secure(false)
        .with_expiry(Expiry::OnInactivity(Duration::days(
            state.config.session_expiry_days,
        )));
    let auth_backend = auth::SqliteAuthBackend::new(state.db.clone());
    let auth_layer = AuthManagerLayerBuilder::new(auth_backend, session_layer).build();
    let x_request_id = HeaderName::from_static("x-request-id");

    html::router()
        .layer(middleware::map_response_with_state(
            state.clone(),
            map_error_response,
        ))
        .layer(auth_layer)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .with_state(state)
}

#[cfg(test)]
pub(crate) async fn test_app(pool: sqlx::Pool<sqlx::Sqlite>) -> Result<(Router, AppState)> {
    let state = Arc::new(SharedState::test(pool.clone()));
    let session_store = SqliteStore::new(pool);
    session_store.migrate().await?;
    Ok((app(state.clone(), session_store), state))
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Received interrupt, shutting down"),
        Err(e) => {
            warn!("Unable to listen for shutdown signal: {e}");
            std::future::pending::<()>().await
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_env("BIOBANKWEB_LOG"))
        .init();
    let args = Cli::parse();
    let datadir = match args.datadir {
        Some(dir) => dir,
        None => directories::ProjectDirs::from("org", "biobank", "biobankweb")
            .ok_or_else(|| anyhow!("Cannot find default project data directory"))?
            .data_dir()
            .to_path_buf(),
    };
    let configfile = args.config.unwrap_or_else(|| datadir.join("config.yaml"));
    let env = EnvConfig::load(&configfile, &args.env)?;
    debug!(?env, "Loaded environment '{}'", args.env);
    let listen = env.listen.clone();

    let state = Arc::new(SharedState::new(env, datadir).await?);
    info!(datadir = ?state.datadir, database = %state.config.database, "Starting biobankweb");

    let session_store = SqliteStore::new(state.db.pool().clone());
    session_store
        .migrate()
        .await
        .with_context(|| "Failed to create session table")?;

    let addr: SocketAddr = format!("{}:{}", listen.host, listen.port)
        .parse()
        .with_context(|| format!("Invalid listen address {}:{}", listen.host, listen.port))?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on http://{}", addr);
    axum::serve(listener, app(state, session_store))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}
