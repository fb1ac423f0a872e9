use crate::{EnvConfig, template_engine};
use anyhow::{Context, Result};
use axum::response::IntoResponse;
use axum_template::{RenderHtml, engine::Engine};
use libbiobank::Database;
use serde::Serialize;
use std::{path::PathBuf, sync::Arc};
use tracing::debug;

pub(crate) type TemplateEngine = Engine<minijinja::Environment<'static>>;

#[derive(Debug)]
pub struct SharedState {
    pub db: Database,
    pub tmpl: TemplateEngine,
    pub config: EnvConfig,
    pub datadir: PathBuf,
}

impl SharedState {
    pub async fn new(env: EnvConfig, datadir: PathBuf) -> Result<Self> {
        let tmpl_path = datadir.join("templates");
        debug!(?tmpl_path, "Creating shared app state");
        let template = template_engine(&tmpl_path);
        Ok(Self {
            db: Database::open(&env.database)
                .await
                .with_context(|| format!("Unable to open database {}", &env.database))?,
            tmpl: template,
            config: env,
            datadir,
        })
    }

    pub fn render_template<K, S>(&self, key: K, context: S) -> impl IntoResponse + use<K, S>
    where
        K: AsRef<str>,
        S: Serialize,
    {
        RenderHtml(key, self.tmpl.clone(), context)
    }

    #[cfg(test)]
    pub fn test(pool: sqlx::Pool<sqlx::Sqlite>) -> Self {
        let template = template_engine("./templates");
        debug!("Creating test shared app state");
        Self {
            db: pool.into(),
            tmpl: template,
            config: EnvConfig {
                listen: crate::config::ListenConfig {
                    host: "127.0.0.1".to_string(),
                    port: 8080,
                },
                database: "test-database.sqlite".to_string(),
                user_registration_enabled: true,
                session_expiry_days: 1,
            },
            datadir: ".".into(),
        }
    }
}

pub type AppState = Arc<SharedState>;
