use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

use actix_web::{middleware::Compress, middleware::Logger, web, App, HttpServer};
use anyhow::Result;
use tracing::info;

use crate::api::auth::{AdminCredentials, SessionAuth, SessionStore};
use crate::api::{middleware::setup_cors, routes};
use crate::blobstore::{BlobStore, FsBlobStore};
use crate::util::db::Db;
use crate::util::env::{env_opt, env_parse};

static STARTED_AT: OnceLock<Instant> = OnceLock::new();

pub fn uptime_seconds() -> u64 {
    STARTED_AT.get().map(|t| t.elapsed().as_secs()).unwrap_or(0)
}

pub struct ApiServer {
    pub host: String,
    pub port: u16,
    pub allowed_origins: Vec<String>,
    pub upload_dir: String,
    pub session_ttl: Duration,
}

impl ApiServer {
    pub fn from_env() -> Self {
        let allowed_origins = env_opt("ALLOWED_ORIGINS")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Self {
            host: env_opt("API_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: env_parse("API_PORT", 8080),
            allowed_origins,
            upload_dir: env_opt("UPLOAD_DIR").unwrap_or_else(|| "./uploads".to_string()),
            session_ttl: Duration::from_secs(env_parse("SESSION_TTL_SECS", 8 * 3600)),
        }
    }

    pub async fn run(self, db: Db) -> Result<()> {
        STARTED_AT.get_or_init(Instant::now);

        let credentials = AdminCredentials::from_env()?;
        let sessions = Arc::new(SessionStore::new(self.session_ttl));
        let blobs: Arc<dyn BlobStore> = Arc::new(FsBlobStore::new(&self.upload_dir));

        let bind = (self.host.clone(), self.port);
        info!(host = %self.host, port = self.port, "starting API server");

        let allowed_origins = self.allowed_origins.clone();
        HttpServer::new(move || {
            App::new()
                .app_data(web::Data::new(db.clone()))
                .app_data(web::Data::new(credentials.clone()))
                .app_data(web::Data::new(sessions.clone()))
                .app_data(web::Data::new(blobs.clone()))
                .wrap(Logger::default())
                .wrap(Compress::default())
                .wrap(setup_cors(&allowed_origins))
                .configure(routes::configure_public)
                .service(
                    web::scope("/admin")
                        .wrap(SessionAuth::new(sessions.clone()))
                        .configure(routes::configure_admin),
                )
        })
        .bind(bind)?
        .run()
        .await?;

        Ok(())
    }
}
