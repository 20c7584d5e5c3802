#[macro_use]
extern crate rocket;

pub mod auth;
pub mod config;
pub mod db;
pub mod domain;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;
pub mod store;
pub mod telemetry;

use std::sync::Arc;

use rocket::fairing::AdHoc;
use rocket::http::Method;
use rocket::{Build, Rocket};
use rocket_cors::{AllowedHeaders, AllowedOrigins, Cors, CorsOptions};

use crate::config::{AppConfig, StorageBackend};
use crate::error::StoreError;
use crate::store::{MemoryStore, PgStore, SharedStore};

/// Opens the configured backend. Postgres is migrated before the pool is handed out.
pub async fn open_store(config: &AppConfig) -> Result<SharedStore, StoreError> {
    match config.storage {
        StorageBackend::Memory => {
            tracing::warn!("using in-memory storage, data is lost on shutdown");
            Ok(Arc::new(MemoryStore::new()))
        }
        StorageBackend::Postgres => {
            let database_url = config
                .database_url
                .as_deref()
                .ok_or_else(|| StoreError::Migration("DATABASE_URL must be set".into()))?;
            db::run_migrations(database_url).await?;
            let pool = db::init_pool(database_url, config.max_connections).await?;
            Ok(Arc::new(PgStore::new(pool)))
        }
    }
}

fn cors() -> Result<Cors, rocket_cors::Error> {
    CorsOptions::default()
        .allowed_origins(AllowedOrigins::all())
        .allowed_methods(
            vec![Method::Get, Method::Post, Method::Put, Method::Delete, Method::Options]
                .into_iter()
                .map(From::from)
                .collect(),
        )
        .allowed_headers(AllowedHeaders::all())
        .to_cors()
}

fn base(config: &AppConfig) -> Result<Rocket<Build>, rocket_cors::Error> {
    Ok(rocket::build()
        .attach(cors()?)
        .manage(config.auth_settings())
        .mount("/api", routes::get_routes())
        .register("/", routes::get_catchers()))
}

/// The server with its store opened during ignition.
pub fn build_rocket(config: AppConfig) -> Result<Rocket<Build>, rocket_cors::Error> {
    Ok(base(&config)?.attach(AdHoc::try_on_ignite("Initialize Storage", |rocket| async move {
        match open_store(&config).await {
            Ok(store) => Ok(rocket.manage(store)),
            Err(e) => {
                tracing::error!(error = %e, "storage initialization failed");
                Err(rocket)
            }
        }
    })))
}

/// The server over an already opened store.
pub fn build_rocket_with_store(
    config: &AppConfig,
    store: SharedStore,
) -> Result<Rocket<Build>, rocket_cors::Error> {
    Ok(base(config)?.manage(store))
}
