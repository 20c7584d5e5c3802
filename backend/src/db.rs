use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use crate::error::StoreError;

mod embedded {
    use refinery::embed_migrations;
    embed_migrations!("migrations");
}

pub async fn init_pool(database_url: &str, max_connections: u32) -> Result<PgPool, StoreError> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await?;

    tracing::info!(max_connections, "database pool ready");
    Ok(pool)
}

pub async fn run_migrations(database_url: &str) -> Result<(), StoreError> {
    let (mut client, connection) = tokio_postgres::connect(database_url, tokio_postgres::NoTls)
        .await
        .map_err(|e| StoreError::Migration(e.to_string()))?;

    // The connection object drives the socket; it must be polled while migrations run.
    tokio::spawn(async move {
        if let Err(e) = connection.await {
            tracing::error!(error = %e, "migration connection closed with an error");
        }
    });

    let report = embedded::migrations::runner()
        .run_async(&mut client)
        .await
        .map_err(|e| StoreError::Migration(e.to_string()))?;
    for migration in report.applied_migrations() {
        tracing::info!(%migration, "applied migration");
    }

    Ok(())
}
