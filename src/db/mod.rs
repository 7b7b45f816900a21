use anyhow::{Context, Result};
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Schema};

pub mod entity;

/// Connects with a small pool and SQL logging routed through `tracing`.
pub async fn connect(database_url: &str) -> Result<DatabaseConnection> {
    let mut opts = ConnectOptions::new(database_url.to_owned());
    opts.max_connections(5)
        .min_connections(1)
        .sqlx_logging(true);
    Database::connect(opts)
        .await
        .with_context(|| format!("failed to connect to database at {database_url}"))
}

/// Creates the `players` table when it does not exist yet.
pub async fn ensure_schema(db: &DatabaseConnection) -> Result<()> {
    let backend = db.get_database_backend();
    let schema = Schema::new(backend);
    let mut statement = schema.create_table_from_entity(entity::players::Entity);
    statement.if_not_exists();
    db.execute(backend.build(&statement))
        .await
        .context("failed to create players table")?;
    Ok(())
}
