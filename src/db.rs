use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};
use std::str::FromStr;
use std::time::Duration;

const MIGRATIONS: &[&str] = &[include_str!("../migrations/sqlite/001_initial.sql")];

#[derive(Clone)]
pub struct Database {
    pub pool: SqlitePool,
}

impl Database {
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        let connect_options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(10)
            .min_connections(1)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .max_lifetime(Duration::from_secs(3600))
            .connect_with(connect_options)
            .await?;

        Ok(Database { pool })
    }

    /// Single-connection in-memory database, every connection would otherwise
    /// see its own empty schema.
    #[cfg(test)]
    pub async fn in_memory() -> anyhow::Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;
        let db = Database { pool };
        db.run_migrations().await?;
        Ok(db)
    }

    pub async fn run_migrations(&self) -> anyhow::Result<()> {
        for (idx, migration_sql) in MIGRATIONS.iter().enumerate() {
            tracing::info!("Running migration {}", idx + 1);

            for statement in split_statements(migration_sql) {
                match sqlx::query(&statement).execute(&self.pool).await {
                    Ok(_) => {}
                    Err(e) if e.to_string().contains("already exists") => {
                        tracing::debug!("Skipping existing object in migration {}: {}", idx + 1, e);
                    }
                    Err(e) => {
                        tracing::error!(
                            "Error in migration {} statement: {} - Error: {}",
                            idx + 1,
                            statement,
                            e
                        );
                        return Err(e.into());
                    }
                }
            }
        }

        tracing::info!("All migrations completed");
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// Split a migration file into executable statements, dropping `--` comment lines.
fn split_statements(sql: &str) -> Vec<String> {
    sql.split(';')
        .map(|statement| {
            statement
                .lines()
                .filter(|line| !line.trim_start().starts_with("--"))
                .collect::<Vec<_>>()
                .join("\n")
                .trim()
                .to_string()
        })
        .filter(|statement| !statement.is_empty())
        .collect()
}
