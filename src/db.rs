use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};

pub async fn connect(database_url: &str) -> anyhow::Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
        .context("connect to database")
}

/// Creates the two tables if they are missing. Safe to run on every
/// process start.
pub async fn ensure_schema(db: &PgPool) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id            BIGSERIAL PRIMARY KEY,
            full_name     VARCHAR(100) NOT NULL,
            email         VARCHAR(100) NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            created_at    TIMESTAMPTZ NOT NULL DEFAULT now()
        )
        "#,
    )
    .execute(db)
    .await
    .context("create users table")?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS projects (
            id          BIGSERIAL PRIMARY KEY,
            title       VARCHAR(100) NOT NULL,
            description VARCHAR(255) NOT NULL,
            link        VARCHAR(100) NOT NULL,
            category    VARCHAR(50) NOT NULL DEFAULT 'General',
            created_at  TIMESTAMPTZ NOT NULL DEFAULT now()
        )
        "#,
    )
    .execute(db)
    .await
    .context("create projects table")?;

    Ok(())
}
