use sqlx::PgPool;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    username        TEXT PRIMARY KEY,
    email           TEXT NOT NULL,
    password_hash   TEXT NOT NULL,
    role            TEXT CHECK (role IN ('student', 'teacher')),
    display_name    TEXT NOT NULL DEFAULT '',
    class_group     TEXT,
    created_at      TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE UNIQUE INDEX IF NOT EXISTS users_email_lower_idx
    ON users (LOWER(email));

CREATE TABLE IF NOT EXISTS mood_entries (
    id          BIGSERIAL PRIMARY KEY,
    username    TEXT NOT NULL REFERENCES users(username),
    date        DATE NOT NULL,
    mood        TEXT NOT NULL,
    comment     TEXT,
    timestamp   TIMESTAMPTZ NOT NULL DEFAULT now(),
    UNIQUE (username, date)
);

CREATE INDEX IF NOT EXISTS mood_entries_date_idx
    ON mood_entries (date);
"#;

/// Creates the tables on first start. Safe to run on every boot.
pub async fn ensure_schema(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::raw_sql(SCHEMA).execute(pool).await?;
    tracing::info!("Database schema ready");
    Ok(())
}
