//! Ordered schema migrations for the PostgreSQL store.
//!
//! Each migration runs once in its own transaction and is recorded in
//! `schema_migrations`. Append new migrations to the end of [`MIGRATIONS`];
//! never edit one that has shipped.

/// A named, versioned schema change.
#[derive(Debug, Clone, Copy)]
pub struct Migration {
    /// Strictly increasing version number.
    pub version: i64,
    /// Short description recorded alongside the version.
    pub name: &'static str,
    /// Statements executed in order.
    pub statements: &'static [&'static str],
}

pub(crate) const CREATE_MIGRATIONS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS schema_migrations (
    version BIGINT PRIMARY KEY,
    name TEXT NOT NULL,
    applied_at TIMESTAMPTZ NOT NULL DEFAULT now()
)
"#;

/// Arbitrary key for the advisory lock that serializes concurrent migrators.
pub(crate) const MIGRATION_LOCK_KEY: i64 = 0x7265_6369_7065;

/// All migrations, in application order.
pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "create_users",
        statements: &[r#"
            CREATE TABLE users (
                id BIGSERIAL PRIMARY KEY,
                email VARCHAR(255) NOT NULL UNIQUE,
                name VARCHAR(255) NOT NULL DEFAULT '',
                password_hash TEXT NOT NULL,
                is_active BOOLEAN NOT NULL DEFAULT TRUE,
                is_staff BOOLEAN NOT NULL DEFAULT FALSE,
                is_superuser BOOLEAN NOT NULL DEFAULT FALSE,
                created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
            )
        "#],
    },
    Migration {
        version: 2,
        name: "create_tags",
        statements: &[
            r#"
            CREATE TABLE tags (
                id BIGSERIAL PRIMARY KEY,
                user_id BIGINT NOT NULL REFERENCES users (id) ON DELETE CASCADE,
                name VARCHAR(255) NOT NULL,
                CONSTRAINT tags_user_id_name_key UNIQUE (user_id, name)
            )
            "#,
        ],
    },
    Migration {
        version: 3,
        name: "create_recipes",
        statements: &[
            r#"
            CREATE TABLE recipes (
                id BIGSERIAL PRIMARY KEY,
                user_id BIGINT NOT NULL REFERENCES users (id) ON DELETE CASCADE,
                title VARCHAR(255) NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                time_minutes INTEGER NOT NULL CHECK (time_minutes >= 0),
                price NUMERIC(5, 2) NOT NULL,
                link VARCHAR(255) NOT NULL DEFAULT '',
                created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
            )
            "#,
            "CREATE INDEX recipes_user_id_idx ON recipes (user_id)",
            r#"
            CREATE TABLE recipe_tags (
                recipe_id BIGINT NOT NULL REFERENCES recipes (id) ON DELETE CASCADE,
                tag_id BIGINT NOT NULL REFERENCES tags (id) ON DELETE CASCADE,
                PRIMARY KEY (recipe_id, tag_id)
            )
            "#,
            "CREATE INDEX recipe_tags_tag_id_idx ON recipe_tags (tag_id)",
        ],
    },
    Migration {
        version: 4,
        name: "create_revoked_tokens",
        statements: &[r#"
            CREATE TABLE revoked_tokens (
                jti VARCHAR(64) PRIMARY KEY,
                expires_at TIMESTAMPTZ NOT NULL
            )
        "#],
    },
];
