//! PostgreSQL store implementation.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use entities::{Recipe, Tag, User};
use sqlx::{postgres::PgPoolOptions, PgConnection, PgExecutor, PgPool};

use crate::{
    dedup_tag_names,
    migrations::{CREATE_MIGRATIONS_TABLE, MIGRATIONS, MIGRATION_LOCK_KEY},
    schema::{RecipeRow, RecipeTagRow, TagRow, UserRow},
    AccountStore, NewUser, RecipeChanges, RecipeFields, RecipeStore, StoreError, StoreResult,
    TagStore,
};

const USER_COLUMNS: &str =
    "id, email, name, password_hash, is_active, is_staff, is_superuser, created_at, updated_at";

const RECIPE_COLUMNS: &str =
    "id, user_id, title, description, time_minutes, price, link, created_at, updated_at";

/// Store backed by a PostgreSQL connection pool.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connects a new pool to the given database URL.
    pub async fn connect(database_url: &str, max_connections: u32) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    /// Applies all pending migrations and returns how many ran.
    ///
    /// Safe to call from several processes at once: each migration takes a
    /// transaction-scoped advisory lock and re-checks the ledger.
    pub async fn migrate(&self) -> StoreResult<usize> {
        sqlx::query(CREATE_MIGRATIONS_TABLE)
            .execute(&self.pool)
            .await?;

        let mut applied = 0;
        for migration in MIGRATIONS {
            let mut tx = self.pool.begin().await?;
            sqlx::query("SELECT pg_advisory_xact_lock($1)")
                .bind(MIGRATION_LOCK_KEY)
                .execute(&mut *tx)
                .await?;

            let done: bool = sqlx::query_scalar(
                "SELECT EXISTS (SELECT 1 FROM schema_migrations WHERE version = $1)",
            )
            .bind(migration.version)
            .fetch_one(&mut *tx)
            .await?;
            if done {
                continue;
            }

            for statement in migration.statements {
                sqlx::query(statement)
                    .execute(&mut *tx)
                    .await
                    .map_err(|e| StoreError::Migration {
                        version: migration.version,
                        name: migration.name,
                        message: e.to_string(),
                    })?;
            }

            sqlx::query("INSERT INTO schema_migrations (version, name) VALUES ($1, $2)")
                .bind(migration.version)
                .bind(migration.name)
                .execute(&mut *tx)
                .await?;
            tx.commit().await?;

            tracing::info!(
                version = migration.version,
                name = migration.name,
                "Applied migration"
            );
            applied += 1;
        }

        Ok(applied)
    }
}

async fn get_or_create_tag_in(
    conn: &mut PgConnection,
    owner: i64,
    name: &str,
) -> StoreResult<(Tag, bool)> {
    let inserted = sqlx::query_as::<_, TagRow>(
        "INSERT INTO tags (user_id, name) VALUES ($1, $2) \
         ON CONFLICT (user_id, name) DO NOTHING \
         RETURNING id, user_id, name",
    )
    .bind(owner)
    .bind(name)
    .fetch_optional(&mut *conn)
    .await?;

    if let Some(row) = inserted {
        return Ok((row.into(), true));
    }

    let existing = sqlx::query_as::<_, TagRow>(
        "SELECT id, user_id, name FROM tags WHERE user_id = $1 AND name = $2",
    )
    .bind(owner)
    .bind(name)
    .fetch_one(&mut *conn)
    .await?;
    Ok((existing.into(), false))
}

/// Clears the recipe's associations and attaches the named tags.
async fn set_recipe_tags(
    conn: &mut PgConnection,
    owner: i64,
    recipe_id: i64,
    names: &[String],
) -> StoreResult<()> {
    sqlx::query("DELETE FROM recipe_tags WHERE recipe_id = $1")
        .bind(recipe_id)
        .execute(&mut *conn)
        .await?;

    // Concurrent writers must take the (user_id, name) index locks in the
    // same order or they deadlock on each other's uncommitted tags.
    let mut names = dedup_tag_names(names);
    names.sort_unstable();

    for name in names {
        let (tag, _) = get_or_create_tag_in(conn, owner, &name).await?;
        sqlx::query(
            "INSERT INTO recipe_tags (recipe_id, tag_id) VALUES ($1, $2) \
             ON CONFLICT DO NOTHING",
        )
        .bind(recipe_id)
        .bind(tag.id)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

/// Loads the tags of the given recipes, keyed by recipe ID.
async fn load_tags<'e, E: PgExecutor<'e>>(
    executor: E,
    recipe_ids: &[i64],
) -> StoreResult<HashMap<i64, Vec<Tag>>> {
    let rows = sqlx::query_as::<_, RecipeTagRow>(
        "SELECT rt.recipe_id, t.id, t.user_id, t.name \
         FROM recipe_tags rt JOIN tags t ON t.id = rt.tag_id \
         WHERE rt.recipe_id = ANY($1) \
         ORDER BY t.id",
    )
    .bind(recipe_ids)
    .fetch_all(executor)
    .await?;

    let mut tags: HashMap<i64, Vec<Tag>> = HashMap::new();
    for row in rows {
        tags.entry(row.recipe_id).or_default().push(row.into());
    }
    Ok(tags)
}

async fn with_tags<'e, E: PgExecutor<'e>>(executor: E, row: RecipeRow) -> StoreResult<Recipe> {
    let mut tags = load_tags(executor, &[row.id]).await?;
    let recipe_tags = tags.remove(&row.id).unwrap_or_default();
    Ok(row.into_recipe(recipe_tags))
}

#[async_trait]
impl AccountStore for PgStore {
    async fn create_user(&self, user: NewUser) -> StoreResult<User> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "INSERT INTO users (email, name, password_hash, is_staff, is_superuser) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {USER_COLUMNS}"
        ))
        .bind(&user.email)
        .bind(&user.name)
        .bind(&user.password_hash)
        .bind(user.is_staff)
        .bind(user.is_superuser)
        .fetch_one(&self.pool)
        .await
        .map_err(StoreError::from_unique("User", &user.email))?;
        Ok(row.into())
    }

    async fn get_user(&self, id: i64) -> StoreResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    async fn get_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    async fn update_user(&self, user: User) -> StoreResult<User> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "UPDATE users SET email = $2, name = $3, password_hash = $4, is_active = $5, \
             is_staff = $6, is_superuser = $7, updated_at = now() \
             WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.name)
        .bind(&user.password_hash)
        .bind(user.is_active)
        .bind(user.is_staff)
        .bind(user.is_superuser)
        .fetch_optional(&self.pool)
        .await
        .map_err(StoreError::from_unique("User", &user.email))?;

        row.map(Into::into)
            .ok_or_else(|| StoreError::not_found("User", user.id))
    }

    async fn revoke_token(&self, jti: &str, expires_at: DateTime<Utc>) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM revoked_tokens WHERE expires_at < now()")
            .execute(&mut *tx)
            .await?;
        sqlx::query(
            "INSERT INTO revoked_tokens (jti, expires_at) VALUES ($1, $2) \
             ON CONFLICT (jti) DO NOTHING",
        )
        .bind(jti)
        .bind(expires_at)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn is_token_revoked(&self, jti: &str) -> StoreResult<bool> {
        let revoked: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM revoked_tokens WHERE jti = $1)",
        )
        .bind(jti)
        .fetch_one(&self.pool)
        .await?;
        Ok(revoked)
    }
}

#[async_trait]
impl TagStore for PgStore {
    async fn list_tags(&self, owner: i64) -> StoreResult<Vec<Tag>> {
        let rows = sqlx::query_as::<_, TagRow>(
            "SELECT id, user_id, name FROM tags WHERE user_id = $1 ORDER BY id DESC",
        )
        .bind(owner)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn get_tag(&self, owner: i64, id: i64) -> StoreResult<Option<Tag>> {
        let row = sqlx::query_as::<_, TagRow>(
            "SELECT id, user_id, name FROM tags WHERE id = $1 AND user_id = $2",
        )
        .bind(id)
        .bind(owner)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    async fn create_tag(&self, owner: i64, name: &str) -> StoreResult<Tag> {
        let row = sqlx::query_as::<_, TagRow>(
            "INSERT INTO tags (user_id, name) VALUES ($1, $2) RETURNING id, user_id, name",
        )
        .bind(owner)
        .bind(name)
        .fetch_one(&self.pool)
        .await
        .map_err(StoreError::from_unique("Tag", name))?;
        Ok(row.into())
    }

    async fn get_or_create_tag(&self, owner: i64, name: &str) -> StoreResult<(Tag, bool)> {
        let mut conn = self.pool.acquire().await?;
        get_or_create_tag_in(&mut *conn, owner, name).await
    }

    async fn update_tag(&self, owner: i64, id: i64, name: &str) -> StoreResult<Tag> {
        let row = sqlx::query_as::<_, TagRow>(
            "UPDATE tags SET name = $3 WHERE id = $1 AND user_id = $2 \
             RETURNING id, user_id, name",
        )
        .bind(id)
        .bind(owner)
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(StoreError::from_unique("Tag", name))?;

        row.map(Into::into)
            .ok_or_else(|| StoreError::not_found("Tag", id))
    }

    async fn delete_tag(&self, owner: i64, id: i64) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM tags WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(owner)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("Tag", id));
        }
        Ok(())
    }
}

#[async_trait]
impl RecipeStore for PgStore {
    async fn list_recipes(&self, owner: i64) -> StoreResult<Vec<Recipe>> {
        let rows = sqlx::query_as::<_, RecipeRow>(&format!(
            "SELECT {RECIPE_COLUMNS} FROM recipes WHERE user_id = $1 ORDER BY id DESC"
        ))
        .bind(owner)
        .fetch_all(&self.pool)
        .await?;

        let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
        let mut tags = load_tags(&self.pool, &ids).await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let recipe_tags = tags.remove(&row.id).unwrap_or_default();
                row.into_recipe(recipe_tags)
            })
            .collect())
    }

    async fn get_recipe(&self, owner: i64, id: i64) -> StoreResult<Option<Recipe>> {
        let row = sqlx::query_as::<_, RecipeRow>(&format!(
            "SELECT {RECIPE_COLUMNS} FROM recipes WHERE id = $1 AND user_id = $2"
        ))
        .bind(id)
        .bind(owner)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(with_tags(&self.pool, row).await?)),
            None => Ok(None),
        }
    }

    async fn create_recipe(&self, owner: i64, fields: RecipeFields) -> StoreResult<Recipe> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, RecipeRow>(&format!(
            "INSERT INTO recipes (user_id, title, description, time_minutes, price, link) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {RECIPE_COLUMNS}"
        ))
        .bind(owner)
        .bind(&fields.title)
        .bind(fields.description.as_deref().unwrap_or_default())
        .bind(fields.time_minutes)
        .bind(fields.price)
        .bind(fields.link.as_deref().unwrap_or_default())
        .fetch_one(&mut *tx)
        .await?;

        if let Some(names) = &fields.tags {
            set_recipe_tags(&mut *tx, owner, row.id, names).await?;
        }

        let recipe = with_tags(&mut *tx, row).await?;
        tx.commit().await?;
        Ok(recipe)
    }

    async fn update_recipe(
        &self,
        owner: i64,
        id: i64,
        changes: RecipeChanges,
    ) -> StoreResult<Recipe> {
        let mut tx = self.pool.begin().await?;

        // The UPDATE holds the row lock until commit, covering the tag rewrite.
        let row = sqlx::query_as::<_, RecipeRow>(&format!(
            "UPDATE recipes SET \
             title = COALESCE($3, title), \
             description = COALESCE($4, description), \
             time_minutes = COALESCE($5, time_minutes), \
             price = COALESCE($6, price), \
             link = COALESCE($7, link), \
             updated_at = now() \
             WHERE id = $1 AND user_id = $2 RETURNING {RECIPE_COLUMNS}"
        ))
        .bind(id)
        .bind(owner)
        .bind(&changes.title)
        .bind(&changes.description)
        .bind(changes.time_minutes)
        .bind(changes.price)
        .bind(&changes.link)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| StoreError::not_found("Recipe", id))?;

        if let Some(names) = &changes.tags {
            set_recipe_tags(&mut *tx, owner, id, names).await?;
        }

        let recipe = with_tags(&mut *tx, row).await?;
        tx.commit().await?;
        Ok(recipe)
    }

    async fn delete_recipe(&self, owner: i64, id: i64) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM recipes WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(owner)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("Recipe", id));
        }
        Ok(())
    }
}
