use chrono::{DateTime, Utc};
use entities::{Recipe, Tag, User};
use rust_decimal::Decimal;
use sqlx::FromRow;

/// Database row for User
#[derive(Debug, FromRow)]
pub(crate) struct UserRow {
    pub id: i64,
    pub email: String,
    pub name: String,
    pub password_hash: String,
    pub is_active: bool,
    pub is_staff: bool,
    pub is_superuser: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            email: row.email,
            name: row.name,
            password_hash: row.password_hash,
            is_active: row.is_active,
            is_staff: row.is_staff,
            is_superuser: row.is_superuser,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Database row for Tag
#[derive(Debug, FromRow)]
pub(crate) struct TagRow {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
}

impl From<TagRow> for Tag {
    fn from(row: TagRow) -> Self {
        Tag {
            id: row.id,
            user_id: row.user_id,
            name: row.name,
        }
    }
}

/// Database row for Recipe, without tags
#[derive(Debug, FromRow)]
pub(crate) struct RecipeRow {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub description: String,
    pub time_minutes: i32,
    pub price: Decimal,
    pub link: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RecipeRow {
    pub fn into_recipe(self, tags: Vec<Tag>) -> Recipe {
        Recipe {
            id: self.id,
            user_id: self.user_id,
            title: self.title,
            description: self.description,
            time_minutes: self.time_minutes,
            price: self.price,
            link: self.link,
            tags,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// A tag joined to the recipe it is attached to
#[derive(Debug, FromRow)]
pub(crate) struct RecipeTagRow {
    pub recipe_id: i64,
    pub id: i64,
    pub user_id: i64,
    pub name: String,
}

impl From<RecipeTagRow> for Tag {
    fn from(row: RecipeTagRow) -> Self {
        Tag {
            id: row.id,
            user_id: row.user_id,
            name: row.name,
        }
    }
}
