//! Store trait definitions.
//!
//! Every tag and recipe operation takes the acting user's ID as `owner` and
//! filters on it. Rows owned by someone else behave exactly like rows that do
//! not exist.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use entities::{Recipe, Tag, User};
use rust_decimal::Decimal;

use crate::StoreResult;

/// Fields for inserting a user. The password must already be hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    /// Normalized email address.
    pub email: String,
    /// Argon2 PHC string.
    pub password_hash: String,
    /// Display name.
    pub name: String,
    /// Staff flag.
    pub is_staff: bool,
    /// Superuser flag.
    pub is_superuser: bool,
}

/// All core recipe fields, used for creation and full replacement.
///
/// `description` and `link` default to empty on creation and stay unchanged
/// on replacement when omitted.
#[derive(Debug, Clone)]
pub struct RecipeFields {
    /// Title.
    pub title: String,
    /// Preparation time in minutes.
    pub time_minutes: i32,
    /// Price, already normalized to two decimal places.
    pub price: Decimal,
    /// Description.
    pub description: Option<String>,
    /// Link.
    pub link: Option<String>,
    /// Tag names to get-or-create and attach. `None` leaves existing
    /// associations untouched on replacement.
    pub tags: Option<Vec<String>>,
}

/// A partial recipe update. `None` fields are left unchanged.
///
/// Ownership is fixed at creation and cannot be changed here.
#[derive(Debug, Clone, Default)]
pub struct RecipeChanges {
    /// New title.
    pub title: Option<String>,
    /// New description.
    pub description: Option<String>,
    /// New preparation time.
    pub time_minutes: Option<i32>,
    /// New price.
    pub price: Option<Decimal>,
    /// New link.
    pub link: Option<String>,
    /// Replacement tag set. `Some(vec![])` clears all associations.
    pub tags: Option<Vec<String>>,
}

impl RecipeChanges {
    /// Applies the scalar fields to a recipe. Tags are handled by the store.
    pub fn apply_to(&self, recipe: &mut Recipe) {
        if let Some(title) = &self.title {
            recipe.title = title.clone();
        }
        if let Some(description) = &self.description {
            recipe.description = description.clone();
        }
        if let Some(time_minutes) = self.time_minutes {
            recipe.time_minutes = time_minutes;
        }
        if let Some(price) = self.price {
            recipe.price = price;
        }
        if let Some(link) = &self.link {
            recipe.link = link.clone();
        }
    }
}

impl From<RecipeFields> for RecipeChanges {
    fn from(fields: RecipeFields) -> Self {
        Self {
            title: Some(fields.title),
            description: fields.description,
            time_minutes: Some(fields.time_minutes),
            price: Some(fields.price),
            link: fields.link,
            tags: fields.tags,
        }
    }
}

/// Removes duplicate tag names, keeping the first occurrence.
pub fn dedup_tag_names(names: &[String]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    names
        .iter()
        .filter(|name| seen.insert(name.as_str()))
        .cloned()
        .collect()
}

/// User accounts and token revocation.
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Creates a new user. Fails with `AlreadyExists` on a duplicate email.
    async fn create_user(&self, user: NewUser) -> StoreResult<User>;

    /// Gets a user by ID.
    async fn get_user(&self, id: i64) -> StoreResult<Option<User>>;

    /// Gets a user by normalized email.
    async fn get_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    /// Updates name, password hash and flags of an existing user.
    async fn update_user(&self, user: User) -> StoreResult<User>;

    /// Records a token ID as revoked until its expiry.
    async fn revoke_token(&self, jti: &str, expires_at: DateTime<Utc>) -> StoreResult<()>;

    /// Returns true if the token ID has been revoked.
    async fn is_token_revoked(&self, jti: &str) -> StoreResult<bool>;
}

/// Per-user tags.
#[async_trait]
pub trait TagStore: Send + Sync {
    /// Lists the owner's tags, most recently created first.
    async fn list_tags(&self, owner: i64) -> StoreResult<Vec<Tag>>;

    /// Gets one of the owner's tags.
    async fn get_tag(&self, owner: i64, id: i64) -> StoreResult<Option<Tag>>;

    /// Creates a tag. Fails with `AlreadyExists` if the owner already has a
    /// tag with this name.
    async fn create_tag(&self, owner: i64, name: &str) -> StoreResult<Tag>;

    /// Returns the owner's tag with this name, creating it if absent.
    ///
    /// The boolean is true if the tag was created by this call. Concurrent
    /// calls with the same arguments resolve to the same row.
    async fn get_or_create_tag(&self, owner: i64, name: &str) -> StoreResult<(Tag, bool)>;

    /// Renames one of the owner's tags.
    async fn update_tag(&self, owner: i64, id: i64, name: &str) -> StoreResult<Tag>;

    /// Deletes one of the owner's tags and its recipe associations.
    async fn delete_tag(&self, owner: i64, id: i64) -> StoreResult<()>;
}

/// Per-user recipes.
#[async_trait]
pub trait RecipeStore: Send + Sync {
    /// Lists the owner's recipes, most recently created first.
    async fn list_recipes(&self, owner: i64) -> StoreResult<Vec<Recipe>>;

    /// Gets one of the owner's recipes.
    async fn get_recipe(&self, owner: i64, id: i64) -> StoreResult<Option<Recipe>>;

    /// Creates a recipe and attaches the named tags, creating missing ones
    /// for the owner.
    async fn create_recipe(&self, owner: i64, fields: RecipeFields) -> StoreResult<Recipe>;

    /// Applies a partial update to one of the owner's recipes.
    async fn update_recipe(
        &self,
        owner: i64,
        id: i64,
        changes: RecipeChanges,
    ) -> StoreResult<Recipe>;

    /// Replaces all core fields of one of the owner's recipes.
    async fn replace_recipe(
        &self,
        owner: i64,
        id: i64,
        fields: RecipeFields,
    ) -> StoreResult<Recipe> {
        self.update_recipe(owner, id, fields.into()).await
    }

    /// Deletes one of the owner's recipes.
    async fn delete_recipe(&self, owner: i64, id: i64) -> StoreResult<()>;
}

/// Everything the API needs from storage.
pub trait Store: AccountStore + TagStore + RecipeStore {}

impl<T: AccountStore + TagStore + RecipeStore> Store for T {}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn test_dedup_tag_names() {
        let names = vec![
            "Thai".to_string(),
            "Dinner".to_string(),
            "Thai".to_string(),
        ];

        assert_eq!(dedup_tag_names(&names), vec!["Thai", "Dinner"]);
    }

    #[test]
    fn test_changes_from_fields() {
        let fields = RecipeFields {
            title: "New title".to_string(),
            time_minutes: 40,
            price: Decimal::from_str("1.30").unwrap(),
            description: None,
            link: Some("example.com/new-recipe.pdf".to_string()),
            tags: None,
        };

        let changes = RecipeChanges::from(fields);
        assert_eq!(changes.title.as_deref(), Some("New title"));
        assert_eq!(changes.time_minutes, Some(40));
        assert!(changes.description.is_none());
        assert!(changes.tags.is_none());
    }
}
