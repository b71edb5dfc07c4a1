//! In-memory store implementation for tests and local development.

use std::{
    collections::{BTreeMap, BTreeSet, HashMap},
    sync::Arc,
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use entities::{Recipe, Tag, User};
use tokio::sync::RwLock;

use crate::{
    dedup_tag_names, AccountStore, NewUser, RecipeChanges, RecipeFields, RecipeStore, StoreError,
    StoreResult, TagStore,
};

/// All tables behind one lock, so multi-table writes are atomic.
#[derive(Debug, Default)]
struct Tables {
    users: BTreeMap<i64, User>,
    tags: BTreeMap<i64, Tag>,
    /// Recipes are stored without tags; tags are resolved on read.
    recipes: BTreeMap<i64, Recipe>,
    recipe_tags: BTreeMap<i64, BTreeSet<i64>>,
    revoked_tokens: HashMap<String, DateTime<Utc>>,
    last_user_id: i64,
    last_tag_id: i64,
    last_recipe_id: i64,
}

impl Tables {
    fn find_tag(&self, owner: i64, name: &str) -> Option<&Tag> {
        self.tags
            .values()
            .find(|t| t.is_owned_by(owner) && t.name == name)
    }

    fn insert_tag(&mut self, owner: i64, name: &str) -> Tag {
        self.last_tag_id += 1;
        let tag = Tag {
            id: self.last_tag_id,
            user_id: owner,
            name: name.to_string(),
        };
        self.tags.insert(tag.id, tag.clone());
        tag
    }

    fn get_or_create_tag(&mut self, owner: i64, name: &str) -> (Tag, bool) {
        match self.find_tag(owner, name) {
            Some(tag) => (tag.clone(), false),
            None => (self.insert_tag(owner, name), true),
        }
    }

    /// Clears the recipe's associations and attaches the named tags.
    fn set_recipe_tags(&mut self, owner: i64, recipe_id: i64, names: &[String]) {
        let tag_ids = dedup_tag_names(names)
            .iter()
            .map(|name| self.get_or_create_tag(owner, name).0.id)
            .collect();
        self.recipe_tags.insert(recipe_id, tag_ids);
    }

    fn with_tags(&self, recipe: &Recipe) -> Recipe {
        let mut recipe = recipe.clone();
        recipe.tags = self
            .recipe_tags
            .get(&recipe.id)
            .into_iter()
            .flatten()
            .filter_map(|tag_id| self.tags.get(tag_id))
            .cloned()
            .collect();
        recipe
    }

    fn owned_recipe_mut(&mut self, owner: i64, id: i64) -> StoreResult<&mut Recipe> {
        self.recipes
            .get_mut(&id)
            .filter(|r| r.is_owned_by(owner))
            .ok_or_else(|| StoreError::not_found("Recipe", id))
    }
}

/// In-memory store keyed by monotonically assigned integer IDs.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AccountStore for MemoryStore {
    async fn create_user(&self, user: NewUser) -> StoreResult<User> {
        let mut tables = self.tables.write().await;
        if tables.users.values().any(|u| u.email == user.email) {
            return Err(StoreError::already_exists("User", &user.email));
        }

        tables.last_user_id += 1;
        let now = Utc::now();
        let user = User {
            id: tables.last_user_id,
            email: user.email,
            name: user.name,
            password_hash: user.password_hash,
            is_active: true,
            is_staff: user.is_staff,
            is_superuser: user.is_superuser,
            created_at: now,
            updated_at: now,
        };
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn get_user(&self, id: i64) -> StoreResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.get(&id).cloned())
    }

    async fn get_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.email == email).cloned())
    }

    async fn update_user(&self, mut user: User) -> StoreResult<User> {
        let mut tables = self.tables.write().await;
        if tables
            .users
            .values()
            .any(|u| u.id != user.id && u.email == user.email)
        {
            return Err(StoreError::already_exists("User", &user.email));
        }

        let existing = tables
            .users
            .get_mut(&user.id)
            .ok_or_else(|| StoreError::not_found("User", user.id))?;
        user.created_at = existing.created_at;
        user.updated_at = Utc::now();
        *existing = user.clone();
        Ok(user)
    }

    async fn revoke_token(&self, jti: &str, expires_at: DateTime<Utc>) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        let now = Utc::now();
        tables.revoked_tokens.retain(|_, exp| *exp > now);
        tables.revoked_tokens.insert(jti.to_string(), expires_at);
        Ok(())
    }

    async fn is_token_revoked(&self, jti: &str) -> StoreResult<bool> {
        let tables = self.tables.read().await;
        Ok(tables.revoked_tokens.contains_key(jti))
    }
}

#[async_trait]
impl TagStore for MemoryStore {
    async fn list_tags(&self, owner: i64) -> StoreResult<Vec<Tag>> {
        let tables = self.tables.read().await;
        Ok(tables
            .tags
            .values()
            .rev()
            .filter(|t| t.is_owned_by(owner))
            .cloned()
            .collect())
    }

    async fn get_tag(&self, owner: i64, id: i64) -> StoreResult<Option<Tag>> {
        let tables = self.tables.read().await;
        Ok(tables.tags.get(&id).filter(|t| t.is_owned_by(owner)).cloned())
    }

    async fn create_tag(&self, owner: i64, name: &str) -> StoreResult<Tag> {
        let mut tables = self.tables.write().await;
        if tables.find_tag(owner, name).is_some() {
            return Err(StoreError::already_exists("Tag", name));
        }
        Ok(tables.insert_tag(owner, name))
    }

    async fn get_or_create_tag(&self, owner: i64, name: &str) -> StoreResult<(Tag, bool)> {
        let mut tables = self.tables.write().await;
        Ok(tables.get_or_create_tag(owner, name))
    }

    async fn update_tag(&self, owner: i64, id: i64, name: &str) -> StoreResult<Tag> {
        let mut tables = self.tables.write().await;
        if !tables.tags.get(&id).is_some_and(|t| t.is_owned_by(owner)) {
            return Err(StoreError::not_found("Tag", id));
        }
        if tables.find_tag(owner, name).is_some_and(|t| t.id != id) {
            return Err(StoreError::already_exists("Tag", name));
        }

        let tag = tables
            .tags
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("Tag", id))?;
        tag.name = name.to_string();
        Ok(tag.clone())
    }

    async fn delete_tag(&self, owner: i64, id: i64) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        if !tables.tags.get(&id).is_some_and(|t| t.is_owned_by(owner)) {
            return Err(StoreError::not_found("Tag", id));
        }

        tables.tags.remove(&id);
        for tag_ids in tables.recipe_tags.values_mut() {
            tag_ids.remove(&id);
        }
        Ok(())
    }
}

#[async_trait]
impl RecipeStore for MemoryStore {
    async fn list_recipes(&self, owner: i64) -> StoreResult<Vec<Recipe>> {
        let tables = self.tables.read().await;
        Ok(tables
            .recipes
            .values()
            .rev()
            .filter(|r| r.is_owned_by(owner))
            .map(|r| tables.with_tags(r))
            .collect())
    }

    async fn get_recipe(&self, owner: i64, id: i64) -> StoreResult<Option<Recipe>> {
        let tables = self.tables.read().await;
        Ok(tables
            .recipes
            .get(&id)
            .filter(|r| r.is_owned_by(owner))
            .map(|r| tables.with_tags(r)))
    }

    async fn create_recipe(&self, owner: i64, fields: RecipeFields) -> StoreResult<Recipe> {
        let mut tables = self.tables.write().await;

        tables.last_recipe_id += 1;
        let now = Utc::now();
        let recipe = Recipe {
            id: tables.last_recipe_id,
            user_id: owner,
            title: fields.title,
            description: fields.description.unwrap_or_default(),
            time_minutes: fields.time_minutes,
            price: fields.price,
            link: fields.link.unwrap_or_default(),
            tags: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        tables.recipes.insert(recipe.id, recipe.clone());
        tables.set_recipe_tags(owner, recipe.id, fields.tags.as_deref().unwrap_or_default());

        Ok(tables.with_tags(&recipe))
    }

    async fn update_recipe(
        &self,
        owner: i64,
        id: i64,
        changes: RecipeChanges,
    ) -> StoreResult<Recipe> {
        let mut tables = self.tables.write().await;

        let recipe = tables.owned_recipe_mut(owner, id)?;
        changes.apply_to(recipe);
        recipe.updated_at = Utc::now();
        let recipe = recipe.clone();

        if let Some(names) = &changes.tags {
            tables.set_recipe_tags(owner, id, names);
        }

        Ok(tables.with_tags(&recipe))
    }

    async fn delete_recipe(&self, owner: i64, id: i64) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        tables.owned_recipe_mut(owner, id)?;
        tables.recipes.remove(&id);
        tables.recipe_tags.remove(&id);
        Ok(())
    }
}
