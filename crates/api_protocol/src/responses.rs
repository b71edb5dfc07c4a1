//! Response body types.

use entities::{Recipe, Tag, User};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// ============================================================================
// User Responses
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    pub email: String,
    pub name: String,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            email: user.email.clone(),
            name: user.name.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub token: String,
}

// ============================================================================
// Tag Responses
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagResponse {
    pub id: i64,
    pub name: String,
}

impl From<&Tag> for TagResponse {
    fn from(tag: &Tag) -> Self {
        Self {
            id: tag.id,
            name: tag.name.clone(),
        }
    }
}

// ============================================================================
// Recipe Responses
// ============================================================================

/// List representation of a recipe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeSummary {
    pub id: i64,
    pub title: String,
    pub time_minutes: i32,
    /// Serialized as a string, e.g. `"5.25"`.
    pub price: Decimal,
    pub link: String,
}

impl From<&Recipe> for RecipeSummary {
    fn from(recipe: &Recipe) -> Self {
        Self {
            id: recipe.id,
            title: recipe.title.clone(),
            time_minutes: recipe.time_minutes,
            price: recipe.price,
            link: recipe.link.clone(),
        }
    }
}

/// Detail representation: the summary plus description and tags.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeDetail {
    pub id: i64,
    pub title: String,
    pub time_minutes: i32,
    pub price: Decimal,
    pub link: String,
    pub description: String,
    pub tags: Vec<TagResponse>,
}

impl From<&Recipe> for RecipeDetail {
    fn from(recipe: &Recipe) -> Self {
        Self {
            id: recipe.id,
            title: recipe.title.clone(),
            time_minutes: recipe.time_minutes,
            price: recipe.price,
            link: recipe.link.clone(),
            description: recipe.description.clone(),
            tags: recipe.tags.iter().map(TagResponse::from).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use chrono::Utc;

    use super::*;

    fn sample_recipe() -> Recipe {
        let now = Utc::now();
        Recipe {
            id: 3,
            user_id: 1,
            title: "Sample recipe".to_string(),
            description: "Sample description".to_string(),
            time_minutes: 22,
            price: Decimal::from_str("5.25").unwrap(),
            link: "http://example.com/recipe.pdf".to_string(),
            tags: vec![Tag {
                id: 9,
                user_id: 1,
                name: "Vegan".to_string(),
            }],
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_summary_fields() {
        let json = serde_json::to_value(RecipeSummary::from(&sample_recipe())).unwrap();

        assert_eq!(json["price"], "5.25");
        assert_eq!(json["time_minutes"], 22);
        assert!(json.get("description").is_none());
        assert!(json.get("tags").is_none());
        assert!(json.get("user_id").is_none());
    }

    #[test]
    fn test_detail_fields() {
        let json = serde_json::to_value(RecipeDetail::from(&sample_recipe())).unwrap();

        assert_eq!(json["description"], "Sample description");
        assert_eq!(json["tags"][0]["id"], 9);
        assert_eq!(json["tags"][0]["name"], "Vegan");
        assert!(json["tags"][0].get("user_id").is_none());
    }
}
