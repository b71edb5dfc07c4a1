//! Request body types.
//!
//! Unknown fields (such as `id` or `owner`) are ignored by serde's default
//! behaviour. Every field is optional at the JSON level so that missing
//! values are reported per field instead of as a parse failure. Tag and
//! recipe fields keep an explicit `null` apart from an absent field, and
//! reject it.

use entities::{normalize_price, MAX_TEXT_LENGTH};
use recipe_store::{RecipeChanges, RecipeFields};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

use crate::{FieldErrors, FIELD_BLANK, FIELD_NULL, FIELD_REQUIRED};

/// Maps a present field to `Some`, so that `null` becomes `Some(None)` while
/// an absent field stays `None` through `#[serde(default)]`.
fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

// ============================================================================
// User Requests
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateUserRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

// ============================================================================
// Tag Requests
// ============================================================================

/// A tag reference inside a recipe body. Tags are matched by name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagInput {
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TagRequest {
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub name: Option<Option<String>>,
}

impl TagRequest {
    /// Validates the tag name.
    pub fn into_name(self) -> Result<String, FieldErrors> {
        let mut errors = FieldErrors::new();
        if self.name.is_none() {
            errors.add("name", FIELD_REQUIRED);
        }
        let name = non_null(&mut errors, "name", self.name)
            .and_then(|name| check_text(&mut errors, "name", name));
        errors.into_result(name.unwrap_or_default())
    }
}

// ============================================================================
// Recipe Requests
// ============================================================================

/// Body of `POST`, `PUT` and `PATCH` on recipes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecipeRequest {
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub title: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub time_minutes: Option<Option<i64>>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub price: Option<Option<Decimal>>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub link: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub tags: Option<Option<Vec<TagInput>>>,
}

impl RecipeRequest {
    /// Validates a create or full-replace body. Title, time and price are
    /// required.
    pub fn into_fields(self) -> Result<RecipeFields, FieldErrors> {
        let mut errors = FieldErrors::new();
        for (field, present) in [
            ("title", self.title.is_some()),
            ("time_minutes", self.time_minutes.is_some()),
            ("price", self.price.is_some()),
        ] {
            if !present {
                errors.add(field, FIELD_REQUIRED);
            }
        }

        let changes = self.validate(&mut errors);
        match (changes.title, changes.time_minutes, changes.price) {
            (Some(title), Some(time_minutes), Some(price)) if errors.is_empty() => {
                Ok(RecipeFields {
                    title,
                    time_minutes,
                    price,
                    description: changes.description,
                    link: changes.link,
                    tags: changes.tags,
                })
            }
            _ => Err(errors),
        }
    }

    /// Validates a partial update body. Only supplied fields are checked.
    pub fn into_changes(self) -> Result<RecipeChanges, FieldErrors> {
        let mut errors = FieldErrors::new();
        let changes = self.validate(&mut errors);
        errors.into_result(changes)
    }

    fn validate(self, errors: &mut FieldErrors) -> RecipeChanges {
        let title = non_null(errors, "title", self.title)
            .and_then(|t| check_text(errors, "title", t));

        let description =
            non_null(errors, "description", self.description).map(|d| d.trim().to_string());

        let time_minutes = non_null(errors, "time_minutes", self.time_minutes).and_then(|t| {
            if t < 0 {
                errors.add("time_minutes", "Ensure this value is greater than or equal to 0.");
                None
            } else if t > i64::from(i32::MAX) {
                errors.add(
                    "time_minutes",
                    format!("Ensure this value is less than or equal to {}.", i32::MAX),
                );
                None
            } else {
                i32::try_from(t).ok()
            }
        });

        let price = non_null(errors, "price", self.price).and_then(|p| {
            normalize_price(p)
                .map_err(|e| errors.add("price", e.message()))
                .ok()
        });

        let link = non_null(errors, "link", self.link)
            .map(|link| link.trim().to_string())
            .filter(|link| {
                let ok = link.chars().count() <= MAX_TEXT_LENGTH;
                if !ok {
                    errors.add("link", max_length_message());
                }
                ok
            });

        let tags = non_null(errors, "tags", self.tags).map(|tags| {
            tags.into_iter()
                .filter_map(|tag| check_text(errors, "tags", tag.name))
                .collect()
        });

        RecipeChanges {
            title,
            description,
            time_minutes,
            price,
            link,
            tags,
        }
    }
}

fn max_length_message() -> String {
    format!("Ensure this field has no more than {MAX_TEXT_LENGTH} characters.")
}

/// Unwraps a field that may be absent but not `null`.
fn non_null<T>(errors: &mut FieldErrors, field: &str, value: Option<Option<T>>) -> Option<T> {
    match value {
        Some(None) => {
            errors.add(field, FIELD_NULL);
            None
        }
        Some(value) => value,
        None => None,
    }
}

/// Trims a required short text value and checks it is neither blank nor
/// longer than the column.
fn check_text(errors: &mut FieldErrors, field: &str, value: String) -> Option<String> {
    let value = value.trim();
    if value.is_empty() {
        errors.add(field, FIELD_BLANK);
        None
    } else if value.chars().count() > MAX_TEXT_LENGTH {
        errors.add(field, max_length_message());
        None
    } else {
        Some(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use serde_json::json;

    use super::*;

    fn parse(value: serde_json::Value) -> RecipeRequest {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_create_recipe_valid() {
        let request = parse(json!({
            "title": "Thai Prawn Curry",
            "time_minutes": 30,
            "price": "5.5",
            "tags": [{"name": "Thai"}, {"name": "Dinner"}],
        }));

        let fields = request.into_fields().unwrap();
        assert_eq!(fields.title, "Thai Prawn Curry");
        assert_eq!(fields.price.to_string(), "5.50");
        assert_eq!(fields.tags.unwrap(), vec!["Thai", "Dinner"]);
        assert!(fields.description.is_none());
    }

    #[test]
    fn test_price_accepts_number() {
        let request = parse(json!({"title": "t", "time_minutes": 1, "price": 10.3}));

        let fields = request.into_fields().unwrap();
        assert_eq!(fields.price, Decimal::from_str("10.30").unwrap());
    }

    #[test]
    fn test_create_recipe_missing_fields() {
        let errors = parse(json!({"description": "no title"}))
            .into_fields()
            .unwrap_err();

        assert_eq!(
            errors.fields().collect::<Vec<_>>(),
            vec!["price", "time_minutes", "title"]
        );
        assert_eq!(errors.get("title").unwrap(), [FIELD_REQUIRED]);
    }

    #[test]
    fn test_invalid_values() {
        let errors = parse(json!({
            "title": "  ",
            "time_minutes": -1,
            "price": "1234.5",
            "link": "x".repeat(300),
        }))
        .into_fields()
        .unwrap_err();

        assert_eq!(errors.get("title").unwrap(), [FIELD_BLANK]);
        assert!(errors.get("time_minutes").is_some());
        assert!(errors.get("price").is_some());
        assert!(errors.get("link").is_some());
    }

    #[test]
    fn test_time_minutes_upper_bound() {
        let request = parse(json!({"time_minutes": i64::from(i32::MAX) + 1}));
        let errors = request.into_changes().unwrap_err();
        assert!(errors.get("time_minutes").is_some());

        let request = parse(json!({"time_minutes": i32::MAX}));
        assert_eq!(request.into_changes().unwrap().time_minutes, Some(i32::MAX));
    }

    #[test]
    fn test_partial_update_ignores_owner() {
        let request = parse(json!({"title": "New title", "owner": 99, "id": 5}));

        let changes = request.into_changes().unwrap();
        assert_eq!(changes.title.as_deref(), Some("New title"));
        assert!(changes.tags.is_none());
        assert!(changes.price.is_none());
    }

    #[test]
    fn test_empty_tags_clear() {
        let changes = parse(json!({"tags": []})).into_changes().unwrap();
        assert_eq!(changes.tags, Some(Vec::new()));
    }

    #[test]
    fn test_blank_tag_name_rejected() {
        let errors = parse(json!({"tags": [{"name": ""}]}))
            .into_changes()
            .unwrap_err();
        assert_eq!(errors.get("tags").unwrap(), [FIELD_BLANK]);
    }

    #[test]
    fn test_tag_request() {
        let name = TagRequest {
            name: Some(Some(" Vegan ".to_string())),
        }
        .into_name()
        .unwrap();
        assert_eq!(name, "Vegan");

        let errors = TagRequest::default().into_name().unwrap_err();
        assert_eq!(errors.get("name").unwrap(), [FIELD_REQUIRED]);

        let request: TagRequest = serde_json::from_value(json!({"name": null})).unwrap();
        let errors = request.into_name().unwrap_err();
        assert_eq!(errors.get("name").unwrap(), [FIELD_NULL]);
    }

    #[test]
    fn test_text_fields_are_trimmed() {
        let fields = parse(json!({
            "title": "  Thai Prawn Curry ",
            "time_minutes": 30,
            "price": "5.50",
            "link": " example.com/curry ",
            "tags": [{"name": " Thai"}, {"name": "Thai "}],
        }))
        .into_fields()
        .unwrap();

        assert_eq!(fields.title, "Thai Prawn Curry");
        assert_eq!(fields.link.as_deref(), Some("example.com/curry"));
        assert_eq!(fields.tags.unwrap(), vec!["Thai", "Thai"]);
    }

    #[test]
    fn test_null_rejected_on_partial_update() {
        let errors = parse(json!({"title": null, "tags": null, "price": null}))
            .into_changes()
            .unwrap_err();

        assert_eq!(errors.get("title").unwrap(), [FIELD_NULL]);
        assert_eq!(errors.get("tags").unwrap(), [FIELD_NULL]);
        assert_eq!(errors.get("price").unwrap(), [FIELD_NULL]);
    }

    #[test]
    fn test_null_required_field_on_create() {
        let errors = parse(json!({"title": null, "time_minutes": 5, "price": "1.00"}))
            .into_fields()
            .unwrap_err();

        assert_eq!(errors.get("title").unwrap(), [FIELD_NULL]);
    }
}
