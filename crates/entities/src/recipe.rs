//! Recipe entity definitions.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::Tag;

/// Number of decimal places stored for a price.
pub const PRICE_DECIMAL_PLACES: u32 = 2;

/// Maximum number of digits (integer and fractional) in a price.
pub const PRICE_MAX_DIGITS: u32 = 5;

/// A recipe owned by a single user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recipe {
    /// Unique identifier.
    pub id: i64,
    /// Owning user ID. Set once on creation.
    pub user_id: i64,
    /// Title.
    pub title: String,
    /// Free-form description (may be empty).
    pub description: String,
    /// Preparation time in minutes.
    pub time_minutes: i32,
    /// Price with two decimal places.
    pub price: Decimal,
    /// Link to the full recipe (may be empty).
    pub link: String,
    /// Attached tags, all owned by `user_id`, ordered by tag ID.
    pub tags: Vec<Tag>,
    /// When this record was created.
    pub created_at: DateTime<Utc>,
    /// When this record was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Recipe {
    /// Returns true if the recipe belongs to the given user.
    pub fn is_owned_by(&self, user_id: i64) -> bool {
        self.user_id == user_id
    }

    /// Returns the attached tag names, ordered by tag ID.
    pub fn tag_names(&self) -> Vec<&str> {
        self.tags.iter().map(|tag| tag.name.as_str()).collect()
    }
}

/// Why a price cannot be stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceError {
    /// More than [`PRICE_DECIMAL_PLACES`] decimal places.
    TooManyDecimalPlaces,
    /// More than [`PRICE_MAX_DIGITS`] digits in total.
    TooManyDigits,
}

impl PriceError {
    /// Returns a user-facing description.
    pub fn message(&self) -> String {
        match self {
            Self::TooManyDecimalPlaces => format!(
                "Ensure that there are no more than {PRICE_DECIMAL_PLACES} decimal places."
            ),
            Self::TooManyDigits => {
                format!("Ensure that there are no more than {PRICE_MAX_DIGITS} digits in total.")
            }
        }
    }
}

/// Rescales a price to the stored precision.
///
/// Fails if the value has more decimal places than stored, or more digits in
/// total than the column allows.
pub fn normalize_price(price: Decimal) -> Result<Decimal, PriceError> {
    let mut price = price.normalize();
    if price.scale() > PRICE_DECIMAL_PLACES {
        return Err(PriceError::TooManyDecimalPlaces);
    }
    price.rescale(PRICE_DECIMAL_PLACES);

    let digits = price.mantissa().unsigned_abs().to_string().len() as u32;
    if digits > PRICE_MAX_DIGITS {
        return Err(PriceError::TooManyDigits);
    }
    Ok(price)
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn test_normalize_price_rescales() {
        let price = normalize_price(Decimal::from_str("10.3").unwrap()).unwrap();
        assert_eq!(price.to_string(), "10.30");

        let price = normalize_price(Decimal::from_str("5").unwrap()).unwrap();
        assert_eq!(price.to_string(), "5.00");
    }

    #[test]
    fn test_normalize_price_trailing_zeros() {
        let price = normalize_price(Decimal::from_str("3.4500").unwrap()).unwrap();
        assert_eq!(price.to_string(), "3.45");
    }

    #[test]
    fn test_normalize_price_rejects_precision() {
        assert_eq!(
            normalize_price(Decimal::from_str("1.234").unwrap()),
            Err(PriceError::TooManyDecimalPlaces)
        );
        assert_eq!(
            normalize_price(Decimal::from_str("1000.00").unwrap()),
            Err(PriceError::TooManyDigits)
        );
        assert!(normalize_price(Decimal::from_str("999.99").unwrap()).is_ok());
    }

    #[test]
    fn test_tag_names() {
        let now = Utc::now();
        let recipe = Recipe {
            id: 1,
            user_id: 7,
            title: "Thai Prawn Curry".to_string(),
            description: String::new(),
            time_minutes: 30,
            price: Decimal::from_str("3.45").unwrap(),
            link: String::new(),
            tags: vec![
                Tag { id: 2, user_id: 7, name: "Thai".to_string() },
                Tag { id: 3, user_id: 7, name: "Dinner".to_string() },
            ],
            created_at: now,
            updated_at: now,
        };

        assert!(recipe.is_owned_by(7));
        assert_eq!(recipe.tag_names(), vec!["Thai", "Dinner"]);
    }
}
