//! Tag entity definitions.

use serde::{Deserialize, Serialize};

/// A named label owned by a single user.
///
/// Names are unique per owner, not globally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    /// Unique identifier.
    pub id: i64,
    /// Owning user ID.
    pub user_id: i64,
    /// Tag name.
    pub name: String,
}

impl Tag {
    /// Returns true if the tag belongs to the given user.
    pub fn is_owned_by(&self, user_id: i64) -> bool {
        self.user_id == user_id
    }
}
