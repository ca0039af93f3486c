//! Accounts. A user owns itself, so the table carries no `belongs_to`.

use crate::repo::scan::{ColumnCursor, ScanError, Scanner};
use serde::{Deserialize, Serialize};

pub const USERS_TABLE: &str = "users";

/// Canonical projection of the `users` table.
pub const USER_COLUMNS: &[&str] = &[
    "id",
    "username",
    "hashed_password",
    "password_last_changed_on",
    "two_factor_secret",
    "is_admin",
    "created_on",
    "updated_on",
    "archived_on",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub username: String,
    #[serde(skip_serializing)]
    pub hashed_password: String,
    pub password_last_changed_on: Option<u64>,
    #[serde(skip_serializing)]
    pub two_factor_secret: String,
    pub is_admin: bool,
    pub created_on: u64,
    pub updated_on: Option<u64>,
    pub archived_on: Option<u64>,
}

impl User {
    pub fn scan<S: Scanner + ?Sized>(row: &S) -> Result<Self, ScanError> {
        let mut cursor = ColumnCursor::new(row, USERS_TABLE, USER_COLUMNS)?;
        Ok(Self {
            id: cursor.read()?,
            username: cursor.read()?,
            hashed_password: cursor.read()?,
            password_last_changed_on: cursor.read()?,
            two_factor_secret: cursor.read()?,
            is_admin: cursor.read()?,
            created_on: cursor.read()?,
            updated_on: cursor.read()?,
            archived_on: cursor.read()?,
        })
    }

    pub fn is_archived(&self) -> bool {
        self.archived_on.is_some()
    }
}

/// Registration payload. Hashing happens before this crate sees the password.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UserCreationInput {
    pub username: String,
    pub hashed_password: String,
    pub two_factor_secret: String,
    pub is_admin: bool,
}

#[cfg(test)]
mod tests {
    use super::User;

    #[test]
    fn secrets_are_not_serialized() {
        let user = User {
            id: 1,
            username: "chef".to_string(),
            hashed_password: "hash".to_string(),
            password_last_changed_on: None,
            two_factor_secret: "otp".to_string(),
            is_admin: false,
            created_on: 10,
            updated_on: None,
            archived_on: None,
        };
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("hashed_password").is_none());
        assert!(json.get("two_factor_secret").is_none());
        assert_eq!(json["username"], "chef");
    }
}
