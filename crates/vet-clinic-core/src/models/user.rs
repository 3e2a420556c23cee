//! User and role models.
//!
//! Role is a strict 1:1 side record keyed by user id, not a user subtype.
//! The only construction path that assigns a role is
//! `Database::create_user_with_role`, which writes both rows in one
//! transaction.

use serde::{Deserialize, Serialize};

/// The closed set of roles an account can hold.
///
/// Serialized as fixed uppercase tokens: `ADMIN`, `STAFF`, `VETERINARIAN`,
/// `CLIENT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    /// Full access to every resource, including clinic configuration.
    Admin,
    /// Front-desk/operational staff (funcionário).
    Staff,
    /// Medical staff; authors medical records.
    Veterinarian,
    /// Pet owner (tutor/cliente).
    Client,
}

impl Role {
    /// Wire token for this role.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::Staff => "STAFF",
            Role::Veterinarian => "VETERINARIAN",
            Role::Client => "CLIENT",
        }
    }

    /// Parse a wire token back into a role.
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "ADMIN" => Some(Role::Admin),
            "STAFF" => Some(Role::Staff),
            "VETERINARIAN" => Some(Role::Veterinarian),
            "CLIENT" => Some(Role::Client),
            _ => None,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An account known to the clinic. Credentials live in the external
/// authentication layer; this record only carries identity and contact data.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    /// UUID, generated locally
    pub id: String,
    /// Unique login name
    pub username: String,
    /// Display name
    pub name: String,
    /// Contact email
    pub email: String,
    /// Contact phone
    pub phone: Option<String>,
    /// Creation timestamp
    pub created_at: String,
    /// Last update timestamp
    pub updated_at: String,
}

impl User {
    /// Create a new user with required fields.
    pub fn new(username: String, name: String, email: String) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            username,
            name,
            email,
            phone: None,
            created_at: now.clone(),
            updated_at: now,
        }
    }
}
