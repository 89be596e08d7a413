//! The `users` resource.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::UserId;
use crate::resource::Resource;

/// A user as served by the API (never carries credentials).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub email_verified_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Resource for User {
    type Id = UserId;

    fn id(&self) -> UserId {
        self.id
    }

    fn label(&self) -> Option<String> {
        Some(self.name.clone())
    }
}

/// Editable user fields, as submitted by create/edit forms.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPayload {
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl From<User> for UserPayload {
    fn from(user: User) -> Self {
        Self {
            name: user.name,
            email: user.email,
            password: None,
        }
    }
}
