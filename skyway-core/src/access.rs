use serde::{Deserialize, Serialize};

use crate::error::{BookingError, CoreResult};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Customer,
    Admin,
}

crate::model::string_enum!(Role, "role", {
    Customer => "CUSTOMER",
    Admin => "ADMIN",
});

/// An authenticated principal, as resolved by the transport layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub user_id: String,
    pub role: Role,
}

/// What a caller may touch. Resolved once per request; the booking engine
/// never looks at roles directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Grant {
    /// Only records owned by this user.
    Owner(String),
    /// Any record. Carries the acting user for records it creates.
    Elevated { acting_user: String },
}

impl Caller {
    pub fn new(user_id: impl Into<String>, role: Role) -> Self {
        Self {
            user_id: user_id.into(),
            role,
        }
    }

    pub fn grant(&self) -> Grant {
        match self.role {
            Role::Admin => Grant::Elevated {
                acting_user: self.user_id.clone(),
            },
            Role::Customer => Grant::Owner(self.user_id.clone()),
        }
    }
}

impl Grant {
    /// User that newly created records belong to.
    pub fn user_id(&self) -> &str {
        match self {
            Grant::Owner(user) => user,
            Grant::Elevated { acting_user } => acting_user,
        }
    }

    pub fn is_elevated(&self) -> bool {
        matches!(self, Grant::Elevated { .. })
    }

    pub fn permits(&self, owner: &str) -> bool {
        match self {
            Grant::Owner(user) => user == owner,
            Grant::Elevated { .. } => true,
        }
    }

    pub fn ensure_permits(&self, owner: &str) -> CoreResult<()> {
        if self.permits(owner) {
            Ok(())
        } else {
            Err(BookingError::Unauthorized(
                "booking belongs to another user".to_string(),
            ))
        }
    }

    pub fn ensure_elevated(&self) -> CoreResult<()> {
        if self.is_elevated() {
            Ok(())
        } else {
            Err(BookingError::Unauthorized(
                "administrator role required".to_string(),
            ))
        }
    }
}
