//! The acting user, passed explicitly into every operation

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::error::ValidationError;
use crate::models::Profile;

/// Platform role chosen once per account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Seller,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Seller => "seller",
            Role::Admin => "admin",
        }
    }

    /// Whether this role grants `permission`
    pub fn permits(&self, permission: Permission) -> bool {
        match (self, permission) {
            (_, Permission::Shop) => true,
            (Role::Seller, Permission::ManageListings) => true,
            (Role::Admin, Permission::ViewPlatformReport) => true,
            (Role::User, Permission::ManageListings | Permission::ViewPlatformReport)
            | (Role::Seller, Permission::ViewPlatformReport)
            | (Role::Admin, Permission::ManageListings) => false,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operations gated by role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permission {
    /// Fill a cart and check out
    Shop,
    /// Create and view one's own listings
    ManageListings,
    /// See platform-wide totals
    ViewPlatformReport,
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Permission::Shop => "shop",
            Permission::ManageListings => "manage listings",
            Permission::ViewPlatformReport => "view the platform report",
        })
    }
}

/// Authenticated identity plus the profile snapshot the caller holds
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub user_id: Uuid,
    pub profile: Option<Profile>,
    pub access_token: Option<String>,
}

impl Session {
    pub fn new(user_id: Uuid) -> Self {
        Self {
            user_id,
            profile: None,
            access_token: None,
        }
    }

    pub fn with_profile(mut self, profile: Profile) -> Self {
        self.profile = Some(profile);
        self
    }

    pub fn with_access_token(mut self, token: &str) -> Self {
        self.access_token = Some(token.to_string());
        self
    }

    pub fn role(&self) -> Option<Role> {
        self.profile.as_ref().and_then(|p| p.role)
    }

    /// Point balance of the held profile snapshot, zero without one
    pub fn carbon_points(&self) -> i64 {
        self.profile.as_ref().map(|p| p.carbon_points).unwrap_or(0)
    }

    /// Fail unless the session's role grants `permission`
    ///
    /// Shopping only needs a signed-in identity, so it passes even before a
    /// role has been chosen.
    pub fn require(&self, permission: Permission) -> Result<(), ValidationError> {
        if permission == Permission::Shop {
            return Ok(());
        }
        let role = self.role().ok_or(ValidationError::RoleNotSelected)?;
        if role.permits(permission) {
            Ok(())
        } else {
            Err(ValidationError::PermissionDenied { role, permission })
        }
    }
}

/// Unwrap the caller's session or report that sign-in is needed
pub fn authenticated(session: Option<&Session>) -> Result<&Session, ValidationError> {
    session.ok_or(ValidationError::AuthenticationRequired)
}
