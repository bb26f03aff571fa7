//! Error handling for the storefront core

use std::fmt;
use thiserror::Error;
use uuid::Uuid;

use crate::checkout::CheckoutStage;
use crate::session::{Permission, Role};
use crate::store::StoreError;

/// Problems detected before anything is written to the record store
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// No authenticated identity was supplied
    #[error("authentication required")]
    AuthenticationRequired,

    /// The profile has not picked a role yet
    #[error("a role must be selected first")]
    RoleNotSelected,

    /// The signed-in account has no profile row
    #[error("no profile for user {0}")]
    ProfileNotFound(Uuid),

    /// The role can only be chosen once
    #[error("role already selected: {0}")]
    RoleAlreadySelected(Role),

    /// The acting role may not perform the operation
    #[error("role {role} is not permitted to {permission}")]
    PermissionDenied {
        /// Role of the acting profile
        role: Role,
        /// What was attempted
        permission: Permission,
    },

    /// Checkout was requested with nothing in the cart
    #[error("cart is empty")]
    EmptyCart,

    /// A product listing failed validation
    #[error("invalid listing: {0}")]
    InvalidListing(String),

    /// The chosen alternative was not part of the recommendation
    #[error("product {0} is not one of the suggested alternatives")]
    UnknownAlternative(Uuid),

    /// The idempotency key belongs to another user's checkout
    #[error("idempotency key {key} is already used by another checkout")]
    IdempotencyConflict {
        /// The conflicting key
        key: Uuid,
    },
}

/// Unified error type for the storefront core
#[derive(Error, Debug)]
pub enum Error {
    /// Precondition failures, nothing was written
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// A record store call failed
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// A store call failed after the order was created but before the cart was cleared
    #[error("Order {order_id} partially applied (last completed stage: {stage}): {source}")]
    PartialOrder {
        /// The order that exists in the store
        order_id: Uuid,
        /// The last stage that completed successfully
        stage: CheckoutStage,
        /// The failing store call
        #[source]
        source: StoreError,
    },

    /// Invalid or missing configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON serialization or deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a new configuration error
    pub fn config<T: fmt::Display>(msg: T) -> Self {
        Error::Config(msg.to_string())
    }

    /// Whether the error means the caller should prompt for sign-in
    pub fn is_authentication_required(&self) -> bool {
        matches!(
            self,
            Error::Validation(ValidationError::AuthenticationRequired)
        )
    }

    /// The order left behind by a partially applied checkout, if any
    pub fn partial_order(&self) -> Option<Uuid> {
        match self {
            Error::PartialOrder { order_id, .. } => Some(*order_id),
            _ => None,
        }
    }
}

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;
