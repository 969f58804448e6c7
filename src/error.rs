//! Error types for GuildVault.
//!
//! All errors are strongly typed using thiserror. Every variant is an
//! expected, recoverable outcome reported synchronously to the caller of the
//! operation; none of them is retried by the library.

use rust_decimal::Decimal;
use thiserror::Error;

use crate::item::ItemId;
use crate::storage::StorageError;

/// Validation errors: the input has the wrong shape or range.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Item name cannot be empty")]
    EmptyItemName,

    #[error("Field '{field}' exceeds maximum length of {max_length}")]
    FieldTooLong {
        field: String,
        max_length: usize,
    },

    #[error("Quantity for '{field}' cannot be negative (got {value})")]
    NegativeQuantity {
        field: String,
        value: i64,
    },

    #[error("Movement quantity must be positive (got {value})")]
    NonPositiveQuantity {
        value: i64,
    },

    #[error("Unit value cannot be negative (got {value})")]
    NegativeUnitValue {
        value: Decimal,
    },

    #[error("Movement kind '{kind}' cannot be applied directly")]
    UnsupportedMovementKind {
        kind: String,
    },

    #[error("Quantity overflow: {current} + {delta} does not fit")]
    QuantityOverflow {
        current: i64,
        delta: i64,
    },

    #[error("Username cannot be empty")]
    EmptyUsername,

    #[error("Required field '{field}' is missing")]
    MissingField {
        field: String,
    },

    #[error("Invalid value '{value}' for {field}")]
    InvalidValue {
        field: String,
        value: String,
    },

    #[error("Invalid configuration: {reason}")]
    InvalidConfig {
        reason: String,
    },
}

/// Execution errors: the input was well formed but the operation cannot proceed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecutionError {
    #[error("Item not found: {id}")]
    ItemNotFound {
        id: ItemId,
    },

    #[error("Principal not found: {key}")]
    PrincipalNotFound {
        key: String,
    },

    #[error("Insufficient stock for '{item_name}': requested {requested}, available {available} (short by {})", .requested - .available)]
    InsufficientStock {
        item_id: ItemId,
        item_name: String,
        available: i64,
        requested: i64,
    },

    #[error("Identity already registered: {username}")]
    DuplicateIdentity {
        username: String,
    },

    #[error("Principal '{principal}' is not allowed to {action}")]
    PermissionDenied {
        principal: String,
        action: String,
    },

    #[error("Storage error: {message}")]
    Storage {
        message: String,
    },
}

impl ExecutionError {
    /// How many units an OUT movement was missing, if this is a stock shortfall.
    #[must_use]
    pub const fn shortfall(&self) -> Option<i64> {
        match self {
            Self::InsufficientStock {
                available,
                requested,
                ..
            } => Some(*requested - *available),
            _ => None,
        }
    }
}

impl From<StorageError> for ExecutionError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::ItemNotFound(id) => Self::ItemNotFound { id },
            StorageError::IdentityNotFound(key) => Self::PrincipalNotFound { key },
            other => Self::Storage {
                message: other.to_string(),
            },
        }
    }
}

/// Top-level error type for GuildVault.
#[derive(Debug, Error)]
pub enum VaultError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Execution error: {0}")]
    Execution(#[from] ExecutionError),

    #[error("Internal error: {message}")]
    Internal {
        message: String,
    },
}

impl From<StorageError> for VaultError {
    fn from(err: StorageError) -> Self {
        Self::Execution(err.into())
    }
}

impl VaultError {
    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns true if this is a validation error.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Returns true if this is an execution error.
    #[must_use]
    pub const fn is_execution(&self) -> bool {
        matches!(self, Self::Execution(_))
    }

    /// Returns true if an item or principal reference did not resolve.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::Execution(
                ExecutionError::ItemNotFound { .. } | ExecutionError::PrincipalNotFound { .. }
            )
        )
    }

    /// Returns true if an OUT movement exceeded the available stock.
    #[must_use]
    pub const fn is_insufficient_stock(&self) -> bool {
        matches!(self, Self::Execution(ExecutionError::InsufficientStock { .. }))
    }

    /// Returns true if a registration collided with an existing username.
    #[must_use]
    pub const fn is_duplicate_identity(&self) -> bool {
        matches!(self, Self::Execution(ExecutionError::DuplicateIdentity { .. }))
    }

    /// Returns true if the acting principal lacked the required role.
    #[must_use]
    pub const fn is_permission_denied(&self) -> bool {
        matches!(self, Self::Execution(ExecutionError::PermissionDenied { .. }))
    }

    /// Returns true if this is an internal error.
    #[must_use]
    pub const fn is_internal(&self) -> bool {
        matches!(self, Self::Internal { .. })
    }
}

/// Result type alias for GuildVault operations.
pub type VaultResult<T> = Result<T, VaultError>;
