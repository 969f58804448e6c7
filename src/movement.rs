//! Ledger movements.
//!
//! A movement is written once by the engine and never touched again. It
//! keeps a copy of the item name as it was at write time, so renaming an
//! item does not rewrite history.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;
use crate::item::{Item, ItemId};

/// Unique movement identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MovementId(Uuid);

impl MovementId {
    /// Creates a new random movement ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for MovementId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MovementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What a movement did to stock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MovementKind {
    /// Stock increase.
    In,
    /// Stock decrease.
    Out,
    /// Item introduced with its initial quantity.
    Create,
    /// Administrative correction; `balance_after` carries the new quantity.
    Adjust,
}

impl MovementKind {
    /// Canonical label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::In => "IN",
            Self::Out => "OUT",
            Self::Create => "CREATE",
            Self::Adjust => "ADJUST",
        }
    }

    /// True for the kinds a caller may request through `apply_movement`.
    #[must_use]
    pub const fn is_transfer(self) -> bool {
        matches!(self, Self::In | Self::Out)
    }
}

impl fmt::Display for MovementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MovementKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "IN" => Ok(Self::In),
            "OUT" => Ok(Self::Out),
            "CREATE" => Ok(Self::Create),
            "ADJUST" => Ok(Self::Adjust),
            _ => Err(ValidationError::InvalidValue {
                field: "movement_kind".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

/// One immutable ledger entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Movement {
    /// Unique id.
    pub id: MovementId,
    /// The item this movement touched. The item may since have been edited.
    pub item_id: ItemId,
    /// Item name at write time.
    pub item_name: String,
    /// Direction of the change.
    pub kind: MovementKind,
    /// Magnitude of the change, never signed.
    pub quantity: i64,
    /// Item quantity right after this movement.
    pub balance_after: i64,
    /// Identity key of the acting principal.
    pub performed_by: String,
    /// When the movement was recorded.
    pub timestamp: DateTime<Utc>,
    /// Free-text justification.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl Movement {
    /// Records a movement against `item`, whose quantity must already reflect it.
    pub(crate) fn record(
        item: &Item,
        kind: MovementKind,
        quantity: i64,
        performed_by: &str,
        reason: Option<String>,
    ) -> Self {
        Self {
            id: MovementId::new(),
            item_id: item.id,
            item_name: item.name.clone(),
            kind,
            quantity,
            balance_after: item.quantity,
            performed_by: performed_by.to_string(),
            timestamp: Utc::now(),
            reason,
        }
    }

    /// Change this movement applied to stock, with sign.
    #[must_use]
    pub const fn signed_delta(&self) -> i64 {
        match self.kind {
            MovementKind::In | MovementKind::Create => self.quantity,
            MovementKind::Out => -self.quantity,
            MovementKind::Adjust => 0,
        }
    }
}
