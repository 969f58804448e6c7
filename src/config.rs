//! Engine configuration.

use serde::Deserialize;

use crate::error::ValidationError;

/// Tunables for [`InventoryEngine`](crate::engine::InventoryEngine).
///
/// Deserializable so hosts can keep it next to their own settings:
///
/// ```
/// use guildvault::EngineConfig;
///
/// let cfg: EngineConfig = serde_json::from_str(r#"{ "audit_edits": true }"#).unwrap();
/// assert!(cfg.audit_edits);
/// assert_eq!(cfg.default_admin_username, "admin");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Append an ADJUST movement when an edit changes an item's quantity.
    pub audit_edits: bool,
    /// Reject mutations from actors the identity store does not know.
    pub require_registered_actors: bool,
    /// Register the default administrator when the engine is built.
    pub seed_default_admin: bool,
    /// Username of the default administrator. Its role cannot be revoked.
    pub default_admin_username: String,
    /// Longest accepted item name, in characters.
    pub max_name_length: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            audit_edits: false,
            require_registered_actors: false,
            seed_default_admin: true,
            default_admin_username: "admin".to_string(),
            max_name_length: 128,
        }
    }
}

impl EngineConfig {
    /// Checks the configuration, returning it unchanged when valid.
    pub fn validate(self) -> Result<Self, ValidationError> {
        if self.max_name_length == 0 {
            return Err(ValidationError::InvalidConfig {
                reason: "max_name_length must be at least 1".to_string(),
            });
        }
        if self.seed_default_admin && self.default_admin_username.trim().is_empty() {
            return Err(ValidationError::InvalidConfig {
                reason: "default_admin_username cannot be empty when seeding is enabled"
                    .to_string(),
            });
        }
        Ok(self)
    }
}
