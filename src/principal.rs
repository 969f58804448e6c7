//! Principals: the actors that own items and perform mutations.
//!
//! A principal is either a lightweight [`Player`] profile (a game character)
//! or a registered [`User`]. Call sites never inspect which one they hold;
//! they go through the [`Actor`] capability instead.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Privilege level of a principal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    /// May edit items directly and manage other users' roles.
    Admin,
    /// May create items and record IN/OUT movements.
    #[default]
    User,
}

impl Role {
    /// Returns true for the elevated role.
    #[must_use]
    pub const fn is_admin(self) -> bool {
        matches!(self, Self::Admin)
    }

    /// Canonical label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "ADMIN",
            Self::User => "USER",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for Role {
    type Error = ValidationError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let value = value.trim();
        if value.eq_ignore_ascii_case("admin") {
            Ok(Self::Admin)
        } else if value.eq_ignore_ascii_case("user") {
            Ok(Self::User)
        } else {
            Err(ValidationError::InvalidValue {
                field: "role".to_string(),
                value: value.to_string(),
            })
        }
    }
}

/// A registered user account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Unique login name; also the identity key.
    pub username: String,
    /// Privilege level.
    pub role: Role,
    /// Opaque credential supplied at registration. Never copied into item ownership.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential: Option<String>,
}

impl User {
    /// Creates a user, trimming the username.
    ///
    /// Returns `ValidationError::EmptyUsername` for a blank name.
    pub fn new(username: impl Into<String>, role: Role) -> Result<Self, ValidationError> {
        let username = username.into().trim().to_string();
        if username.is_empty() {
            return Err(ValidationError::EmptyUsername);
        }
        Ok(Self {
            username,
            role,
            credential: None,
        })
    }

    /// Attaches a credential.
    #[must_use]
    pub fn with_credential(mut self, credential: impl Into<String>) -> Self {
        self.credential = Some(credential.into());
        self
    }
}

/// A game character profile. Players own items but hold no privileges.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    /// Stable profile id; also the identity key.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Free-form role tag ("Warrior", "Archer", ...).
    pub role_tag: String,
    /// Optional avatar image.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

impl Player {
    /// Creates a player profile without an avatar.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, role_tag: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            role_tag: role_tag.into(),
            avatar_url: None,
        }
    }

    /// Sets the avatar URL.
    #[must_use]
    pub fn with_avatar(mut self, url: impl Into<String>) -> Self {
        self.avatar_url = Some(url.into());
        self
    }
}

/// Whoever holds an item or performed a movement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Principal {
    /// A game character.
    Player(Player),
    /// A registered account (credential stripped).
    User(User),
}

/// Capability required of anything that acts on the inventory.
pub trait Actor {
    /// Stable key used for attribution, ownership filters and registry lookups.
    fn identity_key(&self) -> &str;

    /// Human-readable label.
    fn display_name(&self) -> &str;

    /// Privilege level as claimed by the caller.
    fn role(&self) -> Role;

    /// Ownership snapshot stored on items this actor acquires.
    fn to_principal(&self) -> Principal;
}

impl Actor for User {
    fn identity_key(&self) -> &str {
        &self.username
    }

    fn display_name(&self) -> &str {
        &self.username
    }

    fn role(&self) -> Role {
        self.role
    }

    fn to_principal(&self) -> Principal {
        Principal::User(Self {
            username: self.username.clone(),
            role: self.role,
            credential: None,
        })
    }
}

impl Actor for Player {
    fn identity_key(&self) -> &str {
        &self.id
    }

    fn display_name(&self) -> &str {
        &self.name
    }

    fn role(&self) -> Role {
        Role::User
    }

    fn to_principal(&self) -> Principal {
        Principal::Player(self.clone())
    }
}

impl Actor for Principal {
    fn identity_key(&self) -> &str {
        match self {
            Self::Player(p) => p.identity_key(),
            Self::User(u) => u.identity_key(),
        }
    }

    fn display_name(&self) -> &str {
        match self {
            Self::Player(p) => p.display_name(),
            Self::User(u) => u.display_name(),
        }
    }

    fn role(&self) -> Role {
        match self {
            Self::Player(p) => p.role(),
            Self::User(u) => u.role(),
        }
    }

    fn to_principal(&self) -> Principal {
        match self {
            Self::Player(p) => p.to_principal(),
            Self::User(u) => u.to_principal(),
        }
    }
}

impl From<Player> for Principal {
    fn from(player: Player) -> Self {
        Self::Player(player)
    }
}

impl From<User> for Principal {
    fn from(user: User) -> Self {
        user.to_principal()
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}
