//! Actor resolution and user management.

use tracing::{info, warn};

use crate::error::{ExecutionError, VaultError, VaultResult};
use crate::principal::{Actor, Principal, Role, User};
use crate::storage::StorageError;

use super::{InventoryEngine, ResolvedActor};

impl InventoryEngine {
    pub(super) fn seed_default_admin(&self) -> VaultResult<()> {
        if !self.config.seed_default_admin {
            return Ok(());
        }
        let username = self.config.default_admin_username.trim();
        if self.identities.get(username)?.is_some() {
            return Ok(());
        }
        match self.identities.register(User::new(username, Role::Admin)?) {
            // Lost a race with another engine sharing the store.
            Ok(()) | Err(StorageError::DuplicateKey(_)) => {}
            Err(e) => return Err(e.into()),
        }
        info!(username, "default administrator registered");
        Ok(())
    }

    /// Look the actor up in the registry.
    ///
    /// A registered actor's role comes from the registry, not from the
    /// caller's copy.
    pub(crate) fn resolve_actor(&self, actor: &dyn Actor) -> VaultResult<ResolvedActor> {
        let key = actor.identity_key().to_string();
        let mut principal = actor.to_principal();

        let role = match self.identities.get(&key)? {
            Some(user) => {
                if let Principal::User(u) = &mut principal {
                    u.role = user.role;
                }
                user.role
            }
            None if self.config.require_registered_actors => {
                return Err(ExecutionError::PrincipalNotFound { key }.into());
            }
            None => actor.role(),
        };

        Ok(ResolvedActor {
            key,
            role,
            principal,
        })
    }

    pub(super) fn require_admin(&self, actor: &ResolvedActor, action: &str) -> VaultResult<()> {
        if actor.role.is_admin() {
            return Ok(());
        }
        Err(deny(actor, action))
    }

    /// Register a new user account.
    ///
    /// # Errors
    /// - `EmptyUsername` for a blank username
    /// - `DuplicateIdentity` if the username is taken
    pub fn register_user(
        &self,
        username: &str,
        role: Role,
        credential: Option<String>,
    ) -> VaultResult<User> {
        let mut user = User::new(username, role)?;
        if let Some(credential) = credential {
            user = user.with_credential(credential);
        }

        let _gate = self.lock_writes()?;
        match self.identities.register(user.clone()) {
            Ok(()) => {}
            Err(StorageError::DuplicateKey(username)) => {
                return Err(ExecutionError::DuplicateIdentity { username }.into());
            }
            Err(e) => return Err(e.into()),
        }
        info!(username = %user.username, role = %user.role, "user registered");
        Ok(user)
    }

    /// Change a registered user's role. Admin only.
    ///
    /// Actors cannot change their own role, and the default administrator
    /// cannot be demoted.
    pub fn set_role(&self, actor: &dyn Actor, username: &str, role: Role) -> VaultResult<User> {
        let _gate = self.lock_writes()?;
        let actor = self.resolve_actor(actor)?;
        self.require_admin(&actor, "change roles")?;

        let username = username.trim();
        if username == actor.key {
            return Err(deny(&actor, "change their own role"));
        }
        if self.config.seed_default_admin
            && username == self.config.default_admin_username.trim()
            && role != Role::Admin
        {
            return Err(deny(&actor, "demote the default administrator"));
        }

        self.identities.set_role(username, role)?;
        let user = self
            .identities
            .get(username)?
            .ok_or_else(|| ExecutionError::PrincipalNotFound {
                key: username.to_string(),
            })?;
        info!(username, role = %role, actor = %actor.key, "role changed");
        Ok(user)
    }
}

fn deny(actor: &ResolvedActor, action: &str) -> VaultError {
    warn!(actor = %actor.key, action, "privileged operation denied");
    ExecutionError::PermissionDenied {
        principal: actor.key.clone(),
        action: action.to_string(),
    }
    .into()
}
