//! Mock authentication gate.
//!
//! The signed-in user lives in an explicit [`Session`] value that callers
//! pass to whatever needs it. `restore` brings the last user back from
//! durable storage; `logout` clears both storage and memory.

pub mod auth;

pub use auth::CredentialDirectory;

use crate::core::{AdminError, Result, User};
use crate::overlay::KeyValueStore;
use std::sync::Arc;
use tracing::{Level, event};

/// Storage key holding the serialized current user.
pub const USER_KEY: &str = "user";

pub struct Session {
    storage: Arc<dyn KeyValueStore>,
    directory: CredentialDirectory,
    user: Option<User>,
}

impl Session {
    /// Restores the persisted user, if any.
    pub fn restore(storage: Arc<dyn KeyValueStore>, directory: CredentialDirectory) -> Result<Self> {
        let user = match storage.get(USER_KEY)? {
            None => None,
            Some(raw) => Some(serde_json::from_str::<User>(&raw).map_err(|err| {
                AdminError::Persistence(format!("Stored session is malformed: {}", err))
            })?),
        };
        if let Some(user) = &user {
            event!(Level::INFO, username = %user.username, role = %user.role, "session restored");
        }
        Ok(Self {
            storage,
            directory,
            user,
        })
    }

    pub fn login(&mut self, username: &str, password: &str) -> Result<User> {
        let user = match self.directory.authenticate(username, password) {
            Ok(user) => user,
            Err(err) => {
                event!(Level::WARN, username = %username, "login rejected");
                return Err(err);
            }
        };
        let raw = serde_json::to_string(&user)
            .map_err(|err| AdminError::Persistence(format!("Failed to serialize session: {}", err)))?;
        self.storage.set(USER_KEY, &raw)?;
        self.user = Some(user.clone());
        event!(Level::INFO, username = %user.username, role = %user.role, "logged in");
        Ok(user)
    }

    pub fn logout(&mut self) -> Result<()> {
        self.storage.remove(USER_KEY)?;
        if let Some(user) = self.user.take() {
            event!(Level::INFO, username = %user.username, "logged out");
        }
        Ok(())
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    pub fn is_admin(&self) -> bool {
        self.user.as_ref().is_some_and(User::is_admin)
    }

    /// The current user, provided they may perform `action`.
    pub fn require_admin(&self, action: &str) -> Result<&User> {
        match &self.user {
            Some(user) if user.is_admin() => Ok(user),
            Some(user) => Err(AdminError::Forbidden(format!(
                "'{}' may not {}",
                user.username, action
            ))),
            None => Err(AdminError::Forbidden(format!("log in to {}", action))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Role;
    use crate::overlay::MemoryKeyValueStore;

    fn directory() -> CredentialDirectory {
        CredentialDirectory::with_accounts(&[
            ("admin", "admin123", Role::Admin),
            ("user", "user123", Role::User),
        ])
        .unwrap()
    }

    #[test]
    fn login_persists_and_restore_recovers() {
        let storage: Arc<dyn KeyValueStore> = Arc::new(MemoryKeyValueStore::new());
        let mut session = Session::restore(storage.clone(), directory()).unwrap();
        assert!(!session.is_authenticated());

        session.login("admin", "admin123").unwrap();
        assert_eq!(
            storage.get(USER_KEY).unwrap().as_deref(),
            Some(r#"{"username":"admin","role":"admin"}"#)
        );

        let restored = Session::restore(storage, directory()).unwrap();
        assert_eq!(restored.user(), Some(&User::new("admin", Role::Admin)));
        assert!(restored.is_admin());
    }

    #[test]
    fn logout_clears_storage_and_memory() {
        let storage: Arc<dyn KeyValueStore> = Arc::new(MemoryKeyValueStore::new());
        let mut session = Session::restore(storage.clone(), directory()).unwrap();
        session.login("user", "user123").unwrap();

        session.logout().unwrap();
        assert!(session.user().is_none());
        assert_eq!(storage.get(USER_KEY).unwrap(), None);
    }

    #[test]
    fn failed_login_keeps_previous_state() {
        let storage: Arc<dyn KeyValueStore> = Arc::new(MemoryKeyValueStore::new());
        let mut session = Session::restore(storage.clone(), directory()).unwrap();
        assert!(session.login("admin", "nope").is_err());
        assert!(!session.is_authenticated());
        assert_eq!(storage.get(USER_KEY).unwrap(), None);
    }

    #[test]
    fn require_admin_rejects_plain_users() {
        let storage: Arc<dyn KeyValueStore> = Arc::new(MemoryKeyValueStore::new());
        let mut session = Session::restore(storage, directory()).unwrap();
        assert!(matches!(session.require_admin("delete"), Err(AdminError::Forbidden(_))));

        session.login("user", "user123").unwrap();
        assert!(matches!(session.require_admin("delete"), Err(AdminError::Forbidden(_))));

        session.login("admin", "admin123").unwrap();
        assert_eq!(session.require_admin("delete").unwrap().username, "admin");
    }

    #[test]
    fn malformed_session_blob_is_reported() {
        let storage: Arc<dyn KeyValueStore> = Arc::new(MemoryKeyValueStore::new());
        storage.set(USER_KEY, "not-json").unwrap();
        assert!(matches!(
            Session::restore(storage, directory()),
            Err(AdminError::Persistence(_))
        ));
    }
}
