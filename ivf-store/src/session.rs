//! Who is signed in, and whose data blob is loaded.

use chrono::Utc;
use ivf_core::TrackerData;

use crate::{AuthDirectory, AuthError, KeyValueStore, StoreConfig, StoreError, TrackerStore, User};

/// Owns the backend, the account directory and the active user's snapshot.
///
/// Changing identity always goes through [`Session::activate`], which persists
/// the directory and reloads the tracker blob from scratch.
#[derive(Debug)]
pub struct Session<S> {
    directory: AuthDirectory,
    tracker: TrackerStore<S>,
}

impl<S: KeyValueStore> Session<S> {
    /// Load the account directory and, if someone was signed in, their data.
    pub fn open(backend: S, config: StoreConfig) -> Result<Self, StoreError> {
        let directory = match backend.get(&config.auth_key)? {
            Some(value) => serde_json::from_value(value)?,
            None => AuthDirectory::default(),
        };
        let mut session = Self {
            directory,
            tracker: TrackerStore::new(backend, config),
        };

        match session.directory.current().map(|user| user.id.clone()) {
            Some(user_id) => {
                // An unreadable blob signs the user out instead of locking every account out.
                if let Err(err) = session.tracker.load_user(&user_id) {
                    tracing::warn!(
                        %err,
                        %user_id,
                        "cannot load tracker data, starting signed out"
                    );
                    session.directory.current_user = None;
                }
            }
            // A pointer to a deleted account is dropped.
            None => session.directory.current_user = None,
        }
        Ok(session)
    }

    pub fn current_user(&self) -> Option<&User> {
        self.directory.current()
    }

    pub fn users(&self) -> &[User] {
        &self.directory.users
    }

    pub fn tracker(&self) -> &TrackerStore<S> {
        &self.tracker
    }

    /// Tracker operations for the signed-in user.
    pub fn tracker_mut(&mut self) -> Result<&mut TrackerStore<S>, StoreError> {
        if self.tracker.active_user().is_none() {
            return Err(StoreError::NoActiveUser);
        }
        Ok(&mut self.tracker)
    }

    pub fn data(&self) -> &TrackerData {
        self.tracker.data()
    }

    /// Register a new account and sign it in with an empty data blob.
    pub fn create_account(
        &mut self,
        username: &str,
        display_name: &str,
        email: &str,
        password: &str,
    ) -> Result<User, AuthError> {
        let iterations = self.tracker.config().password_iterations;
        let user = self
            .directory
            .register(username, display_name, email, password, iterations, Utc::now())?;
        tracing::info!(user_id = %user.id, username = %user.username, "account created");
        self.activate(&user.id)?;
        Ok(user)
    }

    pub fn login_user(&mut self, username: &str, password: &str) -> Result<User, AuthError> {
        let user = match self.directory.authenticate(username, password, Utc::now()) {
            Ok(user) => user,
            Err(err) => {
                tracing::warn!(username, "login rejected");
                return Err(err);
            }
        };
        self.activate(&user.id)?;
        Ok(user)
    }

    pub fn switch_user(&mut self, user_id: &str) -> Result<(), AuthError> {
        if self.directory.user(user_id).is_none() {
            return Err(AuthError::UserNotFound(user_id.to_string()));
        }
        self.activate(user_id)
    }

    pub fn logout(&mut self) -> Result<(), AuthError> {
        self.directory.current_user = None;
        self.save_directory()?;
        self.tracker.unload();
        tracing::info!("signed out");
        Ok(())
    }

    /// Remove the account and its data blob.
    pub fn delete_account(&mut self, user_id: &str) -> Result<User, AuthError> {
        let was_current = self.directory.current_user.as_deref() == Some(user_id);
        let removed = self.directory.remove(user_id)?;
        self.save_directory()?;

        let data_key = self.tracker.config().data_key(user_id);
        let preferences_key = self.tracker.config().preferences_key(user_id);
        let backend = self.tracker.backend_mut();
        backend.remove(&data_key)?;
        backend.remove(&preferences_key)?;

        if was_current {
            self.tracker.unload();
        }
        tracing::info!(user_id, "account deleted");
        Ok(removed)
    }

    /// Load `user_id`'s blob, then point the directory at them and persist it.
    ///
    /// A blob that fails to load leaves both the pointer and the previous
    /// user's snapshot untouched.
    fn activate(&mut self, user_id: &str) -> Result<(), AuthError> {
        self.tracker.load_user(user_id)?;
        self.directory.current_user = Some(user_id.to_string());
        self.save_directory()?;
        tracing::info!(user_id, "active user switched");
        Ok(())
    }

    fn save_directory(&mut self) -> Result<(), StoreError> {
        let key = self.tracker.config().auth_key.clone();
        let value = serde_json::to_value(&self.directory)?;
        self.tracker.backend_mut().set(&key, &value)
    }

    pub fn into_backend(self) -> S {
        self.tracker.into_backend()
    }
}
