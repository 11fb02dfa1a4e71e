//! Root aggregate: every user of one store, keyed by username.
//!
//! # Responsibility
//! - Eagerly read the username index; leave each user unloaded.
//! - Keep the `users` index in step with user create/rename/delete.
//!
//! # Invariants
//! - `get_user` is an implicit upsert; a repeated call never allocates.
//! - A user's own keys are written before its index entry.

use crate::model::error::{CoreError, CoreResult};
use crate::model::keys::{EntityKind, IdAllocator, USERS_KEY};
use crate::model::name::validate_name;
use crate::model::user::User;
use log::info;
use std::collections::BTreeMap;

#[derive(Debug)]
pub struct NoteDirectory {
    ids: IdAllocator,
    users: BTreeMap<String, User>,
}

impl NoteDirectory {
    /// Reads the username index and builds one unloaded user per entry.
    pub fn open(ids: IdAllocator) -> CoreResult<Self> {
        let index = ids.store().hash_entries(USERS_KEY)?;
        let users = index
            .into_iter()
            .map(|(username, user_id)| {
                let user = User::by_reference(&ids, user_id);
                (username, user)
            })
            .collect::<BTreeMap<_, _>>();
        info!(
            "event=directory_open module=model status=ok users={}",
            users.len()
        );
        Ok(Self { ids, users })
    }

    pub fn ids(&self) -> &IdAllocator {
        &self.ids
    }

    pub fn users(&self) -> &BTreeMap<String, User> {
        &self.users
    }

    pub fn user(&self, username: &str) -> Option<&User> {
        self.users.get(username)
    }

    pub fn contains_user(&self, username: &str) -> bool {
        self.users.contains_key(username)
    }

    /// Returns the user, creating it first when the username is unknown.
    pub fn get_user(&mut self, username: &str) -> CoreResult<&mut User> {
        if !self.users.contains_key(username) {
            self.add_user(username)?;
        }
        self.users
            .get_mut(username)
            .ok_or_else(|| CoreError::not_found(EntityKind::User, username))
    }

    pub fn add_user(&mut self, username: &str) -> CoreResult<String> {
        validate_name(username).map_err(|reason| CoreError::invalid_name(username, reason))?;
        if self.users.contains_key(username) {
            return Err(CoreError::AlreadyExists {
                username: username.to_string(),
            });
        }

        let user = User::create(&self.ids, username)?;
        self.ids.store().hash_set(USERS_KEY, username, user.id())?;
        self.users.insert(username.to_string(), user);
        Ok(username.to_string())
    }

    /// Renames a user. The name key is rewritten first, then the index entry
    /// moves from the old username to the new one.
    pub fn rename_user(&mut self, username: &str, new_username: &str) -> CoreResult<String> {
        validate_name(new_username)
            .map_err(|reason| CoreError::invalid_name(new_username, reason))?;
        if !self.users.contains_key(username) {
            return Err(CoreError::not_found(EntityKind::User, username));
        }
        if username == new_username {
            return Ok(new_username.to_string());
        }
        if self.users.contains_key(new_username) {
            return Err(CoreError::AlreadyExists {
                username: new_username.to_string(),
            });
        }

        let mut user = self
            .users
            .remove(username)
            .ok_or_else(|| CoreError::not_found(EntityKind::User, username))?;
        let moved = user.set_name(new_username).and_then(|()| {
            let store = self.ids.store();
            store.hash_set(USERS_KEY, new_username, user.id())?;
            store.hash_delete(USERS_KEY, username)?;
            Ok(())
        });
        match moved {
            Ok(()) => {
                info!(
                    "event=user_rename module=model status=ok user_id={}",
                    user.id()
                );
                self.users.insert(new_username.to_string(), user);
                Ok(new_username.to_string())
            }
            Err(err) => {
                self.users.insert(username.to_string(), user);
                Err(err)
            }
        }
    }

    /// Deletes the user's keys, then its index entry. A user whose name key
    /// is already gone is still deletable.
    pub fn delete_user(&mut self, username: &str) -> CoreResult<String> {
        let user = self
            .users
            .get_mut(username)
            .ok_or_else(|| CoreError::not_found(EntityKind::User, username))?;
        user.delete()?;
        self.users.remove(username);
        self.ids.store().hash_delete(USERS_KEY, username)?;
        Ok(username.to_string())
    }

    /// Deletes every user, then the username index. Users leave the map and
    /// the index one at a time, so a failed call can be retried.
    pub fn delete(&mut self) -> CoreResult<()> {
        let usernames: Vec<String> = self.users.keys().cloned().collect();
        for username in &usernames {
            self.delete_user(username)?;
        }
        self.ids.store().delete(USERS_KEY)?;
        info!(
            "event=directory_delete module=model status=ok users={}",
            usernames.len()
        );
        Ok(())
    }
}
