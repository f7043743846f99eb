use super::models::{AccountUpdate, NewUser, User, UserCollection};
use anyhow::Result;
use std::collections::HashSet;

pub trait UserStore: Send + Sync {
    /// Creates an unverified user and returns its id.
    /// Fails if the username or the email is already taken.
    fn create_user(&self, new_user: &NewUser) -> Result<usize>;

    /// Returns Ok(None) if the user does not exist.
    fn get_user(&self, user_id: usize) -> Result<Option<User>>;

    /// Returns Ok(None) if no user has this email.
    fn get_user_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Returns Ok(None) if no user has this username.
    fn get_user_by_username(&self, username: &str) -> Result<Option<User>>;

    /// Applies every field set in `update` in a single transaction.
    fn update_account(&self, user_id: usize, update: &AccountUpdate) -> Result<()>;

    /// Removes the user and its collections. Returns false if there was no
    /// such user.
    fn delete_user(&self, user_id: usize) -> Result<bool>;

    /// Returns false if the id was already in the collection.
    fn add_to_collection(
        &self,
        user_id: usize,
        collection: UserCollection,
        item_id: &str,
    ) -> Result<bool>;

    /// Returns false if the id was not in the collection.
    fn remove_from_collection(
        &self,
        user_id: usize,
        collection: UserCollection,
        item_id: &str,
    ) -> Result<bool>;

    fn get_collection(&self, user_id: usize, collection: UserCollection)
        -> Result<HashSet<String>>;

    fn count_users(&self) -> Result<usize>;
}
