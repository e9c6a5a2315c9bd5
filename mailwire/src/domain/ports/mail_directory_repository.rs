//! Port abstraction for the user/alias store and its errors.
//!
//! The read methods are the lookups the mail daemons issue per message; each
//! call is a fresh query against the current store contents. The write
//! methods back the administrative commands.

use async_trait::async_trait;

use crate::domain::{Alias, MailUser, NewAlias, NewMailUser, PasswordHash, Privileges};

use super::define_port_error;

define_port_error! {
    /// Persistence errors raised by mail directory adapters.
    pub enum MailDirectoryError {
        /// Store connection could not be established.
        Connection { message: String } => "mail directory connection failed: {message}",
        /// A unique key already exists.
        Duplicate { message: String } => "mail directory record already exists: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => "mail directory query failed: {message}",
    }
}

/// Store of mail users and aliases.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MailDirectoryRepository: Send + Sync {
    /// Create the users and aliases relations when absent. Idempotent.
    async fn initialize(&self) -> Result<(), MailDirectoryError>;

    /// Stored credential for `email`, if the user exists.
    async fn find_user_password(
        &self,
        email: &str,
    ) -> Result<Option<PasswordHash>, MailDirectoryError>;

    /// Whether any user address or alias source ends with `@domain`.
    async fn domain_has_any_recipient(&self, domain: &str) -> Result<bool, MailDirectoryError>;

    /// Whether a user row with exactly this address exists.
    async fn user_exists(&self, email: &str) -> Result<bool, MailDirectoryError>;

    /// Destination for `address`: the alias destination when an alias with
    /// this source exists, otherwise `address` itself when it is a user.
    async fn resolve_destination(
        &self,
        address: &str,
    ) -> Result<Option<String>, MailDirectoryError>;

    /// Insert a user. Fails with `Duplicate` if the address is taken.
    async fn insert_user(&self, user: &NewMailUser) -> Result<(), MailDirectoryError>;

    /// Delete a user; returns whether a row was removed.
    async fn delete_user(&self, email: &str) -> Result<bool, MailDirectoryError>;

    /// Replace a user's credential; returns whether the user exists.
    async fn update_password(
        &self,
        email: &str,
        password: &PasswordHash,
    ) -> Result<bool, MailDirectoryError>;

    /// Replace a user's privileges; returns whether the user exists.
    async fn update_privileges(
        &self,
        email: &str,
        privileges: &Privileges,
    ) -> Result<bool, MailDirectoryError>;

    /// Fetch a single user without its credential.
    async fn find_user(&self, email: &str) -> Result<Option<MailUser>, MailDirectoryError>;

    /// All users ordered by address.
    async fn list_users(&self) -> Result<Vec<MailUser>, MailDirectoryError>;

    /// Insert an alias. Fails with `Duplicate` if the source is taken.
    async fn insert_alias(&self, alias: &NewAlias) -> Result<(), MailDirectoryError>;

    /// Delete an alias; returns whether a row was removed.
    async fn delete_alias(&self, source: &str) -> Result<bool, MailDirectoryError>;

    /// All aliases ordered by source.
    async fn list_aliases(&self) -> Result<Vec<Alias>, MailDirectoryError>;

    /// Distinct lowercased domains of user addresses and alias sources, in
    /// ascending order.
    async fn list_mail_domains(&self) -> Result<Vec<String>, MailDirectoryError>;
}
