//! Administrative and credential operations on the mail directory.
//!
//! Writes validate their input before touching the store; duplicates come
//! back as `ConstraintViolation` and are never overwritten. Addresses naming
//! an existing record are lowercased first, matching how they were stored.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::domain::address::is_valid_domain;
use crate::domain::contact_aliases::{ContactAliasCheck, check_contact_aliases};
use crate::domain::credentials::{hash_password, verify_password};
use crate::domain::routing::map_directory_error;
use crate::domain::{
    Alias, EmailAddress, Error, MailUser, NewAlias, NewMailUser, PasswordHash, Privilege,
    Privileges,
};
use crate::domain::ports::MailDirectoryRepository;

/// Mail directory administration backed by a [`MailDirectoryRepository`].
#[derive(Clone)]
pub struct DirectoryService<R> {
    directory: Arc<R>,
}

fn parse_address(raw: &str) -> Result<EmailAddress, Error> {
    EmailAddress::parse(raw).map_err(|err| Error::invalid_request(format!("{raw}: {err}")))
}

/// Stored form of an address that names an existing record.
fn stored_key(raw: &str) -> String {
    raw.to_lowercase()
}

fn parse_privilege(raw: &str) -> Result<Privilege, Error> {
    Privilege::new(raw).map_err(|err| Error::invalid_request(err.to_string()))
}

impl<R> DirectoryService<R>
where
    R: MailDirectoryRepository,
{
    /// Create a service over `directory`.
    pub fn new(directory: Arc<R>) -> Self {
        Self { directory }
    }

    /// Create the schema if it does not exist yet.
    pub async fn initialize(&self) -> Result<(), Error> {
        self.directory
            .initialize()
            .await
            .map_err(map_directory_error)?;
        info!("mail directory schema ready");
        Ok(())
    }

    /// Stored credential for `email`, for the mailbox server's passdb.
    pub async fn find_user_password(&self, email: &str) -> Result<Option<PasswordHash>, Error> {
        self.directory
            .find_user_password(email)
            .await
            .map_err(map_directory_error)
    }

    /// Verify a login. Unknown users and wrong passwords both yield `false`.
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<bool, Error> {
        let key = stored_key(email);
        let Some(stored) = self.find_user_password(&key).await? else {
            debug!(email = %key, "authentication for unknown user");
            return Ok(false);
        };
        let verified = verify_password(password, &stored);
        debug!(email = %key, verified, "password verification");
        Ok(verified)
    }

    /// Create a mailbox user with a freshly hashed password.
    pub async fn add_user(
        &self,
        email: &str,
        password: &str,
        privileges: Privileges,
    ) -> Result<MailUser, Error> {
        let email = parse_address(email)?;
        let user = NewMailUser {
            password: hash_password(password)?,
            email,
            privileges,
        };
        self.directory
            .insert_user(&user)
            .await
            .map_err(map_directory_error)?;
        info!(email = %user.email, "mail user added");
        Ok(MailUser::new(user.email.as_str(), user.privileges))
    }

    /// Delete a mailbox user. Aliases pointing at it are left untouched.
    pub async fn remove_user(&self, email: &str) -> Result<(), Error> {
        let email = stored_key(email);
        let removed = self
            .directory
            .delete_user(&email)
            .await
            .map_err(map_directory_error)?;
        if !removed {
            return Err(Error::not_found(format!("no such user: {email}")));
        }
        info!(email = %email, "mail user removed");
        Ok(())
    }

    /// Replace a user's password.
    pub async fn set_password(&self, email: &str, password: &str) -> Result<(), Error> {
        let email = stored_key(email);
        let hash = hash_password(password)?;
        let updated = self
            .directory
            .update_password(&email, &hash)
            .await
            .map_err(map_directory_error)?;
        if !updated {
            return Err(Error::not_found(format!("no such user: {email}")));
        }
        info!(email = %email, "mail user password changed");
        Ok(())
    }

    /// Grant a privilege tag; returns `false` when it was already granted.
    pub async fn grant_privilege(&self, email: &str, privilege: &str) -> Result<bool, Error> {
        let privilege = parse_privilege(privilege)?;
        self.edit_privileges(email, |privileges| privileges.insert(privilege))
            .await
    }

    /// Revoke a privilege tag; returns `false` when it was not granted.
    pub async fn revoke_privilege(&self, email: &str, privilege: &str) -> Result<bool, Error> {
        let privilege = parse_privilege(privilege)?;
        self.edit_privileges(email, |privileges| privileges.remove(&privilege))
            .await
    }

    async fn edit_privileges(
        &self,
        email: &str,
        edit: impl FnOnce(&mut Privileges) -> bool + Send,
    ) -> Result<bool, Error> {
        let email = stored_key(email);
        let Some(user) = self
            .directory
            .find_user(&email)
            .await
            .map_err(map_directory_error)?
        else {
            return Err(Error::not_found(format!("no such user: {email}")));
        };
        let mut privileges = user.privileges().clone();
        if !edit(&mut privileges) {
            return Ok(false);
        }
        let updated = self
            .directory
            .update_privileges(&email, &privileges)
            .await
            .map_err(map_directory_error)?;
        if !updated {
            return Err(Error::not_found(format!("no such user: {email}")));
        }
        info!(email = %email, privileges = %privileges, "mail user privileges changed");
        Ok(true)
    }

    /// All users ordered by address.
    pub async fn list_users(&self) -> Result<Vec<MailUser>, Error> {
        self.directory
            .list_users()
            .await
            .map_err(map_directory_error)
    }

    /// Create an alias from `source` (an address or catch-all `@domain`) to
    /// `destination`.
    pub async fn add_alias(&self, source: &str, destination: &str) -> Result<Alias, Error> {
        let source = EmailAddress::parse_alias_source(source)
            .map_err(|err| Error::invalid_request(format!("{source}: {err}")))?;
        let destination = parse_address(destination)?;
        let alias = NewAlias {
            source,
            destination,
        };
        self.directory
            .insert_alias(&alias)
            .await
            .map_err(map_directory_error)?;
        info!(source = %alias.source, destination = %alias.destination, "mail alias added");
        Ok(Alias::from(&alias))
    }

    /// Delete the alias with this source.
    pub async fn remove_alias(&self, source: &str) -> Result<(), Error> {
        let source = stored_key(source);
        let removed = self
            .directory
            .delete_alias(&source)
            .await
            .map_err(map_directory_error)?;
        if !removed {
            return Err(Error::not_found(format!("no such alias: {source}")));
        }
        info!(source = %source, "mail alias removed");
        Ok(())
    }

    /// All aliases ordered by source.
    pub async fn list_aliases(&self) -> Result<Vec<Alias>, Error> {
        self.directory
            .list_aliases()
            .await
            .map_err(map_directory_error)
    }

    /// Domains mail is accepted for, in ascending order.
    pub async fn list_mail_domains(&self) -> Result<Vec<String>, Error> {
        self.directory
            .list_mail_domains()
            .await
            .map_err(map_directory_error)
    }

    /// Report the contact aliases required for `primary_hostname` and every
    /// mail domain, and whether each one exists.
    pub async fn check_required_aliases(
        &self,
        primary_hostname: &str,
    ) -> Result<Vec<ContactAliasCheck>, Error> {
        let hostname = primary_hostname.trim_end_matches('.').to_lowercase();
        if !is_valid_domain(&hostname) {
            return Err(Error::invalid_request(format!(
                "invalid primary hostname '{primary_hostname}'"
            )));
        }
        let domains = self.list_mail_domains().await?;
        let aliases = self.list_aliases().await?;
        let checks = check_contact_aliases(&hostname, &domains, &aliases);
        let missing = checks.iter().filter(|check| !check.is_present()).count();
        if missing > 0 {
            warn!(hostname = %hostname, missing, "required contact aliases missing");
        } else {
            debug!(hostname = %hostname, checked = checks.len(), "required contact aliases present");
        }
        Ok(checks)
    }
}
