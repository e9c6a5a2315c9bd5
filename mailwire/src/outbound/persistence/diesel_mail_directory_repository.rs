//! Diesel-backed `MailDirectoryRepository` over SQLite.
//!
//! Lookups run the statements from [`crate::lookup`] with bound parameters,
//! so the store answers exactly what the rendered Postfix maps answer.
//! Writes are serialized through an in-process gate on top of SQLite's own
//! writer lock.

use std::sync::Arc;

use async_trait::async_trait;
use diesel::prelude::*;
use diesel::sql_types::Text;
use diesel_async::{RunQueryDsl, SimpleAsyncConnection};
use tokio::sync::Mutex;
use tracing::debug;

use super::diesel_error_mapping::{map_diesel_error, map_pool_error};
use super::models::{
    AliasRow, DestinationRow, DomainRow, FoundRow, NewAliasRow, NewUserRow, UserRow,
};
use super::pool::DbPool;
use super::schema::{SCHEMA_DDL, aliases, users};
use crate::domain::ports::{MailDirectoryError, MailDirectoryRepository};
use crate::domain::{Alias, MailUser, NewAlias, NewMailUser, PasswordHash, Privileges};
use crate::lookup::{
    DOMAIN_HAS_ANY_RECIPIENT, MAIL_DOMAINS, RESOLVE_DESTINATION, USER_EXISTS,
    domain_suffix_pattern,
};

/// SQLite implementation of the mail directory store.
#[derive(Clone)]
pub struct DieselMailDirectoryRepository {
    pool: DbPool,
    write_gate: Arc<Mutex<()>>,
}

impl DieselMailDirectoryRepository {
    /// Create a repository over `pool`.
    pub fn new(pool: DbPool) -> Self {
        Self {
            pool,
            write_gate: Arc::new(Mutex::new(())),
        }
    }
}

#[async_trait]
impl MailDirectoryRepository for DieselMailDirectoryRepository {
    async fn initialize(&self) -> Result<(), MailDirectoryError> {
        let _guard = self.write_gate.lock().await;
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        conn.batch_execute(SCHEMA_DDL)
            .await
            .map_err(|err| map_diesel_error(err, "initialize schema"))
    }

    async fn find_user_password(
        &self,
        email: &str,
    ) -> Result<Option<PasswordHash>, MailDirectoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let stored: Option<String> = users::table
            .filter(users::email.eq(email.to_owned()))
            .select(users::password)
            .first(&mut conn)
            .await
            .optional()
            .map_err(|err| map_diesel_error(err, "find user password"))?;
        Ok(stored.map(PasswordHash::from_stored))
    }

    async fn domain_has_any_recipient(&self, domain: &str) -> Result<bool, MailDirectoryError> {
        let pattern = domain_suffix_pattern(domain);
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let found: Option<FoundRow> = diesel::sql_query(DOMAIN_HAS_ANY_RECIPIENT.sql)
            .bind::<Text, _>(pattern.clone())
            .bind::<Text, _>(pattern)
            .get_result(&mut conn)
            .await
            .optional()
            .map_err(|err| map_diesel_error(err, "domain lookup"))?;
        Ok(found.is_some())
    }

    async fn user_exists(&self, email: &str) -> Result<bool, MailDirectoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let found: Option<FoundRow> = diesel::sql_query(USER_EXISTS.sql)
            .bind::<Text, _>(email.to_owned())
            .get_result(&mut conn)
            .await
            .optional()
            .map_err(|err| map_diesel_error(err, "mailbox lookup"))?;
        Ok(found.is_some())
    }

    async fn resolve_destination(
        &self,
        address: &str,
    ) -> Result<Option<String>, MailDirectoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row: Option<DestinationRow> = diesel::sql_query(RESOLVE_DESTINATION.sql)
            .bind::<Text, _>(address.to_owned())
            .bind::<Text, _>(address.to_owned())
            .get_result(&mut conn)
            .await
            .optional()
            .map_err(|err| map_diesel_error(err, "destination lookup"))?;
        Ok(row.map(|row| row.destination))
    }

    async fn insert_user(&self, user: &NewMailUser) -> Result<(), MailDirectoryError> {
        let row = NewUserRow {
            email: user.email.as_str(),
            password: user.password.as_ref(),
            privileges: user.privileges.to_string(),
        };
        let _guard = self.write_gate.lock().await;
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        diesel::insert_into(users::table)
            .values(&row)
            .execute(&mut conn)
            .await
            .map_err(|err| map_diesel_error(err, "insert user"))?;
        debug!(email = row.email, "user row inserted");
        Ok(())
    }

    async fn delete_user(&self, email: &str) -> Result<bool, MailDirectoryError> {
        let _guard = self.write_gate.lock().await;
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let deleted = diesel::delete(users::table.filter(users::email.eq(email.to_owned())))
            .execute(&mut conn)
            .await
            .map_err(|err| map_diesel_error(err, "delete user"))?;
        Ok(deleted > 0)
    }

    async fn update_password(
        &self,
        email: &str,
        password: &PasswordHash,
    ) -> Result<bool, MailDirectoryError> {
        let _guard = self.write_gate.lock().await;
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let updated = diesel::update(users::table.filter(users::email.eq(email.to_owned())))
            .set(users::password.eq(password.as_ref().to_owned()))
            .execute(&mut conn)
            .await
            .map_err(|err| map_diesel_error(err, "update password"))?;
        Ok(updated > 0)
    }

    async fn update_privileges(
        &self,
        email: &str,
        privileges: &Privileges,
    ) -> Result<bool, MailDirectoryError> {
        let _guard = self.write_gate.lock().await;
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let updated = diesel::update(users::table.filter(users::email.eq(email.to_owned())))
            .set(users::privileges.eq(privileges.to_string()))
            .execute(&mut conn)
            .await
            .map_err(|err| map_diesel_error(err, "update privileges"))?;
        Ok(updated > 0)
    }

    async fn find_user(&self, email: &str) -> Result<Option<MailUser>, MailDirectoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row: Option<UserRow> = users::table
            .filter(users::email.eq(email.to_owned()))
            .select(UserRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(|err| map_diesel_error(err, "find user"))?;
        Ok(row.map(MailUser::from))
    }

    async fn list_users(&self) -> Result<Vec<MailUser>, MailDirectoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows: Vec<UserRow> = users::table
            .select(UserRow::as_select())
            .order_by(users::email.asc())
            .load(&mut conn)
            .await
            .map_err(|err| map_diesel_error(err, "list users"))?;
        Ok(rows.into_iter().map(MailUser::from).collect())
    }

    async fn insert_alias(&self, alias: &NewAlias) -> Result<(), MailDirectoryError> {
        let row = NewAliasRow {
            source: alias.source.as_str(),
            destination: alias.destination.as_str(),
        };
        let _guard = self.write_gate.lock().await;
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        diesel::insert_into(aliases::table)
            .values(&row)
            .execute(&mut conn)
            .await
            .map_err(|err| map_diesel_error(err, "insert alias"))?;
        debug!(source = row.source, "alias row inserted");
        Ok(())
    }

    async fn delete_alias(&self, source: &str) -> Result<bool, MailDirectoryError> {
        let _guard = self.write_gate.lock().await;
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let deleted = diesel::delete(aliases::table.filter(aliases::source.eq(source.to_owned())))
            .execute(&mut conn)
            .await
            .map_err(|err| map_diesel_error(err, "delete alias"))?;
        Ok(deleted > 0)
    }

    async fn list_aliases(&self) -> Result<Vec<Alias>, MailDirectoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows: Vec<AliasRow> = aliases::table
            .select(AliasRow::as_select())
            .order_by(aliases::source.asc())
            .load(&mut conn)
            .await
            .map_err(|err| map_diesel_error(err, "list aliases"))?;
        Ok(rows.into_iter().map(Alias::from).collect())
    }

    async fn list_mail_domains(&self) -> Result<Vec<String>, MailDirectoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows: Vec<DomainRow> = diesel::sql_query(MAIL_DOMAINS)
            .load(&mut conn)
            .await
            .map_err(|err| map_diesel_error(err, "list mail domains"))?;
        Ok(rows.into_iter().map(|row| row.domain).collect())
    }
}
