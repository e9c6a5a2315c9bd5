//! Internal Diesel row structs for database operations.
//!
//! These types are implementation details of the persistence layer and are
//! never exposed to the domain.

use diesel::prelude::*;
use diesel::sql_types::{Integer, Text};

use super::schema::{aliases, users};
use crate::domain::{Alias, MailUser, Privileges};

/// Row struct for reading from the users table, minus the credential.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub(crate) struct UserRow {
    pub email: String,
    pub privileges: String,
}

impl From<UserRow> for MailUser {
    fn from(row: UserRow) -> Self {
        Self::new(row.email, Privileges::parse(&row.privileges))
    }
}

/// Insertable struct for creating new user records.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = users)]
pub(crate) struct NewUserRow<'a> {
    pub email: &'a str,
    pub password: &'a str,
    pub privileges: String,
}

/// Row struct for reading from the aliases table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = aliases)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub(crate) struct AliasRow {
    pub source: String,
    pub destination: String,
}

impl From<AliasRow> for Alias {
    fn from(row: AliasRow) -> Self {
        Self::new(row.source, row.destination)
    }
}

/// Insertable struct for creating new alias records.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = aliases)]
pub(crate) struct NewAliasRow<'a> {
    pub source: &'a str,
    pub destination: &'a str,
}

/// Single-column result of the destination lookup.
#[derive(Debug, Clone, QueryableByName)]
pub(crate) struct DestinationRow {
    #[diesel(sql_type = Text)]
    pub destination: String,
}

/// Single-column result of the mail domain listing.
#[derive(Debug, Clone, QueryableByName)]
pub(crate) struct DomainRow {
    #[diesel(sql_type = Text)]
    pub domain: String,
}

/// Marker row returned by existence lookups.
#[derive(Debug, Clone, QueryableByName)]
pub(crate) struct FoundRow {
    #[diesel(sql_type = Integer)]
    #[expect(dead_code, reason = "only the presence of the row is used")]
    pub found: i32,
}
