//! Diesel table definitions and DDL for the SQLite mail directory.
//!
//! The `table!` definitions must match [`SCHEMA_DDL`] exactly. The DDL only
//! uses `IF NOT EXISTS`, so running it against an initialized database is a
//! no-op.

/// Idempotent schema creation script.
pub(crate) const SCHEMA_DDL: &str = "\
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    email TEXT NOT NULL UNIQUE,
    password TEXT NOT NULL,
    extra TEXT,
    privileges TEXT NOT NULL DEFAULT ''
);
CREATE TABLE IF NOT EXISTS aliases (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    source TEXT NOT NULL UNIQUE,
    destination TEXT NOT NULL
);
";

diesel::table! {
    /// Mailbox users.
    ///
    /// `email` is unique; `password` holds a `{SHA512-CRYPT}` hash;
    /// `privileges` is a space-delimited tag list, empty by default.
    /// `extra` belongs to other tools sharing the file and is never read.
    users (id) {
        id -> Integer,
        email -> Text,
        password -> Text,
        extra -> Nullable<Text>,
        privileges -> Text,
    }
}

diesel::table! {
    /// Forwarding rules. `source` is unique and may be a catch-all `@domain`.
    aliases (id) {
        id -> Integer,
        source -> Text,
        destination -> Text,
    }
}

diesel::allow_tables_to_appear_in_same_query!(users, aliases);
