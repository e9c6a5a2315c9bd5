//! SQLite persistence adapter for the mail directory.
//!
//! The Postfix and Dovecot lookup maps read the same database file this
//! adapter writes, so the schema in `schema.rs` is a compatibility surface:
//! table and column names must stay as they are.
//!
//! Diesel row structs (`models.rs`) and table definitions stay private to
//! this module. Every database failure is mapped to a
//! [`crate::domain::ports::MailDirectoryError`] before it leaves the adapter.
//!
//! # Example
//!
//! ```ignore
//! use mailwire::outbound::persistence::{DbPool, DieselMailDirectoryRepository, PoolConfig};
//!
//! let pool = DbPool::new(PoolConfig::new("/home/user-data/mail/users.sqlite")).await?;
//! let repo = DieselMailDirectoryRepository::new(pool);
//! repo.initialize().await?;
//! ```

mod diesel_error_mapping;
mod diesel_mail_directory_repository;
mod models;
mod pool;
mod schema;

pub use diesel_mail_directory_repository::DieselMailDirectoryRepository;
pub use pool::{DbPool, PoolConfig, PoolError, SqliteConn};
