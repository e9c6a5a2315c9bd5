//! Mail routing directory for Postfix and Dovecot.
//!
//! The crate owns a small SQLite database of mail users and aliases and the
//! lookup queries the mail daemons run against it on every message:
//!
//! - whether a domain is handled locally,
//! - whether a mailbox exists,
//! - which destination an address resolves to, with explicit aliases taking
//!   precedence over a user's implicit alias to itself,
//! - whether an authenticated user may send as a given address.
//!
//! It also renders the daemons' lookup configuration and asks a service
//! supervisor to restart them once the directory is ready.

pub mod config;
pub mod domain;
pub mod lookup;
pub mod outbound;
pub mod provision;
