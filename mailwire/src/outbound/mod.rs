//! Outbound adapters implementing domain ports for external infrastructure.
//!
//! - **persistence**: the SQLite mail directory, via Diesel.
//! - **supervisor**: restarting the mail daemons after provisioning.
//!
//! Adapters translate between domain types and infrastructure
//! representations. They contain no routing logic.

pub mod persistence;
pub mod supervisor;
