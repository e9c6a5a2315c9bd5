//! Domain primitives, services and ports.
//!
//! Public surface:
//! - `Error` / `ErrorCode`: failure taxonomy; negative lookups are not errors.
//! - `EmailAddress`, `MailUser`, `Alias`, `Privileges`, `PasswordHash`.
//! - `MailRoutingService`: domain, mailbox and destination lookups.
//! - `SenderPolicyService`: sender-address authorization built on routing.
//! - `DirectoryService`: administrative writes, credential checks and the
//!   required contact alias report.

pub mod address;
pub mod alias;
pub mod contact_aliases;
pub mod credentials;
pub mod directory;
pub mod error;
pub mod ports;
pub mod routing;
pub mod sender_policy;
pub mod user;

pub use self::address::{AddressValidationError, EmailAddress};
pub use self::alias::{Alias, NewAlias};
pub use self::contact_aliases::{ContactAliasCheck, ContactRole, check_contact_aliases};
pub use self::directory::DirectoryService;
pub use self::error::{Error, ErrorCode, ErrorValidationError};
pub use self::routing::MailRoutingService;
pub use self::sender_policy::SenderPolicyService;
pub use self::user::{
    MailUser, NewMailUser, PasswordHash, Privilege, PrivilegeValidationError, Privileges,
};
