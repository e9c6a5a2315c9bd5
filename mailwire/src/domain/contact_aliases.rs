//! Contact addresses a mail host is expected to route.
//!
//! Notices about the host go to `administrator@<primary hostname>`, DNS
//! contacts to `hostmaster@<primary hostname>`, and every mail domain needs
//! `postmaster@<domain>` unless a catch-all `@<domain>` alias covers it.
//! Only alias rows satisfy a requirement; a mailbox user with the same
//! address does not.

use std::collections::HashMap;
use std::fmt;

use super::alias::Alias;

/// Role a required contact address plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContactRole {
    /// Destination for system notices about the host.
    Administrator,
    /// DNS contact for the primary hostname.
    Hostmaster,
    /// Contact for a mail domain.
    Postmaster,
}

impl ContactRole {
    /// Local part of the required address.
    pub fn local_part(self) -> &'static str {
        match self {
            Self::Administrator => "administrator",
            Self::Hostmaster => "hostmaster",
            Self::Postmaster => "postmaster",
        }
    }
}

impl fmt::Display for ContactRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Administrator => "system administrator address",
            Self::Hostmaster => "hostmaster contact address",
            Self::Postmaster => "postmaster contact address",
        })
    }
}

/// One required contact address and the alias routing it, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactAliasCheck {
    role: ContactRole,
    address: String,
    destination: Option<String>,
}

impl ContactAliasCheck {
    /// Role of the address.
    pub fn role(&self) -> ContactRole {
        self.role
    }

    /// Required address, such as `postmaster@example.com`.
    pub fn address(&self) -> &str {
        self.address.as_str()
    }

    /// Destination of the alias, when it exists.
    pub fn destination(&self) -> Option<&str> {
        self.destination.as_deref()
    }

    /// Whether an alias routes the address.
    pub fn is_present(&self) -> bool {
        self.destination.is_some()
    }
}

/// Check the contact aliases for `primary_hostname` and each of
/// `mail_domains` against the stored `aliases`.
///
/// Host contacts come first, then one postmaster entry per domain in the
/// order given. Domains with a catch-all alias get no postmaster entry.
///
/// # Examples
///
/// ```
/// use mailwire::domain::{Alias, check_contact_aliases};
///
/// let aliases = [Alias::new("administrator@box.example.com", "me@example.com")];
/// let checks = check_contact_aliases("box.example.com", &["example.com".to_owned()], &aliases);
///
/// let missing: Vec<&str> = checks
///     .iter()
///     .filter(|check| !check.is_present())
///     .map(|check| check.address())
///     .collect();
/// assert_eq!(missing, ["hostmaster@box.example.com", "postmaster@example.com"]);
/// ```
pub fn check_contact_aliases(
    primary_hostname: &str,
    mail_domains: &[String],
    aliases: &[Alias],
) -> Vec<ContactAliasCheck> {
    let routes: HashMap<&str, &str> = aliases
        .iter()
        .map(|alias| (alias.source(), alias.destination()))
        .collect();
    let check = |role: ContactRole, domain: &str| {
        let address = format!("{}@{domain}", role.local_part());
        let destination = routes.get(address.as_str()).map(|dest| (*dest).to_owned());
        ContactAliasCheck {
            role,
            address,
            destination,
        }
    };

    let mut checks = vec![
        check(ContactRole::Administrator, primary_hostname),
        check(ContactRole::Hostmaster, primary_hostname),
    ];
    checks.extend(
        mail_domains
            .iter()
            .filter(|domain| !routes.contains_key(format!("@{domain}").as_str()))
            .map(|domain| check(ContactRole::Postmaster, domain.as_str())),
    );
    checks
}
