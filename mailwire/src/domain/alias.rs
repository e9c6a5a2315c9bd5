//! Mail alias data model.

use super::address::EmailAddress;

/// Forwarding rule from `source` to `destination`.
///
/// The destination may be a local user, another alias source or an external
/// address. Resolution follows a single hop, so a destination that is itself
/// an alias source is returned as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alias {
    source: String,
    destination: String,
}

impl Alias {
    /// Build an alias from stored parts.
    pub fn new(source: impl Into<String>, destination: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
        }
    }

    /// Address the rule matches; the unique key.
    pub fn source(&self) -> &str {
        self.source.as_str()
    }

    /// Address mail is forwarded to.
    pub fn destination(&self) -> &str {
        self.destination.as_str()
    }
}

/// Validated alias ready for insertion.
#[derive(Debug, Clone)]
pub struct NewAlias {
    /// Matched address, possibly a catch-all `@domain`.
    pub source: EmailAddress,
    /// Forwarding target.
    pub destination: EmailAddress,
}

impl From<&NewAlias> for Alias {
    fn from(value: &NewAlias) -> Self {
        Self::new(value.source.as_str(), value.destination.as_str())
    }
}
