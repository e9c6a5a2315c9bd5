//! Mail user data model.

use std::fmt;

use super::address::EmailAddress;

/// Validation errors for privilege tags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrivilegeValidationError {
    /// The tag was empty.
    Empty,
    /// The tag contained a separator or control character.
    InvalidCharacters {
        /// Tag as supplied.
        tag: String,
    },
}

impl fmt::Display for PrivilegeValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "privilege must not be empty"),
            Self::InvalidCharacters { tag } => write!(
                f,
                "privilege '{tag}' may not contain whitespace, commas or control characters",
            ),
        }
    }
}

impl std::error::Error for PrivilegeValidationError {}

/// Single capability tag such as `admin`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Privilege(String);

impl Privilege {
    /// Validate and construct a [`Privilege`].
    pub fn new(tag: impl Into<String>) -> Result<Self, PrivilegeValidationError> {
        let tag = tag.into();
        if tag.is_empty() {
            return Err(PrivilegeValidationError::Empty);
        }
        if tag
            .chars()
            .any(|c| c.is_whitespace() || c.is_control() || c == ',')
        {
            return Err(PrivilegeValidationError::InvalidCharacters { tag });
        }
        Ok(Self(tag))
    }
}

impl AsRef<str> for Privilege {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for Privilege {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Ordered, de-duplicated set of privilege tags.
///
/// Stored space-delimited; parsing accepts spaces or commas so rows written
/// by other tools stay readable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Privileges(Vec<Privilege>);

impl Privileges {
    /// Parse a stored privileges column. Empty segments are ignored.
    pub fn parse(raw: &str) -> Self {
        let mut privileges = Self::default();
        raw.split(|c: char| c == ',' || c.is_whitespace())
            .filter_map(|segment| Privilege::new(segment).ok())
            .for_each(|privilege| {
                privileges.insert(privilege);
            });
        privileges
    }

    /// Add a tag; returns `false` when it was already present.
    pub fn insert(&mut self, privilege: Privilege) -> bool {
        if self.0.contains(&privilege) {
            return false;
        }
        self.0.push(privilege);
        true
    }

    /// Remove a tag; returns `false` when it was not present.
    pub fn remove(&mut self, privilege: &Privilege) -> bool {
        let before = self.0.len();
        self.0.retain(|existing| existing != privilege);
        before != self.0.len()
    }

    /// Whether `tag` is granted.
    pub fn contains(&self, tag: &str) -> bool {
        self.0.iter().any(|privilege| privilege.as_ref() == tag)
    }

    /// Whether no tag is granted.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Privileges {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for privilege in &self.0 {
            if !first {
                f.write_str(" ")?;
            }
            f.write_str(privilege.as_ref())?;
            first = false;
        }
        Ok(())
    }
}

/// Hashed credential in Dovecot's `{SCHEME}hash` notation.
#[derive(Clone, PartialEq, Eq)]
pub struct PasswordHash(String);

impl PasswordHash {
    /// Wrap a stored credential without inspecting it.
    pub fn from_stored(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Scheme prefix such as `SHA512-CRYPT`, when present.
    pub fn scheme(&self) -> Option<&str> {
        let rest = self.0.strip_prefix('{')?;
        let end = rest.find('}')?;
        rest.get(..end)
    }

    /// Hash body after the scheme prefix.
    pub fn body(&self) -> &str {
        match self.scheme() {
            Some(scheme) => self.0.get(scheme.len() + 2..).unwrap_or_default(),
            None => self.0.as_str(),
        }
    }
}

impl AsRef<str> for PasswordHash {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Debug for PasswordHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PasswordHash")
            .field(&self.scheme().unwrap_or("unknown"))
            .finish()
    }
}

/// Mail user as visible to administrative listings.
///
/// The credential is deliberately not part of this type; it is only read
/// through the password lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailUser {
    email: String,
    privileges: Privileges,
}

impl MailUser {
    /// Build a user from stored parts.
    pub fn new(email: impl Into<String>, privileges: Privileges) -> Self {
        Self {
            email: email.into(),
            privileges,
        }
    }

    /// Mailbox address.
    pub fn email(&self) -> &str {
        self.email.as_str()
    }

    /// Granted privileges.
    pub fn privileges(&self) -> &Privileges {
        &self.privileges
    }
}

/// Validated user record ready for insertion.
#[derive(Debug, Clone)]
pub struct NewMailUser {
    /// Mailbox address; the unique key.
    pub email: EmailAddress,
    /// Hashed credential.
    pub password: PasswordHash,
    /// Initial privileges.
    pub privileges: Privileges,
}
