//! Mail address value type used by administrative writes.
//!
//! Lookups deliberately take plain strings: an address that would fail
//! validation here simply never matches a stored row.

use std::fmt;

use thiserror::Error;

/// Validation errors returned when parsing an [`EmailAddress`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressValidationError {
    /// The input was empty.
    #[error("email address must not be empty")]
    Empty,
    /// The input had leading or trailing whitespace, or embedded whitespace.
    #[error("email address must not contain whitespace")]
    Whitespace,
    /// The input contained control characters.
    #[error("email address must not contain control characters")]
    ControlCharacter,
    /// The input did not contain exactly one `@`.
    #[error("email address must contain exactly one '@'")]
    AtSign,
    /// The part before `@` was empty.
    #[error("email address must have a local part")]
    EmptyLocalPart,
    /// The part after `@` is not a usable domain name.
    #[error("invalid domain name '{domain}'")]
    InvalidDomain {
        /// Domain as supplied.
        domain: String,
    },
}

/// Mail address stored in the directory.
///
/// ## Invariants
/// - Exactly one `@` with a non-empty domain of at least two labels.
/// - No whitespace or control characters.
/// - Stored lowercased; lookups compare stored values exactly.
/// - The local part may only be empty for catch-all alias sources
///   (`@example.com`), built with [`EmailAddress::parse_alias_source`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EmailAddress {
    raw: String,
    at: usize,
}

impl EmailAddress {
    /// Parse a mailbox address such as `alice@example.com`.
    pub fn parse(input: &str) -> Result<Self, AddressValidationError> {
        Self::parse_inner(input, false)
    }

    /// Parse an alias source, which may also be a catch-all `@example.com`.
    pub fn parse_alias_source(input: &str) -> Result<Self, AddressValidationError> {
        Self::parse_inner(input, true)
    }

    fn parse_inner(input: &str, allow_catch_all: bool) -> Result<Self, AddressValidationError> {
        if input.is_empty() {
            return Err(AddressValidationError::Empty);
        }
        if input.chars().any(char::is_whitespace) {
            return Err(AddressValidationError::Whitespace);
        }
        if input.chars().any(char::is_control) {
            return Err(AddressValidationError::ControlCharacter);
        }
        let mut parts = input.split('@');
        let (Some(local), Some(domain), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(AddressValidationError::AtSign);
        };
        if local.is_empty() && !allow_catch_all {
            return Err(AddressValidationError::EmptyLocalPart);
        }
        if !is_valid_domain(domain) {
            return Err(AddressValidationError::InvalidDomain {
                domain: domain.to_owned(),
            });
        }

        let raw = input.to_lowercase();
        let Some(at) = raw.find('@') else {
            return Err(AddressValidationError::AtSign);
        };
        Ok(Self { raw, at })
    }

    /// Part before the `@`; empty for catch-all sources.
    pub fn local_part(&self) -> &str {
        self.raw.get(..self.at).unwrap_or_default()
    }

    /// Part after the `@`.
    pub fn domain(&self) -> &str {
        self.raw.get(self.at + 1..).unwrap_or_default()
    }

    /// Whether this is a catch-all alias source (`@domain`).
    pub fn is_catch_all(&self) -> bool {
        self.at == 0
    }

    /// Borrow the full lowercased address.
    pub fn as_str(&self) -> &str {
        self.raw.as_str()
    }
}

/// Check that `domain` is a dotted name of LDH labels.
pub fn is_valid_domain(domain: &str) -> bool {
    let mut labels = 0_usize;
    for label in domain.split('.') {
        let valid = !label.is_empty()
            && label.len() <= 63
            && label.chars().all(|c| c.is_alphanumeric() || c == '-')
            && !label.starts_with('-')
            && !label.ends_with('-');
        if !valid {
            return false;
        }
        labels += 1;
    }
    labels >= 2 && domain.len() <= 253
}

impl AsRef<str> for EmailAddress {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<EmailAddress> for String {
    fn from(value: EmailAddress) -> Self {
        value.raw
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn parse_lowercases_and_splits() {
        let address = EmailAddress::parse("Alice@Example.COM").expect("valid address");
        assert_eq!(address.as_str(), "alice@example.com");
        assert_eq!(address.local_part(), "alice");
        assert_eq!(address.domain(), "example.com");
        assert!(!address.is_catch_all());
    }

    #[rstest]
    #[case("", AddressValidationError::Empty)]
    #[case(" alice@example.com", AddressValidationError::Whitespace)]
    #[case("al ice@example.com", AddressValidationError::Whitespace)]
    #[case("alice\u{7}@example.com", AddressValidationError::ControlCharacter)]
    #[case("alice.example.com", AddressValidationError::AtSign)]
    #[case("a@b@example.com", AddressValidationError::AtSign)]
    #[case("@example.com", AddressValidationError::EmptyLocalPart)]
    fn parse_rejects_malformed_input(#[case] input: &str, #[case] expected: AddressValidationError) {
        assert_eq!(EmailAddress::parse(input), Err(expected));
    }

    #[rstest]
    #[case("alice@localhost")]
    #[case("alice@example..com")]
    #[case("alice@-example.com")]
    #[case("alice@exa_mple.com")]
    #[case("alice@")]
    fn parse_rejects_bad_domains(#[case] input: &str) {
        assert!(matches!(
            EmailAddress::parse(input),
            Err(AddressValidationError::InvalidDomain { .. })
        ));
    }

    #[test]
    fn alias_sources_accept_catch_all() {
        let source = EmailAddress::parse_alias_source("@Example.com").expect("catch-all source");
        assert!(source.is_catch_all());
        assert_eq!(source.as_str(), "@example.com");
        assert_eq!(source.domain(), "example.com");
        assert_eq!(source.local_part(), "");
    }
}
