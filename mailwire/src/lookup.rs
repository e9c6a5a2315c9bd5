//! Lookup query catalogue.
//!
//! Every query the mail daemons run exists here twice with the same shape:
//! the parameterized statement executed by the SQLite adapter (`?`
//! placeholders, values bound separately) and the map form rendered into
//! Postfix lookup tables, where Postfix substitutes `%s` itself.
//!
//! The destination query is the heart of routing. Postfix consults
//! `virtual_alias_maps` before the mailbox maps and takes the first
//! non-empty answer, so a catch-all alias `@domain` would swallow mail for
//! real users on that domain. Every user is therefore also offered as an
//! alias of itself (priority 1), and a genuine alias row for the same
//! address (priority 0) still wins the `ORDER BY priority LIMIT 1`.

/// A lookup in both executable and Postfix map form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LookupQuery {
    /// Statement with `?` placeholders for the embedded store.
    pub sql: &'static str,
    /// Statement with `%s` placeholders for a Postfix `sqlite:` table.
    pub postfix: &'static str,
}

/// Domain ownership: any user address or alias source ending in `@domain`.
///
/// Both placeholders take `%@` followed by the LIKE-escaped domain.
pub const DOMAIN_HAS_ANY_RECIPIENT: LookupQuery = LookupQuery {
    sql: "SELECT 1 AS found FROM users WHERE email LIKE ? ESCAPE '\\' \
          UNION SELECT 1 AS found FROM aliases WHERE source LIKE ? ESCAPE '\\' \
          LIMIT 1",
    postfix: "SELECT 1 FROM users WHERE email LIKE '%%@%s' \
              UNION SELECT 1 FROM aliases WHERE source LIKE '%%@%s'",
};

/// Mailbox existence: exact user row only.
pub const USER_EXISTS: LookupQuery = LookupQuery {
    sql: "SELECT 1 AS found FROM users WHERE email = ?",
    postfix: "SELECT 1 FROM users WHERE email = '%s'",
};

/// Destination with alias-over-user precedence. Both placeholders take the
/// looked-up address.
pub const RESOLVE_DESTINATION: LookupQuery = LookupQuery {
    sql: "SELECT destination FROM (\
          SELECT destination, 0 AS priority FROM aliases WHERE source = ? \
          UNION \
          SELECT email AS destination, 1 AS priority FROM users WHERE email = ?\
          ) ORDER BY priority LIMIT 1",
    postfix: "SELECT destination FROM (\
              SELECT destination, 0 AS priority FROM aliases WHERE source = '%s' \
              UNION \
              SELECT email AS destination, 1 AS priority FROM users WHERE email = '%s'\
              ) ORDER BY priority LIMIT 1",
};

/// Sender login map: an address may be used by whoever it resolves to, so
/// this is the destination query unchanged.
pub const SENDER_LOGIN: LookupQuery = RESOLVE_DESTINATION;

/// Mail domains: the domain part of every user address and alias source.
/// A catch-all source `@domain` contributes `domain`.
pub const MAIL_DOMAINS: &str =
    "SELECT lower(substr(email, instr(email, '@') + 1)) AS domain FROM users \
     UNION \
     SELECT lower(substr(source, instr(source, '@') + 1)) AS domain FROM aliases \
     ORDER BY domain";

/// Dovecot passdb query; `%u` is the full login address.
pub const DOVECOT_PASSWORD_QUERY: &str =
    "SELECT email AS user, password FROM users WHERE email = '%u'";

/// Dovecot userdb iteration over every mailbox.
pub const DOVECOT_ITERATE_QUERY: &str = "SELECT email AS user FROM users";

/// Dovecot userdb query. Mailboxes live under
/// `<storage_root>/mail/mailboxes/<domain>/<local part>` owned by `mail`.
pub fn dovecot_user_query(storage_root: &str) -> String {
    format!(
        "SELECT email AS user, 'mail' AS uid, 'mail' AS gid, \
         '{}/mail/mailboxes/%d/%n' AS home FROM users WHERE email = '%u'",
        storage_root.trim_end_matches('/').replace('\'', "''")
    )
}

/// Build the bound LIKE pattern matching addresses in `domain`.
///
/// `%`, `_` and `\` inside the domain are escaped so they match literally.
pub fn domain_suffix_pattern(domain: &str) -> String {
    let mut pattern = String::with_capacity(domain.len() + 2);
    pattern.push_str("%@");
    for c in domain.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern
}
