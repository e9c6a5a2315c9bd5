//! Postfix `sqlite:` lookup tables and the `main.cf` settings that use them.

use camino::Utf8Path;

use crate::lookup::{DOMAIN_HAS_ANY_RECIPIENT, LookupQuery, RESOLVE_DESTINATION, SENDER_LOGIN, USER_EXISTS};

/// One Postfix lookup table backed by the mail directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PostfixMap {
    /// File name under the Postfix configuration directory.
    pub file_name: &'static str,
    /// `main.cf` parameter pointing at the table.
    pub parameter: &'static str,
    /// Query rendered into the table.
    pub query: LookupQuery,
}

/// Every lookup table, in `main.cf` order.
pub const POSTFIX_MAPS: [PostfixMap; 4] = [
    PostfixMap {
        file_name: "virtual-mailbox-domains.cf",
        parameter: "virtual_mailbox_domains",
        query: DOMAIN_HAS_ANY_RECIPIENT,
    },
    PostfixMap {
        file_name: "virtual-mailbox-maps.cf",
        parameter: "virtual_mailbox_maps",
        query: USER_EXISTS,
    },
    PostfixMap {
        file_name: "virtual-alias-maps.cf",
        parameter: "virtual_alias_maps",
        query: RESOLVE_DESTINATION,
    },
    PostfixMap {
        file_name: "sender-login-maps.cf",
        parameter: "smtpd_sender_login_maps",
        query: SENDER_LOGIN,
    },
];

/// Render a lookup table file for `map` against `database_path`.
pub fn render_map(map: &PostfixMap, database_path: &Utf8Path) -> String {
    format!("dbpath={database_path}\nquery = {}\n", map.query.postfix)
}

/// `main.cf` settings wiring the lookup tables into Postfix.
///
/// `local_recipient_maps` follows the mailbox map so unknown local
/// recipients are rejected at SMTP time.
pub fn main_cf_settings(postfix_dir: &Utf8Path) -> Vec<(&'static str, String)> {
    let mut settings: Vec<(&'static str, String)> = POSTFIX_MAPS
        .iter()
        .map(|map| (map.parameter, format!("sqlite:{}", postfix_dir.join(map.file_name))))
        .collect();
    settings.push(("local_recipient_maps", "$virtual_mailbox_maps".to_owned()));
    settings
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_file_names_the_database_and_query() {
        let rendered = render_map(&POSTFIX_MAPS[1], Utf8Path::new("/data/mail/users.sqlite"));
        assert_eq!(
            rendered,
            "dbpath=/data/mail/users.sqlite\nquery = SELECT 1 FROM users WHERE email = '%s'\n"
        );
    }

    #[test]
    fn alias_and_sender_maps_share_the_priority_query() {
        let db = Utf8Path::new("/db");
        assert_eq!(
            render_map(&POSTFIX_MAPS[2], db),
            render_map(&POSTFIX_MAPS[3], db)
        );
    }

    #[test]
    fn main_cf_points_at_rendered_tables() {
        let settings = main_cf_settings(Utf8Path::new("/etc/postfix"));
        assert!(settings.contains(&(
            "virtual_alias_maps",
            "sqlite:/etc/postfix/virtual-alias-maps.cf".to_owned()
        )));
        assert!(settings.contains(&(
            "smtpd_sender_login_maps",
            "sqlite:/etc/postfix/sender-login-maps.cf".to_owned()
        )));
        assert_eq!(
            settings.last(),
            Some(&("local_recipient_maps", "$virtual_mailbox_maps".to_owned()))
        );
    }
}
