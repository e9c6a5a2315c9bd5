//! Dovecot SQL authentication configuration.

use camino::Utf8Path;

use super::editconf::{Dialect, apply_settings, set_line_enabled};
use crate::domain::credentials::PASSWORD_SCHEME;
use crate::lookup::{DOVECOT_ITERATE_QUERY, DOVECOT_PASSWORD_QUERY, dovecot_user_query};

/// SQL driver settings, relative to the Dovecot directory.
pub const SQL_CONF: &str = "dovecot-sql.conf.ext";
/// passdb/userdb blocks, relative to `conf.d`.
pub const AUTH_SQL_CONF: &str = "auth-sql.conf.ext";
/// Stock authentication settings, relative to `conf.d`.
pub const AUTH_CONF: &str = "10-auth.conf";
/// Holds the database path; readable by root only.
pub const SQL_CONF_MODE: u32 = 0o600;

const SYSTEM_AUTH_INCLUDE: &str = "!include auth-system.conf.ext";
const SQL_AUTH_INCLUDE: &str = "!include auth-sql.conf.ext";

/// Render `dovecot-sql.conf.ext`.
pub fn render_sql_conf(database_path: &Utf8Path, storage_root: &Utf8Path) -> String {
    format!(
        "driver = sqlite\n\
         connect = {database_path}\n\
         default_pass_scheme = {PASSWORD_SCHEME}\n\
         password_query = {DOVECOT_PASSWORD_QUERY}\n\
         user_query = {}\n\
         iterate_query = {DOVECOT_ITERATE_QUERY}\n",
        dovecot_user_query(storage_root.as_str())
    )
}

/// Render `conf.d/auth-sql.conf.ext` pointing both databases at the SQL
/// settings file.
pub fn render_auth_sql_conf(dovecot_dir: &Utf8Path) -> String {
    let args = dovecot_dir.join(SQL_CONF);
    format!(
        "passdb {{\n  driver = sql\n  args = {args}\n}}\n\
         userdb {{\n  driver = sql\n  args = {args}\n}}\n"
    )
}

/// Edit `conf.d/10-auth.conf`: plaintext auth only over TLS, PLAIN and
/// LOGIN mechanisms, SQL instead of system users.
pub fn edit_auth_conf(original: &str) -> String {
    let edited = apply_settings(
        original,
        &[
            ("disable_plaintext_auth", "yes"),
            ("auth_mechanisms", "plain login"),
        ],
        Dialect::Dovecot,
    );
    let edited = set_line_enabled(&edited, SYSTEM_AUTH_INCLUDE, false);
    set_line_enabled(&edited, SQL_AUTH_INCLUDE, true)
}
