//! Runtime settings loaded via OrthoConfig.
//!
//! Every field is optional in the environment (`MAILWIRE_*`) and in config
//! files; accessors supply the defaults of a standard box layout.

use std::path::PathBuf;

use ortho_config::OrthoConfig;
use serde::Deserialize;

const DEFAULT_STORAGE_ROOT: &str = "/home/user-data";
const DEFAULT_POSTFIX_DIR: &str = "/etc/postfix";
const DEFAULT_DOVECOT_DIR: &str = "/etc/dovecot";
const DEFAULT_POOL_MAX_SIZE: u32 = 4;

/// Settings shared by every `mailwire` command.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "MAILWIRE")]
pub struct MailwireSettings {
    /// Root of the persistent data tree; mailboxes and the database live
    /// under `<storage_root>/mail`.
    pub storage_root: Option<PathBuf>,
    /// Override for the SQLite database file.
    pub database_path: Option<PathBuf>,
    /// Postfix configuration directory.
    pub postfix_dir: Option<PathBuf>,
    /// Dovecot configuration directory.
    pub dovecot_dir: Option<PathBuf>,
    /// Command run to restart a daemon, with `{service}` substituted.
    /// Restarts are only logged when unset.
    pub restart_command: Option<String>,
    /// Fully qualified name of this mail host. Required contact aliases
    /// are checked against it.
    pub primary_hostname: Option<String>,
    /// Maximum pooled database connections.
    pub pool_max_size: Option<u32>,
    /// Emit logs as JSON lines.
    #[ortho_config(default = false)]
    pub json_logs: bool,
}

impl MailwireSettings {
    /// Return the storage root, falling back to `/home/user-data`.
    pub fn storage_root(&self) -> PathBuf {
        self.storage_root
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_STORAGE_ROOT))
    }

    /// Return the database path, falling back to
    /// `<storage_root>/mail/users.sqlite`.
    pub fn database_path(&self) -> PathBuf {
        self.database_path
            .clone()
            .unwrap_or_else(|| self.storage_root().join("mail").join("users.sqlite"))
    }

    /// Return the Postfix configuration directory.
    pub fn postfix_dir(&self) -> PathBuf {
        self.postfix_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_POSTFIX_DIR))
    }

    /// Return the Dovecot configuration directory.
    pub fn dovecot_dir(&self) -> PathBuf {
        self.dovecot_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DOVECOT_DIR))
    }

    /// Return the restart command template, if one is configured.
    pub fn restart_command(&self) -> Option<&str> {
        self.restart_command
            .as_deref()
            .map(str::trim)
            .filter(|command| !command.is_empty())
    }

    /// Return the primary hostname, if one is configured.
    pub fn primary_hostname(&self) -> Option<&str> {
        self.primary_hostname
            .as_deref()
            .map(str::trim)
            .filter(|hostname| !hostname.is_empty())
    }

    /// Return the pool size, falling back to 4.
    pub fn pool_max_size(&self) -> u32 {
        self.pool_max_size.unwrap_or(DEFAULT_POOL_MAX_SIZE)
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for settings parsing.

    use super::*;
    use std::ffi::OsString;

    use env_lock::lock_env;
    use rstest::rstest;

    const VARS: [&str; 8] = [
        "MAILWIRE_STORAGE_ROOT",
        "MAILWIRE_DATABASE_PATH",
        "MAILWIRE_POSTFIX_DIR",
        "MAILWIRE_DOVECOT_DIR",
        "MAILWIRE_RESTART_COMMAND",
        "MAILWIRE_PRIMARY_HOSTNAME",
        "MAILWIRE_POOL_MAX_SIZE",
        "MAILWIRE_JSON_LOGS",
    ];

    fn load_from_empty_args() -> MailwireSettings {
        MailwireSettings::load_from_iter([OsString::from("mailwire")]).expect("config should load")
    }

    #[rstest]
    fn default_values_are_used_when_missing() {
        let _guard = lock_env(VARS.map(|name| (name, None::<String>)));

        let settings = load_from_empty_args();
        assert_eq!(settings.storage_root(), PathBuf::from("/home/user-data"));
        assert_eq!(
            settings.database_path(),
            PathBuf::from("/home/user-data/mail/users.sqlite")
        );
        assert_eq!(settings.postfix_dir(), PathBuf::from("/etc/postfix"));
        assert_eq!(settings.dovecot_dir(), PathBuf::from("/etc/dovecot"));
        assert_eq!(settings.restart_command(), None);
        assert_eq!(settings.primary_hostname(), None);
        assert_eq!(settings.pool_max_size(), 4);
        assert!(!settings.json_logs);
    }

    #[rstest]
    fn environment_overrides_are_respected() {
        let _guard = lock_env([
            ("MAILWIRE_STORAGE_ROOT", Some("/srv/mail-data".to_owned())),
            ("MAILWIRE_DATABASE_PATH", None),
            ("MAILWIRE_POSTFIX_DIR", Some("/tmp/postfix".to_owned())),
            ("MAILWIRE_DOVECOT_DIR", None),
            (
                "MAILWIRE_RESTART_COMMAND",
                Some("systemctl restart {service}".to_owned()),
            ),
            ("MAILWIRE_PRIMARY_HOSTNAME", Some("box.example.com".to_owned())),
            ("MAILWIRE_POOL_MAX_SIZE", Some("8".to_owned())),
            ("MAILWIRE_JSON_LOGS", Some("true".to_owned())),
        ]);

        let settings = load_from_empty_args();
        assert_eq!(
            settings.database_path(),
            PathBuf::from("/srv/mail-data/mail/users.sqlite")
        );
        assert_eq!(settings.postfix_dir(), PathBuf::from("/tmp/postfix"));
        assert_eq!(settings.restart_command(), Some("systemctl restart {service}"));
        assert_eq!(settings.primary_hostname(), Some("box.example.com"));
        assert_eq!(settings.pool_max_size(), 8);
        assert!(settings.json_logs);
    }

    #[rstest]
    #[case(Some("   "), None)]
    #[case(Some(" service {service} restart "), Some("service {service} restart"))]
    #[case(None, None)]
    fn blank_restart_command_is_treated_as_unset(
        #[case] raw: Option<&str>,
        #[case] expected: Option<&str>,
    ) {
        let settings = MailwireSettings {
            storage_root: None,
            database_path: None,
            postfix_dir: None,
            dovecot_dir: None,
            restart_command: raw.map(str::to_owned),
            primary_hostname: None,
            pool_max_size: None,
            json_logs: false,
        };
        assert_eq!(settings.restart_command(), expected);
    }
}
