//! Wiring the mail daemons to the directory.
//!
//! Provisioning creates the schema, renders the Postfix lookup tables and
//! Dovecot SQL authentication settings, edits the stock daemon
//! configuration to use them, and finally asks the service supervisor to
//! restart Postfix and then Dovecot. Every step is idempotent, so running it
//! again converges on the same files.

mod atomic_io;
pub mod dovecot;
pub mod editconf;
pub mod postfix;

use std::path::PathBuf;
use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use thiserror::Error;
use tracing::{info, warn};

use crate::config::MailwireSettings;
use crate::domain::ports::{MailDirectoryRepository, ManagedService, ServiceSupervisor, SupervisorError};
use crate::domain::{DirectoryService, Error};
use atomic_io::{open_dir, read_or_empty, write_atomic};
use editconf::{Dialect, apply_settings};

/// Errors raised while provisioning.
#[derive(Debug, Error)]
pub enum ProvisionError {
    /// A configured path cannot be rendered into daemon configuration.
    #[error("path is not valid UTF-8: {}", path.display())]
    NonUtf8Path {
        /// Offending path.
        path: PathBuf,
    },
    /// The directory schema could not be created.
    #[error("failed to initialize the mail directory: {0}")]
    Store(#[source] Error),
    /// An existing configuration file could not be read.
    #[error("failed to read {path}: {message}")]
    Read {
        /// File being read.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        message: String,
    },
    /// A configuration file could not be written.
    #[error("failed to write {path}: {message}")]
    Write {
        /// File being written.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        message: String,
    },
    /// The supervisor did not restart a daemon.
    #[error(transparent)]
    Supervisor(#[from] SupervisorError),
}

impl ProvisionError {
    pub(crate) fn read(path: impl Into<Utf8PathBuf>, message: impl Into<String>) -> Self {
        Self::Read {
            path: path.into(),
            message: message.into(),
        }
    }

    pub(crate) fn write(path: impl Into<Utf8PathBuf>, message: impl Into<String>) -> Self {
        Self::Write {
            path: path.into(),
            message: message.into(),
        }
    }
}

fn utf8(path: PathBuf) -> Result<Utf8PathBuf, ProvisionError> {
    Utf8PathBuf::from_path_buf(path).map_err(|path| ProvisionError::NonUtf8Path { path })
}

/// Filesystem locations touched by provisioning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionLayout {
    /// Root of the data tree; mailboxes live under `<root>/mail/mailboxes`.
    pub storage_root: Utf8PathBuf,
    /// SQLite database shared with the daemons.
    pub database_path: Utf8PathBuf,
    /// Postfix configuration directory.
    pub postfix_dir: Utf8PathBuf,
    /// Dovecot configuration directory.
    pub dovecot_dir: Utf8PathBuf,
}

impl ProvisionLayout {
    /// Resolve the layout from settings.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError::NonUtf8Path`] for paths that cannot be
    /// written into configuration text.
    pub fn from_settings(settings: &MailwireSettings) -> Result<Self, ProvisionError> {
        Ok(Self {
            storage_root: utf8(settings.storage_root())?,
            database_path: utf8(settings.database_path())?,
            postfix_dir: utf8(settings.postfix_dir())?,
            dovecot_dir: utf8(settings.dovecot_dir())?,
        })
    }

    fn dovecot_conf_d(&self) -> Utf8PathBuf {
        self.dovecot_dir.join("conf.d")
    }
}

/// Outcome of a provisioning run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionReport {
    /// Files written or rewritten, in order.
    pub files: Vec<Utf8PathBuf>,
    /// Services restarted, in order.
    pub restarted: Vec<ManagedService>,
}

/// Runs the provisioning sequence.
pub struct Provisioner<R> {
    directory: DirectoryService<R>,
    supervisor: Arc<dyn ServiceSupervisor>,
    layout: ProvisionLayout,
}

impl<R> Provisioner<R>
where
    R: MailDirectoryRepository,
{
    /// Create a provisioner.
    pub fn new(
        directory: DirectoryService<R>,
        supervisor: Arc<dyn ServiceSupervisor>,
        layout: ProvisionLayout,
    ) -> Self {
        Self {
            directory,
            supervisor,
            layout,
        }
    }

    /// Initialize the store, write configuration, then restart the daemons.
    ///
    /// Nothing is restarted unless the store and every file are ready.
    ///
    /// # Errors
    ///
    /// Returns the first failing step; a restart failure stops the sequence.
    pub async fn run(&self) -> Result<ProvisionReport, ProvisionError> {
        self.directory
            .initialize()
            .await
            .map_err(ProvisionError::Store)?;

        let files = self.write_configuration()?;
        info!(count = files.len(), "daemon configuration written");

        let mut restarted = Vec::with_capacity(ManagedService::ALL.len());
        for service in ManagedService::ALL {
            if let Err(err) = self.supervisor.restart(service).await {
                warn!(%service, kind = err.kind(), error = %err, "service restart failed");
                return Err(err.into());
            }
            restarted.push(service);
        }

        Ok(ProvisionReport { files, restarted })
    }

    /// Render and write every configuration file without touching the store
    /// or the daemons.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError::Read`] or [`ProvisionError::Write`] on
    /// filesystem failure.
    pub fn write_configuration(&self) -> Result<Vec<Utf8PathBuf>, ProvisionError> {
        let mut files = self.write_postfix()?;
        files.extend(self.write_dovecot()?);
        Ok(files)
    }

    fn write_postfix(&self) -> Result<Vec<Utf8PathBuf>, ProvisionError> {
        let layout = &self.layout;
        let dir = open_dir(&layout.postfix_dir)?;
        let mut files = Vec::new();

        for map in &postfix::POSTFIX_MAPS {
            let contents = postfix::render_map(map, &layout.database_path);
            write_atomic(&dir, &layout.postfix_dir, map.file_name, &contents, None)?;
            files.push(layout.postfix_dir.join(map.file_name));
        }

        let settings = postfix::main_cf_settings(&layout.postfix_dir);
        let pairs: Vec<(&str, &str)> = settings
            .iter()
            .map(|(key, value)| (*key, value.as_str()))
            .collect();
        edit_file(&dir, &layout.postfix_dir, "main.cf", |original| {
            apply_settings(original, &pairs, Dialect::Postfix)
        })?;
        files.push(layout.postfix_dir.join("main.cf"));

        Ok(files)
    }

    fn write_dovecot(&self) -> Result<Vec<Utf8PathBuf>, ProvisionError> {
        let layout = &self.layout;
        let dir = open_dir(&layout.dovecot_dir)?;
        let conf_d_path = layout.dovecot_conf_d();
        let conf_d = open_dir(&conf_d_path)?;

        let sql = dovecot::render_sql_conf(&layout.database_path, &layout.storage_root);
        write_atomic(
            &dir,
            &layout.dovecot_dir,
            dovecot::SQL_CONF,
            &sql,
            Some(dovecot::SQL_CONF_MODE),
        )?;

        let auth_sql = dovecot::render_auth_sql_conf(&layout.dovecot_dir);
        write_atomic(&conf_d, &conf_d_path, dovecot::AUTH_SQL_CONF, &auth_sql, None)?;

        edit_file(&conf_d, &conf_d_path, dovecot::AUTH_CONF, dovecot::edit_auth_conf)?;

        Ok(vec![
            layout.dovecot_dir.join(dovecot::SQL_CONF),
            conf_d_path.join(dovecot::AUTH_SQL_CONF),
            conf_d_path.join(dovecot::AUTH_CONF),
        ])
    }
}

fn edit_file(
    dir: &cap_std::fs::Dir,
    dir_path: &Utf8Path,
    name: &str,
    edit: impl FnOnce(&str) -> String,
) -> Result<(), ProvisionError> {
    let original = read_or_empty(dir, dir_path, name)?;
    let edited = edit(&original);
    if edited == original {
        return Ok(());
    }
    write_atomic(dir, dir_path, name, &edited, None)
}
