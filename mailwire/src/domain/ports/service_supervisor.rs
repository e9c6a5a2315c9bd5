//! Port for asking a service supervisor to restart a mail daemon.

use std::fmt;

use async_trait::async_trait;

use super::define_port_error;

define_port_error! {
    /// Errors surfaced by supervisor adapters.
    pub enum SupervisorError {
        /// The restart request could not be issued.
        Spawn { service: String, message: String } =>
            "failed to request restart of {service}: {message}",
        /// The supervisor reported that the restart failed.
        Failed { service: String, status: String } =>
            "restart of {service} failed: {status}",
    }
}

/// Daemons whose configuration this crate manages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ManagedService {
    /// SMTP relay.
    Postfix,
    /// IMAP/POP server.
    Dovecot,
}

impl ManagedService {
    /// Restart order after the directory is provisioned.
    pub const ALL: [Self; 2] = [Self::Postfix, Self::Dovecot];

    /// Service unit name as known to the init system.
    pub fn unit_name(self) -> &'static str {
        match self {
            Self::Postfix => "postfix",
            Self::Dovecot => "dovecot",
        }
    }
}

impl fmt::Display for ManagedService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.unit_name())
    }
}

/// Receives "configuration ready, restart now" notifications.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ServiceSupervisor: Send + Sync {
    /// Restart `service` so it picks up regenerated configuration.
    async fn restart(&self, service: ManagedService) -> Result<(), SupervisorError>;
}
