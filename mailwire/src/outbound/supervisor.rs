//! Service supervisor adapters.
//!
//! [`TracingServiceSupervisor`] only records the restart request, for hosts
//! where an external orchestrator watches the log. [`CommandServiceSupervisor`]
//! runs a configured command such as `systemctl restart {service}`.

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{info, warn};

use crate::domain::ports::{ManagedService, ServiceSupervisor, SupervisorError};

/// Placeholder replaced with the service unit name in command templates.
pub const SERVICE_PLACEHOLDER: &str = "{service}";

/// Supervisor that logs restart requests without acting on them.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingServiceSupervisor;

#[async_trait]
impl ServiceSupervisor for TracingServiceSupervisor {
    async fn restart(&self, service: ManagedService) -> Result<(), SupervisorError> {
        info!(%service, "service restart requested");
        Ok(())
    }
}

/// Supervisor that runs a command template per restart.
///
/// The template is split on whitespace; every occurrence of `{service}` in
/// any word is replaced with the unit name. No shell is involved.
///
/// # Examples
///
/// ```
/// use mailwire::outbound::supervisor::CommandServiceSupervisor;
///
/// let supervisor = CommandServiceSupervisor::new("systemctl restart {service}");
/// assert_eq!(supervisor.template(), "systemctl restart {service}");
/// ```
#[derive(Debug, Clone)]
pub struct CommandServiceSupervisor {
    template: String,
}

impl CommandServiceSupervisor {
    /// Build a supervisor from a command template.
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    /// The configured command template.
    pub fn template(&self) -> &str {
        &self.template
    }

    fn command_line(&self, service: ManagedService) -> Vec<String> {
        self.template
            .split_whitespace()
            .map(|word| word.replace(SERVICE_PLACEHOLDER, service.unit_name()))
            .collect()
    }
}

#[async_trait]
impl ServiceSupervisor for CommandServiceSupervisor {
    async fn restart(&self, service: ManagedService) -> Result<(), SupervisorError> {
        let words = self.command_line(service);
        let Some((program, args)) = words.split_first() else {
            return Err(SupervisorError::spawn(
                service.to_string(),
                "restart command is empty",
            ));
        };

        info!(%service, command = %words.join(" "), "restarting service");
        let status = Command::new(program)
            .args(args)
            .status()
            .await
            .map_err(|err| SupervisorError::spawn(service.to_string(), err.to_string()))?;

        if status.success() {
            return Ok(());
        }

        warn!(%service, %status, "service restart failed");
        Err(SupervisorError::failed(service.to_string(), status.to_string()))
    }
}
