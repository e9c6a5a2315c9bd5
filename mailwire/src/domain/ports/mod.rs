//! Domain ports and supporting types for the hexagonal boundary.

mod macros;
pub(crate) use macros::define_port_error;

mod mail_directory_repository;
mod mail_routing;
mod service_supervisor;

#[cfg(test)]
pub use mail_directory_repository::MockMailDirectoryRepository;
pub use mail_directory_repository::{MailDirectoryError, MailDirectoryRepository};
#[cfg(test)]
pub use mail_routing::MockMailRouting;
pub use mail_routing::{MailRouting, SenderPolicy};
#[cfg(test)]
pub use service_supervisor::MockServiceSupervisor;
pub use service_supervisor::{ManagedService, ServiceSupervisor, SupervisorError};
