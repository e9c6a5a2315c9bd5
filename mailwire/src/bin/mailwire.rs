//! `mailwire`: administer the mail directory and answer routing lookups.
#![cfg_attr(not(any(test, doctest)), deny(clippy::unwrap_used))]
#![cfg_attr(not(any(test, doctest)), deny(clippy::expect_used))]

use std::ffi::OsString;
use std::io::{self, BufRead, Write};
use std::process::ExitCode;
use std::sync::Arc;

use cap_std::{ambient_authority, fs::Dir};
use clap::{Parser, Subcommand};
use mailwire::config::MailwireSettings;
use mailwire::domain::ports::{MailRouting, SenderPolicy, ServiceSupervisor};
use mailwire::domain::{
    ContactAliasCheck, DirectoryService, Error, MailRoutingService, Privileges,
    SenderPolicyService,
};
use mailwire::outbound::persistence::{DbPool, DieselMailDirectoryRepository, PoolConfig};
use mailwire::outbound::supervisor::{CommandServiceSupervisor, TracingServiceSupervisor};
use mailwire::provision::{ProvisionError, ProvisionLayout, Provisioner};
use ortho_config::OrthoConfig;
use tokio::runtime::Builder;
use tracing::{error, warn};
use tracing_subscriber::{EnvFilter, fmt};
use zeroize::Zeroizing;

/// Exit status for a negative lookup, failed verification or missing
/// contact alias.
const EXIT_NEGATIVE: u8 = 1;
/// Exit status for invalid input or internal failures.
const EXIT_FAILURE: u8 = 2;
/// Exit status when the store cannot be reached; callers should defer.
const EXIT_TEMPFAIL: u8 = 75;

/// `mailwire` command arguments.
#[derive(Debug, Parser)]
#[command(
    name = "mailwire",
    about = "Mail routing directory for Postfix and Dovecot",
    version
)]
struct CliArgs {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create the directory, write daemon configuration and restart daemons.
    Provision,
    /// Manage mailbox users.
    User {
        #[command(subcommand)]
        action: UserCommand,
    },
    /// Manage aliases.
    Alias {
        #[command(subcommand)]
        action: AliasCommand,
    },
    /// Answer the routing questions the MTA asks.
    Lookup {
        #[command(subcommand)]
        query: LookupCommand,
    },
    /// Check a password read from stdin against a user's credential.
    Verify { email: String },
    /// List the domains mail is accepted for.
    Domains,
    /// Report whether the administrator, hostmaster and postmaster aliases
    /// exist.
    Check {
        /// Fully qualified name of this host; defaults to the configured
        /// primary hostname.
        #[arg(long)]
        primary_hostname: Option<String>,
    },
}

impl Command {
    /// Commands that never write; they open an existing store read-only.
    fn is_read_only(&self) -> bool {
        matches!(
            self,
            Self::Lookup { .. } | Self::Verify { .. } | Self::Domains | Self::Check { .. }
        )
    }
}

#[derive(Debug, Subcommand)]
enum UserCommand {
    /// Add a user; the password is read from stdin.
    Add {
        email: String,
        /// Privilege tags, separated by spaces or commas.
        #[arg(long, default_value = "")]
        privileges: String,
    },
    /// Remove a user.
    Remove { email: String },
    /// Change a user's password; the new password is read from stdin.
    Password { email: String },
    /// List users with their privileges.
    List,
    /// Grant a privilege tag.
    Grant { email: String, privilege: String },
    /// Revoke a privilege tag.
    Revoke { email: String, privilege: String },
}

#[derive(Debug, Subcommand)]
enum AliasCommand {
    /// Forward `source` (an address or `@domain`) to `destination`.
    Add { source: String, destination: String },
    /// Remove the alias for `source`.
    Remove { source: String },
    /// List aliases.
    List,
}

#[derive(Debug, Subcommand)]
enum LookupCommand {
    /// Whether mail for a domain is accepted.
    Domain { domain: String },
    /// Whether an address is a mailbox.
    Mailbox { email: String },
    /// Where mail for an address is delivered.
    Alias { address: String },
    /// Whether `principal` may send as `address`.
    Sender { principal: String, address: String },
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("{0}")]
    Domain(#[from] Error),
    #[error(transparent)]
    Provision(#[from] ProvisionError),
    #[error("{0}")]
    Io(#[from] io::Error),
}

impl CliError {
    fn exit_code(&self) -> ExitCode {
        match self {
            Self::Domain(err) if err.is_unavailable() => ExitCode::from(EXIT_TEMPFAIL),
            Self::Provision(ProvisionError::Store(err)) if err.is_unavailable() => {
                ExitCode::from(EXIT_TEMPFAIL)
            }
            _ => ExitCode::from(EXIT_FAILURE),
        }
    }
}

fn main() -> ExitCode {
    let args = CliArgs::parse();
    let settings = match MailwireSettings::load_from_iter([OsString::from("mailwire")]) {
        Ok(settings) => settings,
        Err(err) => {
            drop(writeln!(io::stderr(), "mailwire: failed to load settings: {err}"));
            return ExitCode::from(EXIT_FAILURE);
        }
    };
    init_tracing(settings.json_logs);

    let runtime = match Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(err) => {
            error!(error = %err, "failed to create Tokio runtime");
            return ExitCode::from(EXIT_FAILURE);
        }
    };

    match runtime.block_on(run(args.command, &settings)) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(EXIT_NEGATIVE),
        Err(err) => {
            error!(error = %err, "mailwire command failed");
            drop(writeln!(io::stderr(), "mailwire: {err}"));
            err.exit_code()
        }
    }
}

fn init_tracing(json: bool) {
    let builder = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr);
    let result = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    if let Err(err) = result {
        drop(writeln!(io::stderr(), "mailwire: tracing init failed: {err}"));
    }
}

/// Run one command; `Ok(false)` means a negative answer.
async fn run(command: Command, settings: &MailwireSettings) -> Result<bool, CliError> {
    let layout = ProvisionLayout::from_settings(settings)?;
    let mut pool_config =
        PoolConfig::new(layout.database_path.as_str()).with_max_size(settings.pool_max_size());
    if command.is_read_only() {
        if !layout.database_path.is_file() {
            return Err(Error::store_unavailable(format!(
                "mail directory {} does not exist",
                layout.database_path
            ))
            .into());
        }
        pool_config = pool_config.read_only();
    } else if let Some(parent) = layout.database_path.parent() {
        Dir::create_ambient_dir_all(parent, ambient_authority())?;
    }

    let pool = DbPool::new(pool_config)
        .await
        .map_err(|err| Error::store_unavailable(err.to_string()))?;
    let repo = Arc::new(DieselMailDirectoryRepository::new(pool));
    let directory = DirectoryService::new(Arc::clone(&repo));

    match command {
        Command::Provision => {
            let supervisor: Arc<dyn ServiceSupervisor> = match settings.restart_command() {
                Some(template) => Arc::new(CommandServiceSupervisor::new(template)),
                None => {
                    warn!("no restart command configured; restarts are only logged");
                    Arc::new(TracingServiceSupervisor)
                }
            };
            let report = Provisioner::new(directory, supervisor, layout).run().await?;
            let mut out = io::stdout().lock();
            for file in &report.files {
                writeln!(out, "wrote {file}")?;
            }
            for service in &report.restarted {
                writeln!(out, "restarted {service}")?;
            }
            Ok(true)
        }
        Command::User { action } => {
            directory.initialize().await?;
            run_user(&directory, action).await
        }
        Command::Alias { action } => {
            directory.initialize().await?;
            run_alias(&directory, action).await
        }
        Command::Lookup { query } => {
            let routing = Arc::new(MailRoutingService::new(repo));
            run_lookup(routing, query).await
        }
        Command::Verify { email } => {
            let password = read_password()?;
            let verified = directory.authenticate(&email, &password).await?;
            writeln!(io::stdout(), "{}", if verified { "ok" } else { "denied" })?;
            Ok(verified)
        }
        Command::Domains => {
            let mut out = io::stdout().lock();
            for domain in directory.list_mail_domains().await? {
                writeln!(out, "{domain}")?;
            }
            Ok(true)
        }
        Command::Check { primary_hostname } => {
            let Some(hostname) = primary_hostname
                .as_deref()
                .or_else(|| settings.primary_hostname())
            else {
                return Err(Error::invalid_request(
                    "no primary hostname: pass --primary-hostname or set MAILWIRE_PRIMARY_HOSTNAME",
                )
                .into());
            };
            let checks = directory.check_required_aliases(hostname).await?;
            write_contact_report(&checks)?;
            Ok(checks.iter().all(ContactAliasCheck::is_present))
        }
    }
}

fn write_contact_report(checks: &[ContactAliasCheck]) -> io::Result<()> {
    let mut out = io::stdout().lock();
    for check in checks {
        match check.destination() {
            Some(destination) => writeln!(
                out,
                "ok\t{} -> {destination}\t{}",
                check.address(),
                check.role()
            )?,
            None => writeln!(out, "missing\t{}\t{}", check.address(), check.role())?,
        }
    }
    Ok(())
}

async fn run_user(
    directory: &DirectoryService<DieselMailDirectoryRepository>,
    action: UserCommand,
) -> Result<bool, CliError> {
    let mut out = io::stdout().lock();
    match action {
        UserCommand::Add { email, privileges } => {
            let password = read_password()?;
            let user = directory
                .add_user(&email, &password, Privileges::parse(&privileges))
                .await?;
            writeln!(out, "added {}", user.email())?;
        }
        UserCommand::Remove { email } => {
            directory.remove_user(&email).await?;
            writeln!(out, "removed {email}")?;
        }
        UserCommand::Password { email } => {
            let password = read_password()?;
            directory.set_password(&email, &password).await?;
            writeln!(out, "updated {email}")?;
        }
        UserCommand::List => {
            for user in directory.list_users().await? {
                writeln!(out, "{}\t{}", user.email(), user.privileges())?;
            }
        }
        UserCommand::Grant { email, privilege } => {
            let changed = directory.grant_privilege(&email, &privilege).await?;
            writeln!(out, "{}", if changed { "granted" } else { "unchanged" })?;
        }
        UserCommand::Revoke { email, privilege } => {
            let changed = directory.revoke_privilege(&email, &privilege).await?;
            writeln!(out, "{}", if changed { "revoked" } else { "unchanged" })?;
        }
    }
    Ok(true)
}

async fn run_alias(
    directory: &DirectoryService<DieselMailDirectoryRepository>,
    action: AliasCommand,
) -> Result<bool, CliError> {
    let mut out = io::stdout().lock();
    match action {
        AliasCommand::Add {
            source,
            destination,
        } => {
            let alias = directory.add_alias(&source, &destination).await?;
            writeln!(out, "added {} -> {}", alias.source(), alias.destination())?;
        }
        AliasCommand::Remove { source } => {
            directory.remove_alias(&source).await?;
            writeln!(out, "removed {source}")?;
        }
        AliasCommand::List => {
            for alias in directory.list_aliases().await? {
                writeln!(out, "{}\t{}", alias.source(), alias.destination())?;
            }
        }
    }
    Ok(true)
}

async fn run_lookup(
    routing: Arc<MailRoutingService<DieselMailDirectoryRepository>>,
    query: LookupCommand,
) -> Result<bool, CliError> {
    let found = match query {
        LookupCommand::Domain { domain } => routing.domain_has_any_recipient(&domain).await?,
        LookupCommand::Mailbox { email } => routing.user_exists(&email).await?,
        LookupCommand::Alias { address } => match routing.resolve_destination(&address).await? {
            Some(destination) => {
                writeln!(io::stdout(), "{destination}")?;
                return Ok(true);
            }
            None => false,
        },
        LookupCommand::Sender { principal, address } => {
            SenderPolicyService::new(routing)
                .may_use_sender_address(&principal, &address)
                .await?
        }
    };
    writeln!(io::stdout(), "{}", if found { "yes" } else { "no" })?;
    Ok(found)
}

/// Read one line from stdin without its line terminator.
fn read_password() -> io::Result<Zeroizing<String>> {
    let mut line = Zeroizing::new(String::new());
    io::stdin().lock().read_line(&mut line)?;
    let trimmed = line.trim_end_matches(['\r', '\n']).len();
    line.truncate(trimmed);
    Ok(line)
}
