//! Notary Registry Command Line Interface
//!
//! Runs one registry operation per invocation against a local state file:
//! the snapshot is loaded, the operation is applied through
//! `RegistryService`, and on success the new snapshot replaces the file.
//! A lock file next to the state file serializes writers across processes.

mod config;
mod output;
mod state;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use crate::config::{AppConfig, Overrides};
use notary_registry::{DisputeOutcome, NewRegistration, RegistryService};
use notary_time::{Clock, ManualClock, SystemClock, Timestamp};
use notary_types::{Address, ContentHash, RegistrationId};
use output::Rendered;
use state::StateLock;
use serde_json::json;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "notary")]
#[command(about = "Notary Registry Command Line Interface", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file (defaults to ./notary.toml when present)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Registry state file
    #[arg(long, global = true, value_name = "PATH")]
    state: Option<PathBuf>,

    /// Log level or filter directive (RUST_LOG takes precedence)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Log output format
    #[arg(long, global = true, value_parser = ["pretty", "json"])]
    log_format: Option<String>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Evaluate at this unix time instead of the system clock
    #[arg(long, global = true, value_name = "UNIX_SECS")]
    at: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Register a file's content hash
    Register(RegisterCommand),
    /// Transfer ownership of a registration
    Transfer {
        id: RegistrationId,
        /// Current owner
        #[arg(long)]
        from: Address,
        /// New owner
        #[arg(long)]
        to: Address,
    },
    /// Grant access to a registration, permanent unless --expires-at is given
    Grant {
        id: RegistrationId,
        #[arg(long)]
        owner: Address,
        #[arg(long)]
        grantee: Address,
        /// Absolute expiry as unix seconds
        #[arg(long, value_name = "UNIX_SECS")]
        expires_at: Option<u64>,
    },
    /// Issue a license that expires after a number of seconds
    License {
        id: RegistrationId,
        #[arg(long)]
        owner: Address,
        #[arg(long)]
        grantee: Address,
        #[arg(long, value_name = "SECS", allow_negative_numbers = true)]
        duration: i64,
    },
    /// Revoke a grant or license
    Revoke {
        id: RegistrationId,
        #[arg(long)]
        owner: Address,
        #[arg(long)]
        grantee: Address,
    },
    /// Check whether an address may access a registration
    Check { id: RegistrationId, address: Address },
    /// Check whether an address owns a registration
    Verify { id: RegistrationId, address: Address },
    /// Show one registration
    Show { id: RegistrationId },
    /// Look up the registration holding a content hash
    Find(ContentArgs),
    /// List registrations
    List {
        /// Only registrations owned by this address
        #[arg(long)]
        owner: Option<Address>,
    },
    /// Count registrations
    Count {
        #[arg(long)]
        owner: Option<Address>,
    },
    /// Show the n-th registration (0-based) owned by an address
    OwnerAt { owner: Address, index: usize },
    /// Show the transfer history of a registration
    History { id: RegistrationId },
    /// List active grants on a registration
    Grants { id: RegistrationId },
    /// List registrations shared with an address
    SharedWith { address: Address },
    /// Dispute operations
    Dispute {
        #[command(subcommand)]
        action: DisputeCommands,
    },
    /// Full report on one registration
    Audit { id: RegistrationId },
    /// Print the whole registry snapshot as JSON
    Snapshot,
}

#[derive(Subcommand)]
enum DisputeCommands {
    /// Contest a registration
    Open {
        id: RegistrationId,
        #[arg(long)]
        claimant: Address,
        #[arg(long)]
        reason: String,
    },
    /// Close the open dispute on a registration
    Resolve {
        id: RegistrationId,
        #[arg(long)]
        resolver: Address,
        /// upheld or dismissed
        #[arg(long)]
        outcome: DisputeOutcome,
    },
    /// List open disputes, or every dispute on one registration
    List { id: Option<RegistrationId> },
}

#[derive(Args)]
struct RegisterCommand {
    /// Registering owner
    #[arg(long)]
    owner: Address,
    #[command(flatten)]
    content: ContentArgs,
    #[arg(long)]
    title: String,
    #[arg(long)]
    description: String,
    /// Pointer to off-registry metadata
    #[arg(long, default_value = "")]
    uri: String,
}

#[derive(Args)]
#[group(required = true, multiple = false)]
struct ContentArgs {
    /// Content identifier from the content store
    #[arg(long)]
    hash: Option<String>,
    /// Local file to hash with BLAKE3 (the file itself is not stored)
    #[arg(long, value_name = "PATH")]
    file: Option<PathBuf>,
}

impl ContentArgs {
    fn content_hash(&self) -> Result<ContentHash> {
        match (&self.hash, &self.file) {
            (Some(hash), _) => Ok(ContentHash::new(hash.trim())),
            (None, Some(path)) => {
                let data = fs::read(path)
                    .with_context(|| format!("failed to read {}", path.display()))?;
                Ok(ContentHash::from_data(&data))
            }
            (None, None) => anyhow::bail!("either --hash or --file must be provided"),
        }
    }
}

impl Commands {
    fn mutates(&self) -> bool {
        match self {
            Commands::Register(_)
            | Commands::Transfer { .. }
            | Commands::Grant { .. }
            | Commands::License { .. }
            | Commands::Revoke { .. } => true,
            Commands::Dispute { action } => !matches!(action, DisputeCommands::List { .. }),
            _ => false,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load(cli.config.as_deref())?;
    config.apply_overrides(&Overrides {
        state_path: cli.state.clone(),
        log_level: cli.log_level.clone(),
        log_format: cli.log_format.clone(),
    })?;

    init_logging(&config)?;

    let clock: Arc<dyn Clock> = match cli.at {
        Some(secs) => Arc::new(ManualClock::new(Timestamp::from_secs(secs))),
        None => Arc::new(SystemClock::new()),
    };

    // Held from load to save so concurrent invocations apply one at a time.
    let mutates = cli.command.mutates();
    let _lock = if mutates {
        Some(StateLock::exclusive(&config.state_path)?)
    } else {
        StateLock::shared(&config.state_path)?
    };

    let registry = state::load_registry(&config.state_path, clock, config.policy.clone())?;
    let rendered = execute(cli.command, &registry)?;
    if mutates {
        state::save_registry(&config.state_path, &registry)?;
    }
    rendered.print(cli.json)
}

fn execute(command: Commands, registry: &RegistryService) -> Result<Rendered> {
    debug!(now = %registry.now(), "executing command");

    match command {
        Commands::Register(cmd) => {
            let content_hash = cmd.content.content_hash()?;
            let id = registry.register_file(NewRegistration::new(
                cmd.owner,
                content_hash.clone(),
                cmd.title,
                cmd.description,
                cmd.uri,
            ))?;
            Rendered::new(
                &json!({ "id": id, "content_hash": content_hash }),
                format!("Registered #{id} ({content_hash})"),
            )
        }
        Commands::Transfer { id, from, to } => {
            let record = registry.transfer_ownership(id, from, to)?;
            let text = format!("Transferred {}", output::transfer(&record));
            Rendered::new(&record, text)
        }
        Commands::Grant {
            id,
            owner,
            grantee,
            expires_at,
        } => {
            let grant =
                registry.grant_access(id, owner, grantee, expires_at.map(Timestamp::from_secs))?;
            let text = format!("Granted {}", output::grant(&grant));
            Rendered::new(&grant, text)
        }
        Commands::License {
            id,
            owner,
            grantee,
            duration,
        } => {
            let grant = registry.issue_license(id, owner, grantee, duration)?;
            let text = format!("Licensed {}", output::grant(&grant));
            Rendered::new(&grant, text)
        }
        Commands::Revoke { id, owner, grantee } => {
            registry.revoke_access(id, owner, grantee)?;
            Rendered::new(
                &json!({ "id": id, "grantee": grantee, "revoked": true }),
                format!("Revoked access of {grantee} to #{id}"),
            )
        }
        Commands::Check { id, address } => {
            let allowed = registry.check_access(id, &address);
            Rendered::new(
                &json!({ "id": id, "address": address, "access": allowed }),
                allowed.to_string(),
            )
        }
        Commands::Verify { id, address } => {
            let owner = registry.is_owner(id, &address);
            Rendered::new(
                &json!({ "id": id, "address": address, "owner": owner }),
                owner.to_string(),
            )
        }
        Commands::Show { id } => {
            let registration = registry.get_registration(id)?;
            Rendered::new(&registration, output::registration(&registration))
        }
        Commands::Find(content) => {
            let hash = content.content_hash()?;
            let found = registry
                .find_by_content_hash(&hash)
                .with_context(|| format!("no registration holds content {hash}"))?;
            Rendered::new(&found, output::registration(&found))
        }
        Commands::List { owner } => {
            let items = match owner {
                Some(owner) => registry.list_by_owner(&owner),
                None => registry.list_all(),
            };
            Rendered::new(&items, output::registration_list(&items))
        }
        Commands::Count { owner } => {
            let count = match owner {
                Some(owner) => registry.count_by_owner(&owner),
                None => registry.count(),
            };
            Rendered::new(&json!({ "count": count }), count.to_string())
        }
        Commands::OwnerAt { owner, index } => {
            let registration = registry.registration_of_owner_at(&owner, index)?;
            Rendered::new(&registration, output::registration(&registration))
        }
        Commands::History { id } => {
            let history = registry.transfer_history(id)?;
            Rendered::new(&history, output::transfer_list(&history))
        }
        Commands::Grants { id } => {
            let grants = registry.list_grants(id)?;
            Rendered::new(&grants, output::grant_list(&grants))
        }
        Commands::SharedWith { address } => {
            let items = registry.list_shared_with(&address);
            Rendered::new(&items, output::registration_list(&items))
        }
        Commands::Dispute { action } => execute_dispute(action, registry),
        Commands::Audit { id } => {
            let report = registry.audit(id)?;
            Rendered::new(&report, output::audit(&report))
        }
        Commands::Snapshot => {
            let snapshot = registry.snapshot();
            let text = snapshot.to_json()?;
            Rendered::new(&snapshot, text)
        }
    }
}

fn execute_dispute(action: DisputeCommands, registry: &RegistryService) -> Result<Rendered> {
    match action {
        DisputeCommands::Open {
            id,
            claimant,
            reason,
        } => {
            let dispute_id = registry.file_dispute(id, claimant, reason)?;
            Rendered::new(
                &json!({ "dispute_id": dispute_id, "id": id }),
                format!("Opened dispute {dispute_id} on #{id}"),
            )
        }
        DisputeCommands::Resolve {
            id,
            resolver,
            outcome,
        } => {
            let dispute = registry.resolve_dispute(id, resolver, outcome)?;
            let text = format!("Resolved {}", output::dispute(&dispute));
            Rendered::new(&dispute, text)
        }
        DisputeCommands::List { id } => {
            let disputes = match id {
                Some(id) => registry.disputes_for(id)?,
                None => registry.list_open_disputes(),
            };
            Rendered::new(&disputes, output::dispute_list(&disputes))
        }
    }
}

fn init_logging(config: &AppConfig) -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    // stdout carries command output; logs go to stderr.
    if config.log_format == "json" {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().pretty().with_writer(std::io::stderr))
            .try_init()?;
    }

    Ok(())
}
