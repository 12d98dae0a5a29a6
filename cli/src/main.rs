//! Minimal command-line front end: starts a cluster, runs one operation
//! against it, prints the result, and shuts down.
//!
//! This is a harness for exercising the library end to end, not a
//! persistent service — nothing in the cluster outlives the process.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use observability_deps::tracing::error;
use thiserror::Error;

use blobstore::{Config, Error as BlobstoreError};

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Blobstore(#[from] BlobstoreError),
    #[error("no content provided for upload/update")]
    MissingContent,
}

/// Run a single operation against a fresh in-memory blob-store cluster.
#[derive(Debug, Parser)]
#[clap(name = "blobstore", about = "In-memory chunked, replicated blob store")]
struct Cli {
    #[clap(flatten)]
    config: ConfigArgs,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Debug, clap::Args)]
struct ConfigArgs {
    /// Number of storage actors in the cluster.
    #[clap(long, env = "BLOBSTORE_ACTOR_COUNT", default_value = "15")]
    actor_count: usize,

    /// Maximum length, in bytes, of a single chunk.
    #[clap(long, env = "BLOBSTORE_MAX_CHUNK_LEN", default_value = "3")]
    max_chunk_len: usize,

    /// Number of replicas to maintain per chunk.
    #[clap(long, env = "BLOBSTORE_REPLICA_FACTOR", default_value = "3")]
    replica_factor: usize,
}

impl From<ConfigArgs> for Config {
    fn from(args: ConfigArgs) -> Self {
        let defaults = Config::default();
        Self {
            actor_count: args.actor_count,
            max_chunk_len: args.max_chunk_len,
            replica_factor: args.replica_factor,
            max_dead: args.actor_count / 2,
            ..defaults
        }
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Upload a new artifact (or replace an existing one).
    Upload {
        name: String,
        content: String,
    },
    /// Overwrite an existing artifact's content.
    Update {
        name: String,
        content: String,
    },
    /// Fetch an artifact's content.
    Get {
        name: String,
    },
    /// Delete an artifact.
    Delete {
        name: String,
    },
    /// List every artifact's name and content.
    List,
    /// List every storage actor's liveness.
    Status,
    /// List every storage actor's chunk-count load hint.
    Nodes,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(%err, "command failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let config: Config = cli.config.into();
    let system = blobstore::start(config);
    let coordinator = system.coordinator().clone();

    let outcome = match cli.command {
        Command::Upload { content, .. } if content.is_empty() => Err(CliError::MissingContent),
        Command::Upload { name, content } => {
            coordinator.upload(&name, content.into_bytes()).await?;
            println!("uploaded '{name}'");
            Ok(())
        }
        Command::Update { content, .. } if content.is_empty() => Err(CliError::MissingContent),
        Command::Update { name, content } => {
            coordinator.update(&name, content.into_bytes()).await?;
            println!("updated '{name}'");
            Ok(())
        }
        Command::Get { name } => {
            let content = coordinator.get(&name).await?;
            println!("{}", String::from_utf8_lossy(&content));
            Ok(())
        }
        Command::Delete { name } => {
            coordinator.delete(&name).await?;
            println!("deleted '{name}'");
            Ok(())
        }
        Command::List => {
            let artifacts = coordinator.list_artifacts().await;
            if artifacts.is_empty() {
                println!("No artifacts found");
            }
            for (name, content) in artifacts {
                println!("{name}: {}", String::from_utf8_lossy(&content));
            }
            Ok(())
        }
        Command::Status => {
            for (id, alive) in coordinator.list_statuses().await {
                println!("{id}: {}", if alive { "alive" } else { "dead" });
            }
            Ok(())
        }
        Command::Nodes => {
            for node in coordinator.list_nodes().await {
                println!("{}: chunk_count={}", node.id, node.chunk_count);
            }
            Ok(())
        }
    };

    system.shutdown().await;
    outcome
}
