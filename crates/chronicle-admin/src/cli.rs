//! Command-line interface definition.

use clap::{Parser, Subcommand, ValueEnum};
use uuid::Uuid;

/// Default page size for forward scans.
pub const DEFAULT_LIMIT: u32 = 100;

#[derive(Debug, Parser)]
#[command(name = "chronicle-admin")]
#[command(about = "Inspect and migrate the Chronicle event store")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Apply pending schema migrations
    Migrate,

    #[command(flatten)]
    Query(Query),
}

/// Read-only commands. Each prints one JSON object per line.
#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Query {
    /// Print every event of one stream, oldest first
    Stream {
        /// Aggregate type, e.g. "module"
        aggregate_type: String,
        /// Aggregate identifier
        aggregate_id: String,
    },

    /// Print the committed version of one stream
    Version {
        /// Aggregate type, e.g. "module"
        aggregate_type: String,
        /// Aggregate identifier
        aggregate_id: String,
    },

    /// Print events across all streams in insertion order
    Tail {
        /// Start after this event id
        #[arg(long)]
        from: Option<Uuid>,
        /// Maximum number of events to print
        #[arg(long, default_value_t = DEFAULT_LIMIT)]
        limit: u32,
    },

    /// Print events of one type across all streams
    ByType {
        /// Event type, e.g. "module.installed"
        event_type: String,
        /// Maximum number of events to print
        #[arg(long, default_value_t = DEFAULT_LIMIT)]
        limit: u32,
    },

    /// Rebuild an aggregate and print its current state
    Show {
        /// Kind of aggregate
        #[arg(value_enum)]
        kind: AggregateKind,
        /// Aggregate identifier
        aggregate_id: String,
    },
}

/// Aggregates the tool knows how to rebuild.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum AggregateKind {
    Module,
    Page,
}
