//! ShelfDB CLI
//!
//! Command-line interface for a local ShelfDB data directory.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use shelfdb::{Config, Database, SyncMode, WriteOptions};
use tracing_subscriber::{fmt, EnvFilter};

/// ShelfDB CLI
#[derive(Parser, Debug)]
#[command(name = "shelfdb-cli")]
#[command(about = "CLI for the ShelfDB embedded key-value store")]
#[command(version)]
struct Args {
    /// Data directory
    #[arg(short, long, default_value = "./shelfdb_data")]
    data_dir: String,

    /// fsync every write before returning
    #[arg(long)]
    durable: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Get a value by key, or every live entry when the key is omitted
    Get {
        table: String,
        key: Option<String>,
    },

    /// Set a key to a JSON value (bare text is stored as a string)
    Set {
        table: String,
        key: String,
        value: String,

        /// Expire this many seconds from now
        #[arg(long)]
        ttl: Option<u64>,
    },

    /// Delete a key
    Del { table: String, key: String },

    /// Count live entries
    Size { table: String },

    /// List tables
    Tables,

    /// Delete a whole table
    Drop { table: String },

    /// Evict expired entries from one table, or from all tables
    Cleanup { table: Option<String> },
}

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,shelfdb=info"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> shelfdb::Result<()> {
    let config = Config::builder()
        .data_dir(&args.data_dir)
        .sync_mode(if args.durable { SyncMode::Durable } else { SyncMode::Fast })
        .build();
    let db = Database::open(config)?;

    match args.command {
        Commands::Get { table, key: Some(key) } => match db.get(&table, &key)? {
            Some(value) => println!("{}", value),
            None => println!("(not found)"),
        },
        Commands::Get { table, key: None } => {
            for (key, value) in db.get_all(&table)? {
                println!("{}\t{}", key, value);
            }
        }
        Commands::Set { table, key, value, ttl } => {
            let value: serde_json::Value =
                serde_json::from_str(&value).unwrap_or(serde_json::Value::String(value));
            let mut options = WriteOptions::new();
            if let Some(secs) = ttl {
                options = options.expires_in(std::time::Duration::from_secs(secs));
            }
            let ok = db.write_with(&table, &key, &value, options)?;
            println!("{}", if ok { "OK" } else { "FAILED" });
        }
        Commands::Del { table, key } => {
            println!("{}", if db.delete(&table, &key)? { "1" } else { "0" });
        }
        Commands::Size { table } => println!("{}", db.size(&table)?),
        Commands::Tables => {
            for name in db.list_tables()? {
                println!("{}", name);
            }
        }
        Commands::Drop { table } => {
            println!("{}", if db.delete_table(&table)? { "1" } else { "0" });
        }
        Commands::Cleanup { table } => {
            let removed = match table {
                Some(table) => db.cleanup_expired(&table)?,
                None => db.cleanup_all_expired()?,
            };
            println!("{}", removed);
        }
    }

    db.close()
}
