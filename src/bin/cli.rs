//! pmemkv CLI
//!
//! Opens an engine from a JSON config and runs one operation against it.
//!
//! ```text
//! pmemkv-cli --engine stree --config '{"path":"/tmp/kv.pool","size":1048576}' put k v
//! pmemkv-cli --engine stree --config-file kv.json list --above a
//! ```

use std::fs;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use pmemkv::{Config, Db, EngineKind, KvError};
use tracing_subscriber::{fmt, EnvFilter};

/// pmemkv CLI
#[derive(Parser, Debug)]
#[command(name = "pmemkv-cli")]
#[command(about = "CLI for pmemkv engines")]
#[command(version)]
struct Cli {
    /// Engine variant to open
    #[arg(short, long, default_value = "stree")]
    engine: String,

    /// Engine config as a JSON object
    #[arg(short, long, conflicts_with = "config_file")]
    config: Option<String>,

    /// File holding the engine config as a JSON object
    #[arg(short = 'f', long)]
    config_file: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug)]
struct Range {
    /// Only keys strictly greater than this
    #[arg(long)]
    above: Option<String>,

    /// Only keys strictly less than this
    #[arg(long)]
    below: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Get a value by key
    Get {
        /// The key to get
        key: String,
    },

    /// Set a key-value pair
    Put {
        /// The key to set
        key: String,

        /// The value to set
        value: String,
    },

    /// Remove a key
    Remove {
        /// The key to remove
        key: String,
    },

    /// Check whether a key exists
    Exists {
        /// The key to check
        key: String,
    },

    /// Count keys, optionally within bounds
    Count(Range),

    /// Print key-value pairs in key order, optionally within bounds
    List(Range),

    /// List the engine variants built into this binary
    Engines,
}

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,pmemkv=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Cli::parse();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::from(e.status().code().unsigned_abs() as u8)
        }
    }
}

fn run(args: Cli) -> pmemkv::Result<()> {
    if let Commands::Engines = args.command {
        for kind in EngineKind::ALL {
            println!("{}", kind);
        }
        return Ok(());
    }

    let config = load_config(&args)?;
    let db = Db::open(&args.engine, config.as_ref())?;
    tracing::debug!(engine = db.engine_name(), "engine ready");

    match &args.command {
        Commands::Get { key } => {
            let value = db.get(key.as_bytes())?;
            println!("{}", String::from_utf8_lossy(&value));
        }
        Commands::Put { key, value } => {
            db.put(key.as_bytes(), value.as_bytes())?;
            println!("OK");
        }
        Commands::Remove { key } => {
            db.remove(key.as_bytes())?;
            println!("OK");
        }
        Commands::Exists { key } => {
            println!("{}", db.exists(key.as_bytes())?);
        }
        Commands::Count(range) => {
            let count = match (&range.above, &range.below) {
                (Some(lo), Some(hi)) => db.count_between(lo.as_bytes(), hi.as_bytes())?,
                (Some(lo), None) => db.count_above(lo.as_bytes())?,
                (None, Some(hi)) => db.count_below(hi.as_bytes())?,
                (None, None) => db.count_all()?,
            };
            println!("{}", count);
        }
        Commands::List(range) => {
            let mut print = |key: &[u8], value: &[u8]| {
                println!(
                    "{}\t{}",
                    String::from_utf8_lossy(key),
                    String::from_utf8_lossy(value)
                );
            };
            match (&range.above, &range.below) {
                (Some(lo), Some(hi)) => db.get_between(lo.as_bytes(), hi.as_bytes(), &mut print)?,
                (Some(lo), None) => db.get_above(lo.as_bytes(), &mut print)?,
                (None, Some(hi)) => db.get_below(hi.as_bytes(), &mut print)?,
                (None, None) => db.get_all(&mut print)?,
            }
        }
        Commands::Engines => {}
    }

    db.close()
}

fn load_config(args: &Cli) -> pmemkv::Result<Option<Config>> {
    let json = match (&args.config, &args.config_file) {
        (Some(json), _) => json.clone(),
        (None, Some(file)) => fs::read_to_string(file).map_err(|e| {
            KvError::InvalidArgument(format!("cannot read config file {}: {}", file, e))
        })?,
        (None, None) => return Ok(None),
    };
    Config::from_json(&json).map(Some)
}
