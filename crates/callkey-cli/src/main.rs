use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;

use callkey_core::{Keyer, KeyConfig, Mapping, Value, FORMAT_VERSION};

/// callkey: deterministic cache keys for call arguments
///
/// Compute or inspect the key a cache layer would use for a call whose
/// arguments are given as JSON.
#[derive(Parser)]
#[command(name = "callkey", version, about, long_about = None)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute the cache key of a call
    Key {
        #[command(flatten)]
        call: CallArgs,
        /// Print the SHA-256 digest instead of the full key
        #[arg(long)]
        digest: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the canonical form of a call's arguments
    Inspect {
        #[command(flatten)]
        call: CallArgs,
    },

    /// Show version information
    Version,
}

#[derive(Args)]
struct CallArgs {
    /// Positional arguments as a JSON array
    #[arg(long, default_value = "[]")]
    args: String,
    /// Keyword arguments as a JSON object
    #[arg(long, default_value = "{}")]
    kwargs: String,
    /// Override the normalization depth budget
    #[arg(long)]
    max_depth: Option<usize>,
    /// Path to a JSON key configuration file
    #[arg(long)]
    config: Option<PathBuf>,
}

/// Exit 1: the key could not be computed. Exit 2: bad input or configuration.
enum Failure {
    Input(String),
    Key(callkey_core::Error),
}

impl Failure {
    fn report(&self) -> i32 {
        match self {
            Failure::Input(msg) => {
                eprintln!("{} {}", "error:".red().bold(), msg);
                2
            }
            Failure::Key(err) => {
                eprintln!("{} {}", "error:".red().bold(), err);
                1
            }
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Key { call, digest, json } => run_key(&call, digest, json),
        Commands::Inspect { call } => run_inspect(&call),
        Commands::Version => {
            println!(
                "callkey {} (key format v{})",
                env!("CARGO_PKG_VERSION"),
                FORMAT_VERSION
            );
            Ok(())
        }
    };

    let exit_code = match result {
        Ok(()) => 0,
        Err(failure) => failure.report(),
    };
    process::exit(exit_code);
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("callkey={level},callkey_core={level}")));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

// ── Commands ──────────────────────────────────────────────

fn run_key(call: &CallArgs, digest: bool, json: bool) -> Result<(), Failure> {
    let keyer = build_keyer(call)?;
    let (args, kwargs) = parse_call(call)?;
    let key = keyer.encode(&args, &kwargs).map_err(Failure::Key)?;
    tracing::info!(len = key.len(), "computed cache key");

    if json {
        let output = serde_json::json!({
            "key": key.to_hex(),
            "digest": key.digest(),
            "length": key.len(),
            "format_version": key.format_version(),
        });
        println!("{}", pretty(&output)?);
    } else if digest {
        println!("{}", key.digest());
    } else {
        println!("{}", key);
    }
    Ok(())
}

fn run_inspect(call: &CallArgs) -> Result<(), Failure> {
    let keyer = build_keyer(call)?;
    let (args, kwargs) = parse_call(call)?;
    let (positional, keyword) = keyer.freeze_call(&args, &kwargs).map_err(Failure::Key)?;

    let output = serde_json::json!({
        "args": positional.to_json(),
        "kwargs": keyword.to_json(),
        "max_depth": keyer.config().max_depth,
    });
    println!("{}", pretty(&output)?);
    Ok(())
}

// ── Helpers ───────────────────────────────────────────────

fn build_keyer(call: &CallArgs) -> Result<Keyer, Failure> {
    let mut config = match &call.config {
        Some(path) => KeyConfig::from_file(path)
            .map_err(|e| Failure::Input(format!("{}: {}", path.display(), e)))?,
        None => KeyConfig::default(),
    };
    if let Some(depth) = call.max_depth {
        config = config.with_max_depth(depth);
    }
    Keyer::new(config).map_err(|e| Failure::Input(e.to_string()))
}

fn parse_call(call: &CallArgs) -> Result<(Vec<Value>, Mapping), Failure> {
    let args = match parse_json("--args", &call.args)? {
        serde_json::Value::Array(items) => items.iter().map(Value::from_json).collect(),
        _ => return Err(Failure::Input("--args must be a JSON array".into())),
    };
    let kwargs = match parse_json("--kwargs", &call.kwargs)? {
        serde_json::Value::Object(map) => map
            .iter()
            .map(|(k, v)| (k.as_str(), Value::from_json(v)))
            .collect(),
        _ => return Err(Failure::Input("--kwargs must be a JSON object".into())),
    };
    Ok((args, kwargs))
}

fn parse_json(flag: &str, text: &str) -> Result<serde_json::Value, Failure> {
    serde_json::from_str(text).map_err(|e| Failure::Input(format!("{} is not valid JSON: {}", flag, e)))
}

fn pretty(value: &serde_json::Value) -> Result<String, Failure> {
    serde_json::to_string_pretty(value)
        .map_err(|e| Failure::Input(format!("Serialization error: {}", e)))
}
