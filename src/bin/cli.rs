//! LockKV CLI Client
//!
//! Command-line interface for interacting with LockKV.
//!
//! Each invocation is its own connection, so locks taken by a one-shot
//! `lock` are released as soon as the CLI exits. Use `repl` to hold locks
//! across several requests.

use std::io::{self, BufRead, Write};

use clap::{Parser, Subcommand};
use lockkv::network::Client;
use lockkv::protocol::Response;
use lockkv::{KvError, LockMode, Result};

/// LockKV CLI
#[derive(Parser, Debug)]
#[command(name = "lockkv-cli")]
#[command(about = "CLI for LockKV key-value store")]
struct Args {
    /// Server address
    #[arg(short, long, default_value = "127.0.0.1:8008")]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write key=value pairs
    Write {
        /// Pairs in key=value form
        #[arg(required = true, value_parser = parse_pair)]
        pairs: Vec<(String, String)>,

        /// Keep written keys locked (write mode) until this connection ends
        #[arg(long)]
        hold_lock: bool,

        /// List keys that were skipped because they were locked
        #[arg(long)]
        report_skipped: bool,
    },

    /// Read values by key
    Read {
        #[arg(required = true)]
        keys: Vec<String>,
    },

    /// Lock keys
    Lock {
        #[arg(required = true)]
        keys: Vec<String>,

        /// Lock mode: read or write
        #[arg(short, long, default_value = "read")]
        mode: String,
    },

    /// Unlock keys
    Unlock {
        #[arg(required = true)]
        keys: Vec<String>,
    },

    /// Send one raw JSON request per stdin line over a single connection
    Repl,
}

fn main() {
    let args = Args::parse();

    if let Err(e) = run(args) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    let mut client = Client::connect(&args.server)?;

    let response = match args.command {
        Commands::Write {
            pairs,
            hold_lock,
            report_skipped,
        } => {
            let (keys, values): (Vec<&str>, Vec<&str>) = pairs
                .iter()
                .map(|(key, value)| (key.as_str(), value.as_str()))
                .unzip();
            client.write_with(&keys, &values, hold_lock, report_skipped)?
        }
        Commands::Read { keys } => client.read(&borrowed(&keys))?,
        Commands::Lock { keys, mode } => {
            let mode: LockMode = mode.parse()?;
            client.lock(&borrowed(&keys), mode)?
        }
        Commands::Unlock { keys } => client.unlock(&borrowed(&keys))?,
        Commands::Repl => return repl(&mut client),
    };

    print_response(&response)
}

fn repl(client: &mut Client) -> Result<()> {
    let stdin = io::stdin();

    for line in stdin.lock().lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let response = client.send_raw(line.as_bytes())?;
        print_response(&response)?;
    }

    Ok(())
}

fn print_response(response: &Response) -> Result<()> {
    let json = serde_json::to_string(response).map_err(|e| KvError::Serialization(e.to_string()))?;
    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{}", json)?;
    Ok(())
}

/// Parse one `key=value` argument; the value may itself contain '='
fn parse_pair(arg: &str) -> std::result::Result<(String, String), String> {
    arg.split_once('=')
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .ok_or_else(|| format!("expected key=value, got '{}'", arg))
}

fn borrowed(items: &[String]) -> Vec<&str> {
    items.iter().map(String::as_str).collect()
}
