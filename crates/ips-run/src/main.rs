//! ips-run - command-line front end for ips-common
//!
//! Wires together:
//! - Configuration loading (file, environment, flags)
//! - Logging to stderr
//! - Streaming command execution and the path/address helpers

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ips_command::{network_addresses, CommandRunner};
use ips_config::{load_config, load_config_or_default, Settings};
use ips_util::{data_file_in, default_config_path, host_port_for_url};
use std::io::Write;
use std::path::PathBuf;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// ips-run - run shell commands and inspect the host
#[derive(Parser, Debug)]
#[command(name = "ips-run")]
#[command(about = "Run shell commands line by line and inspect the host", long_about = None)]
struct Args {
    /// Configuration file path (default: ~/.config/ips-common/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Shell used to interpret commands (or set IPS_SHELL env var)
    #[arg(long, env = "IPS_SHELL")]
    shell: Option<PathBuf>,

    /// Data directory override (or set IPS_DATA_DIR env var)
    #[arg(short, long, env = "IPS_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Stream a command's output line by line
    Run {
        /// Shell command to execute
        command: String,

        /// Kill the command after this many lines
        #[arg(long)]
        max_lines: Option<usize>,
    },

    /// Run a command to completion and print its output
    Call {
        /// Shell command to execute
        command: String,
    },

    /// Print the global addresses of a network interface
    Addrs {
        /// Interface name (default: interface of the default route)
        #[arg(long)]
        dev: Option<String>,
    },

    /// Print the data directory
    DataDir,

    /// Print the resolved path of a data file
    DataFile {
        name: PathBuf,
    },

    /// Print host:port formatted for a URL
    HostPort {
        host: String,
        port: u16,
    },
}

fn load_settings(args: &Args) -> Result<Settings> {
    let mut settings = match &args.config {
        Some(path) => load_config(path)
            .with_context(|| format!("Failed to load config from {:?}", path))?,
        None => {
            let path = default_config_path();
            load_config_or_default(&path)
                .with_context(|| format!("Failed to load config from {:?}", path))?
        }
    };

    if let Some(shell) = &args.shell {
        settings.shell = shell.clone();
    }
    if let Some(data_dir) = &args.data_dir {
        settings.data_dir = data_dir.clone();
    }

    debug!(?settings, "Settings resolved");
    Ok(settings)
}

/// Stream `command` to stdout, killing it after `max_lines` lines
fn run_streaming(runner: &CommandRunner, command: &str, max_lines: Option<usize>) -> Result<()> {
    let cmd = runner
        .stream(command)
        .with_context(|| format!("Failed to start {:?}", command))?;
    info!(pid = cmd.pid(), command = %command, "Command started");

    let mut stdout = std::io::stdout().lock();
    let mut produced = 0;
    while let Some(line) = cmd.next_line()? {
        stdout.write_all(line.as_bytes())?;
        stdout.flush()?;
        produced += 1;

        if max_lines.is_some_and(|max| produced >= max) {
            info!(lines = produced, "Line limit reached, killing command");
            cmd.kill()?;
        }
    }

    info!(lines = produced, code = ?cmd.exit_code(), "Command finished");
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    debug!(version = env!("CARGO_PKG_VERSION"), "ips-run starting");

    let settings = load_settings(&args)?;
    let runner = CommandRunner::new(settings.shell.clone());

    match &args.command {
        Cmd::Run { command, max_lines } => run_streaming(&runner, command, *max_lines)?,
        Cmd::Call { command } => {
            let output = runner.call(command.as_str())?;
            print!("{}", output);
        }
        Cmd::Addrs { dev } => {
            for addr in network_addresses(&runner, dev.as_deref(), &settings.default_device)? {
                println!("{}", addr);
            }
        }
        Cmd::DataDir => println!("{}", settings.data_dir.display()),
        Cmd::DataFile { name } => println!("{}", data_file_in(&settings.data_dir, name).display()),
        Cmd::HostPort { host, port } => println!("{}", host_port_for_url(host, port)),
    }

    Ok(())
}
