//! ZeroByte - share files over IPFS, scanned for malware
//!
//! Uploads files to an IPFS node and downloads them by CID, checking
//! content with VirusTotal before it is kept on disk.

use clap::{Parser, Subcommand};
use owo_colors::OwoColorize;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;
use zerobyte_cli::OutputFormat;
use zerobyte_core::address::NodeAddress;
use zerobyte_core::config::Config;
use zerobyte_core::error::exit_codes;

mod commands;
mod session;

use commands::{Context, config as config_cmd, download, login, logout, scan, status, upload, whoami};
use session::SessionStore;

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: &str = "5001";

/// Share files over IPFS with malware scanning
#[derive(Parser)]
#[command(name = "zerobyte")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Configuration file (default: ./.zerobyte.toml, ./zerobyte.toml, then the user config dir)
    #[arg(short, long, global = true, env = "ZEROBYTE_CONFIG")]
    config: Option<PathBuf>,

    /// IPFS node multiaddr, e.g. /ip4/192.168.1.10/tcp/5001
    #[arg(long, global = true, conflicts_with_all = ["host", "port"])]
    node: Option<String>,

    /// IPFS node host (IPv4, IPv6 or DNS name)
    #[arg(long, global = true)]
    host: Option<String>,

    /// IPFS node API port
    #[arg(long, global = true)]
    port: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in (or create an account)
    Login(login::LoginArgs),

    /// Forget the stored session
    Logout,

    /// Show the signed-in user
    Whoami,

    /// Check whether the IPFS node is online
    Status {
        /// Include node version, service configuration and session details
        #[arg(short, long)]
        detailed: bool,
    },

    /// Upload a file to IPFS
    Upload {
        /// File to upload
        file: PathBuf,

        /// Scan the file with VirusTotal before uploading
        #[arg(short, long)]
        scan: bool,

        /// Upload even if the scan flags the file
        #[arg(long)]
        force: bool,
    },

    /// Download content by CID, scanning it before it is saved
    Download {
        /// Content identifier (CIDv0 `Qm...` or CIDv1 `b...`)
        cid: String,

        /// Destination file (default: ./<cid>)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Save without scanning
        #[arg(long)]
        skip_scan: bool,

        /// Overwrite the destination and keep flagged files without asking
        #[arg(long)]
        force: bool,
    },

    /// Scan a local file with VirusTotal
    Scan {
        /// File to scan
        file: PathBuf,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration (API keys masked)
    Show,

    /// Write a configuration file with default values
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Print the configuration file location
    Path,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.format);

    let code = match run(cli).await {
        Ok(code) => code,
        Err((e, format)) => report_error(&e, format),
    };

    ExitCode::from(u8::try_from(code).unwrap_or(1))
}

fn init_tracing(verbose: bool, format: OutputFormat) {
    let default_filter = if verbose {
        "zerobyte=debug,zerobyte_api_client=debug,zerobyte_core=debug"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr);

    if format == OutputFormat::Json {
        builder.json().init();
    } else {
        builder.with_target(verbose).init();
    }
}

async fn run(cli: Cli) -> Result<i32, (anyhow::Error, OutputFormat)> {
    let format = cli.format;
    dispatch(cli).await.map_err(|e| (e, format))
}

async fn dispatch(cli: Cli) -> anyhow::Result<i32> {
    // `config init` must work even when the existing file is broken
    if let Commands::Config {
        action: ConfigAction::Init { force },
    } = cli.command
    {
        return config_cmd::init(cli.config.as_deref(), force, cli.format);
    }

    let ctx = Context {
        config: Config::load(cli.config.as_deref())?,
        node: resolve_node(cli.node.as_deref(), cli.host.as_deref(), cli.port.as_deref())?,
        format: cli.format,
        sessions: SessionStore::new(
            SessionStore::default_location().unwrap_or_else(|| PathBuf::from(".zerobyte-session.json")),
        ),
    };

    match cli.command {
        Commands::Login(args) => login::run(&ctx, args).await,
        Commands::Logout => logout::run(&ctx),
        Commands::Whoami => whoami::run(&ctx),
        Commands::Status { detailed } => status::run(&ctx, detailed).await,
        Commands::Upload { file, scan, force } => upload::run(&ctx, &file, scan, force).await,
        Commands::Download {
            cid,
            output,
            skip_scan,
            force,
        } => download::run(&ctx, &cid, output, skip_scan, force).await,
        Commands::Scan { file } => scan::run(&ctx, &file).await,
        Commands::Config { action } => match action {
            ConfigAction::Show => config_cmd::show(&ctx),
            ConfigAction::Path => config_cmd::path(&ctx),
            ConfigAction::Init { force } => config_cmd::init(cli.config.as_deref(), force, ctx.format),
        },
    }
}

/// Node from `--node`, else from `--host`/`--port`
///
/// `None` leaves the choice to the environment and configuration file.
fn resolve_node(node: Option<&str>, host: Option<&str>, port: Option<&str>) -> zerobyte_core::Result<Option<NodeAddress>> {
    if let Some(addr) = node {
        return NodeAddress::parse(addr).map(Some);
    }
    if host.is_none() && port.is_none() {
        return Ok(None);
    }

    NodeAddress::from_host_port(host.unwrap_or(DEFAULT_HOST), port.unwrap_or(DEFAULT_PORT)).map(Some)
}

fn report_error(err: &anyhow::Error, format: OutputFormat) -> i32 {
    let code = commands::exit_code_for(err);

    if format == OutputFormat::Json {
        let report = serde_json::json!({
            "success": false,
            "error": {
                "code": commands::error_code_for(err).to_string(),
                "message": commands::render_error(err),
            },
        });
        println!("{report}");
    } else {
        eprintln!("{} {}", "Error:".red().bold(), commands::render_error(err));
    }

    if code == exit_codes::SUCCESS { exit_codes::FAILURE } else { code }
}
