use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use mimalloc::MiMalloc;
use runtime::{AppConfig, AppConfigProvider, CliArgs, DatabaseConfig};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

// Adapter to make AppConfigProvider implement modkit::ConfigProvider
struct ModkitConfigAdapter(AppConfigProvider);

impl modkit::ConfigProvider for ModkitConfigAdapter {
    fn get_module_config(&self, module_name: &str) -> Option<&serde_json::Value> {
        self.0.get_module_config(module_name)
    }
}

use modkit::runtime::{run, DbOptions, RunOptions, ShutdownOptions};
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

const MEMORY_DSN: &str = "sqlite::memory:";

/// Every module compiled into the server, in no particular order; the
/// registry sorts them by their declared dependencies.
fn modules() -> Vec<modkit::Registrator> {
    vec![
        api_ingress::register as modkit::Registrator,
        auth::register,
        persons::register,
    ]
}

/// Expand a sqlite DSN into an absolute-path DSN using a base directory.
/// - Keeps "sqlite::memory:" as-is.
/// - Normalizes backslashes into forward slashes (important on Windows).
/// - Adds `mode=rwc` when no query is given so the file is created on first start.
fn absolutize_sqlite_dsn(dsn: &str, base_dir: &Path, create_dirs: bool) -> Result<String> {
    if dsn.eq_ignore_ascii_case(MEMORY_DSN) || dsn.eq_ignore_ascii_case("sqlite://:memory:") {
        return Ok(MEMORY_DSN.to_string());
    }
    let db_path = dsn
        .strip_prefix("sqlite://")
        .ok_or_else(|| anyhow!("DSN must start with sqlite:// (got: {})", dsn))?;

    let (path_str, query) = match db_path.split_once('?') {
        Some((p, q)) => (p, Some(q)),
        None => (db_path, None),
    };

    let mut p = PathBuf::from(path_str);
    if p.as_os_str().is_empty() {
        return Err(anyhow!("Empty SQLite path in DSN"));
    }
    if p.is_relative() {
        p = base_dir.join(p);
    }

    if let Some(dir) = p.parent() {
        if create_dirs {
            std::fs::create_dir_all(dir)?;
        }
    }

    // Rebuild DSN with absolute path and normalized slashes
    let mut out = String::from("sqlite://");
    out.push_str(&p.to_string_lossy().replace('\\', "/"));
    out.push('?');
    out.push_str(query.unwrap_or("mode=rwc"));
    Ok(out)
}

/// Persons Server - person records behind a JWT-protected REST API
#[derive(Parser)]
#[command(name = "persons-server")]
#[command(about = "Persons Server - person records behind a JWT-protected REST API")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port for HTTP server (overrides config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Print current configuration and exit
    #[arg(long)]
    print_config: bool,

    /// Log verbosity level (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Use an in-memory SQLite database instead of the configured one
    #[arg(long)]
    mock: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the server
    Run,
    /// Check configuration
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // CLI args passed down to config/app
    let args = CliArgs {
        config: cli.config.as_ref().map(|p| p.to_string_lossy().to_string()),
        port: cli.port,
        print_config: cli.print_config,
        verbose: cli.verbose,
        mock: cli.mock,
    };

    // Load configuration (normalized home_dir is applied inside)
    let mut config = AppConfig::load_or_default(cli.config.as_deref())?;

    // Apply CLI overrides (port / verbosity / mock database)
    config.apply_cli_overrides(&args);

    // Print config and exit if requested; stdout stays plain YAML
    if cli.print_config {
        println!("{}", config.to_yaml()?);
        return Ok(());
    }

    let logging_config = config.logging.clone().unwrap_or_default();
    runtime::logging::init_logging_from_config(&logging_config, &config.home_dir());
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Persons Server starting");

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run_server(config).await,
        Commands::Check => check_config(&config),
    }
}

/// Only SQLite is wired into the ORM features of this build.
fn detect_backend(cfg: &DatabaseConfig) -> Result<&'static str> {
    let raw = cfg.url.trim();
    if raw.is_empty() {
        return Err(anyhow!("Database URL not configured"));
    }

    let url = Url::parse(raw).map_err(|e| anyhow!("Invalid database DSN '{}': {}", raw, e))?;

    match url.scheme() {
        "sqlite" => Ok("sqlite"),
        other => Err(anyhow!(
            "Unsupported database type: {} (only sqlite is supported)",
            other
        )),
    }
}

async fn connect_database(db_config: &DatabaseConfig, base_dir: &Path) -> Result<DatabaseConnection> {
    detect_backend(db_config)?;

    // Absolutize sqlite DSNs to avoid cwd issues
    let dsn = absolutize_sqlite_dsn(db_config.url.trim(), base_dir, true)?;
    let in_memory = dsn == MEMORY_DSN;

    let busy_timeout = Duration::from_millis(u64::from(db_config.busy_timeout_ms.unwrap_or(5000)));
    let mut opts = ConnectOptions::new(dsn.clone());
    opts.acquire_timeout(Duration::from_secs(5))
        .sqlx_logging(false)
        .map_sqlx_sqlite_opts(move |o| o.busy_timeout(busy_timeout));
    if in_memory {
        // Every pooled connection to :memory: would see its own empty database
        opts.max_connections(1).min_connections(1);
    } else {
        opts.max_connections(db_config.max_conns.unwrap_or(10));
    }

    tracing::info!("Connecting to database: {}", dsn);
    let db = Database::connect(opts).await?;
    tracing::info!(backend = ?db.get_database_backend(), "Connected to database");
    Ok(db)
}

async fn run_server(config: AppConfig) -> Result<()> {
    tracing::info!("Initializing modules...");

    let base_dir = config.home_dir();

    let db = match &config.database {
        Some(db_config) => DbOptions::Connection(connect_database(db_config, &base_dir).await?),
        None => {
            tracing::warn!("No database configuration found, running without database");
            DbOptions::None
        }
    };

    // Provide module configs to modkit
    let modules_cfg = Arc::new(ModkitConfigAdapter(AppConfigProvider::new(config)));

    run(RunOptions {
        modules_cfg,
        db,
        shutdown: ShutdownOptions::Signals,
        modules: modules(),
    })
    .await
}

fn check_config(config: &AppConfig) -> Result<()> {
    tracing::info!("Checking configuration...");

    // AppConfig::load_* already normalized & created home_dir
    if let Some(db_config) = &config.database {
        let backend = detect_backend(db_config)?;
        tracing::info!(backend, "Database configuration is valid");
    }

    tracing::info!("Configuration is valid");
    println!("Configuration check passed");
    println!("Server config:");
    println!("{}", config.to_yaml()?);

    Ok(())
}
