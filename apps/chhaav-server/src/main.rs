use anyhow::{anyhow, Context, Result};
use axum::Router;
use clap::{Parser, Subcommand};
use mimalloc::MiMalloc;
use modkit::{cancel_on_signal, Module, ModuleCtxBuilder, RestfulModule};
use runtime::{AppConfig, AppConfigProvider, CliArgs, DatabaseConfig};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

// Adapter to make AppConfigProvider implement modkit::ConfigProvider
struct ModkitConfigAdapter(AppConfigProvider);

impl modkit::ConfigProvider for ModkitConfigAdapter {
    fn get_module_config(&self, module_name: &str) -> Option<&serde_json::Value> {
        self.0.get_module_config(module_name)
    }
}

/// Chhaav Server - session & profile backend for the wellbeing companion app
#[derive(Parser)]
#[command(name = "chhaav-server")]
#[command(about = "Chhaav Server - session & profile backend for the wellbeing companion app")]
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

    /// Keep everything in memory: KV store and identity provider
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

    let args = CliArgs {
        config: cli.config.as_ref().map(|p| p.to_string_lossy().to_string()),
        port: cli.port,
        print_config: cli.print_config,
        verbose: cli.verbose,
        mock: cli.mock,
    };

    // Load configuration (normalized home_dir is applied inside)
    let mut config = AppConfig::load_or_default(cli.config.as_deref())?;
    config.apply_cli_overrides(&args);
    apply_module_overrides(&mut config, &args);

    let logging_config = config.logging.clone().unwrap_or_default();
    runtime::logging::init_logging_from_config(&logging_config, Path::new(&config.server.home_dir));
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Chhaav Server starting");

    if cli.print_config {
        println!("{}", config.to_redacted_yaml()?);
        return Ok(());
    }

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run_server(config, args).await,
        Commands::Check => check_config(&config, &args),
    }
}

/// Push process-level settings down into the module bag.
fn apply_module_overrides(config: &mut AppConfig, args: &CliArgs) {
    let has_bind_addr = config
        .modules
        .get(api_ingress::MODULE_NAME)
        .and_then(|m| m.get("bind_addr"))
        .is_some();
    if !has_bind_addr || args.port.is_some() {
        let addr = format!("{}:{}", config.server.host, config.server.port);
        config.set_module_value(api_ingress::MODULE_NAME, &["bind_addr"], addr.into());
    }

    if args.mock {
        config.set_module_value(
            session_profile::MODULE_NAME,
            &["kv", "backend"],
            "memory".into(),
        );
        config.set_module_value(
            session_profile::MODULE_NAME,
            &["identity", "provider"],
            "memory".into(),
        );
    }
}

async fn connect_db(db: &DatabaseConfig, base_dir: &Path) -> Result<SqlitePool> {
    let url = db.absolutize_sqlite_url(base_dir, true)?;
    let mut opts = SqliteConnectOptions::from_str(&url)
        .with_context(|| format!("invalid database.url '{}'", db.url))?
        .create_if_missing(true);
    if let Some(ms) = db.busy_timeout_ms {
        opts = opts.busy_timeout(Duration::from_millis(u64::from(ms)));
    }

    // Every connection to sqlite::memory: is its own database
    let max_conns = if url == "sqlite::memory:" {
        1
    } else {
        db.max_conns.unwrap_or(10)
    };

    tracing::info!("Connecting to database: {}", url);
    SqlitePoolOptions::new()
        .max_connections(max_conns)
        .acquire_timeout(Duration::from_secs(5))
        .connect_with(opts)
        .await
        .with_context(|| format!("connecting to {url}"))
}

async fn run_server(config: AppConfig, args: CliArgs) -> Result<()> {
    tracing::info!("Initializing modules...");

    let cancel = CancellationToken::new();
    let signals = cancel_on_signal(cancel.clone());

    let pool = match (&config.database, args.mock) {
        (_, true) => {
            tracing::info!("--mock: running without database");
            None
        }
        (Some(db), false) => {
            Some(connect_db(db, Path::new(&config.server.home_dir)).await?)
        }
        (None, false) => {
            tracing::warn!("No database configuration found, running without database");
            None
        }
    };

    let provider = Arc::new(ModkitConfigAdapter(AppConfigProvider::new(&config)));
    let mut builder = ModuleCtxBuilder::new(cancel.clone()).with_config_provider(provider);
    if let Some(pool) = &pool {
        builder = builder.with_db(pool.clone());
    }
    let ctx = builder.build();

    let ingress = api_ingress::ApiIngress::default();
    ingress.init(&ctx.for_module(api_ingress::MODULE_NAME)).await?;

    let session_profile = session_profile::SessionProfile::default();
    let sp_ctx = ctx.for_module(session_profile::MODULE_NAME);
    session_profile.init(&sp_ctx).await?;

    let routes = session_profile.register_rest(&sp_ctx, Router::new(), &ingress)?;
    ingress.finalize(routes)?;

    let served = ingress.serve(cancel.clone()).await;

    cancel.cancel();
    signals.abort();
    if let Some(pool) = pool {
        pool.close().await;
    }
    tracing::info!("Chhaav Server stopped");
    served
}

fn check_config(config: &AppConfig, args: &CliArgs) -> Result<()> {
    tracing::info!("Checking configuration...");

    let ingress: api_ingress::ApiIngressConfig = module_section(config, api_ingress::MODULE_NAME)?;
    ingress
        .bind_addr
        .parse::<std::net::SocketAddr>()
        .map_err(|e| anyhow!("invalid bind address '{}': {e}", ingress.bind_addr))?;

    let sp: session_profile::config::SessionProfileConfig =
        module_section(config, session_profile::MODULE_NAME)?;
    if !args.mock && sp.kv.backend == session_profile::config::KvBackend::Sqlite {
        let db = config
            .database
            .as_ref()
            .ok_or_else(|| anyhow!("kv.backend = sqlite requires a database section"))?;
        db.absolutize_sqlite_url(Path::new(&config.server.home_dir), false)?;
    }

    tracing::info!("Configuration is valid");
    println!("Configuration check passed");
    println!("{}", config.to_redacted_yaml()?);
    Ok(())
}

fn module_section<T>(config: &AppConfig, name: &str) -> Result<T>
where
    T: serde::de::DeserializeOwned + Default,
{
    match config.modules.get(name) {
        Some(v) => serde_json::from_value(v.clone())
            .with_context(|| format!("invalid configuration for module '{name}'")),
        None => Ok(T::default()),
    }
}
