use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use api_ingress::{ApiIngress, ApiIngressConfig};
use clap::{Parser, Subcommand};
use resources::{BackendKind, ResourcesConfig};
use runtime::{AppConfig, CliArgs};
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;

/// Cloud Gateway - REST front door of the multi-cloud orchestration engine
#[derive(Parser)]
#[command(name = "gateway-server")]
#[command(about = "Cloud Gateway - REST front door of the multi-cloud orchestration engine")]
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

    /// Serve from the in-memory orchestration backend
    #[arg(long)]
    mock: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the server
    Run,
    /// Check configuration, contract and routes, then exit
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

    let mut config = AppConfig::load_or_default(cli.config.as_deref())?;
    config.apply_cli_overrides(&args);

    let logging_config = config.logging.clone().unwrap_or_default();
    runtime::logging::init_logging_from_config(&logging_config, config.home_dir());
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Cloud Gateway starting");

    if cli.print_config {
        println!("{}", config.to_yaml()?);
        return Ok(());
    }

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run_server(&config, &args).await,
        Commands::Check => check_config(&config, &args),
    }
}

/// A module section, strictly parsed when present and defaulted when absent.
fn section<T: DeserializeOwned + Default>(config: &AppConfig, module: &str) -> Result<T> {
    if config.modules.contains_key(module) {
        config.module_config_required(module)
    } else {
        Ok(T::default())
    }
}

fn ingress_config(config: &AppConfig, args: &CliArgs) -> Result<ApiIngressConfig> {
    let mut cfg = if config.modules.contains_key("api_ingress") {
        config.module_config_required::<ApiIngressConfig>("api_ingress")?
    } else {
        ApiIngressConfig {
            bind_addr: format!("{}:{}", config.server.host, config.server.port),
            ..ApiIngressConfig::default()
        }
    };
    if let Some(port) = args.port {
        cfg.bind_addr = with_port(&cfg.bind_addr, port);
    }
    Ok(cfg)
}

/// `host:port` with the port replaced; an address without one gains it.
fn with_port(bind_addr: &str, port: u16) -> String {
    let host = match bind_addr.rsplit_once(':') {
        Some((host, tail)) if !tail.contains(']') => host,
        _ => bind_addr,
    };
    format!("{host}:{port}")
}

fn resources_config(config: &AppConfig, args: &CliArgs) -> Result<ResourcesConfig> {
    let mut cfg: ResourcesConfig = section(config, "resources")?;
    if args.mock {
        cfg.backend = BackendKind::Memory;
    }
    Ok(cfg)
}

/// Load the contract and assemble the ingress. Every startup check happens here.
fn build_gateway(config: &AppConfig, args: &CliArgs) -> Result<ApiIngress> {
    let ingress_cfg = ingress_config(config, args)?;
    let resources_cfg = resources_config(config, args)?;

    let registry = Arc::new(resources::contract_registry().context("loading the v1 contract")?);
    tracing::info!(schemas = registry.schemas().count(), "contract loaded");

    let client = resources::build_client(&resources_cfg, registry.clone())?;
    let table = resources::build_operation_table(registry.clone(), client)?;
    Ok(ApiIngress::new(ingress_cfg, registry, table))
}

async fn run_server(config: &AppConfig, args: &CliArgs) -> Result<()> {
    let gateway = Arc::new(build_gateway(config, args)?);

    let cancel = CancellationToken::new();
    let mut server = tokio::spawn(gateway.serve(cancel.clone()));

    tokio::select! {
        res = runtime::wait_for_shutdown() => {
            res?;
            cancel.cancel();
        }
        // Only reached when binding or serving failed.
        joined = &mut server => {
            return joined.context("server task panicked")?;
        }
    }

    let result = server.await.context("server task panicked")?;
    tracing::info!("Cloud Gateway stopped");
    result
}

fn check_config(config: &AppConfig, args: &CliArgs) -> Result<()> {
    tracing::info!("Checking configuration...");
    let gateway = build_gateway(config, args)?;
    gateway
        .config()
        .bind_addr
        .parse::<std::net::SocketAddr>()
        .with_context(|| format!("invalid bind address '{}'", gateway.config().bind_addr))?;
    gateway.build_router()?;

    println!("Configuration check passed");
    println!(
        "{} operations, serving on {}",
        gateway.dispatcher().table().len(),
        gateway.config().bind_addr
    );
    println!("{}", config.to_yaml()?);
    Ok(())
}
