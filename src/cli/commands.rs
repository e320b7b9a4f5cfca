use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use http::Method;
use tracing::info;

use crate::config::AppConfig;
use crate::controllers::{records_tree, sample_catalog};
use crate::dispatcher::{DispatchRequest, Dispatcher};
use crate::logging::{init_logging, LogConfig};
use crate::middleware::{MetricsMiddleware, TracingMiddleware};
use crate::resource::ResourceNode;
use crate::runtime_config::RuntimeConfig;
use crate::server::{AppService, HttpServer};

/// Command-line interface for resttree
///
/// Serves one of the bundled resource trees, or inspects how it resolves requests.
#[derive(Parser)]
#[command(name = "resttree")]
#[command(about = "Resource-tree URL dispatcher", long_about = None)]
pub struct Cli {
    /// YAML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Serve a resource tree over HTTP
    Serve {
        /// Address and port to bind to (overrides `http.addr` from the config file)
        #[arg(long)]
        addr: Option<String>,

        /// Resource tree to serve
        #[arg(long, value_enum, default_value_t = Sample::Catalog)]
        sample: Sample,
    },
    /// Print the resource tree
    Routes {
        #[arg(long, value_enum, default_value_t = Sample::Catalog)]
        sample: Sample,
    },
    /// Resolve a single request without serving it and print the chosen handler
    Resolve {
        /// HTTP verb
        #[arg(short, long, default_value = "GET")]
        method: String,

        /// Request target, optionally with a query string
        path: String,

        #[arg(long, value_enum, default_value_t = Sample::Catalog)]
        sample: Sample,
    },
}

/// Bundled resource trees.
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum Sample {
    /// REST root over two in-memory records
    Records,
    /// Authors, nested books, records, shelves and legacy URLs
    Catalog,
}

impl Sample {
    /// Build the tree.
    ///
    /// # Errors
    ///
    /// Fails if the bundled declaration is inconsistent.
    pub fn build(self) -> Result<Arc<ResourceNode>> {
        let tree = match self {
            Sample::Records => records_tree(),
            Sample::Catalog => sample_catalog(),
        };
        tree.context("failed to build resource tree")
    }
}

fn load_config(path: Option<&PathBuf>) -> Result<AppConfig> {
    match path {
        Some(path) => AppConfig::load(path),
        None => Ok(AppConfig::default()),
    }
}

/// Execute the command line given to the process.
///
/// # Errors
///
/// Returns an error if the configuration cannot be loaded, logging cannot be
/// initialised, the resource tree is inconsistent, or the server fails to bind.
pub fn run_cli() -> Result<()> {
    run(Cli::parse())
}

/// Execute an already parsed command line.
///
/// # Errors
///
/// See [`run_cli`].
pub fn run(cli: Cli) -> Result<()> {
    let config = load_config(cli.config.as_ref())?;
    match cli.command {
        Commands::Serve { addr, sample } => serve(&config, addr, sample),
        Commands::Routes { sample } => {
            print!("{}", sample.build()?.describe());
            Ok(())
        }
        Commands::Resolve {
            method,
            path,
            sample,
        } => {
            let method = Method::from_bytes(method.to_ascii_uppercase().as_bytes())
                .with_context(|| format!("invalid HTTP method '{method}'"))?;
            let dispatcher = Dispatcher::new(sample.build()?).with_config(config.dispatch);
            let request = DispatchRequest::new(method, &path);
            match dispatcher.resolve(&request) {
                Ok(resolved) => {
                    println!(
                        "{} {} -> {} at /{} args={:?} rest={:?}",
                        resolved.method,
                        request.path,
                        resolved.handler.name(),
                        resolved.trail,
                        resolved.args.positional(),
                        resolved.args.rest,
                    );
                }
                Err(err) => println!("{} {}: {err}", err.status(), request.path),
            }
            Ok(())
        }
    }
}

fn serve(config: &AppConfig, addr: Option<String>, sample: Sample) -> Result<()> {
    let log_config = LogConfig::from_env().merged_with(&config.logging);
    init_logging(&log_config)?;
    RuntimeConfig::from_env().apply();

    let mut dispatcher = Dispatcher::new(sample.build()?).with_config(config.dispatch.clone());
    dispatcher.add_middleware(Arc::new(TracingMiddleware));
    let metrics = Arc::new(MetricsMiddleware::new());
    if config.http.metrics_endpoint {
        dispatcher.add_middleware(metrics.clone());
    }

    let mut service = AppService::new(Arc::new(dispatcher));
    service.set_health_endpoint(config.http.health_endpoint);
    if config.http.metrics_endpoint {
        service.set_metrics_middleware(metrics);
    }

    let addr = addr.unwrap_or_else(|| config.http.addr.clone());
    let handle = HttpServer(service)
        .start(addr.as_str())
        .with_context(|| format!("failed to bind {addr}"))?;
    handle
        .wait_ready(config.http.ready_timeout())
        .with_context(|| format!("server on {addr} did not become ready"))?;
    info!(addr = %handle.addr(), sample = ?sample, "Server listening");
    handle
        .join()
        .map_err(|_| anyhow::anyhow!("server thread panicked"))?;
    Ok(())
}
