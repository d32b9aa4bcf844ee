use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use poller_wrapper::broker::LocalWorkerPool;
use poller_wrapper::config::RunConfig;
use poller_wrapper::dispatch::{JobDispatcher, Operation, ResultAggregator, RunSummary};
use poller_wrapper::error::{PollerError, Result};
use poller_wrapper::inventory::{Host, HostSource, MySqlInventory};
use poller_wrapper::resolve::{resolve, Resolution};
use poller_wrapper::shutdown;
use poller_wrapper::worker::WorkerExecutor;

#[derive(Parser, Debug)]
#[command(name = "poller-wrapper")]
#[command(version)]
#[command(about = "Distributed poller/discovery utility for network device fleets")]
struct Args {
    /// MySQL server holding the device inventory
    #[arg(short = 'd', long, value_name = "HOST")]
    dbhost: String,

    /// Operation to run against every active host
    #[arg(short = 'o', long, value_parser = parse_operation)]
    operation: Operation,

    /// Enables verbose output
    #[arg(short = 'v', long)]
    verbose: bool,

    /// MySQL client default file
    #[arg(
        short = 'f',
        long = "defaultfile",
        value_name = "FILE",
        default_value = "~/.my.cnf"
    )]
    defaultfile: String,

    /// Run against a single named host instead of the whole fleet
    #[arg(long, value_name = "NAME")]
    host: Option<String>,

    /// Summary output format
    #[arg(long, value_enum, default_value = "table")]
    output: OutputFormat,
}

#[derive(Debug, Clone, clap::ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

fn parse_operation(s: &str) -> Result<Operation> {
    s.parse()
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let default_filter = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();

    if let Err(e) = run(args).await {
        tracing::error!(error = %e, "run aborted");
        std::process::exit(exit_code_for(&e));
    }
}

async fn run(args: Args) -> Result<()> {
    let credentials_file = expand_home(&args.defaultfile);
    // Validated up front: a bad credentials file must fail before any
    // inventory connection is attempted.
    check_readable(&credentials_file)?;

    let config = Arc::new(RunConfig {
        db_host: args.dbhost,
        credentials_file,
        ..RunConfig::default()
    });

    let inventory = MySqlInventory::connect(&config).await?;
    let hosts = select_hosts(&inventory, args.host.as_deref()).await?;
    if hosts.is_empty() {
        tracing::info!("no active hosts in inventory, nothing to do");
        return Ok(());
    }

    let executor = WorkerExecutor::new(config.clone());
    let pool = LocalWorkerPool::new(executor, config.result_ttl);
    let pool = Arc::new(match config.max_concurrency {
        Some(max_jobs) => pool.with_concurrency(max_jobs),
        None => pool,
    });

    let dispatcher = JobDispatcher::new(pool.clone(), config.job_time_limit);
    let group = dispatcher.submit(&hosts, args.operation).await?;
    tracing::info!(
        jobs = group.len(),
        operation = %args.operation,
        "job group submitted, waiting for results"
    );

    let cancel = shutdown::install_shutdown_handler();
    let aggregator = ResultAggregator::new(pool);
    let summary = aggregator
        .collect(&group, config.collect_deadline, &cancel, |job_id, result| {
            if result.is_success() {
                tracing::info!(job_id = %job_id, "job completed successfully");
            } else {
                tracing::info!(
                    job_id = %job_id,
                    outcome = %result.outcome,
                    exit_code = result.exit_code,
                    "job finished"
                );
            }
        })
        .await;

    report(&summary, &args.output)
}

/// Whole fleet by default; one inventory host when `--host` is given.
async fn select_hosts(inventory: &dyn HostSource, single: Option<&str>) -> Result<Vec<Host>> {
    match single {
        None => inventory.fetch_ordered_hosts().await,
        Some(name) => match inventory.host_id_by_name(name).await? {
            Some(device_id) => Ok(vec![Host::new(device_id, name)]),
            None => {
                match resolve(name).await {
                    Resolution::Resolved(ip) => {
                        tracing::error!(host = name, ip = %ip, "host resolves in DNS but is not in the inventory");
                    }
                    Resolution::NotFound => {
                        tracing::error!(host = name, "host not found in inventory or DNS");
                    }
                }
                Err(PollerError::HostNotFound(name.to_string()))
            }
        },
    }
}

fn report(summary: &RunSummary, format: &OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => {
            tracing::info!(
                "{} jobs submitted and {} jobs completed",
                summary.submitted_count,
                summary.completed_count
            );
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(summary)?);
        }
    }
    Ok(())
}

fn exit_code_for(err: &PollerError) -> i32 {
    match err {
        PollerError::Credentials(_) | PollerError::DataSource(_) => 2,
        _ => 1,
    }
}

fn expand_home(path: &str) -> PathBuf {
    match path.strip_prefix("~/") {
        Some(rest) => match std::env::var_os("HOME") {
            Some(home) => PathBuf::from(home).join(rest),
            None => PathBuf::from(path),
        },
        None => PathBuf::from(path),
    }
}

fn check_readable(path: &Path) -> Result<()> {
    std::fs::File::open(path)
        .map(|_| ())
        .map_err(|_| PollerError::Credentials(path.to_path_buf()))
}
