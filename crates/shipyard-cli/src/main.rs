//! Shipyard - deploy GraphQL services to a cluster
//!
//! Usage:
//!   shipyard deploy              # Deploy the service in ./shipyard.toml
//!   shipyard deploy --dry-run    # Show the changes without applying them
//!   shipyard info                # Show where the service is reachable

mod interactive;
mod output;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use console::style;
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use shipyard_core::client::GraphqlConnector;
use shipyard_core::cluster::ClusterEnvironment;
use shipyard_core::deploy::poller::DEFAULT_MAX_WAIT;
use shipyard_core::deploy::{
    ArtifactGenerator, DefinitionSeeder, DeployCommand, DeployOptions, load_definition,
};
use shipyard_core::error::DeployError;
use shipyard_core::info::{ServiceInfo, service_info};
use shipyard_core::process::SystemProcessRunner;

use crate::interactive::{DialoguerEndpointDialog, PromptAuthenticator};
use crate::output::ConsoleOutput;

#[derive(Parser)]
#[command(name = "shipyard")]
#[command(about = "Deploy GraphQL services to a cluster", version, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Deploy service changes (or new service)
    Deploy(DeployArgs),

    /// Display service information (endpoints, cluster, ...)
    Info(InfoArgs),
}

#[derive(Args)]
struct DeployArgs {
    /// Accept data loss caused by schema changes
    #[arg(short, long)]
    force: bool,

    /// Force interactive mode to select the cluster
    #[arg(short, long = "new")]
    new: bool,

    /// Perform a dry run of the deployment
    #[arg(short, long)]
    dry_run: bool,

    /// Disable seed on initial service deploy
    #[arg(long)]
    no_seed: bool,

    /// Disable migrations. Available since 1.26
    #[arg(long)]
    no_migrate: bool,

    /// Disable implicit client generation
    #[arg(long)]
    no_generate: bool,

    /// Skip post-deploy hooks
    #[arg(long)]
    skip_hooks: bool,

    /// Path to .env file to inject env vars
    #[arg(short, long, value_name = "PATH")]
    env_file: Option<PathBuf>,

    /// Path to the service definition
    #[arg(short, long, default_value = "shipyard.toml")]
    project: PathBuf,

    /// Print a JSON summary on stdout
    #[arg(short, long)]
    json: bool,

    /// Give up waiting for the migration after this many seconds (0 waits forever)
    #[arg(long, value_name = "SECS")]
    migration_timeout: Option<u64>,
}

impl DeployArgs {
    fn options(&self) -> DeployOptions {
        DeployOptions::new()
            .with_force(self.force)
            .with_interactive(self.new)
            .with_dry_run(self.dry_run)
            .with_no_seed(self.no_seed)
            .with_no_migrate(self.no_migrate)
            .with_no_generate(self.no_generate)
            .with_skip_hooks(self.skip_hooks)
            .with_migration_timeout(migration_timeout(self.migration_timeout))
    }
}

#[derive(Args)]
struct InfoArgs {
    /// Path to .env file to inject env vars
    #[arg(short, long, value_name = "PATH")]
    env_file: Option<PathBuf>,

    /// Path to the service definition
    #[arg(short, long, default_value = "shipyard.toml")]
    project: PathBuf,

    /// Print the information as JSON
    #[arg(short, long)]
    json: bool,

    /// Also print the service secret
    #[arg(short, long)]
    secret: bool,
}

fn migration_timeout(secs: Option<u64>) -> Option<Duration> {
    match secs {
        None => Some(DEFAULT_MAX_WAIT),
        Some(0) => None,
        Some(secs) => Some(Duration::from_secs(secs)),
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // Logs go to stderr so `--json` output stays parseable
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "shipyard=warn,shipyard_core=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Deploy(args) => run_deploy(args).await,
        Commands::Info(args) => run_info(args).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => report_error(&err),
    }
}

fn report_error(err: &anyhow::Error) -> ExitCode {
    if let Some(deploy_err) = err.downcast_ref::<DeployError>() {
        if !deploy_err.is_reported() {
            eprintln!("{} {}", style("ERROR:").red().bold(), deploy_err);
        }
    } else {
        eprintln!("{} {:#}", style("ERROR:").red().bold(), err);
    }
    ExitCode::FAILURE
}

async fn run_deploy(args: DeployArgs) -> Result<()> {
    let mut store = load_definition(&args.project, args.env_file.as_deref())?;
    let mut env = ClusterEnvironment::from_default_location()?;
    let options = args.options();
    debug!("Loaded definition from {}", store.path().display());

    let connector = GraphqlConnector::new();
    let dialog = DialoguerEndpointDialog::new();
    let authenticator = PromptAuthenticator::new();
    let runner = SystemProcessRunner::in_dir(store.dir());
    let generator = ArtifactGenerator::new();
    let seeder = DefinitionSeeder::new(&runner, store.dir());
    let mut out = ConsoleOutput::new(args.json);

    let cmd = DeployCommand::new(
        &connector,
        &dialog,
        &authenticator,
        &runner,
        &generator,
        &seeder,
    );
    let outcome = cmd
        .execute(&mut store, &mut env, &options, &mut out)
        .await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    }

    Ok(())
}

async fn run_info(args: InfoArgs) -> Result<()> {
    let store = load_definition(&args.project, args.env_file.as_deref())?;
    let env = ClusterEnvironment::from_default_location()?;
    let connector = GraphqlConnector::new();

    let info = service_info(&store, &env, &connector, args.secret).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&info)?);
    } else {
        print_info(&info, store.path());
    }
    Ok(())
}

fn print_info(info: &ServiceInfo, definition: &Path) {
    println!(
        "{} {}",
        style("Service Name:").bold(),
        style(&info.name).cyan()
    );
    println!("  {}", style(definition.display()).dim());
    println!();

    let target = match &info.workspace {
        Some(ws) => format!("{}@{}/{}", info.stage, ws, info.cluster),
        None => format!("{}@{}", info.stage, info.cluster),
    };
    println!("  {}", style(target).bold());
    println!();
    println!("  HTTP:  {}", info.http_endpoint);
    println!("  WS:    {}", info.ws_endpoint);
    if let Some(admin) = &info.admin_endpoint {
        println!("  Admin: {}", admin);
    }
    if let Some(secret) = &info.secret {
        println!("  Secret: {}", secret);
    }
}
