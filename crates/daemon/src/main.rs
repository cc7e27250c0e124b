//! suiterun daemon
//!
//! Executes UI test suites against a remote WebDriver endpoint.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use suiterun_browser::{Command, WebDriverProvider};
use suiterun_common::{InMemoryStore, RunRecordStore, RunStatus};
use suiterun_daemon::{
    suite_file, DaemonConfig, ExecuteOptions, LoggingProvisioner, NotificationGateway,
    Orchestrator,
};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "suiterund")]
#[command(about = "suiterun daemon - UI test suite execution")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "suiterun.toml", global = true)]
    config: PathBuf,

    /// WebDriver endpoint (overrides config and SELENIUM_URL)
    #[arg(long, global = true)]
    webdriver: Option<String>,

    /// Base URL for relative navigate targets
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a suite file and wait for the result
    Run {
        /// Suite document (.json, otherwise YAML)
        suite: PathBuf,

        /// Environment to run against instead of the suite's own
        #[arg(short, long)]
        environment: Option<String>,
    },

    /// Show how each step of a suite file would be interpreted
    Parse {
        suite: PathBuf,
    },

    /// Print the effective configuration
    Config {
        /// Also save it to this path
        #[arg(long)]
        write: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let mut config = DaemonConfig::load(&cli.config)?;
    config.apply_env()?;
    if let Some(endpoint) = cli.webdriver {
        config.webdriver.endpoint = endpoint;
    }
    if let Some(base_url) = cli.base_url {
        config.webdriver.base_url = base_url;
    }

    match cli.command {
        Commands::Run { suite, environment } => run(config, suite, environment).await,
        Commands::Parse { suite } => parse(suite),
        Commands::Config { write } => {
            print!("{}", toml::to_string_pretty(&config)?);
            if let Some(path) = write {
                config.save(&path)?;
                info!("Configuration written to {}", path.display());
            }
            Ok(())
        }
    }
}

async fn run(
    config: DaemonConfig,
    suite: PathBuf,
    environment: Option<String>,
) -> anyhow::Result<()> {
    info!("suiterun daemon v{}", env!("CARGO_PKG_VERSION"));

    let draft = suite_file::load(&suite)?;
    let store: Arc<dyn RunRecordStore> = Arc::new(InMemoryStore::new());
    let suite = store.create_suite(draft)?;

    let gateway = NotificationGateway::new(&config.integrations);
    let orchestrator = Orchestrator::new(
        &config,
        store.clone(),
        Arc::new(WebDriverProvider::new()?),
        Arc::new(LoggingProvisioner::new(gateway.clone())),
        gateway.clone(),
    );

    let options = ExecuteOptions { environment };
    let handle = orchestrator.execute_suite(&suite.id, options)?;
    let run_id = handle.id().to_string();

    tokio::select! {
        result = handle.join() => {
            if let Err(e) = result {
                error!("Run task failed: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal, abandoning run {}", run_id);
            return Ok(());
        }
    }

    let run = store
        .get_run(&run_id)?
        .ok_or_else(|| anyhow::anyhow!("run {} vanished", run_id))?;
    println!("{}", serde_json::to_string_pretty(&run)?);
    info!("Report: {}", run.report_url(&config.report_base_url));
    if gateway.failed_deliveries() > 0 {
        info!("{} notification deliveries failed", gateway.failed_deliveries());
    }

    if run.status != RunStatus::Passed {
        std::process::exit(1);
    }
    Ok(())
}

fn parse(suite: PathBuf) -> anyhow::Result<()> {
    let draft = suite_file::load(&suite)?;
    println!("{}", draft.name);
    for case in draft.test_cases.unwrap_or_default() {
        let marker = if case.active { "" } else { " (inactive)" };
        println!("  {}{}", case.name, marker);
        for raw in case.steps.iter().filter(|s| !s.trim().is_empty()) {
            println!("    {:<40} {:?}", raw, Command::parse(raw));
        }
    }
    Ok(())
}
