//! Studio E2E - suite runner entry point

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tracing::info;

use studio_e2e::runner::Filter;
use studio_e2e::server::ServerProbe;
use studio_e2e::visual::{list_all_baselines, VisualTester};
use studio_e2e::{scenarios, Browser, HarnessConfig, PlaywrightSessions, SuiteRunner};

/// Studio end-to-end acceptance harness
#[derive(Parser)]
#[command(name = "studio-e2e")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Harness configuration file (YAML)
    #[arg(long, short, global = true, env = "STUDIO_E2E_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run scenarios against a live product
    Run(RunArgs),

    /// Re-capture visual baselines instead of comparing against them
    UpdateBaselines(RunArgs),

    /// List registered scenarios
    List(FilterArgs),
}

#[derive(Args, Clone)]
struct FilterArgs {
    /// Only scenarios whose name contains this (repeatable)
    #[arg(long = "filter")]
    names: Vec<String>,

    /// Only scenarios carrying this tag (repeatable)
    #[arg(long = "tag")]
    tags: Vec<String>,
}

impl FilterArgs {
    fn into_filter(self) -> Filter {
        Filter {
            names: self.names,
            tags: self.tags,
        }
    }
}

#[derive(Args, Clone)]
struct RunArgs {
    #[command(flatten)]
    filter: FilterArgs,

    /// Browser engine: chromium, firefox or webkit
    #[arg(long)]
    browser: Option<Browser>,

    /// Concurrent workers
    #[arg(long, short)]
    workers: Option<usize>,

    /// Product base URL
    #[arg(long)]
    base_url: Option<String>,

    /// Show the browser window
    #[arg(long)]
    headed: bool,

    /// Do not wait for the product to answer before running
    #[arg(long)]
    skip_probe: bool,
}

impl RunArgs {
    fn apply(&self, config: &mut HarnessConfig) {
        if let Some(browser) = self.browser {
            config.browser = browser;
        }
        if let Some(workers) = self.workers {
            config.workers = workers;
        }
        if let Some(base_url) = &self.base_url {
            config.base_url = base_url.trim_end_matches('/').to_string();
        }
        if self.headed {
            config.headless = false;
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));
    if cli.json_logs {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .init();
    }

    let mut config = HarnessConfig::load(cli.config.as_deref())
        .context("failed to load harness configuration")?;

    match cli.command {
        Commands::List(args) => {
            let suite = scenarios::suite();
            let filter = args.into_filter();
            for (group, scenario) in suite.list(&filter) {
                let mode = if group.is_shared() { "shared" } else { "isolated" };
                println!(
                    "{:<12} {:<40} [{}] {}",
                    group.name(),
                    scenario.name(),
                    scenario.tags().join(","),
                    mode
                );
            }
            let baselines = list_all_baselines(&config.visual.baseline_dir);
            println!(
                "\n{} visual baseline(s) in {}",
                baselines.len(),
                config.visual.baseline_dir.display()
            );
        }
        Commands::Run(args) => {
            args.apply(&mut config);
            let success = run(config, args).await?;
            if !success {
                std::process::exit(1);
            }
        }
        Commands::UpdateBaselines(args) => {
            args.apply(&mut config);
            config.visual.update_baselines = true;
            let tester = VisualTester::new(config.visual.clone(), config.browser, config.platform())?;
            tester.clean_diffs()?;
            run(config, args).await?;
            let names = tester.list_baselines()?;
            println!("✅ {} baseline(s) in group {}", names.len(), tester.group());
        }
    }

    Ok(())
}

async fn run(config: HarnessConfig, args: RunArgs) -> anyhow::Result<bool> {
    config.validate()?;
    if !args.skip_probe {
        ServerProbe::new()?
            .wait_until_ready(&config.base_url, config.timeouts.navigation())
            .await
            .with_context(|| format!("product at {} is not reachable", config.base_url))?;
    }

    let config = Arc::new(config);
    info!(
        "Running against {} with {} on {}",
        config.base_url,
        config.browser,
        config.platform().as_str()
    );
    let sessions = Arc::new(PlaywrightSessions::new(config.clone()));
    let runner = SuiteRunner::new(config.clone(), sessions).with_filter(args.filter.into_filter());

    let summary = runner.run(scenarios::suite()).await?;
    let path = runner.write_results(&summary)?;

    println!(
        "\n{} passed, {} failed, {} skipped in {} ms (results: {})",
        summary.passed,
        summary.failed,
        summary.skipped,
        summary.duration_ms,
        path.display()
    );
    if !summary.leaked_teams.is_empty() {
        println!("⚠️  Leaked teams: {}", summary.leaked_teams.join(", "));
    }
    Ok(summary.success())
}
