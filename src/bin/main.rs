use anyhow::Context;
use clap::Parser;
use lms_navigator::{
    EngineConfig, EokaBrowser, ExampleLibrary, Plan, PlanGenerator, PlanRunner,
};
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(name = "lms-navigator")]
#[command(about = "Run navigation plans against a live browser")]
#[command(version)]
struct Cli {
    /// Plan file to run (YAML or JSON)
    #[arg(required_unless_present = "goal")]
    plan: Option<PathBuf>,

    /// Plan from a free-text goal using the example library instead
    #[arg(long, requires = "examples", conflicts_with = "plan")]
    goal: Option<String>,

    /// Example library for --goal
    #[arg(long, value_name = "FILE")]
    examples: Option<PathBuf>,

    /// Engine config file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Run in headless mode (overrides config)
    #[arg(long)]
    headless: bool,

    /// Page to open at launch (overrides config)
    #[arg(long, value_name = "URL")]
    start_url: Option<String>,

    /// Verbose output (-v for info, -vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Validate the plan without running it
    #[arg(long)]
    check: bool,

    /// Quiet mode (only errors)
    #[arg(short, long)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = if cli.quiet {
        Level::ERROR
    } else {
        match cli.verbose {
            0 => Level::WARN,
            1 => Level::INFO,
            _ => Level::DEBUG,
        }
    };

    // RUST_LOG wins over -v when set.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_lowercase()));
    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();

    let mut config = match &cli.config {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => EngineConfig::default(),
    };
    if cli.headless {
        config.browser.headless = true;
    }
    if let Some(url) = cli.start_url {
        config.browser.start_url = Some(url);
    }

    let plan = match (&cli.plan, &cli.goal, &cli.examples) {
        (Some(path), _, _) => {
            Plan::load(path).with_context(|| format!("loading plan {}", path.display()))?
        }
        (None, Some(goal), Some(examples)) => {
            let library = ExampleLibrary::load(examples)
                .with_context(|| format!("loading examples {}", examples.display()))?;
            library.generate_or_empty(goal).await
        }
        _ => Plan::empty(),
    };

    if cli.check {
        println!("Plan valid: {} steps", plan.len());
        for (i, step) in plan.steps().iter().enumerate() {
            println!("  {}. {}", i + 1, step);
        }
        return Ok(());
    }

    let mut browser = EokaBrowser::launch(&config.browser)
        .await
        .context("launching browser")?;
    let mut runner = PlanRunner::new(config);
    let result = runner.run(&plan, &mut browser).await;

    println!();
    if result.success {
        println!("✓ Success");
    } else {
        println!("✗ Failed");
        if let Some(step) = result.failed_step {
            println!("  Step: {}", step + 1);
        }
        if let Some(ref error) = result.error {
            println!("  Error: {}", error);
        }
    }
    println!("  Steps: {}/{}", result.steps_executed, plan.len());
    println!("  Duration: {}ms", result.duration_ms);

    browser.close().await?;

    if !result.success {
        std::process::exit(1);
    }

    Ok(())
}
