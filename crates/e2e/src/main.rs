//! Suite runner entry point
//!
//! Run with: cargo run --package eventhub-e2e -- --config eventhub-e2e.yaml

use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use eventhub_e2e::config::BrowserKind;
use eventhub_e2e::runner::list;
use eventhub_e2e::{catalogue, E2eResult, Group, Selection, SuiteConfig, TestRunner, WebDriverPage};

#[derive(Parser, Debug)]
#[command(name = "eventhub-e2e")]
#[command(about = "Browser E2E suite for EventHub")]
struct Args {
    /// Suite configuration file (defaults apply when missing)
    #[arg(short, long, default_value = "eventhub-e2e.yaml")]
    config: PathBuf,

    /// Base URL of the application under test
    #[arg(long)]
    base_url: Option<String>,

    /// WebDriver endpoint to open the browser session on
    #[arg(long)]
    webdriver_url: Option<String>,

    /// Browser to use (chrome, firefox)
    #[arg(long)]
    browser: Option<String>,

    /// Show the browser window
    #[arg(long)]
    headed: bool,

    /// Spawn this WebDriver binary instead of using a running server
    #[arg(long)]
    driver_binary: Option<PathBuf>,

    /// Run only this group
    #[arg(short, long)]
    group: Option<String>,

    /// Run only scenarios with this tag
    #[arg(short, long)]
    tag: Option<String>,

    /// Run only the scenario with this exact name
    #[arg(short, long)]
    name: Option<String>,

    /// Print the scenario catalogue and exit
    #[arg(long)]
    list: bool,

    /// Output directory for results
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    if args.list {
        for line in list(&catalogue::<WebDriverPage>()) {
            println!("{}", line);
        }
        return;
    }

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Error: failed to create tokio runtime: {}", e);
            std::process::exit(2);
        }
    };

    match rt.block_on(async_main(args)) {
        Ok(true) => std::process::exit(0),
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(2);
        }
    }
}

fn load_config(args: &Args) -> E2eResult<SuiteConfig> {
    let mut config = SuiteConfig::load(&args.config)?;
    config.apply_env()?;

    if let Some(url) = &args.base_url {
        config.app.base_url = url.clone();
    }
    if let Some(url) = &args.webdriver_url {
        config.browser.webdriver_url = url.clone();
    }
    if let Some(kind) = &args.browser {
        config.browser.kind = kind.parse::<BrowserKind>()?;
    }
    if args.headed {
        config.browser.headless = false;
    }
    if let Some(binary) = &args.driver_binary {
        config.driver.get_or_insert_with(Default::default).binary_path = binary.clone();
    }
    if let Some(output) = &args.output {
        config.report.output_dir = output.clone();
    }

    config.validate()?;
    Ok(config)
}

async fn async_main(args: Args) -> E2eResult<bool> {
    let config = load_config(&args)?;
    let selection = Selection {
        group: args.group.as_deref().map(str::parse::<Group>).transpose()?,
        tag: args.tag.clone(),
        name: args.name.clone(),
    };

    let mut runner = TestRunner::new(config);
    let results = runner.run(&selection).await?;
    runner.write_results(&results)?;
    runner.stop_driver()?;

    Ok(results.success())
}
