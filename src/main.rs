use clap::Parser;
use env_logger::Env;
use std::process::ExitCode;

mod args;
use args::Args;

#[tokio::main]
async fn main() -> ExitCode {
    // Parse command-line arguments
    let args = Args::parse();

    if let Some(input) = &args.dedupe_file {
        init_logging(args.log_level.as_deref().unwrap_or("info"));
        return match page_tree::output::dedupe_links_file(input, args.output.as_deref()) {
            Ok(_) => ExitCode::SUCCESS,
            Err(e) => {
                ::log::error!("Failed to dedupe {}: {}", input.display(), e);
                ExitCode::FAILURE
            }
        };
    }

    let config = args.to_config();
    let level = match &config {
        Ok(config) => config.log_level.clone(),
        Err(_) => args.log_level.clone().unwrap_or_else(|| "info".to_string()),
    };
    init_logging(&level);

    let config = match config {
        Ok(config) => config,
        Err(e) => {
            ::log::error!("Invalid configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    println!("Note: Web crawling requires a WebDriver server (e.g., ChromeDriver).");
    println!(
        "Set WEBDRIVER_URL environment variable if not using the default http://localhost:4444"
    );

    match page_tree::run(config).await {
        Ok(summary) => {
            for failure in &summary.failures {
                ::log::info!("Failed: {} ({})", failure.url, failure.reason);
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            ::log::error!("Crawl aborted: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Initializes logging; RUST_LOG takes precedence over `level`
fn init_logging(level: &str) {
    env_logger::Builder::from_env(Env::default().default_filter_or(level)).init();
}
