// src/main.rs
// =============================================================================
// This is the entry point of our CLI application.
//
// What happens here:
// 1. Parse command-line arguments using clap
// 2. Validate the URL and build the configuration
// 3. Create the mirror directory and the HTTP client
// 4. Run the crawl until it finishes or the user hits Ctrl-C
// 5. Print the summary and exit (0 = completed, 1 = anything else)
//
// Anything that fails before the first worker starts is fatal. Once the crawl
// is running, failures are per-URL and only show up in the error count.
// =============================================================================

// Module declarations - tells Rust about our other source files
mod cli; // src/cli.rs - command-line parsing
mod config; // src/config.rs - defaults, config file, CLI overrides
mod crawl; // src/crawl/ - frontier, workers, stats
mod error; // src/error.rs - error types
mod fetch; // src/fetch/ - HTTP GET and writing files
mod output; // src/output.rs - banner, status lines, summary
mod rewrite; // src/rewrite/ - making pages work offline
mod site; // src/site/ - scope and URL -> path mapping

use anyhow::{Context, Result};
use clap::Parser;
use url::Url;

use cli::Cli;
use config::MirrorConfig;
use crawl::{CrawlSettings, Mirror, Outcome};
use fetch::Fetcher;
use site::Site;

#[tokio::main]
async fn main() {
    let exit_code = match run().await {
        Ok(code) => code,
        Err(e) => {
            output::print_error(&format!("Fatal error: {:#}", e));
            1
        }
    };

    std::process::exit(exit_code);
}

// Returns the process exit code:
//   Ok(0) = crawl completed
//   Ok(1) = invalid URL or interrupted by the user
//   Err   = setup failed (printed by main, exit code 1)
async fn run() -> Result<i32> {
    let cli = Cli::parse();

    if !cli.no_banner {
        output::print_banner();
    }

    output::init_logging(cli.verbose);

    if !cli.has_web_scheme() {
        output::print_error("URL must start with http:// or https://");
        return Ok(1);
    }

    let config = MirrorConfig::load(&cli)?;
    let seed = Url::parse(&cli.url).with_context(|| format!("invalid URL '{}'", cli.url))?;

    let site = Site::new(&seed, &config.output_dir)?;
    site.create_root()?;

    let fetcher = Fetcher::new(config.request_timeout(), &config.user_agent)?;
    let settings = CrawlSettings::from_config(&config)?;

    output::print_start(&cli.url, site.root(), &config);
    output::print_status(&format!(
        "Staying on {}. Press Ctrl+C to stop.",
        site.host()
    ));

    let mirror = Mirror::new(site, fetcher, settings);
    let report = mirror.run(interrupted()).await;

    if report.outcome == Outcome::Interrupted {
        output::print_error("Mirroring interrupted by user");
        return Ok(1);
    }

    let summary = output::Summary::from_report(&report);
    if cli.json {
        output::print_summary_json(&summary)?;
    } else {
        output::print_summary(&summary);
    }

    Ok(0)
}

// Resolves on Ctrl-C. If the handler can't be installed we never resolve,
// so the crawl simply runs to completion.
async fn interrupted() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::warn!("Cannot listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}
