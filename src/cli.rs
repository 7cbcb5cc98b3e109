// src/cli.rs
// =============================================================================
// This file defines our command-line interface using the `clap` crate.
//
// There are no subcommands: one positional URL plus a handful of flags.
// Flags that also exist in the config file are Options here, so we can tell
// "user passed -t 10" apart from "user didn't pass -t at all" and only let
// explicit flags override the file.
// =============================================================================

use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "site-mirror",
    version,
    about = "Threaded website mirroring tool",
    long_about = "site-mirror recursively downloads every page and asset of a website \
                  (same host only) and rewrites links so the copy browses offline.",
    after_help = "Examples:\n  \
                  site-mirror https://example.com\n  \
                  site-mirror https://example.com -t 20 -v\n  \
                  site-mirror https://example.com -d 0.5 --no-banner"
)]
pub struct Cli {
    /// URL to mirror (e.g., https://example.com)
    ///
    /// Must start with http:// or https://
    pub url: String,

    /// Number of worker threads (default: 10)
    #[arg(short, long)]
    pub threads: Option<usize>,

    /// Delay in seconds each worker waits before every request (default: 0.1)
    #[arg(short, long)]
    pub delay: Option<f64>,

    /// Enable verbose (debug) logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Skip the banner
    #[arg(long)]
    pub no_banner: bool,

    /// Directory in which the mirror_<host> folder is created (default: .)
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// TOML file with crawl settings; flags override its values
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Print the final summary as JSON
    #[arg(long)]
    pub json: bool,
}

impl Cli {
    /// Only absolute http(s) URLs are accepted.
    pub fn has_web_scheme(&self) -> bool {
        self.url.starts_with("http://") || self.url.starts_with("https://")
    }
}
