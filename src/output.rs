// src/output.rs
// =============================================================================
// Everything the user sees on the terminal.
//
// Two channels:
// - log events (env_logger): per-URL progress and failures, filtered by level
// - status lines (colored): banner, startup parameters, final summary
//
// Nothing in here affects the crawl. It only reads final statistics.
// =============================================================================

use std::io::Write;
use std::path::Path;

use colored::Colorize;
use serde::Serialize;
use walkdir::WalkDir;

use crate::config::MirrorConfig;
use crate::crawl::Report;

const BANNER: &str = r"
 ____  _ _         __  __ _
/ ___|(_) |_ ___  |  \/  (_)_ __ _ __ ___  _ __
\___ \| | __/ _ \ | |\/| | | '__| '__/ _ \| '__|
 ___) | | ||  __/ | |  | | | |  | | | (_) | |
|____/|_|\__\___| |_|  |_|_|_|  |_|  \___/|_|
";

/// Sets up env_logger. `RUST_LOG` wins over the -v flag when set.
pub fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format(|buf, record| {
            let style = buf.default_level_style(record.level());
            writeln!(
                buf,
                "{} {style}{:<5}{style:#} {}",
                buf.timestamp_seconds(),
                record.level(),
                record.args()
            )
        })
        .init();
}

pub fn print_banner() {
    println!("{}", BANNER.cyan().bold());
    println!("{}", "        THREADED WEBSITE MIRROR".magenta().bold());
    println!();
}

pub fn print_status(message: &str) {
    println!("{} {}", "[*]".yellow().bold(), message.yellow());
}

pub fn print_success(message: &str) {
    println!("{} {}", "[+]".green().bold(), message.green());
}

pub fn print_error(message: &str) {
    eprintln!("{} {}", "[-]".red().bold(), message.red());
}

pub fn print_info(message: &str) {
    println!("{} {}", "[i]".cyan().bold(), message.cyan());
}

/// The parameter block printed before workers start.
pub fn print_start(url: &str, root: &Path, config: &MirrorConfig) {
    print_info(&format!("Starting mirror of {}", url.bold()));
    print_info(&format!("Output directory: {}", root.display().to_string().bold()));
    print_info(&format!("Using {} threads", config.threads.to_string().bold()));
    print_info(&format!("Delay between requests: {}s", config.delay_secs.to_string().bold()));
}

/// Final numbers, in the shape printed by --json.
#[derive(Debug, Serialize)]
pub struct Summary {
    pub completed: bool,
    pub total_seconds: f64,
    pub pages: u64,
    pub resources: u64,
    pub errors: u64,
    pub mirror_dir: String,
    pub total_files: u64,
    pub total_bytes: u64,
}

impl Summary {
    pub fn from_report(report: &Report) -> Self {
        let (total_files, total_bytes) = directory_usage(&report.root);
        Self {
            completed: report.outcome == crate::crawl::Outcome::Completed,
            total_seconds: report.snapshot.elapsed_seconds,
            pages: report.snapshot.pages,
            resources: report.snapshot.resources,
            errors: report.snapshot.errors,
            mirror_dir: report.root.display().to_string(),
            total_files,
            total_bytes,
        }
    }
}

pub fn print_summary(summary: &Summary) {
    let rule = "=".repeat(60);
    println!();
    println!("{}", rule.cyan().bold());
    print_success("MIRRORING COMPLETED SUCCESSFULLY!");
    println!("{}", rule.cyan().bold());

    print_info(&format!("Total time: {:.2} seconds", summary.total_seconds));
    print_info(&format!("Pages downloaded: {}", summary.pages));
    print_info(&format!("Resources downloaded: {}", summary.resources));
    print_info(&format!("Errors encountered: {}", summary.errors));
    print_info(&format!("Mirror saved to: {}", summary.mirror_dir));
    print_info(&format!("Total files: {}", summary.total_files));
    print_info(&format!(
        "Total size: {:.2} MB",
        summary.total_bytes as f64 / 1024.0 / 1024.0
    ));
}

pub fn print_summary_json(summary: &Summary) -> serde_json::Result<()> {
    println!("{}", serde_json::to_string_pretty(summary)?);
    Ok(())
}

// (file count, total bytes) under `root`. Unreadable entries are skipped.
fn directory_usage(root: &Path) -> (u64, u64) {
    WalkDir::new(root)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| entry.metadata().ok())
        .fold((0, 0), |(files, bytes), metadata| (files + 1, bytes + metadata.len()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directory_usage_counts_nested_files() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("img")).unwrap();
        std::fs::write(dir.path().join("index.html"), b"12345").unwrap();
        std::fs::write(dir.path().join("img/a.png"), b"123").unwrap();

        assert_eq!(directory_usage(dir.path()), (2, 8));
    }

    #[test]
    fn test_directory_usage_missing_root() {
        assert_eq!(directory_usage(Path::new("/nonexistent/mirror")), (0, 0));
    }
}
