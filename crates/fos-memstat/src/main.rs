//! fos-memstat: Disk Footprint Report
//!
//! Walks a directory tree through the memory sizer, treating directories
//! as components and files as objects, and prints the size-sorted report
//! the engine shows on screen.

mod walker;

use anyhow::{Context, Result};
use clap::Parser;
use fos_sizer::{
    Color, MemStatsConfig, MemStatsMonitor, TextDrawer, TextGrid, TracingLogSink, format_bytes,
};
use std::io::IsTerminal;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

// Use mimalloc as the global allocator for reduced memory fragmentation
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Parser, Debug)]
#[command(name = "fos-memstat", about = "Size-sorted footprint report of a directory tree")]
struct Cli {
    /// Directory (or file) to report
    path: PathBuf,
    /// Report settings (`.toml` or `.json`)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Hide rows at or below this many bytes
    #[arg(long)]
    min_bytes: Option<i64>,
    /// Hide rows deeper than this
    #[arg(long)]
    max_depth: Option<u32>,
    /// Dump sizes in KB instead of MB
    #[arg(long)]
    kb: bool,
    /// Also print the snapshot as JSON
    #[arg(long)]
    json: bool,
    /// Debug logging
    #[arg(long, short)]
    verbose: bool,
}

impl Cli {
    fn load_config(&self) -> Result<MemStatsConfig> {
        let mut config = match &self.config {
            Some(path) => MemStatsConfig::from_file(path)
                .with_context(|| format!("failed to load config {}", path.display()))?,
            None => MemStatsConfig::enabled(),
        };
        if !config.is_enabled() {
            config.refresh_interval_ms = MemStatsConfig::enabled().refresh_interval_ms;
        }
        if let Some(min_bytes) = self.min_bytes {
            config.min_subcomponent_bytes = min_bytes;
        }
        if let Some(max_depth) = self.max_depth {
            config.max_depth = max_depth;
        }
        config.use_kilobytes |= self.kb;
        config.validate()?;
        Ok(config)
    }
}

/// Prints drawn lines to a terminal in the report colors.
struct AnsiScreen;

impl TextDrawer for AnsiScreen {
    fn draw_text(&mut self, _x: f32, _y: f32, _scale: f32, color: Color, text: &str) {
        let [r, g, b, _] = color.to_array().map(|c| (c * 255.0).round() as u8);
        println!("\x1b[38;2;{r};{g};{b}m{text}\x1b[0m");
    }
}

/// Discards drawing; the console mirror carries the text.
struct NoScreen;

impl TextDrawer for NoScreen {
    fn draw_text(&mut self, _x: f32, _y: f32, _scale: f32, _color: Color, _text: &str) {}
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let _subscriber = FmtSubscriber::builder()
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::INFO })
        .with_target(false)
        .compact()
        .init();

    let config = cli.load_config()?;
    let mut monitor = MemStatsMonitor::new(config);

    let mut outcome = None;
    monitor.update(Instant::now(), |sizer| {
        outcome = Some(walker::walk(sizer, &cli.path));
    });
    let summary = outcome.context("memory report is disabled")??;

    let stats = monitor.stats().context("no snapshot was built")?;
    info!(
        files = summary.files,
        directories = summary.directories,
        skipped = summary.skipped,
        total = %format_bytes(stats.total_bytes()),
        "Walked {}",
        cli.path.display()
    );

    if std::io::stdout().is_terminal() {
        monitor.render(&mut AnsiScreen, None);
    } else {
        let mut grid = TextGrid::new();
        monitor.render(&mut NoScreen, Some(&mut grid));
        print!("{grid}");
    }

    monitor.dump(&mut TracingLogSink);

    if cli.json {
        println!("{}", stats.to_json().context("failed to export snapshot")?);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_overrides_config() {
        let cli = Cli::parse_from(["fos-memstat", "assets", "--min-bytes", "1024", "--kb"]);
        let config = cli.load_config().unwrap();
        assert!(config.is_enabled());
        assert_eq!(config.min_subcomponent_bytes, 1024);
        assert!(config.use_kilobytes);
        assert_eq!(config.max_depth, 4);
    }

    #[test]
    fn test_disabled_config_file_is_enabled() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("memstats.toml");
        std::fs::write(&path, "refresh_interval_ms = 0\nmax_depth = 6\n").unwrap();

        let cli = Cli::parse_from([
            "fos-memstat",
            "assets",
            "--config",
            path.to_str().unwrap(),
        ]);
        let config = cli.load_config().unwrap();
        assert!(config.is_enabled());
        assert_eq!(config.max_depth, 6);
    }
}
