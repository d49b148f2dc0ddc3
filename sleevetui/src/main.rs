mod app;
mod cli;
mod config;
mod mpd;
mod terminal;
mod ui;

use std::fs::OpenOptions;
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::config::{paths, settings::Settings};

/// 日志写入缓存目录下的文件，避免破坏 TUI 画面
fn init_logging() -> Result<()> {
    let path = paths::log_file()?;
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("无法打开日志文件 {}", path.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("sleevetui=info".parse()?)
                .add_directive("sleevecore=info".parse()?),
        )
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    init_logging()?;

    let mut settings = Settings::load(cli.config.as_deref())?;
    cli.apply(&mut settings);

    let mut app = app::App::new(settings).await?;
    app.run().await
}
