use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use sleevecore::BackendKind;

use crate::config::settings::Settings;

#[derive(Debug, Parser)]
#[command(name = "sleeve", version, about = "MPD client with album art in the terminal")]
pub struct Cli {
    /// 配置文件路径（默认为配置目录下的 config.toml）
    #[arg(long)]
    pub config: Option<PathBuf>,
    #[arg(long)]
    pub host: Option<String>,
    #[arg(long)]
    pub port: Option<u16>,
    #[arg(long)]
    pub music_dir: Option<PathBuf>,
    #[arg(long, value_enum)]
    pub backend: Option<BackendArg>,
    #[arg(long)]
    pub no_artwork: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum BackendArg {
    Auto,
    Kitty,
    Overlay,
}

impl From<BackendArg> for BackendKind {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::Auto => BackendKind::Auto,
            BackendArg::Kitty => BackendKind::Kitty,
            BackendArg::Overlay => BackendKind::Overlay,
        }
    }
}

impl Cli {
    /// 命令行参数覆盖配置文件
    pub fn apply(&self, settings: &mut Settings) {
        if let Some(host) = &self.host {
            settings.mpd.host.clone_from(host);
        }
        if let Some(port) = self.port {
            settings.mpd.port = port;
        }
        if let Some(dir) = &self.music_dir {
            settings.mpd.music_dir = Some(dir.clone());
        }
        if let Some(backend) = self.backend {
            settings.artwork.backend = backend.into();
        }
        if self.no_artwork {
            settings.artwork.enabled = false;
        }
    }
}
