use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sleevecore::ArtworkConfig;

use super::paths;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub mpd: MpdSettings,
    #[serde(default)]
    pub artwork: ArtworkConfig,
    #[serde(default)]
    pub display: DisplaySettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MpdSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// 与 MPD 的 music_directory 一致，用于查找本地封面文件
    #[serde(default)]
    pub music_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplaySettings {
    /// 封面面板占屏幕宽度的百分比
    #[serde(default = "default_panel_percent")]
    pub panel_percent: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}
fn default_port() -> u16 {
    6600
}
fn default_panel_percent() -> u16 {
    40
}

impl Default for MpdSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            music_dir: None,
        }
    }
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            panel_percent: default_panel_percent(),
        }
    }
}

impl Settings {
    /// 读取配置文件；默认路径下不存在时写入默认配置
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from(path),
            None => {
                let path = paths::config_file()?;
                if path.exists() {
                    Self::load_from(&path)
                } else {
                    let settings = Self::default();
                    settings.save_to(&path)?;
                    Ok(settings)
                }
            }
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("无法读取配置文件 {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("配置文件格式错误 {}", path.display()))
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn mpd_address(&self) -> String {
        format!("{}:{}", self.mpd.host, self.mpd.port)
    }

    /// 交给封面子系统的配置，未单独设置时沿用 `[mpd] music_dir`
    pub fn artwork_config(&self) -> ArtworkConfig {
        let mut config = self.artwork.clone();
        if config.music_dir.is_none() {
            config.music_dir.clone_from(&self.mpd.music_dir);
        }
        config
    }
}
