use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::cache::DEFAULT_CAPACITY;
use crate::source::FetchCommand;

/// 图形协议选择
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// 终端支持 Kitty 协议时用转义序列，否则用外部 overlay 进程
    #[default]
    Auto,
    Kitty,
    Overlay,
}

/// `[artwork]` 配置段
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtworkConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub backend: BackendKind,
    /// MPD 音乐库根目录，用于查找歌曲目录里的封面文件
    #[serde(default)]
    pub music_dir: Option<PathBuf>,
    /// 候选封面文件名，不区分大小写，`cover.*` 匹配任意扩展名
    #[serde(default = "default_cover_names")]
    pub cover_names: Vec<String>,
    #[serde(default)]
    pub fetch_command: FetchCommand,
    #[serde(default = "default_max_picture_bytes")]
    pub max_picture_bytes: usize,
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    /// 封面占面板的比例（百分比）
    #[serde(default = "default_scale_percent")]
    pub scale_percent: u8,
    #[serde(default = "default_overlay_command")]
    pub overlay_command: Vec<String>,
    #[serde(default = "default_overlay_scaler")]
    pub overlay_scaler: String,
}

fn default_true() -> bool {
    true
}
fn default_cover_names() -> Vec<String> {
    ["cover.*", "folder.*", "front.*", "album.*", "albumart.*"]
        .into_iter()
        .map(String::from)
        .collect()
}
fn default_max_picture_bytes() -> usize {
    16 * 1024 * 1024
}
fn default_cache_capacity() -> usize {
    DEFAULT_CAPACITY
}
fn default_debounce_ms() -> u64 {
    60
}
fn default_scale_percent() -> u8 {
    100
}
fn default_overlay_command() -> Vec<String> {
    ["ueberzug", "layer", "--silent", "--parser", "simple"]
        .into_iter()
        .map(String::from)
        .collect()
}
fn default_overlay_scaler() -> String {
    "fit_contain".to_string()
}

impl Default for ArtworkConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            backend: BackendKind::default(),
            music_dir: None,
            cover_names: default_cover_names(),
            fetch_command: FetchCommand::default(),
            max_picture_bytes: default_max_picture_bytes(),
            cache_capacity: default_cache_capacity(),
            debounce_ms: default_debounce_ms(),
            scale_percent: default_scale_percent(),
            overlay_command: default_overlay_command(),
            overlay_scaler: default_overlay_scaler(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_table_uses_defaults() {
        let config: ArtworkConfig = toml::from_str("").unwrap();
        assert_eq!(config, ArtworkConfig::default());
    }

    #[test]
    fn partial_table_overrides_fields() {
        let config: ArtworkConfig = toml::from_str(
            r#"
            backend = "overlay"
            fetch_command = "readpicture"
            cache_capacity = 8
            cover_names = ["Cover.jpg"]
            "#,
        )
        .unwrap();
        assert_eq!(config.backend, BackendKind::Overlay);
        assert_eq!(config.fetch_command, FetchCommand::ReadPicture);
        assert_eq!(config.cache_capacity, 8);
        assert_eq!(config.cover_names, vec!["Cover.jpg".to_string()]);
        assert_eq!(config.debounce_ms, 60);
    }
}
