//! 封面原始数据来源：先找歌曲目录里的封面文件，再走 MPD 二进制传输。

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::config::ArtworkConfig;
use crate::error::{ArtError, Result};
use crate::model::RawArt;

/// MPD 的两种取图命令
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchCommand {
    /// `albumart`：歌曲目录下的封面文件
    #[default]
    AlbumArt,
    /// `readpicture`：音频文件内嵌的图片
    ReadPicture,
}

/// 一次二进制传输的响应
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PictureChunk {
    pub total_size: usize,
    pub data: Vec<u8>,
}

/// MPD 会话能力（由调用方实现）
pub trait PictureSource: Send {
    fn current_song_uri(&mut self) -> Result<Option<String>>;

    /// 读取 `offset` 处的一段数据；`None` 表示该歌曲没有图片
    fn fetch_picture(
        &mut self,
        command: FetchCommand,
        uri: &str,
        offset: usize,
    ) -> Result<Option<PictureChunk>>;
}

pub struct SourceResolver {
    source: Box<dyn PictureSource>,
    music_dir: Option<PathBuf>,
    cover_names: Vec<String>,
    command: FetchCommand,
    max_bytes: usize,
}

impl SourceResolver {
    pub fn new(source: Box<dyn PictureSource>, config: &ArtworkConfig) -> Self {
        Self {
            source,
            music_dir: config.music_dir.clone(),
            cover_names: config.cover_names.clone(),
            command: config.fetch_command,
            max_bytes: config.max_picture_bytes.max(1),
        }
    }

    /// MPD 查询失败按“没有歌曲”处理
    pub fn current_song_uri(&mut self) -> Option<String> {
        match self.source.current_song_uri() {
            Ok(uri) => uri,
            Err(e) => {
                debug!("current song lookup failed: {e}");
                None
            }
        }
    }

    pub fn resolve(&mut self, uri: &str) -> Result<RawArt> {
        if let Some(path) = self.find_local(uri) {
            debug!("using local cover {}", path.display());
            // 先看文件大小，超限的文件不读入内存
            let len = fs::metadata(&path)?.len();
            if usize::try_from(len).map_or(true, |len| len > self.max_bytes) {
                return Err(ArtError::SourceTooLarge {
                    uri: uri.to_string(),
                    limit: self.max_bytes,
                });
            }
            let bytes = fs::read(&path)?;
            return Ok(RawArt { uri: uri.to_string(), bytes });
        }
        self.fetch_remote(uri)
    }

    /// 在 `music_dir/<歌曲所在目录>` 中按候选名顺序查找封面
    fn find_local(&self, uri: &str) -> Option<PathBuf> {
        let music_dir = self.music_dir.as_ref()?;
        if uri.contains("://") {
            return None;
        }
        let dir = music_dir.join(uri).parent()?.to_path_buf();
        let names: Vec<(String, PathBuf)> = fs::read_dir(&dir)
            .ok()?
            .flatten()
            .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
            .map(|e| (e.file_name().to_string_lossy().into_owned(), e.path()))
            .collect();

        self.cover_names.iter().find_map(|pattern| {
            names
                .iter()
                .filter(|(name, _)| matches_cover_name(name, pattern))
                .min_by(|a, b| a.0.cmp(&b.0))
                .map(|(_, path)| path.clone())
        })
    }

    fn fetch_remote(&mut self, uri: &str) -> Result<RawArt> {
        let mut bytes: Vec<u8> = Vec::new();
        loop {
            let chunk = self.source.fetch_picture(self.command, uri, bytes.len())?;
            let Some(chunk) = chunk else {
                if bytes.is_empty() {
                    return Err(ArtError::SourceUnavailable(uri.to_string()));
                }
                break;
            };
            if chunk.total_size > self.max_bytes || bytes.len() + chunk.data.len() > self.max_bytes {
                return Err(ArtError::SourceTooLarge {
                    uri: uri.to_string(),
                    limit: self.max_bytes,
                });
            }
            // 空读即 EOF
            if chunk.data.is_empty() {
                break;
            }
            bytes.extend_from_slice(&chunk.data);
            trace!("fetched {}/{} bytes of {uri}", bytes.len(), chunk.total_size);
            if bytes.len() >= chunk.total_size {
                break;
            }
        }

        if bytes.is_empty() {
            return Err(ArtError::SourceUnavailable(uri.to_string()));
        }
        Ok(RawArt { uri: uri.to_string(), bytes })
    }
}

/// `cover.*` 只比较主文件名，其余按完整文件名比较；均不区分大小写
fn matches_cover_name(file_name: &str, pattern: &str) -> bool {
    match pattern.strip_suffix(".*") {
        Some(stem) => Path::new(file_name)
            .file_stem()
            .and_then(|s| s.to_str())
            .is_some_and(|s| s.eq_ignore_ascii_case(stem) && Path::new(file_name).extension().is_some()),
        None => file_name.eq_ignore_ascii_case(pattern),
    }
}
