use thiserror::Error;

/// 封面子系统的错误分类。
///
/// 除 `BackendUnavailable` 外都只影响当前任务，调用方按“无封面”处理。
#[derive(Debug, Error)]
pub enum ArtError {
    /// 本地没有封面文件，MPD 也没有返回图片
    #[error("no artwork available for {0}")]
    SourceUnavailable(String),

    #[error("artwork for {uri} exceeds {limit} bytes")]
    SourceTooLarge { uri: String, limit: usize },

    #[error("failed to decode artwork: {0}")]
    Decode(#[source] image::ImageError),

    #[error("failed to encode artwork: {0}")]
    Encode(#[source] image::ImageError),

    /// 外部进程启动失败，或终端不支持图形协议；本次会话内不再重试
    #[error("artwork backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("MPD error: {0}")]
    Mpd(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ArtError {
    /// 是否应当显示为“无封面”而非错误
    pub fn is_missing_art(&self) -> bool {
        matches!(
            self,
            ArtError::SourceUnavailable(_) | ArtError::SourceTooLarge { .. } | ArtError::Decode(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, ArtError>;
