//! 终端音乐播放器的封面渲染核心：获取、缓存并通过终端图形协议显示专辑封面。

pub mod backend;
pub mod cache;
pub mod config;
pub mod controller;
pub mod error;
pub mod geometry;
pub mod handshake;
pub mod model;
pub mod queue;
pub mod source;
pub mod worker;

pub use backend::ProtocolBackend;
pub use cache::ArtworkCache;
pub use config::{ArtworkConfig, BackendKind};
pub use controller::ArtworkController;
pub use error::{ArtError, Result};
pub use model::{
    CacheKey, CacheValue, RawArt, RenderOutput, Snapshot, Task, TerminalInfo, TerminalSize,
    WindowGeometry,
};
pub use source::{FetchCommand, PictureChunk, PictureSource, SourceResolver};
pub use worker::{Notifier, Worker, WorkerState};
