//! MPD 连接：UI 侧异步使用，封面 worker 线程通过 runtime handle 同步调用。

use anyhow::{Context, Result};
use mpd_client::client::{CommandError, ConnectionEvents};
use mpd_client::{Client, commands};
use sleevecore::{ArtError, FetchCommand, PictureChunk, PictureSource};
use tokio::net::TcpStream;
use tokio::runtime::Handle;
use tracing::{debug, info};

/// 正在播放的歌曲
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NowPlaying {
    pub uri: Option<String>,
    pub title: String,
    pub artist: String,
    pub album: String,
}

pub async fn connect(address: &str) -> Result<(Client, ConnectionEvents)> {
    let stream = TcpStream::connect(address)
        .await
        .with_context(|| format!("无法连接 MPD {address}"))?;
    let (client, events) = Client::connect(stream)
        .await
        .with_context(|| format!("MPD 握手失败 {address}"))?;
    info!("connected to MPD at {address}");
    Ok((client, events))
}

pub async fn now_playing(client: &Client) -> Result<NowPlaying> {
    let Some(current) = client.command(commands::CurrentSong).await? else {
        return Ok(NowPlaying::default());
    };
    let song = current.song;
    Ok(NowPlaying {
        title: song.title().unwrap_or(song.url.as_str()).to_string(),
        artist: song.artists().join(", "),
        album: song.album().unwrap_or_default().to_string(),
        uri: Some(song.url),
    })
}

/// 封面 worker 使用的 MPD 会话，在非 runtime 线程上阻塞等待结果
pub struct MpdSource {
    client: Client,
    runtime: Handle,
}

impl MpdSource {
    pub fn new(client: Client, runtime: Handle) -> Self {
        Self { client, runtime }
    }
}

impl PictureSource for MpdSource {
    fn current_song_uri(&mut self) -> sleevecore::Result<Option<String>> {
        let current = self
            .runtime
            .block_on(self.client.command(commands::CurrentSong))
            .map_err(|e| ArtError::Mpd(e.to_string()))?;
        Ok(current.map(|c| c.song.url))
    }

    fn fetch_picture(
        &mut self,
        command: FetchCommand,
        uri: &str,
        offset: usize,
    ) -> sleevecore::Result<Option<PictureChunk>> {
        let response = match command {
            FetchCommand::AlbumArt => self
                .runtime
                .block_on(self.client.command(commands::AlbumArt::new(uri).offset(offset))),
            FetchCommand::ReadPicture => self
                .runtime
                .block_on(self.client.command(commands::AlbumArtEmbedded::new(uri).offset(offset))),
        };
        match response {
            Ok(Some(art)) => Ok(Some(PictureChunk {
                total_size: art.size,
                data: art.data.to_vec(),
            })),
            Ok(None) => Ok(None),
            // 文件不存在或没有图片时 MPD 返回 ACK
            Err(CommandError::ErrorResponse { error, .. }) => {
                debug!(?error, "MPD has no picture for {uri}");
                Ok(None)
            }
            Err(e) => Err(ArtError::Mpd(e.to_string())),
        }
    }
}
