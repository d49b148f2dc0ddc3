mod event;
mod render;

const UI_TICK_MS: u64 = 1000;

use std::io::Write;
use std::sync::Arc;

use anyhow::Result;
use crossterm::cursor::{MoveTo, RestorePosition, SavePosition};
use crossterm::event::Event;
use mpd_client::Client;
use mpd_client::client::{ConnectionEvent, ConnectionEvents, Subsystem};
use ratatui::layout::Rect;
use sleevecore::{ArtworkController, Notifier, WindowGeometry};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::config::settings::Settings;
use crate::mpd::{self, MpdSource, NowPlaying};
use crate::terminal::CrosstermTerminal;

/// 异步消息，从后台任务发送到主循环
pub enum AppMessage {
    /// 终端事件（由持久后台线程读取）
    TermEvent(Event),
    /// UI 定时 tick
    Tick,
    /// MPD player 子系统变化（切歌、暂停等）
    PlayerChanged,
    MpdClosed(String),
    /// 封面 worker 有输出等待写入终端
    ArtworkReady,
}

pub struct App {
    pub running: bool,
    pub settings: Settings,
    client: Client,
    events: Option<ConnectionEvents>,
    pub artwork: ArtworkController,
    pub now_playing: NowPlaying,
    /// 状态栏消息（封面禁用原因、MPD 错误等）
    pub status: Option<String>,
    pub show_artwork: bool,
    /// 本帧封面面板位置，render 时记录
    pub(crate) artwork_area: Option<Rect>,
    /// 下一帧之后通知 worker 的可见性变化
    pub(crate) pending_visibility: Option<bool>,
    pub(crate) needs_update: bool,
    /// 终端缩放后即使面板格子不变，单元格像素也可能变了
    pub(crate) force_move: bool,
    pub msg_tx: mpsc::UnboundedSender<AppMessage>,
    msg_rx: mpsc::UnboundedReceiver<AppMessage>,
}

impl App {
    pub async fn new(settings: Settings) -> Result<Self> {
        let (client, events) = mpd::connect(&settings.mpd_address()).await?;
        let (msg_tx, msg_rx) = mpsc::unbounded_channel();

        let ready_tx = msg_tx.clone();
        let notifier: Notifier = Arc::new(move || {
            let _ = ready_tx.send(AppMessage::ArtworkReady);
        });
        let source = MpdSource::new(client.clone(), Handle::current());
        let mut artwork = ArtworkController::start(
            &settings.artwork_config(),
            Box::new(source),
            Arc::new(CrosstermTerminal),
            Some(notifier),
        );
        let status = artwork.take_status();

        let now_playing = mpd::now_playing(&client).await.unwrap_or_else(|e| {
            warn!("failed to query current song: {e:#}");
            NowPlaying::default()
        });

        Ok(Self {
            running: true,
            settings,
            client,
            events: Some(events),
            artwork,
            now_playing,
            status,
            show_artwork: true,
            artwork_area: None,
            pending_visibility: None,
            needs_update: true,
            force_move: false,
            msg_tx,
            msg_rx,
        })
    }

    pub async fn run(&mut self) -> Result<()> {
        let mut terminal = ratatui::init();

        let result = self.main_loop(&mut terminal).await;

        // 先停 worker（overlay 进程随之退出），再恢复终端
        self.artwork.shutdown();
        ratatui::restore();

        result
    }

    async fn main_loop(&mut self, terminal: &mut ratatui::DefaultTerminal) -> Result<()> {
        // 启动持久的事件读取线程，避免 select! + spawn_blocking 丢事件
        let event_tx = self.msg_tx.clone();
        std::thread::spawn(move || {
            while let Ok(ev) = crossterm::event::read() {
                if event_tx.send(AppMessage::TermEvent(ev)).is_err() {
                    break;
                }
            }
        });

        let tick_tx = self.msg_tx.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(std::time::Duration::from_millis(UI_TICK_MS));
            loop {
                interval.tick().await;
                if tick_tx.send(AppMessage::Tick).is_err() {
                    break;
                }
            }
        });

        // MPD idle 事件转发为 AppMessage
        if let Some(mut events) = self.events.take() {
            let mpd_tx = self.msg_tx.clone();
            tokio::spawn(async move {
                while let Some(event) = events.next().await {
                    let msg = match event {
                        ConnectionEvent::SubsystemChange(Subsystem::Player) => AppMessage::PlayerChanged,
                        ConnectionEvent::ConnectionClosed(e) => AppMessage::MpdClosed(e.to_string()),
                        _ => continue,
                    };
                    let closed = matches!(msg, AppMessage::MpdClosed(_));
                    if mpd_tx.send(msg).is_err() || closed {
                        break;
                    }
                }
            });
        }

        while self.running {
            terminal.draw(|f| self.render(f))?;
            // draw 结束后同步面板几何，并把 worker 的输出写入终端
            self.sync_artwork();
            if let Err(e) = self.write_artwork_output() {
                warn!("failed to write artwork: {e}");
            }
            if let Some(status) = self.artwork.take_status() {
                self.status = Some(status);
            }

            // 等待至少一条消息
            if let Some(msg) = self.msg_rx.recv().await {
                self.handle_message(msg).await;
            }
            // 批量处理所有已积压的消息，避免每条消息都触发一次 draw
            while let Ok(msg) = self.msg_rx.try_recv() {
                self.handle_message(msg).await;
            }
        }
        Ok(())
    }

    /// 把本帧的 UI 状态转成封面任务
    fn sync_artwork(&mut self) {
        if let Some(area) = self.artwork_area {
            let geometry = WindowGeometry::new(area.x, area.y, area.width, area.height);
            let moved = self.artwork.set_geometry(geometry);
            if (moved || self.force_move) && !self.needs_update {
                self.artwork.request_move();
            }
        }
        self.force_move = false;

        if let Some(visible) = self.pending_visibility.take() {
            self.artwork.on_visibility_changed(visible);
        }

        if self.needs_update {
            self.needs_update = false;
            match &self.now_playing.uri {
                Some(uri) => self.artwork.request_update_for(uri.clone()),
                None => self.artwork.request_update(),
            }
        }
    }

    /// 光标移到 worker 指定的单元格，原样写入输出后恢复光标
    fn write_artwork_output(&mut self) -> std::io::Result<()> {
        let Some(output) = self.artwork.drain_ready_output() else {
            return Ok(());
        };
        let mut stdout = std::io::stdout().lock();
        crossterm::queue!(stdout, SavePosition, MoveTo(output.x, output.y))?;
        stdout.write_all(&output.bytes)?;
        crossterm::queue!(stdout, RestorePosition)?;
        stdout.flush()
    }

    async fn refresh_song(&mut self) {
        match mpd::now_playing(&self.client).await {
            Ok(song) => {
                if song.uri != self.now_playing.uri {
                    debug!(uri = ?song.uri, "song changed");
                    self.needs_update = true;
                }
                self.now_playing = song;
            }
            Err(e) => {
                warn!("failed to query current song: {e:#}");
                self.status = Some(format!("MPD error: {e}"));
            }
        }
    }
}
