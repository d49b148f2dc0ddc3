//! 后台 worker：独占解析器、缓存与后端，串行处理任务。

use std::sync::Arc;
use std::time::{Duration, Instant};

use image::{DynamicImage, GenericImageView};
use tracing::{debug, error, trace, warn};

use crate::backend::ProtocolBackend;
use crate::cache::ArtworkCache;
use crate::config::ArtworkConfig;
use crate::error::{ArtError, Result};
use crate::geometry::{self, CellAnchor, Placement};
use crate::handshake::{DrawHandshake, DrawWait};
use crate::model::{CacheKey, CacheValue, RenderOutput, Snapshot, Task, TaskClass};
use crate::queue::TaskQueue;
use crate::source::SourceResolver;

/// 输出就绪时调用，让事件驱动的 UI 及时重绘
pub type Notifier = Arc<dyn Fn() + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Idle,
    Resolving,
    Decoding,
    Encoding,
    AwaitingDraw,
}

/// 最近一次解码成功的封面，Move 和重新显示时直接复用
struct CurrentArt {
    uri: String,
    image: DynamicImage,
}

pub struct Worker {
    resolver: SourceResolver,
    cache: ArtworkCache,
    backend: ProtocolBackend,
    scale_percent: u8,
    debounce: Duration,
    state: WorkerState,
    current: Option<CurrentArt>,
    on_screen: bool,
    visible: bool,
    /// 隐藏期间收到的绘制请求
    deferred: Option<Task>,
}

impl Worker {
    pub fn new(resolver: SourceResolver, backend: ProtocolBackend, config: &ArtworkConfig) -> Self {
        Self {
            resolver,
            cache: ArtworkCache::new(config.cache_capacity),
            backend,
            scale_percent: config.scale_percent,
            debounce: Duration::from_millis(config.debounce_ms),
            state: WorkerState::Idle,
            current: None,
            on_screen: false,
            visible: true,
            deferred: None,
        }
    }

    pub fn cache(&self) -> &ArtworkCache {
        &self.cache
    }

    pub fn state(&self) -> WorkerState {
        self.state
    }

    fn set_state(&mut self, state: WorkerState) {
        if self.state != state {
            trace!(from = ?self.state, to = ?state, "worker state");
            self.state = state;
        }
    }

    /// 处理单个任务，返回需要 UI 写入终端的输出
    pub fn process(&mut self, task: Task) -> Result<Option<RenderOutput>> {
        let result = self.dispatch(task);
        self.set_state(WorkerState::Idle);
        result
    }

    fn dispatch(&mut self, task: Task) -> Result<Option<RenderOutput>> {
        match task {
            Task::VisibilityChanged(snap) => self.visibility_changed(snap),
            Task::Remove(snap) => self.remove(&snap, false),
            Task::RemoveAndReset(snap) => self.remove(&snap, true),
            task if !self.visible => {
                self.defer(task);
                Ok(None)
            }
            Task::Update(snap) => {
                self.set_state(WorkerState::Resolving);
                let uri = self.resolver.current_song_uri();
                self.update(uri, snap)
            }
            Task::UpdateForUri { uri, snapshot } => self.update(Some(uri), snapshot),
            Task::Move(snap) => self.relocate(snap),
        }
    }

    fn defer(&mut self, task: Task) {
        let keep_update = task.class() == TaskClass::Move
            && self.deferred.as_ref().is_some_and(|t| t.class() == TaskClass::Update);
        if !keep_update {
            trace!(task = task.name(), "panel hidden, deferring");
            self.deferred = Some(task);
        }
    }

    fn update(&mut self, uri: Option<String>, snap: Snapshot) -> Result<Option<RenderOutput>> {
        self.set_state(WorkerState::Resolving);
        let Some(uri) = uri else {
            debug!("no current song");
            return self.clear_art(&snap);
        };

        let image = match self.resolver.resolve(&uri) {
            Ok(raw) => {
                self.set_state(WorkerState::Decoding);
                image::load_from_memory(&raw.bytes).map_err(ArtError::Decode)
            }
            Err(e) => Err(e),
        };
        let image = match image {
            Ok(image) => image,
            Err(e @ ArtError::BackendUnavailable(_)) => return Err(e),
            Err(e) => {
                if e.is_missing_art() {
                    debug!("{e}");
                } else {
                    warn!("artwork lookup for {uri} failed: {e}");
                }
                return self.clear_art(&snap);
            }
        };

        debug!(uri = %uri, size = ?image.dimensions(), "artwork decoded");
        self.current = Some(CurrentArt { uri, image });
        self.render(snap)
    }

    /// 计算当前封面在快照几何下的放置和缓存键
    fn layout(&self, snap: &Snapshot) -> Option<(CacheKey, Placement)> {
        let art = self.current.as_ref()?;
        let placement = geometry::compute(
            &snap.geometry,
            art.image.dimensions(),
            &snap.terminal,
            self.scale_percent,
        )?;
        let key = CacheKey {
            uri: art.uri.clone(),
            width: placement.width,
            height: placement.height,
            panel_x: snap.geometry.x,
            panel_y: snap.geometry.y,
        };
        Some((key, placement))
    }

    fn render(&mut self, snap: Snapshot) -> Result<Option<RenderOutput>> {
        if self.current.is_none() {
            return Ok(None);
        }
        self.set_state(WorkerState::Encoding);
        let Some((key, placement)) = self.layout(&snap) else {
            return self.clear_screen(&snap);
        };

        let value = match self.cache.get(&key) {
            Some(value) => {
                trace!(uri = %key.uri, "artwork cache hit");
                value
            }
            None => self.encode_and_cache(&key, &placement)?,
        };

        let placement = Placement {
            x_offset: value.x_offset,
            y_offset: value.y_offset,
            ..placement
        };
        let anchor = placement.anchor(&snap.geometry, &snap.terminal);
        let bytes = self.backend.show(&key, &value, &anchor)?;
        self.on_screen = true;
        Ok(output(bytes, &anchor))
    }

    fn encode_and_cache(&mut self, key: &CacheKey, placement: &Placement) -> Result<CacheValue> {
        let Some(art) = self.current.as_ref() else {
            return Err(ArtError::SourceUnavailable(key.uri.clone()));
        };
        let payload = self.backend.encode(&art.image, placement)?;
        let value = CacheValue {
            payload: payload.into(),
            x_offset: placement.x_offset,
            y_offset: placement.y_offset,
        };
        if let Some(evicted) = self.cache.put(key.clone(), value.clone()) {
            trace!(uri = %evicted.uri, "artwork cache evicted");
        }
        Ok(value)
    }

    /// 几何变化：像素相同只移动位置，否则用保留的位图重绘，不重新获取。
    /// 面板曾缩成零尺寸时封面已清除，面板恢复后据保留的位图重新画出。
    fn relocate(&mut self, snap: Snapshot) -> Result<Option<RenderOutput>> {
        if self.current.is_none() {
            return Ok(None);
        }
        let Some((key, placement)) = self.layout(&snap) else {
            return self.clear_screen(&snap);
        };
        let anchor = placement.anchor(&snap.geometry, &snap.terminal);
        if let Some(bytes) = self.backend.reposition(&key, &anchor)? {
            trace!(uri = %key.uri, "artwork repositioned");
            return Ok(output(bytes, &anchor));
        }
        self.render(snap)
    }

    fn remove(&mut self, snap: &Snapshot, reset: bool) -> Result<Option<RenderOutput>> {
        self.deferred = None;
        // 清除后只有新的 Update 能再显示封面
        self.current = None;
        let bytes = self.backend.remove()?;
        self.on_screen = false;
        if reset {
            self.backend.reset();
            self.cache.clear();
            debug!("artwork state reset");
        }
        Ok(output(bytes, &origin(snap)))
    }

    fn visibility_changed(&mut self, snap: Snapshot) -> Result<Option<RenderOutput>> {
        if snap.visible == self.visible {
            return Ok(None);
        }
        self.visible = snap.visible;
        if !snap.visible {
            return self.clear_screen(&snap);
        }
        match self.deferred.take() {
            Some(mut task) if task.class() == TaskClass::Update => {
                *task.snapshot_mut() = snap;
                self.dispatch(task)
            }
            _ => self.render(snap),
        }
    }

    /// 没有封面可显示：清除屏幕并忘记当前封面
    fn clear_art(&mut self, snap: &Snapshot) -> Result<Option<RenderOutput>> {
        self.current = None;
        self.clear_screen(snap)
    }

    fn clear_screen(&mut self, snap: &Snapshot) -> Result<Option<RenderOutput>> {
        if !self.on_screen {
            return Ok(None);
        }
        let bytes = self.backend.remove()?;
        self.on_screen = false;
        Ok(output(bytes, &origin(snap)))
    }

    /// 线程主循环：取任务、处理、交给 UI 并等待绘制确认
    pub fn run(mut self, queue: &TaskQueue, handshake: &DrawHandshake, notifier: Option<&Notifier>) {
        debug!(backend = self.backend.name(), "artwork worker started");
        let mut last_finished = None;

        while let Some(task) = queue.next(self.debounce, last_finished) {
            trace!(task = task.name(), "processing");
            match self.process(task) {
                Ok(Some(out)) => {
                    self.set_state(WorkerState::AwaitingDraw);
                    handshake.publish(out);
                    if let Some(notify) = notifier {
                        notify();
                    }
                    let outcome = handshake.wait_drawn(queue);
                    self.set_state(WorkerState::Idle);
                    match outcome {
                        DrawWait::Drawn => {}
                        DrawWait::Retracted => {
                            debug!("undrawn artwork retracted");
                            self.backend.undelivered();
                        }
                        DrawWait::Exit => break,
                    }
                }
                Ok(None) => {}
                Err(ArtError::BackendUnavailable(reason)) => {
                    error!("artwork disabled: {reason}");
                    handshake.post_status(format!("Artwork disabled: {reason}"));
                    queue.request_exit();
                    if let Some(notify) = notifier {
                        notify();
                    }
                    break;
                }
                Err(e) => warn!("artwork task failed: {e}"),
            }
            last_finished = Some(Instant::now());
        }
        debug!("artwork worker stopped");
    }
}

fn origin(snap: &Snapshot) -> CellAnchor {
    CellAnchor {
        col: snap.geometry.x,
        row: snap.geometry.y,
        pixel_x: 0,
        pixel_y: 0,
        cols: snap.geometry.width,
        rows: snap.geometry.height,
    }
}

fn output(bytes: Vec<u8>, anchor: &CellAnchor) -> Option<RenderOutput> {
    if bytes.is_empty() {
        return None;
    }
    Some(RenderOutput {
        bytes,
        x: anchor.col,
        y: anchor.row,
    })
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use image::{ImageFormat, Rgb, RgbImage};

    use super::*;
    use crate::backend::EscapeSequenceBackend;
    use crate::backend::kitty::tests::parse_apc;
    use crate::model::{TerminalSize, WindowGeometry};
    use crate::source::{FetchCommand, PictureChunk, PictureSource};

    struct OneSong {
        png: Vec<u8>,
        fetches: Arc<AtomicUsize>,
    }

    impl PictureSource for OneSong {
        fn current_song_uri(&mut self) -> Result<Option<String>> {
            Ok(Some("a/b/01.flac".to_string()))
        }

        fn fetch_picture(&mut self, _: FetchCommand, _: &str, offset: usize) -> Result<Option<PictureChunk>> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            Ok(Some(PictureChunk {
                total_size: self.png.len(),
                data: self.png[offset..].to_vec(),
            }))
        }
    }

    fn png(w: u32, h: u32) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(RgbImage::from_pixel(w, h, Rgb([1, 2, 3])))
            .write_to(&mut buf, ImageFormat::Png)
            .unwrap();
        buf.into_inner()
    }

    fn worker(fetches: Arc<AtomicUsize>) -> Worker {
        let config = ArtworkConfig::default();
        let source = OneSong { png: png(32, 32), fetches };
        Worker::new(
            SourceResolver::new(Box::new(source), &config),
            ProtocolBackend::EscapeSequence(EscapeSequenceBackend::new(5)),
            &config,
        )
    }

    fn snap(x: u16, width: u16, visible: bool) -> Snapshot {
        Snapshot {
            geometry: WindowGeometry::new(x, 1, width, 10),
            terminal: TerminalSize::new(80, 24, 640, 480),
            visible,
        }
    }

    fn actions(out: &RenderOutput) -> Vec<String> {
        parse_apc(&out.bytes)
            .into_iter()
            .map(|(keys, _)| keys.split(',').next().unwrap_or_default().to_string())
            .collect()
    }

    #[test]
    fn update_renders_and_caches() {
        let mut w = worker(Arc::default());
        let out = w.process(Task::Update(snap(0, 20, true))).unwrap().unwrap();
        assert_eq!(actions(&out).first().map(String::as_str), Some("a=t"));
        assert_eq!(actions(&out).last().map(String::as_str), Some("a=p"));
        assert_eq!(w.cache().len(), 1);
        assert_eq!(w.state(), WorkerState::Idle);
    }

    #[test]
    fn move_with_same_pixels_only_repositions() {
        let fetches = Arc::new(AtomicUsize::new(0));
        let mut w = worker(Arc::clone(&fetches));
        w.process(Task::Update(snap(0, 20, true))).unwrap();
        let before = fetches.load(Ordering::SeqCst);

        let out = w.process(Task::Move(snap(30, 20, true))).unwrap().unwrap();
        assert_eq!(actions(&out), vec!["a=d", "a=p"]);
        // 160x200 像素面板，封面 160x160 垂直居中
        assert_eq!((out.x, out.y), (30, 2));
        assert_eq!(fetches.load(Ordering::SeqCst), before);
    }

    #[test]
    fn hidden_panel_defers_and_redraws_on_show() {
        let mut w = worker(Arc::default());
        w.process(Task::VisibilityChanged(snap(0, 20, false))).unwrap();
        assert!(w.process(Task::Update(snap(0, 20, false))).unwrap().is_none());
        assert!(w.cache().is_empty());

        let out = w.process(Task::VisibilityChanged(snap(0, 20, true))).unwrap().unwrap();
        assert!(actions(&out).contains(&"a=t".to_string()));
        assert_eq!(w.cache().len(), 1);
    }

    #[test]
    fn hiding_clears_screen_but_keeps_art() {
        let mut w = worker(Arc::default());
        w.process(Task::Update(snap(0, 20, true))).unwrap();
        let out = w.process(Task::VisibilityChanged(snap(0, 20, false))).unwrap().unwrap();
        assert_eq!(actions(&out), vec!["a=d"]);

        let out = w.process(Task::VisibilityChanged(snap(0, 20, true))).unwrap().unwrap();
        assert_eq!(actions(&out).last().map(String::as_str), Some("a=p"));
    }

    #[test]
    fn move_brings_art_back_after_panel_collapsed() {
        let fetches = Arc::new(AtomicUsize::new(0));
        let mut w = worker(Arc::clone(&fetches));
        w.process(Task::Update(snap(0, 20, true))).unwrap();
        let before = fetches.load(Ordering::SeqCst);

        let cleared = w.process(Task::Move(snap(0, 0, true))).unwrap().unwrap();
        assert_eq!(actions(&cleared), vec!["a=d"]);

        let out = w
            .process(Task::Move(snap(0, 20, true)))
            .unwrap()
            .expect("art redrawn once the panel regrows");
        assert!(actions(&out).contains(&"a=t".to_string()));
        assert_eq!(actions(&out).last().map(String::as_str), Some("a=p"));
        assert_eq!(fetches.load(Ordering::SeqCst), before);
    }

    #[test]
    fn update_into_empty_panel_draws_on_next_move() {
        let mut w = worker(Arc::default());
        assert!(w.process(Task::Update(snap(0, 0, true))).unwrap().is_none());

        let out = w.process(Task::Move(snap(0, 20, true))).unwrap().unwrap();
        assert_eq!(actions(&out).last().map(String::as_str), Some("a=p"));
        assert_eq!(w.cache().len(), 1);
    }

    #[test]
    fn move_after_remove_stays_cleared() {
        let mut w = worker(Arc::default());
        w.process(Task::Update(snap(0, 20, true))).unwrap();
        w.process(Task::Remove(snap(0, 20, true))).unwrap();
        assert!(w.process(Task::Move(snap(4, 20, true))).unwrap().is_none());
        assert_eq!(w.cache().len(), 1);
    }

    #[test]
    fn reset_wipes_cache_and_current_art() {
        let mut w = worker(Arc::default());
        w.process(Task::Update(snap(0, 20, true))).unwrap();
        w.process(Task::RemoveAndReset(snap(0, 20, true))).unwrap();
        assert!(w.cache().is_empty());
        assert!(w.process(Task::Move(snap(4, 20, true))).unwrap().is_none());
    }
}
