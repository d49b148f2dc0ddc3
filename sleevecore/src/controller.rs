//! UI 线程使用的封面控制器：把界面事件转成任务，转交 worker 的输出。

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tracing::{debug, info, warn};

use crate::backend::ProtocolBackend;
use crate::config::ArtworkConfig;
use crate::error::Result;
use crate::handshake::DrawHandshake;
use crate::model::{RenderOutput, Snapshot, Task, TerminalInfo, WindowGeometry};
use crate::queue::TaskQueue;
use crate::source::{PictureSource, SourceResolver};
use crate::worker::{Notifier, Worker};

struct Shared {
    queue: TaskQueue,
    handshake: DrawHandshake,
}

struct Running {
    shared: Arc<Shared>,
    thread: JoinHandle<()>,
    terminal: Arc<dyn TerminalInfo>,
}

pub struct ArtworkController {
    running: Option<Running>,
    geometry: WindowGeometry,
    visible: bool,
    status: Option<String>,
}

impl ArtworkController {
    /// 按配置构造后端并启动 worker；后端不可用时返回禁用的控制器并附带状态消息
    pub fn start(
        config: &ArtworkConfig,
        source: Box<dyn PictureSource>,
        terminal: Arc<dyn TerminalInfo>,
        notifier: Option<Notifier>,
    ) -> Self {
        if !config.enabled {
            info!("artwork disabled by configuration");
            return Self::disabled(None);
        }
        let backend = match ProtocolBackend::from_config(config) {
            Ok(backend) => backend,
            Err(e) => {
                warn!("{e}");
                return Self::disabled(Some(format!("Artwork disabled: {e}")));
            }
        };
        let worker = Worker::new(SourceResolver::new(source, config), backend, config);
        match Self::spawn(worker, terminal, notifier) {
            Ok(controller) => controller,
            Err(e) => {
                warn!("failed to start artwork worker: {e}");
                Self::disabled(Some(format!("Artwork disabled: {e}")))
            }
        }
    }

    /// 用现成的 worker 启动后台线程
    pub fn spawn(worker: Worker, terminal: Arc<dyn TerminalInfo>, notifier: Option<Notifier>) -> Result<Self> {
        let shared = Arc::new(Shared {
            queue: TaskQueue::new(),
            handshake: DrawHandshake::new(),
        });
        let thread = {
            let shared = Arc::clone(&shared);
            thread::Builder::new()
                .name("artwork-worker".to_string())
                .spawn(move || worker.run(&shared.queue, &shared.handshake, notifier.as_ref()))?
        };
        Ok(Self {
            running: Some(Running {
                shared,
                thread,
                terminal,
            }),
            geometry: WindowGeometry::default(),
            visible: true,
            status: None,
        })
    }

    /// 不显示封面的控制器，所有请求都被忽略
    pub fn disabled(reason: Option<String>) -> Self {
        Self {
            running: None,
            geometry: WindowGeometry::default(),
            visible: true,
            status: reason,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.running
            .as_ref()
            .is_some_and(|r| !r.shared.queue.is_exiting())
    }

    /// 记录面板位置，返回是否发生变化
    pub fn set_geometry(&mut self, geometry: WindowGeometry) -> bool {
        if self.geometry == geometry {
            return false;
        }
        self.geometry = geometry;
        true
    }

    fn enqueue(&self, make: impl FnOnce(Snapshot) -> Task) {
        let Some(running) = &self.running else {
            return;
        };
        let snapshot = Snapshot {
            geometry: self.geometry,
            terminal: running.terminal.size(),
            visible: self.visible,
        };
        if running.shared.queue.push(make(snapshot)) {
            running.shared.handshake.wake();
        }
    }

    pub fn request_update(&self) {
        self.enqueue(Task::Update);
    }

    pub fn request_update_for(&self, uri: impl Into<String>) {
        let uri = uri.into();
        self.enqueue(|snapshot| Task::UpdateForUri { uri, snapshot });
    }

    pub fn request_move(&self) {
        self.enqueue(Task::Move);
    }

    pub fn request_remove(&self, reset_position: bool) {
        if reset_position {
            self.enqueue(Task::RemoveAndReset);
        } else {
            self.enqueue(Task::Remove);
        }
    }

    pub fn on_visibility_changed(&mut self, visible: bool) {
        self.visible = visible;
        self.enqueue(Task::VisibilityChanged);
    }

    /// 每次 UI 重绘调用一次；返回值须原样写入终端，返回即视为已写入
    pub fn drain_ready_output(&self) -> Option<RenderOutput> {
        self.running.as_ref()?.shared.handshake.take()
    }

    pub fn take_status(&mut self) -> Option<String> {
        self.status.take().or_else(|| {
            self.running
                .as_ref()
                .and_then(|r| r.shared.handshake.take_status())
        })
    }

    /// 请求 worker 退出并等待线程结束
    pub fn shutdown(&mut self) {
        let Some(running) = self.running.take() else {
            return;
        };
        running.shared.queue.request_exit();
        running.shared.handshake.wake();
        if running.thread.join().is_err() {
            warn!("artwork worker panicked");
        }
        debug!("artwork controller shut down");
    }
}

impl Drop for ArtworkController {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_controller_ignores_requests() {
        let mut controller = ArtworkController::disabled(Some("no backend".into()));
        controller.request_update();
        controller.request_move();
        controller.request_remove(true);
        controller.on_visibility_changed(false);
        assert!(!controller.is_enabled());
        assert!(controller.drain_ready_output().is_none());
        assert_eq!(controller.take_status().as_deref(), Some("no backend"));
        assert!(controller.take_status().is_none());
    }

    #[test]
    fn geometry_change_is_structural() {
        let mut controller = ArtworkController::disabled(None);
        assert!(controller.set_geometry(WindowGeometry::new(1, 1, 10, 10)));
        assert!(!controller.set_geometry(WindowGeometry::new(1, 1, 10, 10)));
        assert!(controller.set_geometry(WindowGeometry::new(1, 1, 11, 10)));
    }
}
