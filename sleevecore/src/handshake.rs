//! worker → UI 的绘制握手：同一时刻最多一份输出等待写入终端。
//!
//! 加锁顺序固定为 slot → queue；入队方先释放队列锁再锁 slot 唤醒，不嵌套。

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

use crate::model::RenderOutput;
use crate::queue::TaskQueue;

struct DrawSlot {
    pending: Option<RenderOutput>,
    drawn: bool,
    status: Option<String>,
}

/// `wait_drawn` 的结束原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawWait {
    /// UI 已写入终端
    Drawn,
    /// 队列里出现了清除任务，未写入的输出被收回
    Retracted,
    Exit,
}

pub struct DrawHandshake {
    slot: Mutex<DrawSlot>,
    signal: Condvar,
}

impl Default for DrawHandshake {
    fn default() -> Self {
        Self::new()
    }
}

impl DrawHandshake {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(DrawSlot {
                pending: None,
                drawn: true,
                status: None,
            }),
            signal: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, DrawSlot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// worker 交出输出，`drawn` 置为 false
    pub fn publish(&self, output: RenderOutput) {
        let mut slot = self.lock();
        slot.pending = Some(output);
        slot.drawn = false;
    }

    /// UI 线程每次重绘调用；取走输出即视为已写入终端并通知 worker
    pub fn take(&self) -> Option<RenderOutput> {
        let output = {
            let mut slot = self.lock();
            let output = slot.pending.take()?;
            slot.drawn = true;
            output
        };
        self.signal.notify_all();
        Some(output)
    }

    /// 阻塞直到 UI 写入，或出现需要撤回输出的清除任务，或退出
    pub fn wait_drawn(&self, queue: &TaskQueue) -> DrawWait {
        let mut slot = self.lock();
        loop {
            if slot.drawn {
                return DrawWait::Drawn;
            }
            if queue.is_exiting() {
                slot.pending = None;
                slot.drawn = true;
                return DrawWait::Exit;
            }
            if queue.has_pending_removal() && slot.pending.take().is_some() {
                slot.drawn = true;
                return DrawWait::Retracted;
            }
            slot = self.signal.wait(slot).unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// 队列状态变化后唤醒等待中的 worker 重新检查
    pub fn wake(&self) {
        let _slot = self.lock();
        self.signal.notify_all();
    }

    pub fn post_status(&self, message: String) {
        self.lock().status = Some(message);
    }

    pub fn take_status(&self) -> Option<String> {
        self.lock().status.take()
    }
}
