use super::{TerminalSize, WindowGeometry};

/// 入队时拷贝的 UI 状态快照，任务不持有任何 UI 引用
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Snapshot {
    pub geometry: WindowGeometry,
    pub terminal: TerminalSize,
    pub visible: bool,
}

/// UI 线程提交给后台 worker 的任务
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Task {
    /// 重绘当前播放歌曲的封面
    Update(Snapshot),
    /// 重绘指定歌曲的封面
    UpdateForUri { uri: String, snapshot: Snapshot },
    /// 面板几何变化，内容不变
    Move(Snapshot),
    /// 清除屏幕上的封面
    Remove(Snapshot),
    /// 清除封面并丢弃后端记录的放置状态
    RemoveAndReset(Snapshot),
    VisibilityChanged(Snapshot),
}

/// 合并规则按类别判断
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskClass {
    Update,
    Move,
    Remove,
    Visibility,
}

impl Task {
    pub fn class(&self) -> TaskClass {
        match self {
            Task::Update(_) | Task::UpdateForUri { .. } => TaskClass::Update,
            Task::Move(_) => TaskClass::Move,
            Task::Remove(_) | Task::RemoveAndReset(_) => TaskClass::Remove,
            Task::VisibilityChanged(_) => TaskClass::Visibility,
        }
    }

    pub fn snapshot(&self) -> &Snapshot {
        match self {
            Task::Update(s)
            | Task::Move(s)
            | Task::Remove(s)
            | Task::RemoveAndReset(s)
            | Task::VisibilityChanged(s) => s,
            Task::UpdateForUri { snapshot, .. } => snapshot,
        }
    }

    pub fn snapshot_mut(&mut self) -> &mut Snapshot {
        match self {
            Task::Update(s)
            | Task::Move(s)
            | Task::Remove(s)
            | Task::RemoveAndReset(s)
            | Task::VisibilityChanged(s) => s,
            Task::UpdateForUri { snapshot, .. } => snapshot,
        }
    }

    pub fn is_reset(&self) -> bool {
        matches!(self, Task::RemoveAndReset(_))
    }

    /// 是否参与防抖（快速缩放时只画最后一帧）
    pub fn is_debounced(&self) -> bool {
        matches!(self.class(), TaskClass::Update | TaskClass::Move)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Task::Update(_) => "update",
            Task::UpdateForUri { .. } => "update-uri",
            Task::Move(_) => "move",
            Task::Remove(_) => "remove",
            Task::RemoveAndReset(_) => "remove-reset",
            Task::VisibilityChanged(_) => "visibility",
        }
    }
}
