//! UI → worker 任务队列：互斥锁 + 条件变量，入队时就地合并。

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tracing::trace;

use crate::model::{Task, TaskClass};

#[derive(Default)]
struct QueueState {
    tasks: VecDeque<Task>,
    exit: bool,
}

#[derive(Default)]
pub struct TaskQueue {
    state: Mutex<QueueState>,
    ready: Condvar,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// 入队并唤醒 worker，不会阻塞；已请求退出时丢弃任务并返回 false
    pub fn push(&self, task: Task) -> bool {
        {
            let mut state = self.lock();
            if state.exit {
                trace!(task = task.name(), "queue closed, task dropped");
                return false;
            }
            coalesce(&mut state.tasks, task);
        }
        self.ready.notify_one();
        true
    }

    pub fn request_exit(&self) {
        {
            let mut state = self.lock();
            state.exit = true;
            state.tasks.clear();
        }
        self.ready.notify_all();
    }

    pub fn is_exiting(&self) -> bool {
        self.lock().exit
    }

    /// 队列中是否有清除任务（用于撤回尚未绘制的输出）
    pub fn has_pending_removal(&self) -> bool {
        self.lock().tasks.iter().any(|t| t.class() == TaskClass::Remove)
    }

    pub fn len(&self) -> usize {
        self.lock().tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 取下一个任务，队列为空时阻塞；退出时返回 `None`。
    ///
    /// 上一个任务结束不足 `debounce` 时，Update/Move 类任务先等到阈值，
    /// 期间入队的新任务会就地合并掉它。
    pub fn next(&self, debounce: Duration, last_finished: Option<Instant>) -> Option<Task> {
        let mut state = self.lock();
        loop {
            if state.exit {
                state.tasks.clear();
                return None;
            }
            let Some(front) = state.tasks.front() else {
                state = self.ready.wait(state).unwrap_or_else(PoisonError::into_inner);
                continue;
            };
            let remaining = last_finished
                .filter(|_| front.is_debounced())
                .and_then(|at| debounce.checked_sub(at.elapsed()))
                .filter(|d| !d.is_zero());
            if let Some(remaining) = remaining {
                trace!(task = front.name(), ?remaining, "debouncing");
                state = self
                    .ready
                    .wait_timeout(state, remaining)
                    .unwrap_or_else(PoisonError::into_inner)
                    .0;
                continue;
            }
            return state.tasks.pop_front();
        }
    }
}

/// 把 `incoming` 并入队列，去掉被它取代的旧任务
fn coalesce(tasks: &mut VecDeque<Task>, incoming: Task) {
    match incoming.class() {
        TaskClass::Update => {
            tasks.retain(|t| !matches!(t.class(), TaskClass::Update | TaskClass::Move));
        }
        TaskClass::Move => {
            tasks.retain(|t| t.class() != TaskClass::Move);
            // 队尾的 Update 尚未执行，按新几何绘制即可，Move 并入其中
            if let Some(last) = tasks.back_mut() {
                if last.class() == TaskClass::Update {
                    *last.snapshot_mut() = *incoming.snapshot();
                    return;
                }
            }
        }
        TaskClass::Remove => {
            let mut reset = incoming.is_reset();
            tasks.retain(|t| match t.class() {
                TaskClass::Update | TaskClass::Move => false,
                TaskClass::Remove => {
                    reset |= t.is_reset();
                    false
                }
                TaskClass::Visibility => true,
            });
            if reset && !incoming.is_reset() {
                tasks.push_back(Task::RemoveAndReset(*incoming.snapshot()));
                return;
            }
        }
        TaskClass::Visibility => {
            tasks.retain(|t| t.class() != TaskClass::Visibility);
        }
    }
    tasks.push_back(incoming);
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::*;
    use crate::model::{Snapshot, WindowGeometry};

    fn snap(width: u16) -> Snapshot {
        Snapshot {
            geometry: WindowGeometry::new(0, 0, width, 10),
            visible: true,
            ..Snapshot::default()
        }
    }

    fn drain(queue: &TaskQueue) -> Vec<Task> {
        let mut out = Vec::new();
        while !queue.is_empty() {
            out.extend(queue.next(Duration::ZERO, None));
        }
        out
    }

    #[test]
    fn burst_of_moves_collapses_to_latest() {
        let queue = TaskQueue::new();
        for w in 1..=5 {
            queue.push(Task::Move(snap(w)));
        }
        assert_eq!(drain(&queue), vec![Task::Move(snap(5))]);
    }

    #[test]
    fn move_refreshes_queued_update() {
        let queue = TaskQueue::new();
        queue.push(Task::Update(snap(1)));
        queue.push(Task::Move(snap(2)));
        assert_eq!(drain(&queue), vec![Task::Update(snap(2))]);
    }

    #[test]
    fn move_after_removal_is_kept() {
        let queue = TaskQueue::new();
        queue.push(Task::Update(snap(1)));
        queue.push(Task::Remove(snap(1)));
        queue.push(Task::Move(snap(3)));
        assert_eq!(drain(&queue), vec![Task::Remove(snap(1)), Task::Move(snap(3))]);
    }

    #[test]
    fn update_supersedes_update_and_move() {
        let queue = TaskQueue::new();
        queue.push(Task::Update(snap(1)));
        queue.push(Task::Remove(snap(1)));
        queue.push(Task::Move(snap(2)));
        queue.push(Task::UpdateForUri { uri: "b.flac".into(), snapshot: snap(3) });
        assert_eq!(
            drain(&queue),
            vec![
                Task::Remove(snap(1)),
                Task::UpdateForUri { uri: "b.flac".into(), snapshot: snap(3) },
            ]
        );
    }

    #[test]
    fn removal_supersedes_pending_work_and_keeps_reset() {
        let queue = TaskQueue::new();
        queue.push(Task::RemoveAndReset(snap(1)));
        queue.push(Task::Update(snap(2)));
        queue.push(Task::VisibilityChanged(snap(2)));
        queue.push(Task::Remove(snap(3)));
        assert_eq!(
            drain(&queue),
            vec![Task::VisibilityChanged(snap(2)), Task::RemoveAndReset(snap(3))]
        );
    }

    #[test]
    fn last_submitted_task_is_always_processed_last() {
        let make: [fn(u16) -> Task; 4] = [
            |w| Task::Update(snap(w)),
            |w| Task::Move(snap(w)),
            |w| Task::Remove(snap(w)),
            |w| Task::VisibilityChanged(snap(w)),
        ];
        // 所有长度为 4 的组合
        for n in 0..(4u32.pow(4)) {
            let queue = TaskQueue::new();
            let mut last = None;
            for i in 0..4u16 {
                let kind = (n / 4u32.pow(u32::from(i)) % 4) as usize;
                let task = make[kind](i + 1);
                last = Some(task.clone());
                queue.push(task);
            }
            let processed = drain(&queue);
            let last = last.unwrap();
            let tail = processed.last().unwrap();
            if last.class() == TaskClass::Move && tail.class() == TaskClass::Update {
                assert_eq!(tail.snapshot(), last.snapshot(), "sequence {n}");
            } else {
                assert_eq!(tail, &last, "sequence {n}");
            }
        }
    }

    #[test]
    fn exit_discards_queued_tasks_and_rejects_new_ones() {
        let queue = TaskQueue::new();
        queue.push(Task::Update(snap(1)));
        queue.request_exit();
        assert!(queue.next(Duration::ZERO, None).is_none());
        assert!(!queue.push(Task::Update(snap(2))));
        assert!(queue.is_empty());
    }

    #[test]
    fn blocked_worker_wakes_on_exit() {
        let queue = Arc::new(TaskQueue::new());
        let worker = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || queue.next(Duration::ZERO, None))
        };
        thread::sleep(Duration::from_millis(20));
        queue.request_exit();
        assert!(worker.join().unwrap().is_none());
    }

    #[test]
    fn debounce_lets_newer_task_replace_the_first() {
        let queue = Arc::new(TaskQueue::new());
        queue.push(Task::Move(snap(1)));
        let producer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(20));
                queue.push(Task::Move(snap(2)));
            })
        };
        let task = queue.next(Duration::from_millis(200), Some(Instant::now()));
        producer.join().unwrap();
        assert_eq!(task, Some(Task::Move(snap(2))));
    }

    #[test]
    fn removal_is_never_debounced() {
        let queue = TaskQueue::new();
        queue.push(Task::Remove(snap(1)));
        let started = Instant::now();
        let task = queue.next(Duration::from_secs(5), Some(Instant::now()));
        assert_eq!(task, Some(Task::Remove(snap(1))));
        assert!(started.elapsed() < Duration::from_secs(1));
        assert!(!queue.has_pending_removal());
    }
}
