//! 进度汇总：把各阶段、各并发章节的进度合并为单一的非递减进度流

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

/// 单条进度事件
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressEvent {
    pub status_message: String,
    /// 取值范围 [0, 1]，同一次运行内非递减
    pub fraction: f64,
}

/// 进度接收方，可能被多个并发章节同时调用
pub trait ProgressSink: Send + Sync {
    fn on_progress(&self, event: &ProgressEvent);
}

impl<F> ProgressSink for F
where
    F: Fn(&ProgressEvent) + Send + Sync,
{
    fn on_progress(&self, event: &ProgressEvent) {
        self(event)
    }
}

struct ReporterInner {
    sink: Option<Arc<dyn ProgressSink>>,
    state: Mutex<ReporterState>,
}

#[derive(Default)]
struct ReporterState {
    high_water: f64,
    /// 已定值、尚未交给接收方的事件
    pending: VecDeque<ProgressEvent>,
    /// 是否已有调用方在向接收方投递
    draining: bool,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// 一次运行的进度游标
///
/// 内部保存已发出的最大值，低于该值的进度会被抬到该值再发出。
/// 事件在锁内定值并排队，由同一时刻唯一的投递方在锁外按序交给接收方，
/// 因此接收方看到的序列一定非递减，且接收方可以再次调用 `report`。
#[derive(Clone)]
pub struct ProgressReporter {
    inner: Arc<ReporterInner>,
}

impl ProgressReporter {
    pub fn new(sink: Arc<dyn ProgressSink>) -> Self {
        Self {
            inner: Arc::new(ReporterInner {
                sink: Some(sink),
                state: Mutex::new(ReporterState::default()),
            }),
        }
    }

    /// 不输出任何事件的游标
    pub fn silent() -> Self {
        Self {
            inner: Arc::new(ReporterInner {
                sink: None,
                state: Mutex::new(ReporterState::default()),
            }),
        }
    }

    pub fn report(&self, message: impl Into<String>, fraction: f64) {
        let mut state = lock(&self.inner.state);
        let fraction = clamp_unit(fraction).max(state.high_water);
        state.high_water = fraction;

        let Some(sink) = &self.inner.sink else {
            return;
        };
        state.pending.push_back(ProgressEvent {
            status_message: message.into(),
            fraction,
        });
        if state.draining {
            return;
        }

        state.draining = true;
        loop {
            let Some(event) = state.pending.pop_front() else {
                break;
            };
            drop(state);
            sink.on_progress(&event);
            state = lock(&self.inner.state);
        }
        state.draining = false;
    }

    /// 当前已发出的最大进度
    pub fn current(&self) -> f64 {
        lock(&self.inner.state).high_water
    }

    /// 划出 [start, end] 子区间
    pub fn range(&self, start: f64, end: f64) -> ProgressRange {
        let start = clamp_unit(start);
        ProgressRange {
            reporter: self.clone(),
            start,
            end: clamp_unit(end).max(start),
        }
    }
}

/// 整体进度中的一个连续区间，局部进度 [0, 1] 线性映射到该区间
#[derive(Clone)]
pub struct ProgressRange {
    reporter: ProgressReporter,
    start: f64,
    end: f64,
}

impl ProgressRange {
    pub fn start(&self) -> f64 {
        self.start
    }

    pub fn end(&self) -> f64 {
        self.end
    }

    pub fn report(&self, message: impl Into<String>, local: f64) {
        let fraction = self.start + (self.end - self.start) * clamp_unit(local);
        self.reporter.report(message, fraction);
    }

    /// 把区间等分给 `count` 个并发单元，每个单元只能推进自己那一份
    pub fn split(&self, count: usize) -> SlicedProgress {
        SlicedProgress {
            range: self.clone(),
            slots: Arc::new(Mutex::new(vec![0.0; count])),
        }
    }
}

/// 被等分的区间，区间进度等于各份进度之和
#[derive(Clone)]
pub struct SlicedProgress {
    range: ProgressRange,
    slots: Arc<Mutex<Vec<f64>>>,
}

impl SlicedProgress {
    pub fn slot(&self, index: usize) -> ProgressSlice {
        ProgressSlice {
            range: self.range.clone(),
            slots: self.slots.clone(),
            index,
        }
    }
}

/// 分配给单个并发单元的那一份进度
#[derive(Clone)]
pub struct ProgressSlice {
    range: ProgressRange,
    slots: Arc<Mutex<Vec<f64>>>,
    index: usize,
}

impl ProgressSlice {
    pub fn report(&self, message: impl Into<String>, local: f64) {
        let total = {
            let mut slots = lock(&self.slots);
            let Some(slot) = slots.get_mut(self.index) else {
                return;
            };
            *slot = slot.max(clamp_unit(local));
            slots.iter().sum::<f64>() / slots.len() as f64
        };
        self.range.report(message, total);
    }
}
