//! Serialized, cancellable units of work on a shared bounded pool.
//!
//! A unit moves `Pending -> Running -> Finished`, or through `Cancelled` on
//! its way to `Finished`. Once finished it never runs again. A unit may name a
//! predecessor; it does not start before that predecessor finishes, whatever
//! the predecessor's outcome, which gives strict FIFO order along a chain.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::{watch, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskId(Uuid);

impl TaskId {
    fn new() -> Self { Self(Uuid::new_v4()) }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Pending,
    Running,
    /// Cancellation requested; the unit is winding down.
    Cancelled,
    Finished,
}

#[derive(Debug)]
struct TaskInner {
    id: TaskId,
    predecessor: Option<TaskId>,
    // The watch lock is the single guard for the state; readers never see a torn pair.
    state: watch::Sender<TaskState>,
    cancel: CancellationToken,
}

/// Shared handle to one unit. Cheap to clone.
#[derive(Debug, Clone)]
pub struct TaskHandle {
    inner: Arc<TaskInner>,
}

impl TaskHandle {
    fn new(predecessor: Option<TaskId>) -> Self {
        let (state, _) = watch::channel(TaskState::Pending);
        Self { inner: Arc::new(TaskInner { id: TaskId::new(), predecessor, state, cancel: CancellationToken::new() }) }
    }

    pub fn id(&self) -> TaskId { self.inner.id }
    pub fn predecessor(&self) -> Option<TaskId> { self.inner.predecessor }
    pub fn state(&self) -> TaskState { *self.inner.state.borrow() }
    pub fn is_executing(&self) -> bool { self.state() == TaskState::Running }
    pub fn is_finished(&self) -> bool { self.state() == TaskState::Finished }
    pub fn is_cancelled(&self) -> bool { self.inner.cancel.is_cancelled() }

    /// Request cancellation. A pending unit will skip its work; a running
    /// unit has its work future dropped at the next await point.
    pub fn cancel(&self) {
        self.inner.cancel.cancel();
        self.transition(|s| matches!(s, TaskState::Pending | TaskState::Running).then_some(TaskState::Cancelled));
    }

    /// Resolves once the unit is finished, whatever the outcome.
    pub async fn finished(&self) {
        let mut rx = self.inner.state.subscribe();
        // The sender lives as long as `self`, so this cannot observe a closed channel.
        let _ = rx.wait_for(|s| *s == TaskState::Finished).await;
    }

    pub(crate) fn cancellation(&self) -> CancellationToken { self.inner.cancel.clone() }

    fn transition(&self, next: impl FnOnce(TaskState) -> Option<TaskState>) -> bool {
        self.inner.state.send_if_modified(|s| match next(*s) {
            Some(n) => { *s = n; true }
            None => false,
        })
    }

    fn begin(&self) -> bool {
        let cancel = &self.inner.cancel;
        self.transition(|s| (s == TaskState::Pending && !cancel.is_cancelled()).then_some(TaskState::Running))
    }

    fn finish(&self) {
        self.transition(|s| (s != TaskState::Finished).then_some(TaskState::Finished));
    }
}

/// Bounded worker pool. Clones share the same pool and runtime.
///
/// Units run on the runtime captured at construction, so [`TaskQueue::submit`]
/// may be called from any thread.
#[derive(Debug, Clone)]
pub struct TaskQueue {
    permits: Arc<Semaphore>,
    runtime: Handle,
}

impl TaskQueue {
    /// Pool on the current Tokio runtime. Panics outside of one; use
    /// [`TaskQueue::with_runtime`] there.
    pub fn new(max_concurrent: usize) -> Self {
        Self::with_runtime(max_concurrent, Handle::current())
    }

    pub fn with_runtime(max_concurrent: usize, runtime: Handle) -> Self {
        Self { permits: Arc::new(Semaphore::new(max_concurrent.max(1))), runtime }
    }

    /// Schedule `work`, optionally behind `predecessor`.
    ///
    /// The unit is marked finished when `work` completes or when it is
    /// cancelled, so work never has to finish itself.
    pub fn submit<F, Fut>(&self, predecessor: Option<TaskHandle>, work: F) -> TaskHandle
    where
        F: FnOnce(TaskHandle) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let task = TaskHandle::new(predecessor.as_ref().map(TaskHandle::id));
        let handle = task.clone();
        let permits = self.permits.clone();

        self.runtime.spawn(async move {
            // Even a cancelled unit waits for its predecessor, otherwise a unit
            // further down the chain could overtake it.
            if let Some(prev) = predecessor {
                prev.finished().await;
            }
            if task.is_cancelled() {
                debug!(task = %task.id(), "cancelled before start");
                task.finish();
                return;
            }
            let token = task.cancellation();
            let permit = tokio::select! {
                permit = permits.acquire_owned() => permit.ok(),
                _ = token.cancelled() => None,
            };
            let Some(_permit) = permit else {
                task.finish();
                return;
            };
            if !task.begin() {
                task.finish();
                return;
            }
            debug!(task = %task.id(), "running");
            tokio::select! {
                biased;
                _ = token.cancelled() => debug!(task = %task.id(), "cancelled while running"),
                _ = work(task.clone()) => {}
            }
            task.finish();
        });

        handle
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::time::sleep;

    #[tokio::test]
    async fn cancelled_before_start_skips_work() {
        let queue = TaskQueue::new(1);
        let gate = queue.submit(None, |_| sleep(Duration::from_millis(50)));
        let ran = Arc::new(AtomicBool::new(false));
        let flag = ran.clone();
        let task = queue.submit(Some(gate), move |_| async move { flag.store(true, Ordering::SeqCst); });
        task.cancel();
        task.finished().await;
        assert!(!ran.load(Ordering::SeqCst));
        assert!(task.is_finished());
        assert!(task.is_cancelled());
        assert!(!task.is_executing());
    }

    #[tokio::test]
    async fn chained_units_run_in_submission_order() {
        let queue = TaskQueue::new(4);
        let order = Arc::new(Mutex::new(Vec::new()));
        let mut prev: Option<TaskHandle> = None;
        // Earlier units sleep longer, so without the chain they would finish last.
        for i in 0..4u64 {
            let order = order.clone();
            let t = queue.submit(prev.clone(), move |_| async move {
                sleep(Duration::from_millis(40 - i * 10)).await;
                order.lock().push(i);
            });
            assert_eq!(t.predecessor(), prev.as_ref().map(TaskHandle::id));
            prev = Some(t);
        }
        prev.unwrap().finished().await;
        assert_eq!(*order.lock(), vec![0, 1, 2, 3]);
    }

    #[tokio::test]
    async fn cancelling_a_running_unit_drops_its_work() {
        let queue = TaskQueue::new(1);
        let completed = Arc::new(AtomicBool::new(false));
        let flag = completed.clone();
        let task = queue.submit(None, move |_| async move {
            sleep(Duration::from_secs(5)).await;
            flag.store(true, Ordering::SeqCst);
        });
        while !task.is_executing() { tokio::task::yield_now().await; }
        task.cancel();
        task.finished().await;
        assert!(!completed.load(Ordering::SeqCst));
        assert_eq!(task.state(), TaskState::Finished);

        // Finished is terminal.
        task.cancel();
        assert_eq!(task.state(), TaskState::Finished);
    }

    #[tokio::test]
    async fn cancelled_middle_unit_keeps_chain_order() {
        let queue = TaskQueue::new(4);
        let order = Arc::new(Mutex::new(Vec::new()));
        let o = order.clone();
        let a = queue.submit(None, move |_| async move { sleep(Duration::from_millis(40)).await; o.lock().push("a"); });
        let b = queue.submit(Some(a.clone()), |_| async {});
        b.cancel();
        let o = order.clone();
        let c = queue.submit(Some(b.clone()), move |_| async move { o.lock().push("c"); });
        c.finished().await;
        assert!(a.is_finished());
        assert_eq!(*order.lock(), vec!["a", "c"]);
    }

    #[tokio::test]
    async fn pool_bounds_concurrency() {
        let queue = TaskQueue::new(2);
        let live = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let handles: Vec<_> = (0..6)
            .map(|_| {
                let (live, peak) = (live.clone(), peak.clone());
                queue.submit(None, move |_| async move {
                    let now = live.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    sleep(Duration::from_millis(20)).await;
                    live.fetch_sub(1, Ordering::SeqCst);
                })
            })
            .collect();
        for h in &handles { h.finished().await; }
        assert!(peak.load(Ordering::SeqCst) <= 2);
        assert!(handles.iter().all(|h| h.is_finished() && !h.is_executing()));
    }

    #[test]
    fn submit_works_from_a_thread_without_a_runtime() {
        let rt = tokio::runtime::Builder::new_multi_thread().worker_threads(1).enable_all().build().unwrap();
        let queue = TaskQueue::with_runtime(1, rt.handle().clone());
        let ran = Arc::new(AtomicBool::new(false));
        let flag = ran.clone();
        let task = queue.submit(None, move |_| async move { flag.store(true, Ordering::SeqCst); });
        rt.block_on(task.finished());
        assert!(ran.load(Ordering::SeqCst));
    }
}
