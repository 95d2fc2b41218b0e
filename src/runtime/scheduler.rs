//! Schedulers that resume suspended transitions.
//!
//! When an enter, exit or from-to handler suspends, the rest of the
//! transition is handed to a [`Scheduler`] as one task. The scheduler must
//! eventually run the task to completion; no ordering relative to other
//! scheduled work is required.

use futures::future::BoxFuture;
use tracing::error;

/// A unit of suspended work.
pub type Task = BoxFuture<'static, ()>;

/// Runs suspended transitions to completion.
pub trait Scheduler: Send + Sync {
    fn spawn(&self, task: Task);
}

impl<F> Scheduler for F
where
    F: Fn(Task) + Send + Sync,
{
    fn spawn(&self, task: Task) {
        self(task)
    }
}

/// Runs each task on its own OS thread with a blocking executor.
///
/// Needs no async runtime, at the cost of one thread per suspended
/// transition.
#[derive(Clone, Copy, Debug, Default)]
pub struct ThreadScheduler;

impl Scheduler for ThreadScheduler {
    fn spawn(&self, task: Task) {
        let spawned = std::thread::Builder::new()
            .name("settle-transition".to_string())
            .spawn(move || futures::executor::block_on(task));
        if let Err(e) = spawned {
            error!("failed to start thread for suspended transition: {}", e);
        }
    }
}

#[cfg(feature = "tokio")]
pub use self::tokio_scheduler::TokioScheduler;

#[cfg(feature = "tokio")]
mod tokio_scheduler {
    use super::{Scheduler, Task, ThreadScheduler};
    use tokio::runtime::Handle;
    use tracing::warn;

    /// Spawns tasks on a tokio runtime.
    ///
    /// Without an explicit handle, the runtime the caller is running on is
    /// looked up each time a task is spawned. If there is none the task runs
    /// on a [`ThreadScheduler`] thread instead.
    #[derive(Clone, Debug, Default)]
    pub struct TokioScheduler {
        handle: Option<Handle>,
    }

    impl TokioScheduler {
        /// Spawn on whichever runtime is current at spawn time.
        pub fn new() -> Self {
            Self { handle: None }
        }

        /// Always spawn on `handle`.
        pub fn with_handle(handle: Handle) -> Self {
            Self {
                handle: Some(handle),
            }
        }
    }

    impl Scheduler for TokioScheduler {
        fn spawn(&self, task: Task) {
            let handle = match &self.handle {
                Some(handle) => handle.clone(),
                None => match Handle::try_current() {
                    Ok(handle) => handle,
                    Err(e) => {
                        warn!("no tokio runtime, resuming transition on a thread: {}", e);
                        ThreadScheduler.spawn(task);
                        return;
                    }
                },
            };
            handle.spawn(task);
        }
    }
}

/// The scheduler machines use unless configured otherwise.
pub(crate) fn default_scheduler() -> std::sync::Arc<dyn Scheduler> {
    #[cfg(feature = "tokio")]
    {
        std::sync::Arc::new(TokioScheduler::new())
    }
    #[cfg(not(feature = "tokio"))]
    {
        std::sync::Arc::new(ThreadScheduler)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;
    use std::sync::mpsc;

    #[test]
    fn thread_scheduler_runs_task() {
        let (tx, rx) = mpsc::channel();
        ThreadScheduler.spawn(
            async move {
                tx.send(42).unwrap();
            }
            .boxed(),
        );
        assert_eq!(rx.recv().unwrap(), 42);
    }

    #[test]
    fn closures_are_schedulers() {
        let scheduler = |task: Task| futures::executor::block_on(task);
        let (tx, rx) = mpsc::channel();
        scheduler.spawn(
            async move {
                tx.send("ran").unwrap();
            }
            .boxed(),
        );
        assert_eq!(rx.try_recv().unwrap(), "ran");
    }

    #[cfg(feature = "tokio")]
    #[tokio::test]
    async fn tokio_scheduler_uses_current_runtime() {
        let (tx, rx) = tokio::sync::oneshot::channel();
        TokioScheduler::new().spawn(
            async move {
                tx.send(7).unwrap();
            }
            .boxed(),
        );
        assert_eq!(rx.await.unwrap(), 7);
    }

    #[cfg(feature = "tokio")]
    #[test]
    fn tokio_scheduler_falls_back_to_thread() {
        let (tx, rx) = mpsc::channel();
        TokioScheduler::new().spawn(
            async move {
                tx.send("ran").unwrap();
            }
            .boxed(),
        );
        assert_eq!(rx.recv().unwrap(), "ran");
    }
}
