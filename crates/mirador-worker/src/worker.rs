//! Generic worker supervisor: task dispatch loop and channel protocol.
//!
//! One executor runs on a dedicated OS thread and talks to its host over
//! three unbounded FIFO channels: tasks in, results out, fatal errors out.
//! All coordination is message-based; the handle holds nothing but channel
//! endpoints.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::thread::{self, JoinHandle};

use thiserror::Error;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

/// Control envelope on the task channel.
pub enum Control<T> {
    /// Dispatch one task to the executor.
    Run(T),
    /// Stop dispatching, drain the channel, terminate.
    Shutdown,
}

/// Fatal error envelope. Exactly one is pushed onto the error channel when
/// the worker dies; the worker never restarts itself.
#[derive(Debug, Clone, Error)]
#[error("worker terminated: {message}")]
pub struct FatalError {
    pub message: String,
}

/// Submitting to a worker whose task channel is gone.
#[derive(Debug, Error)]
#[error("worker is no longer accepting tasks")]
pub struct SubmitError;

/// A unit of execution the supervisor can drive.
pub trait TaskExecutor {
    type Task: Send + 'static;
    type Output: Send + 'static;
    type Error: fmt::Display;

    /// Execute one task. `Ok(None)` means the task produces no result.
    /// Any error is fatal for the worker.
    fn execute(&mut self, task: Self::Task) -> Result<Option<Self::Output>, Self::Error>;
}

/// Handle to a spawned worker: the three channel endpoints plus the thread.
pub struct WorkerHandle<T, R> {
    tasks: UnboundedSender<Control<T>>,
    results: UnboundedReceiver<R>,
    errors: UnboundedReceiver<FatalError>,
    thread: Option<JoinHandle<()>>,
}

impl<T, R> WorkerHandle<T, R> {
    /// Enqueue a task. Tasks are executed in submission order.
    pub fn submit(&self, task: T) -> Result<(), SubmitError> {
        self.tasks.send(Control::Run(task)).map_err(|_| SubmitError)
    }

    /// Request shutdown. Tasks enqueued before the sentinel still run;
    /// tasks enqueued after it are discarded during the drain phase.
    pub fn shutdown(&self) {
        let _ = self.tasks.send(Control::Shutdown);
    }

    pub fn try_result(&mut self) -> Option<R> {
        self.results.try_recv().ok()
    }

    /// Block until the next result, or `None` once the worker is gone and
    /// the channel is empty.
    pub fn wait_result(&mut self) -> Option<R> {
        self.results.blocking_recv()
    }

    pub fn try_error(&mut self) -> Option<FatalError> {
        self.errors.try_recv().ok()
    }

    /// Block until the worker reports a fatal error, or `None` once the
    /// worker has exited cleanly.
    pub fn wait_error(&mut self) -> Option<FatalError> {
        self.errors.blocking_recv()
    }

    /// Request shutdown and wait for the worker thread to finish.
    pub fn join(mut self) {
        self.shutdown();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

/// Spawn `executor` on a dedicated named OS thread and return the handle.
pub fn spawn<E>(name: &str, executor: E) -> WorkerHandle<E::Task, E::Output>
where
    E: TaskExecutor + Send + 'static,
{
    let (task_tx, task_rx) = mpsc::unbounded_channel();
    let (result_tx, result_rx) = mpsc::unbounded_channel();
    let (error_tx, error_rx) = mpsc::unbounded_channel();

    let thread = thread::Builder::new()
        .name(name.to_string())
        .spawn(move || run_worker(executor, task_rx, result_tx, error_tx))
        .expect("failed to spawn worker thread");

    WorkerHandle {
        tasks: task_tx,
        results: result_rx,
        errors: error_rx,
        thread: Some(thread),
    }
}

/// The dispatch loop. Public so the protocol can also be driven on a
/// caller-owned thread; [`spawn`] is the usual entry point.
///
/// Receives in FIFO order until the shutdown sentinel, then drains the
/// channel, discarding every queued task without executing it. A failing
/// (or panicking) task pushes one [`FatalError`] envelope and terminates
/// the loop immediately, skipping the drain.
pub fn run_worker<E: TaskExecutor>(
    mut executor: E,
    mut tasks: UnboundedReceiver<Control<E::Task>>,
    results: UnboundedSender<E::Output>,
    errors: UnboundedSender<FatalError>,
) {
    while let Some(control) = tasks.blocking_recv() {
        let task = match control {
            Control::Run(task) => task,
            Control::Shutdown => {
                drain(&mut tasks);
                tracing::info!("worker shut down");
                return;
            }
        };

        match panic::catch_unwind(AssertUnwindSafe(|| executor.execute(task))) {
            Ok(Ok(Some(output))) => {
                // the consumer may already be gone
                let _ = results.send(output);
            }
            Ok(Ok(None)) => {}
            Ok(Err(e)) => {
                tracing::error!(error = %e, "task execution failed, terminating worker");
                let _ = errors.send(FatalError {
                    message: e.to_string(),
                });
                return;
            }
            Err(_) => {
                tracing::error!("task execution panicked, terminating worker");
                let _ = errors.send(FatalError {
                    message: "task execution panicked".to_string(),
                });
                return;
            }
        }
    }

    // All task senders dropped: the channel is empty, nothing to drain.
    tracing::info!("task channel closed, worker exiting");
}

/// Post-shutdown drain: discard queued tasks without executing them, so no
/// task enqueued concurrently with shutdown is left in the channel.
fn drain<T>(tasks: &mut UnboundedReceiver<Control<T>>) {
    let mut discarded = 0usize;
    loop {
        match tasks.try_recv() {
            Ok(_) => discarded += 1,
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
        }
    }
    if discarded > 0 {
        tracing::debug!(discarded, "discarded tasks queued behind shutdown");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Records executed tasks; odd tasks produce a result, even ones don't.
    struct Recorder {
        executed: Arc<Mutex<Vec<u32>>>,
        fail_on: Option<u32>,
        panic_on: Option<u32>,
    }

    impl Recorder {
        fn new(executed: Arc<Mutex<Vec<u32>>>) -> Self {
            Self {
                executed,
                fail_on: None,
                panic_on: None,
            }
        }
    }

    #[derive(Debug, thiserror::Error)]
    #[error("task {0} failed")]
    struct RecorderError(u32);

    impl TaskExecutor for Recorder {
        type Task = u32;
        type Output = u32;
        type Error = RecorderError;

        fn execute(&mut self, task: u32) -> Result<Option<u32>, RecorderError> {
            if self.fail_on == Some(task) {
                return Err(RecorderError(task));
            }
            if self.panic_on == Some(task) {
                panic!("recorder asked to panic");
            }
            self.executed.lock().unwrap().push(task);
            if task % 2 == 1 {
                Ok(Some(task * 10))
            } else {
                Ok(None)
            }
        }
    }

    type Channels = (
        UnboundedSender<Control<u32>>,
        UnboundedReceiver<Control<u32>>,
        UnboundedSender<u32>,
        UnboundedReceiver<u32>,
        UnboundedSender<FatalError>,
        UnboundedReceiver<FatalError>,
    );

    fn channels() -> Channels {
        let (task_tx, task_rx) = mpsc::unbounded_channel();
        let (result_tx, result_rx) = mpsc::unbounded_channel();
        let (error_tx, error_rx) = mpsc::unbounded_channel();
        (task_tx, task_rx, result_tx, result_rx, error_tx, error_rx)
    }

    fn drain_results(mut rx: UnboundedReceiver<u32>) -> Vec<u32> {
        let mut out = Vec::new();
        while let Ok(r) = rx.try_recv() {
            out.push(r);
        }
        out
    }

    #[test]
    fn test_fifo_order_and_result_order() {
        let (task_tx, task_rx, result_tx, result_rx, error_tx, mut error_rx) = channels();
        let executed = Arc::new(Mutex::new(Vec::new()));

        for t in [1, 3, 5] {
            task_tx.send(Control::Run(t)).unwrap();
        }
        task_tx.send(Control::Shutdown).unwrap();

        run_worker(Recorder::new(executed.clone()), task_rx, result_tx, error_tx);

        assert_eq!(*executed.lock().unwrap(), vec![1, 3, 5]);
        assert_eq!(drain_results(result_rx), vec![10, 30, 50]);
        assert!(error_rx.try_recv().is_err());
    }

    #[test]
    fn test_tasks_behind_shutdown_are_drained_not_executed() {
        let (task_tx, task_rx, result_tx, result_rx, error_tx, _error_rx) = channels();
        let executed = Arc::new(Mutex::new(Vec::new()));

        task_tx.send(Control::Run(1)).unwrap();
        task_tx.send(Control::Run(3)).unwrap();
        task_tx.send(Control::Shutdown).unwrap();
        task_tx.send(Control::Run(5)).unwrap();

        run_worker(Recorder::new(executed.clone()), task_rx, result_tx, error_tx);

        assert_eq!(*executed.lock().unwrap(), vec![1, 3]);
        assert_eq!(drain_results(result_rx), vec![10, 30]);
    }

    #[test]
    fn test_resultless_task_pushes_nothing() {
        let (task_tx, task_rx, result_tx, result_rx, error_tx, _error_rx) = channels();
        let executed = Arc::new(Mutex::new(Vec::new()));

        task_tx.send(Control::Run(2)).unwrap();
        task_tx.send(Control::Shutdown).unwrap();

        run_worker(Recorder::new(executed.clone()), task_rx, result_tx, error_tx);

        assert_eq!(*executed.lock().unwrap(), vec![2]);
        assert!(drain_results(result_rx).is_empty());
    }

    #[test]
    fn test_failing_task_emits_one_error_and_stops() {
        let (task_tx, task_rx, result_tx, result_rx, error_tx, mut error_rx) = channels();
        let executed = Arc::new(Mutex::new(Vec::new()));

        task_tx.send(Control::Run(1)).unwrap();
        task_tx.send(Control::Run(4)).unwrap();
        task_tx.send(Control::Run(3)).unwrap();
        task_tx.send(Control::Shutdown).unwrap();

        let mut recorder = Recorder::new(executed.clone());
        recorder.fail_on = Some(4);
        run_worker(recorder, task_rx, result_tx, error_tx);

        // task 3 was already enqueued but must never run
        assert_eq!(*executed.lock().unwrap(), vec![1]);
        assert_eq!(drain_results(result_rx), vec![10]);

        let error = error_rx.try_recv().unwrap();
        assert!(error.message.contains("task 4 failed"));
        assert!(error_rx.try_recv().is_err());
    }

    #[test]
    fn test_panicking_task_emits_error_envelope() {
        let (task_tx, task_rx, result_tx, _result_rx, error_tx, mut error_rx) = channels();
        let executed = Arc::new(Mutex::new(Vec::new()));

        task_tx.send(Control::Run(7)).unwrap();
        task_tx.send(Control::Shutdown).unwrap();

        let mut recorder = Recorder::new(executed.clone());
        recorder.panic_on = Some(7);
        run_worker(recorder, task_rx, result_tx, error_tx);

        let error = error_rx.try_recv().unwrap();
        assert!(error.message.contains("panicked"));
    }

    #[test]
    fn test_spawned_worker_roundtrip() {
        let executed = Arc::new(Mutex::new(Vec::new()));
        let mut handle = spawn("test-worker", Recorder::new(executed.clone()));

        handle.submit(1).unwrap();
        handle.submit(2).unwrap();
        handle.submit(3).unwrap();

        assert_eq!(handle.wait_result(), Some(10));
        assert_eq!(handle.wait_result(), Some(30));

        handle.join();
        assert_eq!(*executed.lock().unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_spawned_worker_fatal_error_closes_results() {
        let executed = Arc::new(Mutex::new(Vec::new()));
        let mut recorder = Recorder::new(executed.clone());
        recorder.fail_on = Some(9);
        let mut handle = spawn("test-worker", recorder);

        handle.submit(9).unwrap();

        let error = handle.wait_error().expect("fatal error envelope");
        assert!(error.message.contains("task 9 failed"));
        // the worker is gone, so the result channel closes without results
        assert_eq!(handle.wait_result(), None);
    }
}
