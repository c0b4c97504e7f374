//! Waiting for backend tasks, with an optional progress indicator.
//!
//! In interactive mode a [`ProgressTicker`] redraws the indicator on its own
//! thread every 200ms, independent of how often the task is polled. The
//! ticker is stopped and joined whenever the wait ends, including on timeout,
//! error and when the waiting future is dropped.

use std::io::IsTerminal;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use tracing::debug;

use crate::error::{Result, VinfraError};
use crate::task::{Task, TaskState, TaskStatus};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(200);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitMode {
    /// Poll silently
    Quiet,
    /// Poll while showing a progress indicator on stderr
    Interactive,
}

impl WaitMode {
    /// Interactive only for a human at a terminal
    pub fn detect(machine_readable: bool) -> Self {
        if !machine_readable && std::io::stderr().is_terminal() {
            WaitMode::Interactive
        } else {
            WaitMode::Quiet
        }
    }
}

/// Something that can show progress
pub trait ProgressDisplay: Send + Sync {
    fn tick(&self);
    fn set_message(&self, message: String);
    fn finish(&self);
}

/// Spinner on stderr
pub struct SpinnerDisplay {
    bar: ProgressBar,
}

impl SpinnerDisplay {
    pub fn new(task_id: &str) -> Self {
        let bar = ProgressBar::with_draw_target(None, ProgressDrawTarget::stderr());
        bar.set_style(
            ProgressStyle::with_template("{spinner} {prefix} {msg} [{elapsed}]")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.set_prefix(format!("Task {}", task_id));
        SpinnerDisplay { bar }
    }
}

impl ProgressDisplay for SpinnerDisplay {
    fn tick(&self) {
        self.bar.tick();
    }

    fn set_message(&self, message: String) {
        self.bar.set_message(message);
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

/// Redraws a display at a fixed rate until stopped
pub struct ProgressTicker {
    stop: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
    display: Arc<dyn ProgressDisplay>,
}

impl ProgressTicker {
    pub fn start(display: Arc<dyn ProgressDisplay>, interval: Duration) -> Result<Self> {
        let (stop, stopped) = mpsc::channel::<()>();
        let ticking = display.clone();
        let handle = thread::Builder::new()
            .name("vinfra-progress".to_string())
            .spawn(move || loop {
                match stopped.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => ticking.tick(),
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            })?;

        Ok(ProgressTicker {
            stop: Some(stop),
            handle: Some(handle),
            display,
        })
    }

    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                debug!("Progress thread panicked");
            }
            self.display.finish();
        }
    }
}

impl Drop for ProgressTicker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn describe(status: &TaskStatus) -> String {
    match status.progress {
        Some(progress) => format!("{} ({:.0}%)", status.state, progress),
        None => status.state.to_string(),
    }
}

pub struct TaskWaiter {
    mode: WaitMode,
    poll_interval: Duration,
    tick_interval: Duration,
    display: Option<Arc<dyn ProgressDisplay>>,
}

/// Outcome of a task that reached a terminal state
fn settle(id: &str, status: TaskStatus) -> Result<TaskStatus> {
    match status.state {
        TaskState::Success => Ok(status),
        TaskState::Error => Err(VinfraError::TaskFailed(
            status
                .details
                .unwrap_or_else(|| format!("Task {} failed", id)),
        )),
        state => Err(VinfraError::Command(format!("Task {} was {}", id, state))),
    }
}

impl TaskWaiter {
    pub fn new(mode: WaitMode) -> Self {
        TaskWaiter {
            mode,
            poll_interval: DEFAULT_POLL_INTERVAL,
            tick_interval: DEFAULT_TICK_INTERVAL,
            display: None,
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    /// Use this display instead of a spinner in interactive mode
    pub fn with_display(mut self, display: Arc<dyn ProgressDisplay>) -> Self {
        self.display = Some(display);
        self
    }

    /// Poll `task` until it finishes or `timeout` elapses.
    ///
    /// Success yields the final status. A task in the error state becomes
    /// [`VinfraError::TaskFailed`] with the backend's detail, a canceled task
    /// a [`VinfraError::Command`], and an expired timeout a
    /// [`VinfraError::Timeout`].
    pub async fn wait<T: Task + ?Sized>(&self, task: &T, timeout: Duration) -> Result<TaskStatus> {
        match self.mode {
            WaitMode::Quiet => self.poll(task, timeout, None).await,
            WaitMode::Interactive => {
                let display: Arc<dyn ProgressDisplay> = match &self.display {
                    Some(display) => display.clone(),
                    None => Arc::new(SpinnerDisplay::new(task.id())),
                };
                let ticker = ProgressTicker::start(display.clone(), self.tick_interval)?;
                let result = self.poll(task, timeout, Some(display.as_ref())).await;
                ticker.stop();
                result
            }
        }
    }

    async fn poll<T: Task + ?Sized>(
        &self,
        task: &T,
        timeout: Duration,
        display: Option<&dyn ProgressDisplay>,
    ) -> Result<TaskStatus> {
        let polling = async {
            loop {
                let status = task.status().await?;
                debug!("Task {} is {}", task.id(), describe(&status));
                if let Some(display) = display {
                    display.set_message(describe(&status));
                }

                if status.state.is_terminal() {
                    return settle(task.id(), status);
                }

                tokio::time::sleep(self.poll_interval).await;
            }
        };

        tokio::time::timeout(timeout, polling).await.map_err(|_| {
            VinfraError::Timeout(format!(
                "Task {} did not complete within {} seconds",
                task.id(),
                timeout.as_secs()
            ))
        })?
    }
}
