//! The executor seam asynchronous dispatch passes are scheduled on.

use log::info;
use tokio::runtime;
use tokio::runtime::Handle;
use tokio::runtime::Runtime;

use crate::config::Config;
use crate::error::AppError;

/// One unit of deferred work: a whole dispatch pass.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Runs jobs off the calling thread.
///
/// The dispatcher reports the outcome of a job through its own future, so an
/// executor only has to run the job (or drop it, which resolves the future as
/// cancelled). No ordering between jobs is expected.
pub trait Executor: Send + Sync {
    fn schedule(&self, job: Job);
}

impl<F> Executor for F
where
    F: Fn(Job) + Send + Sync,
{
    fn schedule(&self, job: Job) {
        self(job)
    }
}

/// Executor backed by the blocking pool of a tokio runtime.
///
/// Dispatch passes run user callbacks that may block, so jobs go to
/// `spawn_blocking` rather than onto the async workers.
pub struct TokioExecutor {
    handle: Handle,
    runtime: Option<Runtime>,
}

impl TokioExecutor {
    /// Builds and owns a dedicated multi-thread runtime.
    pub fn new(config: &Config) -> Result<Self, AppError> {
        let runtime = runtime::Builder::new_multi_thread()
            .worker_threads(config.worker_threads.max(1))
            .max_blocking_threads(config.max_blocking_threads.max(1))
            .thread_name(config.thread_name.clone())
            .enable_all()
            .build()?;
        info!(
            "Started dispatch runtime `{}` ({} worker threads, up to {} blocking threads)",
            config.thread_name, config.worker_threads, config.max_blocking_threads
        );
        Ok(Self {
            handle: runtime.handle().clone(),
            runtime: Some(runtime),
        })
    }

    /// Schedules onto an existing runtime, which the caller keeps alive.
    pub fn from_handle(handle: Handle) -> Self {
        Self {
            handle,
            runtime: None,
        }
    }

    /// Schedules onto the runtime the caller is currently running in.
    pub fn current() -> Result<Self, AppError> {
        Handle::try_current()
            .map(Self::from_handle)
            .map_err(|e| AppError::ConfigurationError {
                msg: format!("No tokio runtime to dispatch on: {e}"),
            })
    }

    pub fn handle(&self) -> &Handle {
        &self.handle
    }
}

impl Executor for TokioExecutor {
    fn schedule(&self, job: Job) {
        self.handle.spawn_blocking(job);
    }
}

impl Drop for TokioExecutor {
    fn drop(&mut self) {
        // A plain drop blocks and panics when it happens inside an async context
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
            info!("Dispatch runtime shut down");
        }
    }
}
