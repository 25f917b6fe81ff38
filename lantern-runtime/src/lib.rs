//! Tokio runtime for the `lantern` binary, paired with the cancellation token
//! that stands for "the page is unloading".
use std::time::Duration;

use anyhow::Result;
use tokio::runtime::{Builder, Handle, Runtime};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

#[derive(Clone)]
pub struct LanternHandle {
    inner: Handle,
    cancel: CancellationToken,
}

pub struct LanternRuntime {
    runtime: Runtime,
    cancel: CancellationToken,
}

impl LanternRuntime {
    /// Build a multi-threaded runtime with all drivers enabled.
    ///
    /// ```
    /// use lantern_runtime::LanternRuntime;
    /// use std::time::Duration;
    ///
    /// let runtime = LanternRuntime::build("doctest-runtime", Some(1)).unwrap();
    /// assert_eq!(runtime.block_on(async { 2 + 2 }), 4);
    /// runtime.shutdown(Duration::from_millis(10));
    /// ```
    pub fn build(thread_name: &str, worker_threads: Option<usize>) -> Result<Self> {
        let mut builder = Builder::new_multi_thread();
        builder.enable_all().thread_name(thread_name);

        if let Some(workers) = worker_threads {
            builder.worker_threads(workers.max(1));
        }

        Ok(Self {
            runtime: builder.build()?,
            cancel: CancellationToken::new(),
        })
    }

    pub fn handle(&self) -> LanternHandle {
        LanternHandle {
            inner: self.runtime.handle().clone(),
            cancel: self.cancel.clone(),
        }
    }

    pub fn block_on<F: std::future::Future>(&self, fut: F) -> F::Output {
        self.runtime.block_on(fut)
    }

    /// Fire the unload token, then give tasks `graceful` to wind down.
    ///
    /// ```
    /// use lantern_runtime::LanternRuntime;
    /// use std::time::Duration;
    ///
    /// let runtime = LanternRuntime::build("shutdown-example", Some(1)).unwrap();
    /// let unload = runtime.handle().unload_token();
    /// runtime.shutdown(Duration::from_millis(5));
    /// assert!(unload.is_cancelled());
    /// ```
    pub fn shutdown(self, graceful: Duration) {
        self.cancel.cancel();
        self.runtime.shutdown_timeout(graceful);
    }
}

impl LanternHandle {
    /// ```
    /// use lantern_runtime::LanternRuntime;
    /// use std::time::Duration;
    ///
    /// let runtime = LanternRuntime::build("handle-doctest", Some(1)).unwrap();
    /// let task = runtime.handle().spawn(async { 21 * 2 });
    /// assert_eq!(runtime.block_on(async move { task.await.unwrap() }), 42);
    /// runtime.shutdown(Duration::from_millis(10));
    /// ```
    pub fn spawn<F, T>(&self, fut: F) -> JoinHandle<T>
    where
        F: std::future::Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        self.inner.spawn(fut)
    }

    /// Token cancelled when the page unloads (Ctrl-C or runtime shutdown).
    pub fn unload_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Cancel the unload token on the first Ctrl-C.
    pub fn cancel_on_ctrl_c(&self) -> JoinHandle<()> {
        let cancel = self.cancel.clone();
        self.inner.spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {}
                signal = tokio::signal::ctrl_c() => {
                    match signal {
                        Ok(()) => {
                            tracing::info!("runtime.ctrl_c");
                            cancel.cancel();
                        }
                        Err(e) => {
                            tracing::warn!(error = %e, "runtime.signal_failed");
                            cancel.cancelled().await;
                        }
                    }
                }
            }
        })
    }
}
