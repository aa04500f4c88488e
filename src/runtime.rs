//! Runtime abstraction layer for async operations
//!
//! Long-lived listeners (the push channel, the position subscription) are
//! spawned through this module and owned through an [`AsyncHandle`], which is
//! the one place where they get released.
//!
//! With `tokio-runtime`, tasks go to the Tokio runtime of the calling thread.
//! Calls from outside any runtime, such as platform lifecycle callbacks, use a
//! small background runtime started on first need.

use crate::prelude::{Future, Pin};

/// A trait for spawning async tasks (object-safe version)
pub trait AsyncSpawner: Send + Sync + 'static {
    /// Spawn a future and return a handle to it
    fn spawn_boxed(
        &self,
        future: Pin<Box<dyn Future<Output = ()> + Send + 'static>>,
    ) -> Box<dyn AsyncHandle>;
}

/// Handle to a spawned async task
pub trait AsyncHandle: Send + Sync {
    /// Check if the task is finished
    fn is_finished(&self) -> bool;

    /// Cancel the task
    fn cancel(&self);
}

/// Spawns a future on the configured runtime
pub fn spawn<F>(future: F) -> Box<dyn AsyncHandle>
where
    F: Future<Output = ()> + Send + 'static,
{
    log::trace!("runtime::spawn() - spawning listener task");
    runtime().spawn_boxed(Box::pin(future))
}

/// Default spawner implementations
pub mod spawners {
    use super::*;

    #[cfg(feature = "tokio-runtime")]
    pub mod tokio_impl {
        use super::*;
        use ::tokio::runtime::{Builder, Handle, Runtime};
        use ::tokio::task::JoinHandle;
        use once_cell::sync::Lazy;

        static FALLBACK: Lazy<Option<Runtime>> = Lazy::new(|| {
            log::debug!("Starting fallback runtime for listeners spawned outside Tokio");
            Builder::new_multi_thread()
                .worker_threads(1)
                .thread_name("fieldmap-listener")
                .enable_all()
                .build()
                .map_err(|e| log::error!("Failed to start fallback runtime: {}", e))
                .ok()
        });

        fn current_handle() -> Option<Handle> {
            Handle::try_current()
                .ok()
                .or_else(|| FALLBACK.as_ref().map(|rt| rt.handle().clone()))
        }

        /// Tokio-based async spawner
        pub struct TokioSpawner;

        impl AsyncSpawner for TokioSpawner {
            fn spawn_boxed(
                &self,
                future: Pin<Box<dyn Future<Output = ()> + Send + 'static>>,
            ) -> Box<dyn AsyncHandle> {
                match current_handle() {
                    Some(handle) => Box::new(TokioHandle(handle.spawn(future))),
                    None => Box::new(NeverStarted),
                }
            }
        }

        struct TokioHandle(JoinHandle<()>);

        impl AsyncHandle for TokioHandle {
            fn is_finished(&self) -> bool {
                self.0.is_finished()
            }

            fn cancel(&self) {
                self.0.abort();
            }
        }

        /// Stands in for a task that could not be started
        struct NeverStarted;

        impl AsyncHandle for NeverStarted {
            fn is_finished(&self) -> bool {
                true
            }

            fn cancel(&self) {}
        }
    }
}

/// Global runtime instance
static RUNTIME: std::sync::OnceLock<Box<dyn AsyncSpawner>> = std::sync::OnceLock::new();

/// Initialize the runtime with a specific spawner
pub fn init_runtime(spawner: Box<dyn AsyncSpawner>) {
    let _ = RUNTIME.set(spawner);
}

/// Get the global runtime spawner
pub fn runtime() -> &'static dyn AsyncSpawner {
    RUNTIME
        .get_or_init(|| {
            #[cfg(feature = "tokio-runtime")]
            {
                Box::new(spawners::tokio_impl::TokioSpawner)
            }

            #[cfg(not(feature = "tokio-runtime"))]
            {
                panic!("No async runtime available. Enable the 'tokio-runtime' feature or call init_runtime().");
            }
        })
        .as_ref()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(feature = "tokio-runtime")]
    #[::tokio::test]
    async fn test_tokio_spawner() {
        let handle = spawn(async {
            ::tokio::time::sleep(::tokio::time::Duration::from_millis(10)).await;
        });

        assert!(!handle.is_finished());

        ::tokio::time::sleep(::tokio::time::Duration::from_millis(50)).await;
        assert!(handle.is_finished());
    }

    #[cfg(feature = "tokio-runtime")]
    #[::tokio::test]
    async fn test_cancel_stops_task() {
        let handle = spawn(futures::future::pending::<()>());
        handle.cancel();
        ::tokio::time::sleep(::tokio::time::Duration::from_millis(20)).await;
        assert!(handle.is_finished());
    }

    #[cfg(feature = "tokio-runtime")]
    #[test]
    fn test_spawn_outside_runtime() {
        let (tx, rx) = crossbeam_channel::bounded(1);
        let handle = spawn(async move {
            let _ = tx.send(());
        });

        assert!(rx
            .recv_timeout(std::time::Duration::from_secs(1))
            .is_ok());
        std::thread::sleep(std::time::Duration::from_millis(20));
        assert!(handle.is_finished());
    }
}
