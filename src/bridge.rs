//! Bridge for invoking the async pipeline from synchronous callers.

use std::future::Future;

use tokio::runtime::{Builder, Handle, Runtime};

/// Run a future to completion from synchronous code, regardless of whether a
/// tokio runtime is already active on the calling thread.
///
/// With no active runtime, the future runs on a fresh current-thread runtime
/// directly. With one active, a reentrant `block_on` would panic, so the
/// future is dispatched to a fresh runtime on a scoped thread and the caller
/// blocks until it completes; results and panics propagate unchanged.
///
/// Calling this from async code stalls the current worker thread for the
/// duration of the future; prefer awaiting `invoke_async` there.
pub fn run_sync<F>(future: F) -> F::Output
where
    F: Future + Send,
    F::Output: Send,
{
    match Handle::try_current() {
        Err(_) => fresh_runtime().block_on(future),
        Ok(_) => std::thread::scope(|scope| {
            let worker = scope.spawn(move || fresh_runtime().block_on(future));
            match worker.join() {
                Ok(output) => output,
                Err(panic) => std::panic::resume_unwind(panic),
            }
        }),
    }
}

fn fresh_runtime() -> Runtime {
    Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("failed to build tokio runtime")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runs_without_an_active_runtime() {
        let result = run_sync(async { 21 * 2 });
        assert_eq!(result, 42);
    }

    #[tokio::test]
    async fn runs_inside_an_active_runtime_without_deadlocking() {
        // Reentrant block_on would panic here; the scoped-thread path must
        // carry the future instead.
        let result = run_sync(async { "bridged".to_string() });
        assert_eq!(result, "bridged");
    }

    #[test]
    fn propagates_errors_unchanged() {
        let result: Result<(), String> = run_sync(async { Err("boom".to_string()) });
        assert_eq!(result.unwrap_err(), "boom");
    }

    #[tokio::test]
    async fn propagates_panics_from_the_worker_thread() {
        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            run_sync(async { panic!("inner panic") })
        }));
        assert!(outcome.is_err());
    }
}
