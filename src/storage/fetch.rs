//! One-shot background fetches tied to the lifetime of their handle.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::task::{JoinError, JoinHandle};

/// A spawned fetch that is aborted if its handle is dropped first.
///
/// Await the handle to get the result. A view that goes away before its
/// data arrives drops the handle, and the result is never delivered.
#[derive(Debug)]
pub struct ScopedFetch<T> {
    handle: JoinHandle<T>,
}

impl<T: Send + 'static> ScopedFetch<T> {
    /// Spawns `future` on the current runtime.
    pub fn spawn<F>(future: F) -> Self
    where
        F: Future<Output = T> + Send + 'static,
    {
        Self {
            handle: tokio::spawn(future),
        }
    }
}

impl<T> ScopedFetch<T> {
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl<T> Future for ScopedFetch<T> {
    type Output = Result<T, JoinError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.get_mut().handle).poll(cx)
    }
}

impl<T> Drop for ScopedFetch<T> {
    fn drop(&mut self) {
        if !self.handle.is_finished() {
            self.handle.abort();
            tracing::debug!("Pending fetch aborted");
        }
    }
}
