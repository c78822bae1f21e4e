//! Coalesces bursts of input (keystrokes in a search box) into a single
//! downstream call once the input goes quiet.

use std::{future::Future, time::Duration};

use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{debug, warn};

enum Signal<T> {
    Value(T),
    Flush,
}

/// Calls the wrapped target with the most recent argument once `delay`
/// passes without another [`Debouncer::call`]. Earlier arguments are
/// discarded, never queued.
///
/// Must be created inside a Tokio runtime. Dropping the debouncer delivers
/// a still-pending argument once; [`Debouncer::shutdown`] does the same and
/// waits for the target to finish with it.
pub struct Debouncer<T> {
    tx: mpsc::UnboundedSender<Signal<T>>,
    delay: Duration,
    worker: JoinHandle<()>,
}

impl<T: Send + 'static> Debouncer<T> {
    pub fn new<F, Fut>(delay: Duration, target: F) -> Self
    where
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let worker = tokio::spawn(run_worker(delay, rx, target));
        Self { tx, delay, worker }
    }

    /// Replaces the pending argument and restarts the countdown.
    pub fn call(&self, value: T) {
        if self.tx.send(Signal::Value(value)).is_err() {
            warn!("debounce worker stopped; input dropped");
        }
    }

    /// Delivers the pending argument now instead of waiting out the delay.
    pub fn flush(&self) {
        if self.tx.send(Signal::Flush).is_err() {
            warn!("debounce worker stopped; flush dropped");
        }
    }

    /// Stops accepting input, delivers a pending argument, and returns once
    /// the target call for it has completed.
    pub async fn shutdown(self) {
        let Self { tx, worker, .. } = self;
        drop(tx);
        if let Err(err) = worker.await {
            warn!(error = %err, "debounce worker ended abnormally");
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }
}

async fn run_worker<T, F, Fut>(
    delay: Duration,
    mut rx: mpsc::UnboundedReceiver<Signal<T>>,
    target: F,
) where
    T: Send + 'static,
    F: Fn(T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let mut pending: Option<T> = None;
    loop {
        let signal = if pending.is_none() {
            rx.recv().await
        } else {
            match tokio::time::timeout(delay, rx.recv()).await {
                Ok(signal) => signal,
                Err(_) => {
                    fire(&target, pending.take());
                    continue;
                }
            }
        };

        match signal {
            Some(Signal::Value(value)) => pending = Some(value),
            Some(Signal::Flush) => fire(&target, pending.take()),
            None => {
                if let Some(value) = pending.take() {
                    target(value).await;
                }
                break;
            }
        }
    }
    debug!("debounce worker finished");
}

// The target runs as its own task so new input is accepted while it is
// still in flight.
fn fire<T, F, Fut>(target: &F, value: Option<T>)
where
    F: Fn(T) -> Fut,
    Fut: Future<Output = ()> + Send + 'static,
{
    if let Some(value) = value {
        tokio::spawn(target(value));
    }
}

#[cfg(test)]
#[path = "tests/debounce_tests.rs"]
mod tests;
