//! Signal queue, thread-backed timer, and the control-thread event loop.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use mtpdesk_update::{Timer, TimerToken};
use tracing::{debug, warn};

use crate::lifecycle::{Flow, Lifecycle, Signal};

/// Cloneable sending half of the signal queue.
#[derive(Debug, Clone)]
pub struct SignalSender {
    tx: Sender<Signal>,
}

impl SignalSender {
    /// Queues `signal`. Returns `false` once the control thread is gone.
    pub fn post(&self, signal: Signal) -> bool {
        self.tx.send(signal).is_ok()
    }
}

/// Creates the queue feeding [`run_event_loop`].
pub fn signal_queue() -> (SignalSender, Receiver<Signal>) {
    let (tx, rx) = mpsc::channel();
    (SignalSender { tx }, rx)
}

/// One-shot timer that waits on a dedicated thread per callback and posts
/// [`Signal::TimerFired`] unless cancelled first.
///
/// Each thread waits on its own cancel channel, so cancelling wakes it
/// immediately. Whichever side removes the pending entry first decides the
/// outcome.
#[derive(Debug)]
pub struct ThreadTimer {
    sender: SignalSender,
    next_id: AtomicU64,
    pending: Arc<Mutex<HashMap<u64, Sender<()>>>>,
}

impl ThreadTimer {
    /// Creates a timer posting into `sender`.
    pub fn new(sender: SignalSender) -> Self {
        Self {
            sender,
            next_id: AtomicU64::new(1),
            pending: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Returns how many callbacks have neither fired nor been cancelled.
    pub fn pending_count(&self) -> usize {
        self.pending.lock().map(|pending| pending.len()).unwrap_or(0)
    }
}

impl Timer for ThreadTimer {
    fn schedule(&self, delay: Duration) -> TimerToken {
        let token = TimerToken(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (cancel_tx, cancel_rx) = mpsc::channel::<()>();
        if let Ok(mut pending) = self.pending.lock() {
            pending.insert(token.0, cancel_tx);
        }

        let sender = self.sender.clone();
        let pending = Arc::clone(&self.pending);
        let spawned = thread::Builder::new()
            .name(format!("mtpdesk-timer-{}", token.0))
            .spawn(move || {
                if !matches!(cancel_rx.recv_timeout(delay), Err(RecvTimeoutError::Timeout)) {
                    return;
                }
                let still_pending = pending
                    .lock()
                    .map(|mut pending| pending.remove(&token.0).is_some())
                    .unwrap_or(false);
                if still_pending {
                    let _ = sender.post(Signal::TimerFired(token));
                }
            });

        if let Err(error) = spawned {
            warn!(token = token.0, %error, "timer thread could not start; callback dropped");
            if let Ok(mut pending) = self.pending.lock() {
                pending.remove(&token.0);
            }
        }
        token
    }

    fn cancel(&self, token: TimerToken) {
        let cancel_tx = self
            .pending
            .lock()
            .ok()
            .and_then(|mut pending| pending.remove(&token.0));
        if let Some(cancel_tx) = cancel_tx {
            let _ = cancel_tx.send(());
            debug!(token = token.0, "timer cancelled");
        }
    }
}

/// Reason the event loop returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    /// Lifecycle returned [`Flow::Exit`].
    Exited,
    /// Every sender was dropped.
    Disconnected,
    /// No signal arrived within the idle limit while no window was live.
    Idle,
}

/// Dispatches queued signals on the calling thread.
///
/// With `idle` set, the loop also returns after that long without a signal,
/// but only while no window is live.
pub fn run_event_loop(
    lifecycle: &mut Lifecycle,
    signals: &Receiver<Signal>,
    idle: Option<Duration>,
) -> LoopExit {
    if lifecycle.phase().is_terminal() {
        return LoopExit::Exited;
    }

    loop {
        let signal = match idle {
            Some(limit) => match signals.recv_timeout(limit) {
                Ok(signal) => signal,
                Err(RecvTimeoutError::Timeout) => {
                    if lifecycle.context().window_id().is_none() {
                        debug!("event loop idle with no window");
                        return LoopExit::Idle;
                    }
                    continue;
                }
                Err(RecvTimeoutError::Disconnected) => return LoopExit::Disconnected,
            },
            None => match signals.recv() {
                Ok(signal) => signal,
                Err(_) => return LoopExit::Disconnected,
            },
        };

        if lifecycle.dispatch(signal) == Flow::Exit {
            return LoopExit::Exited;
        }
    }
}
