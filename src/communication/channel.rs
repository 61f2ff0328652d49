//! The shared optical medium between vehicles.
//!
//! Delivery depends on [`DeliveryMode`]:
//!
//! * `WorkStealing`: every tap reads from one shared queue, so a transmitted
//!   signal is handed to exactly one `receive` call, whichever comes first.
//!   Two vehicles never both observe the same transmission.
//! * `FanOut`: every attached vehicle owns an inbox and `transmit` pushes a
//!   copy into each inbox except the sender's.
//!
//! `transmit` never blocks. `receive` waits at most for the given timeout.

use crate::communication::codec::Signal;
use crate::communication::messages::VehicleId;
use crate::config::DeliveryMode;
use log::debug;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::Mutex as AsyncMutex;
use tokio::time::{timeout, Duration};

type SharedReceiver = Arc<AsyncMutex<UnboundedReceiver<Signal>>>;

struct Inbox {
    owner: VehicleId,
    tx: UnboundedSender<Signal>,
}

pub struct OpticalChannel {
    mode: DeliveryMode,
    shared_tx: UnboundedSender<Signal>,
    shared_rx: SharedReceiver,
    inboxes: Mutex<Vec<Inbox>>,
    transmitted: AtomicU64,
    delivered: AtomicU64,
}

impl OpticalChannel {
    pub fn new(mode: DeliveryMode) -> Self {
        let (shared_tx, shared_rx) = mpsc::unbounded_channel();
        Self {
            mode,
            shared_tx,
            shared_rx: Arc::new(AsyncMutex::new(shared_rx)),
            inboxes: Mutex::new(Vec::new()),
            transmitted: AtomicU64::new(0),
            delivered: AtomicU64::new(0),
        }
    }

    pub fn mode(&self) -> DeliveryMode {
        self.mode
    }

    /// Registers a listener and returns its receiving end.
    pub fn attach(&self, owner: &VehicleId) -> ChannelTap {
        match self.mode {
            DeliveryMode::WorkStealing => ChannelTap {
                rx: Arc::clone(&self.shared_rx),
                private: false,
            },
            DeliveryMode::FanOut => {
                let (tx, rx) = mpsc::unbounded_channel();
                let mut inboxes = self.inboxes.lock().unwrap_or_else(|e| e.into_inner());
                inboxes.push(Inbox {
                    owner: owner.clone(),
                    tx,
                });
                ChannelTap {
                    rx: Arc::new(AsyncMutex::new(rx)),
                    private: true,
                }
            }
        }
    }

    /// Puts a signal on the medium. Always succeeds and never waits.
    pub fn transmit(&self, sender: &VehicleId, signal: Signal) {
        self.transmitted.fetch_add(1, Ordering::Relaxed);
        debug!("{} transmits {} samples", sender, signal.len());
        match self.mode {
            DeliveryMode::WorkStealing => {
                // The channel owns the receiver, so this send cannot fail.
                if self.shared_tx.send(signal).is_ok() {
                    self.delivered.fetch_add(1, Ordering::Relaxed);
                }
            }
            DeliveryMode::FanOut => {
                let mut inboxes = self.inboxes.lock().unwrap_or_else(|e| e.into_inner());
                // Taps that were dropped show up as closed senders.
                inboxes.retain(|inbox| !inbox.tx.is_closed());
                for inbox in inboxes.iter().filter(|inbox| &inbox.owner != sender) {
                    if inbox.tx.send(signal.clone()).is_ok() {
                        self.delivered.fetch_add(1, Ordering::Relaxed);
                    }
                }
            }
        }
    }

    /// Number of `transmit` calls so far.
    pub fn transmitted(&self) -> u64 {
        self.transmitted.load(Ordering::Relaxed)
    }

    /// Number of signal copies queued for listeners so far.
    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }

    /// Number of live listener inboxes (always 0 under work-stealing).
    pub fn listener_count(&self) -> usize {
        let mut inboxes = self.inboxes.lock().unwrap_or_else(|e| e.into_inner());
        inboxes.retain(|inbox| !inbox.tx.is_closed());
        inboxes.len()
    }
}

/// Receiving end of the medium held by one listener.
#[derive(Clone)]
pub struct ChannelTap {
    rx: SharedReceiver,
    /// Fan-out inbox owned by one vehicle, as opposed to the shared queue.
    private: bool,
}

impl ChannelTap {
    /// Waits up to `wait` for the next signal. `None` means nothing arrived.
    pub async fn receive(&self, wait: Duration) -> Option<Signal> {
        timeout(wait, async {
            let mut rx = self.rx.lock().await;
            rx.recv().await
        })
        .await
        .ok()
        .flatten()
    }

    /// Closes a fan-out inbox and drops whatever is still queued in it, so the
    /// medium stops delivering to it. The shared work-stealing queue is left
    /// open for the remaining listeners.
    pub async fn close(&self) {
        if !self.private {
            return;
        }
        let mut rx = self.rx.lock().await;
        rx.close();
        while rx.try_recv().is_ok() {}
    }
}
