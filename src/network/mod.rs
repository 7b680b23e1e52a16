//! # Reachability
//!
//! Connectivity signal feeding the sync engine.
//!
//! Platform connectivity APIs differ per device, so the engine only consumes
//! the [`ReachabilityMonitor`] trait: a current answer plus a watch channel
//! of changes. [`ManualReachability`] is the concrete monitor the host app
//! drives from its platform callbacks, and what tests flip by hand.

use async_trait::async_trait;
use tokio::sync::watch;

/// Source of online/offline state.
#[async_trait]
pub trait ReachabilityMonitor: Send + Sync {
    /// The connectivity state right now.
    async fn current_status(&self) -> bool;

    /// A receiver that yields every subsequent state change.
    fn subscribe(&self) -> watch::Receiver<bool>;
}

/// Monitor driven by explicit [`set_online`](ManualReachability::set_online)
/// calls.
pub struct ManualReachability {
    sender: watch::Sender<bool>,
}

impl ManualReachability {
    pub fn new(initially_online: bool) -> Self {
        let (sender, _) = watch::channel(initially_online);
        Self { sender }
    }

    /// Records the new state and wakes subscribers. Safe to call with the
    /// unchanged value; the engine deduplicates transitions itself.
    pub fn set_online(&self, online: bool) {
        self.sender.send_replace(online);
    }
}

impl Default for ManualReachability {
    fn default() -> Self {
        Self::new(true)
    }
}

#[async_trait]
impl ReachabilityMonitor for ManualReachability {
    async fn current_status(&self) -> bool {
        *self.sender.borrow()
    }

    fn subscribe(&self) -> watch::Receiver<bool> {
        self.sender.subscribe()
    }
}
