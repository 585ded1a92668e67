//! Installation states and state-change subscriptions.

use mcsm_core::TransferProgress;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc;
use tracing::debug;

/// Where an instance is in the installation lifecycle.
#[derive(Debug, Clone, PartialEq)]
pub enum InstallState {
    NotInstalled,
    Preparing,
    /// Carries the latest transfer progress once the download has started.
    Downloading(Option<TransferProgress>),
    Configuring,
    Installed,
}

impl InstallState {
    pub fn is_installing(&self) -> bool {
        matches!(
            self,
            Self::Preparing | Self::Downloading(_) | Self::Configuring
        )
    }
}

impl fmt::Display for InstallState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotInstalled => f.write_str("not installed"),
            Self::Preparing => f.write_str("preparing"),
            Self::Downloading(Some(progress)) => {
                write!(f, "downloading ({:.1}%)", progress.percentage)
            }
            Self::Downloading(None) => f.write_str("downloading"),
            Self::Configuring => f.write_str("configuring"),
            Self::Installed => f.write_str("installed"),
        }
    }
}

#[derive(Default)]
struct SubscriberState {
    next_id: u64,
    subscribers: Vec<(u64, mpsc::UnboundedSender<InstallState>)>,
}

/// Registry of state-change listeners shared with their subscriptions.
#[derive(Default)]
pub(crate) struct Subscribers {
    state: Mutex<SubscriberState>,
}

impl Subscribers {
    fn lock(&self) -> MutexGuard<'_, SubscriberState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub(crate) fn subscribe(shared: &Arc<Self>) -> InstallSubscription {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut state = shared.lock();
        let id = state.next_id;
        state.next_id += 1;
        state.subscribers.push((id, tx));
        debug!("Install subscriber {} added ({} active)", id, state.subscribers.len());

        InstallSubscription {
            id,
            receiver: rx,
            shared: Arc::clone(shared),
        }
    }

    /// Deliver `state` to every listener, dropping closed ones.
    pub(crate) fn publish(&self, state: &InstallState) {
        self.lock()
            .subscribers
            .retain(|(_, tx)| tx.send(state.clone()).is_ok());
    }

    fn remove(&self, id: u64) {
        self.lock().subscribers.retain(|(sub_id, _)| *sub_id != id);
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.lock().subscribers.len()
    }
}

/// A stream of state changes. Dropping it unsubscribes.
pub struct InstallSubscription {
    id: u64,
    receiver: mpsc::UnboundedReceiver<InstallState>,
    shared: Arc<Subscribers>,
}

impl InstallSubscription {
    pub async fn next(&mut self) -> Option<InstallState> {
        self.receiver.recv().await
    }

    pub fn try_next(&mut self) -> Option<InstallState> {
        self.receiver.try_recv().ok()
    }

    /// Stop listening; returns the changes received but not yet read.
    pub fn unsubscribe(mut self) -> Vec<InstallState> {
        self.shared.remove(self.id);
        let mut pending = Vec::new();
        while let Ok(state) = self.receiver.try_recv() {
            pending.push(state);
        }
        pending
    }
}

impl Drop for InstallSubscription {
    fn drop(&mut self) {
        self.shared.remove(self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_reaches_every_subscriber() {
        let subscribers = Arc::new(Subscribers::default());
        let mut a = Subscribers::subscribe(&subscribers);
        let mut b = Subscribers::subscribe(&subscribers);

        subscribers.publish(&InstallState::Preparing);
        assert_eq!(a.try_next(), Some(InstallState::Preparing));
        assert_eq!(b.try_next(), Some(InstallState::Preparing));
    }

    #[test]
    fn test_unsubscribe_and_drop_remove_listener() {
        let subscribers = Arc::new(Subscribers::default());
        let a = Subscribers::subscribe(&subscribers);
        let b = Subscribers::subscribe(&subscribers);
        assert_eq!(subscribers.len(), 2);

        subscribers.publish(&InstallState::Configuring);
        assert_eq!(a.unsubscribe(), vec![InstallState::Configuring]);
        drop(b);
        assert_eq!(subscribers.len(), 0);

        subscribers.publish(&InstallState::Installed);
    }

    #[test]
    fn test_display() {
        let progress = TransferProgress::new(50, 200, 10.0);
        assert_eq!(
            InstallState::Downloading(Some(progress)).to_string(),
            "downloading (25.0%)"
        );
        assert!(InstallState::Preparing.is_installing());
        assert!(!InstallState::Installed.is_installing());
    }
}
