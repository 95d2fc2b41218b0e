//! Event bus used for state-change notifications.

/// Receives fire-and-forget event names.
pub trait EventBus: Send + Sync {
    fn publish(&self, event: &str);
}

impl<F> EventBus for F
where
    F: Fn(&str) + Send + Sync,
{
    fn publish(&self, event: &str) {
        self(event)
    }
}

#[cfg(feature = "tokio")]
pub use self::broadcast_bus::BroadcastBus;

#[cfg(feature = "tokio")]
mod broadcast_bus {
    use super::EventBus;
    use tokio::sync::broadcast;
    use tracing::trace;

    /// Fans published event names out to every subscriber.
    ///
    /// Subscribers that fall behind by more than the channel capacity miss
    /// events; delivery is not guaranteed.
    #[derive(Clone, Debug)]
    pub struct BroadcastBus {
        tx: broadcast::Sender<String>,
    }

    impl BroadcastBus {
        pub fn new(capacity: usize) -> Self {
            let (tx, _) = broadcast::channel(capacity);
            Self { tx }
        }

        pub fn subscribe(&self) -> broadcast::Receiver<String> {
            self.tx.subscribe()
        }
    }

    impl Default for BroadcastBus {
        fn default() -> Self {
            Self::new(64)
        }
    }

    impl EventBus for BroadcastBus {
        fn publish(&self, event: &str) {
            if self.tx.send(event.to_string()).is_err() {
                trace!("no subscribers for {}", event);
            }
        }
    }
}
