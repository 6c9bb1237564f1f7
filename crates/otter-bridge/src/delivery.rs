//! Cross-thread response delivery
//!
//! Host code settles a request through a [`DeliveryHandle`] from any thread.
//! The handle never touches script values: it posts a message onto the
//! realm's channel and the engine thread invokes the callback when it next
//! runs [`Realm::run_pending`](crate::Realm::run_pending).
//!
//! Every token is outstanding exactly once. The first `deliver` or `abandon`
//! for a token wins; later attempts fail with
//! [`BridgeError::UnknownCallback`].

use std::sync::Arc;

use crossbeam_channel::Sender;
use dashmap::DashSet;
use otter_bridge_core::HostValue;
use tracing::debug;

use crate::capsule::CallbackToken;
use crate::error::{BridgeError, BridgeResult};
use crate::stats::BridgeStats;

#[derive(Debug)]
pub(crate) enum DeliveryMessage {
    Deliver {
        token: CallbackToken,
        args: Vec<HostValue>,
    },
    Abandon {
        token: CallbackToken,
        reason: String,
    },
}

impl DeliveryMessage {
    pub(crate) fn token(&self) -> CallbackToken {
        match self {
            Self::Deliver { token, .. } | Self::Abandon { token, .. } => *token,
        }
    }
}

/// Thread-safe handle for settling requests of one realm
#[derive(Debug, Clone)]
pub struct DeliveryHandle {
    sender: Sender<DeliveryMessage>,
    outstanding: Arc<DashSet<CallbackToken>>,
    stats: Arc<BridgeStats>,
}

impl DeliveryHandle {
    pub(crate) fn new(sender: Sender<DeliveryMessage>, stats: Arc<BridgeStats>) -> Self {
        Self {
            sender,
            outstanding: Arc::new(DashSet::new()),
            stats,
        }
    }

    /// Deliver one response value as the callback's single argument
    pub fn deliver(&self, token: CallbackToken, response: HostValue) -> BridgeResult<()> {
        self.deliver_args(token, vec![response])
    }

    /// Deliver several values as the callback's arguments, in order
    pub fn deliver_args(&self, token: CallbackToken, args: Vec<HostValue>) -> BridgeResult<()> {
        self.post(DeliveryMessage::Deliver { token, args })
    }

    /// Release the callback without invoking it
    pub fn abandon(&self, token: CallbackToken, reason: impl Into<String>) -> BridgeResult<()> {
        self.post(DeliveryMessage::Abandon {
            token,
            reason: reason.into(),
        })
    }

    /// Check if `token` can still be delivered or abandoned
    pub fn is_outstanding(&self, token: CallbackToken) -> bool {
        self.outstanding.contains(&token)
    }

    /// Number of tokens still waiting to be settled
    pub fn outstanding(&self) -> usize {
        self.outstanding.len()
    }

    pub(crate) fn register(&self, token: CallbackToken) {
        self.outstanding.insert(token);
    }

    /// Drop a token without posting anything. Returns whether it was
    /// outstanding.
    pub(crate) fn forget(&self, token: CallbackToken) -> bool {
        self.outstanding.remove(&token).is_some()
    }

    fn post(&self, message: DeliveryMessage) -> BridgeResult<()> {
        let token = message.token();
        if self.outstanding.remove(&token).is_none() {
            debug!(%token, "settle attempt for a callback that is not outstanding");
            return Err(BridgeError::UnknownCallback(token));
        }
        self.sender
            .send(message)
            .map_err(|_| BridgeError::RealmClosed)?;
        BridgeStats::record(&self.stats.posted);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;

    fn handle() -> (DeliveryHandle, crossbeam_channel::Receiver<DeliveryMessage>) {
        let (tx, rx) = unbounded();
        (DeliveryHandle::new(tx, Arc::default()), rx)
    }

    #[test]
    fn test_first_settle_wins() {
        let (handle, rx) = handle();
        let token = CallbackToken::from_raw(9_000_001);
        handle.register(token);
        assert!(handle.is_outstanding(token));

        handle.deliver(token, HostValue::from("ok")).unwrap();
        let err = handle.abandon(token, "late").unwrap_err();
        assert!(matches!(err, BridgeError::UnknownCallback(t) if t == token));
        assert_eq!(rx.try_iter().count(), 1);
        assert_eq!(handle.outstanding(), 0);
    }

    #[test]
    fn test_unregistered_token_is_rejected() {
        let (handle, rx) = handle();
        let err = handle
            .deliver(CallbackToken::from_raw(9_000_002), HostValue::Null)
            .unwrap_err();
        assert!(matches!(err, BridgeError::UnknownCallback(_)));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_closed_receiver() {
        let (handle, rx) = handle();
        drop(rx);
        let token = CallbackToken::from_raw(9_000_003);
        handle.register(token);
        let err = handle.deliver(token, HostValue::Null).unwrap_err();
        assert!(matches!(err, BridgeError::RealmClosed));
    }

    #[test]
    fn test_handle_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<DeliveryHandle>();
    }

    #[test]
    fn test_delivery_from_other_thread() {
        let (handle, rx) = handle();
        let token = CallbackToken::from_raw(9_000_004);
        handle.register(token);
        let remote = handle.clone();
        std::thread::spawn(move || {
            remote.deliver_args(token, vec![HostValue::from(1), HostValue::from(2)])
        })
        .join()
        .unwrap()
        .unwrap();
        match rx.try_recv().unwrap() {
            DeliveryMessage::Deliver { token: t, args } => {
                assert_eq!(t, token);
                assert_eq!(args.len(), 2);
            }
            other => panic!("unexpected message {other:?}"),
        }
    }
}
