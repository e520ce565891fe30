//! Forward-vector replies.
//!
//! The platform answers a forward-vector request at most once, from whatever
//! thread it likes. A reply either wakes a waiting caller through a oneshot
//! channel or runs a callback, unless the owning facade was disposed first.

use glam::Vec3;
use std::fmt;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

type ForwardCallback = Box<dyn FnOnce(Vec3) + Send + 'static>;

pub enum ForwardReply {
    Channel(oneshot::Sender<Vec3>),
    Callback {
        cancel: CancellationToken,
        callback: ForwardCallback,
    },
}

impl ForwardReply {
    pub(crate) fn channel() -> (Self, oneshot::Receiver<Vec3>) {
        let (tx, rx) = oneshot::channel();
        (Self::Channel(tx), rx)
    }

    pub(crate) fn callback<F>(cancel: CancellationToken, callback: F) -> Self
    where
        F: FnOnce(Vec3) + Send + 'static,
    {
        Self::Callback {
            cancel,
            callback: Box::new(callback),
        }
    }

    /// Delivers the forward vector. Consumes the reply, so it can only happen once.
    pub fn answer(self, forward: Vec3) {
        match self {
            Self::Channel(tx) => {
                if tx.send(forward).is_err() {
                    trace!("Forward vector waiter went away before the answer");
                }
            }
            Self::Callback { cancel, callback } => {
                if cancel.is_cancelled() {
                    debug!("Facade disposed, skipping forward vector callback");
                    return;
                }
                callback(forward);
            }
        }
    }
}

impl fmt::Debug for ForwardReply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Channel(tx) => f
                .debug_tuple("Channel")
                .field(&tx.is_closed())
                .finish(),
            Self::Callback { cancel, .. } => f
                .debug_struct("Callback")
                .field("cancelled", &cancel.is_cancelled())
                .finish_non_exhaustive(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_channel_reply_wakes_receiver() {
        let (reply, mut rx) = ForwardReply::channel();
        reply.answer(Vec3::NEG_Z);
        assert_eq!(rx.try_recv().unwrap(), Vec3::NEG_Z);
    }

    #[test]
    fn test_callback_skipped_after_cancel() {
        let calls = Arc::new(AtomicUsize::new(0));
        let cancel = CancellationToken::new();
        let counter = calls.clone();
        let reply = ForwardReply::callback(cancel.clone(), move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        cancel.cancel();
        reply.answer(Vec3::X);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_callback_runs_with_value() {
        let seen = Arc::new(parking_lot::Mutex::new(None));
        let sink = seen.clone();
        let reply = ForwardReply::callback(CancellationToken::new(), move |v| {
            *sink.lock() = Some(v);
        });

        reply.answer(Vec3::Y);
        assert_eq!(*seen.lock(), Some(Vec3::Y));
    }
}
