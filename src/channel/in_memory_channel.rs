use crate::channel::{RpcChannel, RpcChannelError, RpcReceiveHandler};
use crate::utils::lock_or_recover;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct Inbox {
    handler: Option<RpcReceiveHandler>,
    backlog: VecDeque<Vec<u8>>,
}

#[derive(Default)]
struct Side {
    inbox: Mutex<Inbox>,
}

impl Side {
    /// Hands `bytes` to the handler, or parks them until one is installed.
    /// The inbox lock is held across the call so deliveries never reorder.
    fn deliver(&self, bytes: Vec<u8>) {
        let mut inbox = lock_or_recover(&self.inbox);
        match inbox.handler.clone() {
            Some(handler) => handler(bytes),
            None => inbox.backlog.push_back(bytes),
        }
    }

    fn install(&self, handler: RpcReceiveHandler) {
        let mut inbox = lock_or_recover(&self.inbox);
        while let Some(bytes) = inbox.backlog.pop_front() {
            handler(bytes);
        }
        inbox.handler = Some(handler);
    }
}

/// One end of an in-process loopback channel.
///
/// `send` delivers synchronously into the peer's handler on the sending
/// thread. Endpoints only ever queue inbound bytes onto their scheduler from
/// that handler, so no user code runs on the sender's thread.
#[derive(Clone)]
pub struct InMemoryChannel {
    local: Arc<Side>,
    remote: Arc<Side>,
    closed: Arc<AtomicBool>,
}

impl InMemoryChannel {
    /// Two connected ends sharing one close flag.
    pub fn pair() -> (Self, Self) {
        let a = Arc::new(Side::default());
        let b = Arc::new(Side::default());
        let closed = Arc::new(AtomicBool::new(false));

        (
            Self {
                local: a.clone(),
                remote: b.clone(),
                closed: closed.clone(),
            },
            Self {
                local: b,
                remote: a,
                closed,
            },
        )
    }

    /// Closes both ends. Later sends fail with [`RpcChannelError::Closed`].
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            tracing::debug!("In-memory channel closed");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl RpcChannel for InMemoryChannel {
    fn send(&self, bytes: Vec<u8>) -> Result<(), RpcChannelError> {
        if self.is_closed() {
            return Err(RpcChannelError::Closed);
        }
        tracing::trace!("In-memory channel delivering {} bytes", bytes.len());
        self.remote.deliver(bytes);
        Ok(())
    }

    fn on_receive(&self, handler: RpcReceiveHandler) {
        self.local.install(handler);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffers_until_handler_then_preserves_order() {
        let (a, b) = InMemoryChannel::pair();
        a.send(vec![1]).unwrap();
        a.send(vec![2]).unwrap();

        let received = Arc::new(Mutex::new(Vec::new()));
        let sink = received.clone();
        b.on_receive(Arc::new(move |bytes: Vec<u8>| {
            sink.lock().unwrap().push(bytes)
        }));

        a.send(vec![3]).unwrap();
        assert_eq!(*received.lock().unwrap(), vec![vec![1], vec![2], vec![3]]);
    }

    #[test]
    fn closed_channel_rejects_sends_on_both_ends() {
        let (a, b) = InMemoryChannel::pair();
        b.close();
        assert_eq!(a.send(vec![0]), Err(RpcChannelError::Closed));
        assert_eq!(b.send(vec![0]), Err(RpcChannelError::Closed));
    }
}
