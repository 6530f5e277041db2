use crate::channel::RpcChannelError;
use std::sync::Arc;

/// Called once per inbound message, in arrival order.
pub type RpcReceiveHandler = Arc<dyn Fn(Vec<u8>) + Send + Sync>;

/// The transport boundary between two endpoints.
///
/// A channel delivers whole messages, in order, to the peer's receive
/// handler. How bytes actually move (sockets, pipes, shared memory) is the
/// implementor's business; the endpoint never frames or splits messages.
pub trait RpcChannel: Send + Sync + 'static {
    fn send(&self, bytes: Vec<u8>) -> Result<(), RpcChannelError>;

    /// Installs the handler for inbound messages, replacing any previous one.
    fn on_receive(&self, handler: RpcReceiveHandler);
}
