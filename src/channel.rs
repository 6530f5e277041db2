mod in_memory_channel;
mod rpc_channel;
mod rpc_channel_error;

pub use in_memory_channel::InMemoryChannel;
pub use rpc_channel::{RpcChannel, RpcReceiveHandler};
pub use rpc_channel_error::RpcChannelError;
