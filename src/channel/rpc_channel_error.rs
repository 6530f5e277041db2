use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RpcChannelError {
    /// The channel or its peer has been closed.
    Closed,

    /// The underlying transport rejected the message.
    Transport(String),
}

impl fmt::Display for RpcChannelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RpcChannelError::Closed => write!(f, "channel closed"),
            RpcChannelError::Transport(msg) => write!(f, "transport error: {}", msg),
        }
    }
}

impl std::error::Error for RpcChannelError {}
