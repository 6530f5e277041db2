use crate::channel::RpcChannelError;
use crate::codec::CodecError;
use crate::scheduler::SchedulerError;
use std::fmt;

/// Errors surfaced to callers of proxies, bindings and endpoints.
#[derive(Debug, Clone, PartialEq)]
pub enum RpcError {
    /// A parameter or result type has no serializer; reported when a proxy
    /// is activated or an implementation is bound.
    UnregisteredType { type_name: &'static str },

    /// The remote side has no binding for the contract (or no such member).
    UnknownContract { contract_id: u64, member_id: u64 },

    /// The remote implementation failed; carries its fault text.
    RemoteFault { message: String },

    /// Work was queued on a scheduler that has shut down.
    SchedulerClosed { scheduler: String },

    /// A blocked synchronous call whose endpoint ended before a response
    /// arrived.
    Abandoned,

    /// The contract already has a live binding on this endpoint.
    AlreadyBound { contract: &'static str },

    /// A correlation id was reused while its call was still pending.
    DuplicateCorrelation { correlation_id: u32 },

    /// A list position outside the current bounds.
    IndexOutOfRange { index: usize, len: usize },

    Codec(CodecError),

    Channel(RpcChannelError),

    /// A message could not be routed (malformed header, unexpected kind).
    Protocol(String),
}

impl fmt::Display for RpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RpcError::UnregisteredType { type_name } => {
                write!(f, "type `{}` has no registered serializer", type_name)
            }
            RpcError::UnknownContract {
                contract_id,
                member_id,
            } => write!(
                f,
                "remote endpoint has no binding for contract {:#018x} member {:#018x}",
                contract_id, member_id
            ),
            RpcError::RemoteFault { message } => write!(f, "remote fault: {}", message),
            RpcError::SchedulerClosed { scheduler } => {
                write!(f, "scheduler `{}` is closed", scheduler)
            }
            RpcError::Abandoned => write!(f, "call abandoned: endpoint terminated"),
            RpcError::AlreadyBound { contract } => {
                write!(f, "contract `{}` is already bound on this endpoint", contract)
            }
            RpcError::DuplicateCorrelation { correlation_id } => write!(
                f,
                "correlation id {} is already in use by a pending call",
                correlation_id
            ),
            RpcError::IndexOutOfRange { index, len } => {
                write!(f, "index {} out of range for list of length {}", index, len)
            }
            RpcError::Codec(e) => write!(f, "codec error: {}", e),
            RpcError::Channel(e) => write!(f, "channel error: {}", e),
            RpcError::Protocol(msg) => write!(f, "protocol error: {}", msg),
        }
    }
}

impl std::error::Error for RpcError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RpcError::Codec(e) => Some(e),
            RpcError::Channel(e) => Some(e),
            _ => None,
        }
    }
}

impl From<CodecError> for RpcError {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::UnregisteredType { type_name } => RpcError::UnregisteredType { type_name },
            other => RpcError::Codec(other),
        }
    }
}

impl From<RpcChannelError> for RpcError {
    fn from(err: RpcChannelError) -> Self {
        RpcError::Channel(err)
    }
}

impl From<SchedulerError> for RpcError {
    fn from(err: SchedulerError) -> Self {
        match err {
            SchedulerError::Closed { name } => RpcError::SchedulerClosed { scheduler: name },
            other => RpcError::Protocol(other.to_string()),
        }
    }
}
