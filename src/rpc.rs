mod rpc_call_codec;
mod rpc_call_kind;
mod rpc_error;
mod rpc_list_op;
mod rpc_member_id;
mod rpc_message;
mod rpc_message_type;
mod rpc_pending_calls;
mod rpc_result_status;
mod rpc_task;

pub use rpc_call_codec::RpcCallCodec;
pub use rpc_call_kind::RpcCallKind;
pub use rpc_error::RpcError;
pub use rpc_list_op::RpcListOp;
pub use rpc_member_id::member_id_hash;
pub use rpc_message::{RpcCallMessage, RpcListDeltaMessage, RpcMessage, RpcResponseMessage};
pub use rpc_message_type::RpcMessageType;
pub use rpc_pending_calls::{RpcPendingCall, RpcPendingCalls, RpcResponseHandler};
pub use rpc_result_status::RpcResultStatus;
pub use rpc_task::RpcTask;
