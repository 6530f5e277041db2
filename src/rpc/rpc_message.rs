use crate::codec::{ByteReader, ByteWriter, CodecError};
use crate::constants::{
    RPC_CALL_HEADER_SIZE, RPC_LIST_DELTA_HEADER_SIZE, RPC_MESSAGE_TYPE_OFFSET,
    RPC_RESPONSE_HEADER_SIZE,
};
use crate::rpc::{RpcCallKind, RpcListOp, RpcMessageType, RpcResultStatus};

/// A request to invoke one member of a bound contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpcCallMessage {
    pub contract_id: u64,
    pub member_id: u64,
    pub kind: RpcCallKind,
    /// Zero for one-way calls.
    pub correlation_id: u32,
    /// Arguments, encoded in declaration order.
    pub payload: Vec<u8>,
}

/// The outcome of a call, matched to its pending call by correlation id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpcResponseMessage {
    pub correlation_id: u32,
    pub status: RpcResultStatus,
    /// Encoded result on success, UTF-8 fault text otherwise.
    pub payload: Vec<u8>,
}

/// One mutation of a replicated list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpcListDeltaMessage {
    /// Member id of the list property the delta belongs to.
    pub entity_id: u64,
    pub op: RpcListOp,
    pub index: u32,
    pub payload: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RpcMessage {
    Call(RpcCallMessage),
    Response(RpcResponseMessage),
    ListDelta(RpcListDeltaMessage),
}

impl RpcCallMessage {
    pub fn encode(&self) -> Vec<u8> {
        let mut writer = ByteWriter::with_capacity(RPC_CALL_HEADER_SIZE + self.payload.len());
        writer.write_u8(RpcMessageType::Call.into());
        writer.write_u64(self.contract_id);
        writer.write_u64(self.member_id);
        writer.write_u8(self.kind.into());
        writer.write_u32(self.correlation_id);
        writer.write_raw(&self.payload);
        writer.into_bytes()
    }
}

impl RpcResponseMessage {
    /// A non-success response carrying `message` as its fault text.
    pub fn fault(correlation_id: u32, status: RpcResultStatus, message: &str) -> Self {
        Self {
            correlation_id,
            status,
            payload: message.as_bytes().to_vec(),
        }
    }

    /// Lossy view of the payload as fault text.
    pub fn fault_message(&self) -> String {
        String::from_utf8_lossy(&self.payload).into_owned()
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut writer =
            ByteWriter::with_capacity(RPC_RESPONSE_HEADER_SIZE + self.payload.len());
        writer.write_u8(RpcMessageType::Response.into());
        writer.write_u32(self.correlation_id);
        writer.write_u8(self.status.into());
        writer.write_raw(&self.payload);
        writer.into_bytes()
    }
}

impl RpcListDeltaMessage {
    pub fn encode(&self) -> Vec<u8> {
        let mut writer =
            ByteWriter::with_capacity(RPC_LIST_DELTA_HEADER_SIZE + self.payload.len());
        writer.write_u8(RpcMessageType::ListDelta.into());
        writer.write_u64(self.entity_id);
        writer.write_u8(self.op.into());
        writer.write_u32(self.index);
        writer.write_raw(&self.payload);
        writer.into_bytes()
    }
}

impl RpcMessage {
    pub fn message_type(&self) -> RpcMessageType {
        match self {
            RpcMessage::Call(_) => RpcMessageType::Call,
            RpcMessage::Response(_) => RpcMessageType::Response,
            RpcMessage::ListDelta(_) => RpcMessageType::ListDelta,
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        match self {
            RpcMessage::Call(call) => call.encode(),
            RpcMessage::Response(response) => response.encode(),
            RpcMessage::ListDelta(delta) => delta.encode(),
        }
    }

    /// Parses one complete message. Everything after the fixed header is
    /// the payload.
    pub fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        let type_byte = *bytes
            .get(RPC_MESSAGE_TYPE_OFFSET)
            .ok_or(CodecError::UnexpectedEof {
                needed: 1,
                remaining: 0,
            })?;

        let message_type = RpcMessageType::try_from(type_byte).map_err(|_| {
            CodecError::InvalidData(format!("unknown message type {}", type_byte))
        })?;

        let mut reader = ByteReader::new(&bytes[RPC_MESSAGE_TYPE_OFFSET + 1..]);

        let message = match message_type {
            RpcMessageType::Call => {
                let contract_id = reader.read_u64()?;
                let member_id = reader.read_u64()?;
                let kind_byte = reader.read_u8()?;
                let kind = RpcCallKind::try_from(kind_byte).map_err(|_| {
                    CodecError::InvalidData(format!("unknown call kind {}", kind_byte))
                })?;
                let correlation_id = reader.read_u32()?;

                RpcMessage::Call(RpcCallMessage {
                    contract_id,
                    member_id,
                    kind,
                    correlation_id,
                    payload: reader.read_remaining().to_vec(),
                })
            }
            RpcMessageType::Response => {
                let correlation_id = reader.read_u32()?;
                let status_byte = reader.read_u8()?;
                let status = RpcResultStatus::try_from(status_byte).map_err(|_| {
                    CodecError::InvalidData(format!("unknown result status {}", status_byte))
                })?;

                RpcMessage::Response(RpcResponseMessage {
                    correlation_id,
                    status,
                    payload: reader.read_remaining().to_vec(),
                })
            }
            RpcMessageType::ListDelta => {
                let entity_id = reader.read_u64()?;
                let op_byte = reader.read_u8()?;
                let op = RpcListOp::try_from(op_byte).map_err(|_| {
                    CodecError::InvalidData(format!("unknown list op {}", op_byte))
                })?;
                let index = reader.read_u32()?;

                RpcMessage::ListDelta(RpcListDeltaMessage {
                    entity_id,
                    op,
                    index,
                    payload: reader.read_remaining().to_vec(),
                })
            }
        };

        Ok(message)
    }
}
